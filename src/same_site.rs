use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// The `SameSite` cookie attribute.
///
/// A cookie with a `SameSite` attribute is imposed restrictions on when it is
/// sent to the origin server in a cross-site request. If the `SameSite`
/// attribute is "strict", then the cookie is never sent in cross-site requests.
/// If the `SameSite` attribute is "lax", the cookie is only sent in cross-site
/// requests with "safe" HTTP methods, i.e, `GET`, `HEAD`, `OPTIONS`, `TRACE`.
/// If the `SameSite` attribute is "none", the cookie is sent in all cross-site
/// requests if the "Secure" flag is also set, otherwise the cookie is ignored.
///
/// `SameSite` values are rendered in lowercase and parsed case-insensitively.
///
/// ```rust
/// use amaretti::SameSite;
///
/// assert_eq!("LAX".parse::<SameSite>().unwrap(), SameSite::Lax);
/// assert_eq!(SameSite::Strict.to_string(), "strict");
/// assert!("bogus".parse::<SameSite>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SameSite {
    /// The "strict" `SameSite` attribute.
    #[cfg_attr(feature = "serde", serde(alias = "Strict"))]
    Strict,
    /// The "lax" `SameSite` attribute.
    #[cfg_attr(feature = "serde", serde(alias = "Lax"))]
    Lax,
    /// The "none" `SameSite` attribute.
    #[cfg_attr(feature = "serde", serde(alias = "None"))]
    None,
}

impl SameSite {
    /// Returns `true` if `self` is `SameSite::Strict` and `false` otherwise.
    #[inline]
    pub fn is_strict(&self) -> bool {
        match *self {
            SameSite::Strict => true,
            SameSite::Lax | SameSite::None => false,
        }
    }

    /// Returns `true` if `self` is `SameSite::Lax` and `false` otherwise.
    #[inline]
    pub fn is_lax(&self) -> bool {
        match *self {
            SameSite::Lax => true,
            SameSite::Strict | SameSite::None => false,
        }
    }

    /// Returns `true` if `self` is `SameSite::None` and `false` otherwise.
    #[inline]
    pub fn is_none(&self) -> bool {
        match *self {
            SameSite::None => true,
            SameSite::Lax | SameSite::Strict => false,
        }
    }

    /// Returns the `SameSite` attribute as a lowercase string slice.
    pub fn as_str(&self) -> &'static str {
        match *self {
            SameSite::Strict => "strict",
            SameSite::Lax => "lax",
            SameSite::None => "none",
        }
    }

    /// Normalize an optional, user-provided `SameSite` value.
    ///
    /// `None` and the empty string both mean "no `SameSite` attribute".
    /// Anything else must be one of `lax`, `strict` or `none`, in any case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::SameSite;
    ///
    /// assert_eq!(SameSite::normalize(Some("Lax")).unwrap(), Some(SameSite::Lax));
    /// assert_eq!(SameSite::normalize(Some("")).unwrap(), None);
    /// assert_eq!(SameSite::normalize(None).unwrap(), None);
    /// assert!(SameSite::normalize(Some("bogus")).is_err());
    /// ```
    pub fn normalize(value: Option<&str>) -> Result<Option<SameSite>, ValidationError> {
        match value {
            None | Some("") => Ok(None),
            Some(v) => v.parse().map(Some),
        }
    }
}

impl FromStr for SameSite {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("lax") {
            Ok(SameSite::Lax)
        } else if s.eq_ignore_ascii_case("strict") {
            Ok(SameSite::Strict)
        } else if s.eq_ignore_ascii_case("none") {
            Ok(SameSite::None)
        } else {
            Err(ValidationError::InvalidSameSite {
                value: s.to_owned(),
            })
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
