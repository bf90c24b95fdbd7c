use std::fmt;
use std::fmt::Write as _;

use time::OffsetDateTime;

use crate::encoding::{encode_name, encode_value, RESERVED_NAME_CHARS};
use crate::expiration::write_http_date;
use crate::{CookieConfig, Expiration, SameSite};

/// How far in the past the `expires` attribute of a deletion is set: one year and one second.
const DELETION_AGE: i64 = 31_536_001;

/// A cookie, as sent by a server in an HTTP response using the `Set-Cookie` header.
///
/// `Cookie` is a value object: it can't be modified in place.
/// Its `with_*` methods return an updated copy and leave the original untouched.
///
/// ## Constructing a `Cookie`
///
/// Use [`Cookie::create()`] to build a cookie with a name, a value and default
/// attributes:
///
/// ```rust
/// use amaretti::Cookie;
///
/// let cookie = Cookie::create("name", "value").unwrap();
/// assert_eq!(cookie.to_string(), "name=value; path=/; httponly; samesite=lax");
/// ```
///
/// Use [`Cookie::new()`] with a [`CookieConfig`] to control every attribute,
/// or [`Cookie::parse()`] to build a cookie out of a `Set-Cookie` header value.
///
/// ## Updating a `Cookie`
///
/// ```rust
/// use amaretti::Cookie;
///
/// let cookie = Cookie::create("name", "value").unwrap();
/// let updated = cookie
///     .with_domain("rust-lang.org")
///     .with_path("/docs")
///     .with_secure(true)
///     .with_same_site("Strict")
///     .unwrap();
///
/// assert_eq!(
///     updated.to_string(),
///     "name=value; path=/docs; domain=rust-lang.org; secure; httponly; samesite=strict"
/// );
/// // The original is left untouched.
/// assert_eq!(cookie.path(), "/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// The cookie's name. Never empty.
    pub(crate) name: String,
    /// The cookie's value, if any.
    pub(crate) value: Option<String>,
    /// Unix timestamp of the expiration, `0` for a session cookie.
    pub(crate) expires_at: i64,
    /// The cookie's path. Never empty.
    pub(crate) path: String,
    /// The cookie's domain, if any.
    pub(crate) domain: Option<String>,
    /// Whether this cookie was marked Secure, if it was decided.
    pub(crate) secure: Option<bool>,
    /// Whether this cookie was marked HttpOnly.
    pub(crate) http_only: bool,
    /// The `SameSite` attribute.
    pub(crate) same_site: Option<SameSite>,
    /// The `Partitioned` attribute.
    pub(crate) partitioned: bool,
    /// Whether name and value are sent without percent-encoding.
    pub(crate) raw: bool,
    /// The fallback when `secure` is `None`.
    pub(crate) secure_default: bool,
}

impl Cookie {
    /// Creates a new [`Cookie`] with the given name and attributes.
    ///
    /// # Errors
    ///
    /// It fails with a [`ValidationError`] if:
    ///
    /// - `name` is empty;
    /// - `config.raw` is `true` and `name` contains `=`, `,`, `;` or whitespace;
    /// - `config.same_site` is not a valid `SameSite` value;
    /// - `config.expires` can't be converted into a timestamp.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::{Cookie, CookieConfig};
    ///
    /// let mut config = CookieConfig::default();
    /// config.value = Some("value".into());
    /// config.raw = true;
    ///
    /// assert!(Cookie::new("name", config.clone()).is_ok());
    /// assert!(Cookie::new("na;me", config.clone()).is_err());
    /// assert!(Cookie::new("", config).is_err());
    /// ```
    pub fn new<N: Into<String>>(name: N, config: CookieConfig) -> Result<Cookie, ValidationError> {
        Self::new_at(name.into(), config, OffsetDateTime::now_utc())
    }

    /// Creates a new [`Cookie`] with the given name and value.
    /// All other attributes take the defaults of [`CookieConfig`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::{Cookie, SameSite};
    ///
    /// let cookie = Cookie::create("name", "value").unwrap();
    /// assert_eq!(cookie.name(), "name");
    /// assert_eq!(cookie.value(), Some("value"));
    /// assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    /// assert!(cookie.is_http_only());
    /// ```
    pub fn create<N, V>(name: N, value: V) -> Result<Cookie, ValidationError>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let config = CookieConfig {
            value: Some(value.into()),
            ..Default::default()
        };
        Self::new(name, config)
    }

    pub(crate) fn new_at(
        name: String,
        config: CookieConfig,
        now: OffsetDateTime,
    ) -> Result<Cookie, ValidationError> {
        let CookieConfig {
            value,
            expires,
            path,
            domain,
            secure,
            http_only,
            raw,
            same_site,
            partitioned,
        } = config;

        check_name(&name, raw)?;
        Ok(Cookie {
            expires_at: expires.timestamp_at(now)?,
            same_site: SameSite::normalize(same_site.as_deref())?,
            path: normalize_path(path.as_deref().unwrap_or_default()),
            name,
            value,
            domain,
            secure,
            http_only,
            partitioned,
            raw,
            secure_default: false,
        })
    }

    /// Returns the name of `self`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value of `self`, if any.
    ///
    /// # Example
    ///
    /// ```
    /// use amaretti::Cookie;
    ///
    /// let c = Cookie::create("name", "value").unwrap();
    /// assert_eq!(c.value(), Some("value"));
    ///
    /// let c = c.with_value(None);
    /// assert_eq!(c.value(), None);
    /// ```
    #[inline]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns the unix timestamp at which `self` expires, or `0` for a session cookie.
    #[inline]
    pub fn expires_time(&self) -> i64 {
        self.expires_at
    }

    /// Returns the number of seconds until `self` expires, as of now.
    ///
    /// It is `0` for session cookies and for cookies that already expired.
    pub fn max_age(&self) -> i64 {
        self.max_age_at(OffsetDateTime::now_utc())
    }

    /// Returns the number of seconds until `self` expires, as of `now`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::Cookie;
    /// use amaretti::time::macros::datetime;
    ///
    /// let now = datetime!(2015-10-21 07:28:00 UTC);
    /// let c = Cookie::create("name", "value").unwrap();
    ///
    /// let in_an_hour = c.with_expires(now.unix_timestamp() + 3600).unwrap();
    /// assert_eq!(in_an_hour.max_age_at(now), 3600);
    ///
    /// let an_hour_ago = c.with_expires(now.unix_timestamp() - 3600).unwrap();
    /// assert_eq!(an_hour_ago.max_age_at(now), 0);
    /// ```
    pub fn max_age_at(&self, now: OffsetDateTime) -> i64 {
        self.expires_at
            .saturating_sub(now.unix_timestamp())
            .max(0)
    }

    /// Returns the path on the server where `self` is available.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the domain `self` is available to, if one was specified.
    #[inline]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Returns the `Secure` attribute as it was set: `None` means
    /// "use the secure default".
    ///
    /// Check out [`Cookie::is_secure`] for the effective value.
    #[inline]
    pub fn secure(&self) -> Option<bool> {
        self.secure
    }

    /// Returns whether `self` must only be sent over HTTPS.
    ///
    /// An explicit `Secure` setting always wins. If there is none, the secure
    /// default applies (see [`Cookie::set_secure_default`]).
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::Cookie;
    ///
    /// let mut c = Cookie::create("name", "value").unwrap();
    /// assert_eq!(c.secure(), None);
    /// assert!(!c.is_secure());
    ///
    /// c.set_secure_default(true);
    /// assert!(c.is_secure());
    ///
    /// let mut c = c.with_secure(false);
    /// c.set_secure_default(true);
    /// assert!(!c.is_secure());
    /// ```
    #[inline]
    pub fn is_secure(&self) -> bool {
        self.secure.unwrap_or(self.secure_default)
    }

    /// Returns whether `self` is hidden from client-side scripts.
    #[inline]
    pub fn is_http_only(&self) -> bool {
        self.http_only
    }

    /// Returns the `SameSite` attribute of `self`, if any.
    #[inline]
    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    /// Returns whether `self` is tied to the top-level site in cross-site contexts.
    ///
    /// **Note:** This cookie attribute is an [HTTP draft]! Its meaning and
    /// definition are not standardized and therefore subject to change.
    ///
    /// [HTTP draft]: https://github.com/privacycg/CHIPS
    #[inline]
    pub fn is_partitioned(&self) -> bool {
        self.partitioned
    }

    /// Returns whether the name and value of `self` are sent without percent-encoding.
    #[inline]
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    /// Returns `true` if `self` has an expiration and it is in the past.
    pub fn is_cleared(&self) -> bool {
        self.is_cleared_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if `self` has an expiration and it is before `now`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::Cookie;
    /// use amaretti::time::macros::datetime;
    ///
    /// let now = datetime!(2015-10-21 07:28:00 UTC);
    /// let c = Cookie::create("name", "value").unwrap();
    /// assert!(!c.is_cleared_at(now));
    ///
    /// let c = c.with_expires(now.unix_timestamp() - 1).unwrap();
    /// assert!(c.is_cleared_at(now));
    /// ```
    pub fn is_cleared_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at != 0 && now.unix_timestamp() > self.expires_at
    }

    /// Sets the value used for the `Secure` attribute when it was left undecided.
    ///
    /// This is the only setting that can be changed in place.
    pub fn set_secure_default(&mut self, default: bool) {
        self.secure_default = default;
    }
}

/// Methods to derive a modified copy of a [`Cookie`].
impl Cookie {
    /// Returns a copy of `self` with the given value.
    /// `None` turns the copy into a deletion.
    pub fn with_value<'a, V: Into<Option<&'a str>>>(&self, value: V) -> Cookie {
        Cookie {
            value: value.into().map(str::to_owned),
            ..self.clone()
        }
    }

    /// Returns a copy of `self` with the given domain. `None` unsets it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::Cookie;
    ///
    /// let c = Cookie::create("name", "value").unwrap();
    /// assert_eq!(c.domain(), None);
    ///
    /// let c = c.with_domain("rust-lang.org");
    /// assert_eq!(c.domain(), Some("rust-lang.org"));
    ///
    /// let c = c.with_domain(None);
    /// assert_eq!(c.domain(), None);
    /// ```
    pub fn with_domain<'a, D: Into<Option<&'a str>>>(&self, domain: D) -> Cookie {
        Cookie {
            domain: domain.into().map(str::to_owned),
            ..self.clone()
        }
    }

    /// Returns a copy of `self` with the given expiration.
    ///
    /// Check out [`Expiration`] for the accepted formats.
    ///
    /// # Errors
    ///
    /// Fails if `expires` is a string that can't be parsed as a date.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::Cookie;
    ///
    /// let c = Cookie::create("name", "value").unwrap();
    /// let c = c.with_expires("Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
    /// assert_eq!(c.expires_time(), 1445412480);
    ///
    /// assert!(c.with_expires("not a date").is_err());
    /// ```
    pub fn with_expires<T: Into<Expiration>>(&self, expires: T) -> Result<Cookie, ValidationError> {
        Ok(Cookie {
            expires_at: expires.into().timestamp()?,
            ..self.clone()
        })
    }

    /// Returns a copy of `self` with the given path. An empty path becomes `/`.
    pub fn with_path(&self, path: &str) -> Cookie {
        Cookie {
            path: normalize_path(path),
            ..self.clone()
        }
    }

    /// Returns a copy of `self` with the given `Secure` setting.
    /// `None` defers to the secure default.
    pub fn with_secure<T: Into<Option<bool>>>(&self, secure: T) -> Cookie {
        Cookie {
            secure: secure.into(),
            ..self.clone()
        }
    }

    /// Returns a copy of `self` with the given `HttpOnly` setting.
    pub fn with_http_only(&self, http_only: bool) -> Cookie {
        Cookie {
            http_only,
            ..self.clone()
        }
    }

    /// Returns a copy of `self` that sends its name and value with (or without) percent-encoding.
    ///
    /// # Errors
    ///
    /// Enabling raw mode fails if the name contains `=`, `,`, `;` or whitespace.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::Cookie;
    ///
    /// let c = Cookie::create("a name", "a value").unwrap();
    /// assert!(c.to_string().starts_with("a%20name=a%20value"));
    /// assert!(c.with_raw(true).is_err());
    ///
    /// let c = Cookie::create("name", "a%20value").unwrap().with_raw(true).unwrap();
    /// assert!(c.to_string().starts_with("name=a%20value"));
    /// ```
    pub fn with_raw(&self, raw: bool) -> Result<Cookie, ValidationError> {
        check_name(&self.name, raw)?;
        Ok(Cookie {
            raw,
            ..self.clone()
        })
    }

    /// Returns a copy of `self` with the given `SameSite` attribute.
    ///
    /// The value is case-insensitive. `None` and the empty string unset it.
    ///
    /// # Errors
    ///
    /// Fails if the value is not one of `lax`, `strict` or `none`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::{Cookie, SameSite};
    ///
    /// let c = Cookie::create("name", "value").unwrap();
    ///
    /// let strict = c.with_same_site("STRICT").unwrap();
    /// assert_eq!(strict.same_site(), Some(SameSite::Strict));
    ///
    /// let unset = c.with_same_site("").unwrap();
    /// assert_eq!(unset.same_site(), None);
    ///
    /// assert!(c.with_same_site("bogus").is_err());
    /// ```
    pub fn with_same_site<'a, S: Into<Option<&'a str>>>(
        &self,
        same_site: S,
    ) -> Result<Cookie, ValidationError> {
        Ok(Cookie {
            same_site: SameSite::normalize(same_site.into())?,
            ..self.clone()
        })
    }

    /// Returns a copy of `self` with the given `Partitioned` setting.
    pub fn with_partitioned(&self, partitioned: bool) -> Cookie {
        Cookie {
            partitioned,
            ..self.clone()
        }
    }
}

/// Serialization.
impl Cookie {
    /// Formats `self` as a `Set-Cookie` header value, as of now.
    ///
    /// It's equivalent to `self.to_string()`.
    pub fn to_header_string(&self) -> String {
        self.to_header_string_at(OffsetDateTime::now_utc())
    }

    /// Formats `self` as a `Set-Cookie` header value, computing `Max-Age`
    /// (and the expiration of deletions) relative to `now`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::Cookie;
    /// use amaretti::time::macros::datetime;
    ///
    /// let now = datetime!(2015-10-21 07:28:00 UTC);
    /// let c = Cookie::create("name", "value")
    ///     .unwrap()
    ///     .with_expires(now.unix_timestamp() + 60)
    ///     .unwrap();
    /// assert_eq!(
    ///     c.to_header_string_at(now),
    ///     "name=value; expires=Wed, 21 Oct 2015 07:29:00 GMT; Max-Age=60; path=/; httponly; samesite=lax"
    /// );
    ///
    /// let deletion = c.with_value(None);
    /// assert_eq!(
    ///     deletion.to_header_string_at(now),
    ///     "name=deleted; expires=Tue, 21 Oct 2014 07:27:59 GMT; Max-Age=0; path=/; httponly; samesite=lax"
    /// );
    /// ```
    pub fn to_header_string_at(&self, now: OffsetDateTime) -> String {
        let mut header = String::new();
        // Writing to a `String` can only fail on out-of-range dates, and stored
        // timestamps are capped at year 9999.
        let _ = self.write_header(&mut header, now.unix_timestamp());
        header
    }

    fn write_header<W: fmt::Write>(&self, w: &mut W, now: i64) -> fmt::Result {
        if self.raw {
            w.write_str(&self.name)?;
        } else {
            w.write_str(&encode_name(&self.name))?;
        }
        w.write_char('=')?;

        match self.value.as_deref() {
            None | Some("") => {
                w.write_str("deleted; expires=")?;
                write_http_date(w, now - DELETION_AGE)?;
                w.write_str("; Max-Age=0")?;
            }
            Some(value) => {
                if self.raw {
                    w.write_str(value)?;
                } else {
                    write!(w, "{}", encode_value(value))?;
                }
                if self.expires_at != 0 {
                    w.write_str("; expires=")?;
                    write_http_date(w, self.expires_at)?;
                    write!(w, "; Max-Age={}", self.expires_at.saturating_sub(now).max(0))?;
                }
            }
        }

        if !self.path.is_empty() {
            write!(w, "; path={}", self.path)?;
        }

        if let Some(domain) = self.domain().filter(|d| !d.is_empty()) {
            write!(w, "; domain={}", domain)?;
        }

        if self.is_secure() {
            w.write_str("; secure")?;
        }

        if self.http_only {
            w.write_str("; httponly")?;
        }

        if let Some(same_site) = self.same_site {
            write!(w, "; samesite={}", same_site)?;
        }

        if self.partitioned {
            w.write_str("; partitioned")?;
        }

        Ok(())
    }
}

impl fmt::Display for Cookie {
    /// Formats the cookie `self` as a `Set-Cookie` header value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::Cookie;
    ///
    /// let cookie = Cookie::create("foo", "bar").unwrap().with_http_only(false);
    /// assert_eq!(cookie.to_string(), "foo=bar; path=/; samesite=lax");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_header(f, OffsetDateTime::now_utc().unix_timestamp())
    }
}

fn check_name(name: &str, raw: bool) -> Result<(), ValidationError> {
    if raw && name.contains(&RESERVED_NAME_CHARS[..]) {
        return Err(ValidationError::ReservedCharacters {
            name: name.to_owned(),
        });
    }
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(())
}

fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_owned()
    } else {
        path.to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
/// The error returned when a cookie attribute is invalid.
///
/// It can occur when building a [`Cookie`], when deriving a modified copy of one,
/// or when parsing one.
pub enum ValidationError {
    #[error("The cookie name cannot be empty")]
    EmptyName,
    #[error("The cookie name `{name}` contains invalid characters")]
    ReservedCharacters { name: String },
    #[error("`{value}` is not a valid `SameSite` value: expected `lax`, `strict` or `none`")]
    InvalidSameSite { value: String },
    #[error("The cookie expiration time is not valid: `{input}`")]
    InvalidExpiration { input: String },
}
