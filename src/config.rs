//! Construction parameters for a [`Cookie`].
//!
//! Check out the [`CookieConfig`] struct for more information.
//!
//! [`Cookie`]: crate::Cookie
use crate::Expiration;

/// `CookieConfig` holds every attribute of a [`Cookie`] except its name.
///
/// Each field has a default, so you only need to set the ones you care about.
/// The values are validated and normalized when the config is turned into a
/// [`Cookie`] via [`Cookie::new`]:
///
/// ```rust
/// use amaretti::{Cookie, CookieConfig, SameSite};
///
/// let mut config = CookieConfig::default();
/// config.value = Some("a value".into());
/// config.domain = Some("example.com".into());
/// config.same_site = Some("Strict".into());
///
/// let cookie = Cookie::new("name", config).unwrap();
/// assert_eq!(cookie.same_site(), Some(SameSite::Strict));
/// assert_eq!(cookie.path(), "/");
/// assert!(cookie.is_http_only());
/// ```
///
/// With the `serde` feature enabled, `CookieConfig` can be deserialized
/// from your application configuration. Missing fields take their default value.
///
/// [`Cookie`]: crate::Cookie
/// [`Cookie::new`]: crate::Cookie::new
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CookieConfig {
    /// The value of the cookie.
    ///
    /// `None` (or an empty string) produces a cookie that deletes its
    /// counterpart on the client when sent.
    ///
    /// By default, this field is `None`.
    pub value: Option<String>,
    /// When the cookie expires.
    ///
    /// Anything that resolves to a timestamp `<= 0` makes the cookie a
    /// session cookie: no `expires` or `Max-Age` attribute is sent.
    ///
    /// By default, this field is `Expiration::Timestamp(0)`.
    pub expires: Expiration,
    /// The path on the server where the cookie is available.
    ///
    /// `None` and the empty string are both replaced by `/`.
    ///
    /// By default, this field is `None`.
    pub path: Option<String>,
    /// The domain the cookie is available to.
    ///
    /// By default, this field is `None`.
    pub domain: Option<String>,
    /// Whether the cookie must only be sent over HTTPS.
    ///
    /// `None` defers the decision to the cookie's secure default,
    /// see [`Cookie::set_secure_default`].
    ///
    /// By default, this field is `None`.
    ///
    /// [`Cookie::set_secure_default`]: crate::Cookie::set_secure_default
    pub secure: Option<bool>,
    /// Whether the cookie is hidden from client-side scripts.
    ///
    /// By default, this field is `true`.
    pub http_only: bool,
    /// If `true`, the name and value are sent without percent-encoding.
    /// The name must then be free of `=`, `,`, `;` and whitespace.
    ///
    /// By default, this field is `false`.
    pub raw: bool,
    /// The `SameSite` attribute, case-insensitive: `lax`, `strict` or `none`.
    /// `None` or the empty string omit the attribute.
    ///
    /// By default, this field is `Some("lax")`.
    pub same_site: Option<String>,
    /// Whether the cookie is tied to the top-level site in cross-site contexts.
    ///
    /// By default, this field is `false`.
    pub partitioned: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        CookieConfig {
            value: None,
            expires: Expiration::default(),
            path: None,
            domain: None,
            secure: None,
            http_only: true,
            raw: false,
            same_site: Some("lax".into()),
            partitioned: false,
        }
    }
}
