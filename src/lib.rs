//! A `Set-Cookie` value object for Rust servers.
//!
//! # Overview
//!
//! You can use `amaretti` to build the `Set-Cookie` header values your server
//! sends, and to turn such header values back into structured cookies.
//!
//! It has support for:
//!
//! - Building cookies with validated attributes, via [`Cookie`] and [`CookieConfig`]
//! - Deriving modified copies of a cookie, via the `with_*` methods of [`Cookie`]
//! - Serializing a cookie to a `Set-Cookie` header value, via [`Cookie::to_header_string`]
//! - Parsing a `Set-Cookie` header value, via [`Cookie::parse`]
//! - Splitting arbitrary header values while respecting quoted strings, via [`tokenizer::split`]
//!
//! In particular:
//!
//! - Names and values are percent-encoded by default (but you can opt out with raw cookies)
//! - A cookie without a value serializes as a deletion
//! - Expiration times can be timestamps, date-times or date expressions such as `+1 day`
//! - The `Partitioned` attribute is supported
//!
//! # Non-goals
//!
//! `amaretti` doesn't send headers: it gives you the header value, you attach it
//! to your response.
//! It doesn't parse `Cookie` request headers with multiple cookies, nor does it
//! implement a cookie jar.
//!
//! # Quickstart
//!
//! ## Outgoing cookies
//!
//! ```rust
//! use amaretti::{Cookie, CookieConfig};
//!
//! // `Cookie::create` gives you a cookie with sensible defaults:
//! // available on `/`, `HttpOnly` and `SameSite=Lax`.
//! let cookie = Cookie::create("name", "a value").unwrap();
//! assert_eq!(cookie.to_string(), "name=a%20value; path=/; httponly; samesite=lax");
//!
//! // Use `CookieConfig` to control every attribute at once...
//! let mut config = CookieConfig::default();
//! config.value = Some("value".into());
//! config.domain = Some("example.com".into());
//! config.secure = Some(true);
//! let cookie = Cookie::new("id", config).unwrap();
//! assert_eq!(
//!     cookie.to_string(),
//!     "id=value; path=/; domain=example.com; secure; httponly; samesite=lax"
//! );
//!
//! // ...or derive a modified copy of an existing cookie.
//! let cookie = cookie.with_same_site("strict").unwrap().with_http_only(false);
//! assert_eq!(
//!     cookie.to_string(),
//!     "id=value; path=/; domain=example.com; secure; samesite=strict"
//! );
//!
//! // A cookie without a value tells the client to delete it.
//! let removal = cookie.with_value(None).to_string();
//! assert!(removal.starts_with("id=deleted; expires="));
//! assert!(removal.contains("; Max-Age=0"));
//! ```
//!
//! ## Parsing
//!
//! ```rust
//! use amaretti::{Cookie, SameSite};
//!
//! let cookie = Cookie::parse(r#"name="a;value"; Path=/app; HttpOnly; SameSite=None; Secure"#, false).unwrap();
//! assert_eq!(cookie.name(), "name");
//! assert_eq!(cookie.value(), Some("a;value"));
//! assert_eq!(cookie.path(), "/app");
//! assert!(cookie.is_http_only());
//! assert!(cookie.is_secure());
//! assert_eq!(cookie.same_site(), Some(SameSite::None));
//! ```
//!
//! [`tokenizer::split`]: crate::tokenizer::split

pub mod config;
mod cookie;
mod encoding;
mod expiration;
mod parse;
mod same_site;
pub mod tokenizer;

pub use config::CookieConfig;
pub use cookie::Cookie;
pub use expiration::Expiration;
pub use same_site::SameSite;
pub use time;

/// Errors that can occur when using `amaretti`.
pub mod errors {
    pub use crate::cookie::ValidationError;
    pub use crate::encoding::DecodingError;
    pub use crate::parse::ParseError;
    pub use crate::tokenizer::InvalidInputError;
}
