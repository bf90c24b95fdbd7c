use std::str::FromStr;

use time::OffsetDateTime;

use crate::cookie::ValidationError;
use crate::encoding::{self, DecodingError};
use crate::tokenizer::{combine, split_on, AttributeValue, Segment};
use crate::{Cookie, CookieConfig, Expiration};

/// Attributes the parser knows how to map onto a [`Cookie`].
const KNOWN_ATTRIBUTES: [&str; 9] = [
    "expires",
    "max-age",
    "path",
    "domain",
    "secure",
    "httponly",
    "raw",
    "samesite",
    "partitioned",
];

impl Cookie {
    /// Parses a `Set-Cookie` header value into a [`Cookie`].
    ///
    /// The first `name=value` pair becomes the name and value of the cookie.
    /// The following pairs are matched case-insensitively against the known
    /// cookie attributes; unknown attributes are ignored and, when an attribute
    /// appears more than once, the last occurrence wins.
    ///
    /// If `decode` is `true`, name and value are URL-decoded (`+` is a space)
    /// and the resulting cookie is not raw. Otherwise they are kept verbatim and
    /// the cookie is raw, unless the header says otherwise via a `raw` attribute.
    ///
    /// Attributes that are missing take these values: no expiration, path `/`,
    /// no domain, not secure, not HttpOnly, no `SameSite`, not partitioned.
    /// A positive `Max-Age` (or any `Max-Age` alongside an `Expires` in the
    /// future) replaces the expiration with `now + Max-Age`.
    /// Only the leading integer of a `Max-Age` value is read: `60s` counts as `60`
    /// and a value without digits, such as `abc`, counts as `0`.
    /// A `Max-Age` without a value is ignored.
    ///
    /// # Errors
    ///
    /// It fails with [`ParseError::Validation`] if the cookie is invalid (e.g.
    /// the name is empty, or `SameSite` has an unknown value) and with
    /// [`ParseError::Decoding`] if URL-decoding yields invalid UTF-8.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::{Cookie, SameSite};
    ///
    /// let cookie = Cookie::parse("name=value; HttpOnly; Secure; SameSite=Strict", false).unwrap();
    /// assert_eq!(cookie.name(), "name");
    /// assert_eq!(cookie.value(), Some("value"));
    /// assert!(cookie.is_http_only());
    /// assert!(cookie.is_secure());
    /// assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    /// assert_eq!(cookie.path(), "/");
    ///
    /// let cookie = Cookie::parse("a+name=a%20value", true).unwrap();
    /// assert_eq!(cookie.name(), "a name");
    /// assert_eq!(cookie.value(), Some("a value"));
    /// assert!(!cookie.is_raw());
    ///
    /// assert!(Cookie::parse("=value", false).is_err());
    /// ```
    pub fn parse(header: &str, decode: bool) -> Result<Cookie, ParseError> {
        Self::parse_at(header, decode, OffsetDateTime::now_utc())
    }

    /// Parses a `Set-Cookie` header value into a [`Cookie`], resolving
    /// `Max-Age` and relative dates against `now`.
    ///
    /// Check out [`Cookie::parse`] for the details.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::Cookie;
    /// use amaretti::time::macros::datetime;
    ///
    /// let now = datetime!(2015-10-21 07:28:00 UTC);
    /// let cookie = Cookie::parse_at("id=1; Max-Age=60", false, now).unwrap();
    /// assert_eq!(cookie.expires_time(), now.unix_timestamp() + 60);
    /// ```
    pub fn parse_at(header: &str, decode: bool, now: OffsetDateTime) -> Result<Cookie, ParseError> {
        let segments = split_on(header, &[';', '=']);
        let (first, rest) = match segments.split_first() {
            Some((first, rest)) => (first.as_group().unwrap_or_default(), rest),
            None => (&[][..], &[][..]),
        };

        let raw_name = first.first().and_then(Segment::as_text).unwrap_or_default();
        let raw_value = first.get(1).and_then(Segment::as_text);
        let (name, value) = if decode {
            (
                encoding::decode(raw_name)?,
                raw_value.map(encoding::decode).transpose()?,
            )
        } else {
            (raw_name.to_owned(), raw_value.map(str::to_owned))
        };

        let attributes = combine(rest);
        for (attribute, _) in attributes.iter() {
            if !KNOWN_ATTRIBUTES.contains(&attribute.as_str()) {
                tracing::trace!(attribute = %attribute, "Ignoring an unknown cookie attribute");
            }
        }

        let flag = |attribute: &str| attributes.get(attribute).map(is_truthy);
        let text = |attribute: &str| {
            attributes
                .get(attribute)
                .and_then(AttributeValue::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        let mut expires = match attributes.get("expires") {
            None | Some(AttributeValue::Flag) => Expiration::Timestamp(0),
            Some(AttributeValue::Value(v)) => Expiration::Text(v.to_owned()),
        }
        .timestamp_at(now)
        .map_err(|e| log_validation_failure(&name, e))?;

        if let Some(max_age) = attributes
            .get("max-age")
            .and_then(AttributeValue::as_str)
            .map(leading_integer)
        {
            let now = now.unix_timestamp();
            if max_age > 0 || now < expires {
                tracing::debug!(
                    cookie.name = %name,
                    max_age,
                    expires,
                    "`Max-Age` overrides `Expires`"
                );
                expires = now.saturating_add(max_age);
            }
        }

        let config = CookieConfig {
            value,
            expires: Expiration::Timestamp(expires),
            path: text("path"),
            domain: text("domain"),
            secure: Some(flag("secure").unwrap_or(false)),
            http_only: flag("httponly").unwrap_or(false),
            raw: flag("raw").unwrap_or(!decode),
            same_site: text("samesite"),
            partitioned: flag("partitioned").unwrap_or(false),
        };

        Cookie::new_at(name.clone(), config, now)
            .map_err(|e| log_validation_failure(&name, e).into())
    }
}

impl FromStr for Cookie {
    type Err = ParseError;

    /// Parses a `Set-Cookie` header value without URL-decoding,
    /// like [`Cookie::parse`] with `decode` set to `false`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::Cookie;
    ///
    /// let cookie: Cookie = "name=a%20value; path=/docs".parse().unwrap();
    /// assert_eq!(cookie.value(), Some("a%20value"));
    /// assert_eq!(cookie.path(), "/docs");
    /// assert!(cookie.is_raw());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cookie::parse(s, false)
    }
}

/// A bare attribute is `true`, a valued one is `true` unless empty or `0`.
fn is_truthy(value: &AttributeValue) -> bool {
    match value {
        AttributeValue::Flag => true,
        AttributeValue::Value(v) => !(v.is_empty() || v == "0"),
    }
}

/// The integer at the start of `s`, `0` if there is none.
fn leading_integer(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

fn log_validation_failure(name: &str, error: ValidationError) -> ValidationError {
    tracing::debug!(cookie.name = %name, error = %error, "Failed to parse a cookie");
    error
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
/// The error returned by [`Cookie::parse`].
pub enum ParseError {
    /// The header describes an invalid cookie.
    #[error("Failed to parse a cookie out of a header value")]
    Validation(#[from] ValidationError),
    /// The cookie name or value could not be URL-decoded.
    #[error("Failed to parse a cookie out of a header value")]
    Decoding(#[from] DecodingError),
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use googletest::prelude::*;
    use time::macros::datetime;
    use time::OffsetDateTime;

    use super::{leading_integer, ParseError};
    use crate::errors::ValidationError;
    use crate::{Cookie, SameSite};

    fn now() -> OffsetDateTime {
        datetime!(2023-11-14 22:13:20 UTC)
    }

    fn parse(header: &str) -> Cookie {
        Cookie::parse_at(header, false, now()).unwrap()
    }

    #[googletest::test]
    fn defaults() {
        let cookie = parse("name=value");
        expect_that!(cookie.name(), eq("name"));
        expect_that!(cookie.value(), some(eq("value")));
        expect_that!(cookie.expires_time(), eq(0));
        expect_that!(cookie.path(), eq("/"));
        expect_that!(cookie.domain(), none());
        expect_that!(cookie.secure(), some(eq(false)));
        expect_that!(cookie.is_http_only(), eq(false));
        expect_that!(cookie.is_raw(), eq(true));
        expect_that!(cookie.same_site(), none());
        expect_that!(cookie.is_partitioned(), eq(false));
    }

    #[googletest::test]
    fn attributes_are_case_insensitive() {
        let cookie = parse("name=value; HttpOnly; Secure; SameSite=Strict; PATH=/app; Domain=example.com; partitioned");
        expect_that!(cookie.is_http_only(), eq(true));
        expect_that!(cookie.is_secure(), eq(true));
        expect_that!(cookie.same_site(), some(eq(SameSite::Strict)));
        expect_that!(cookie.path(), eq("/app"));
        expect_that!(cookie.domain(), some(eq("example.com")));
        expect_that!(cookie.is_partitioned(), eq(true));
    }

    #[test]
    fn last_occurrence_wins() {
        let cookie = parse("a=b; path=/first; Path=/second; samesite=strict; SameSite=none");
        assert_eq!(cookie.path(), "/second");
        assert_eq!(cookie.same_site(), Some(SameSite::None));
    }

    #[googletest::test]
    fn attribute_coercions() {
        let cookie = parse("a=b; secure=0; httponly=; partitioned=yes; path; domain; samesite");
        expect_that!(cookie.secure(), some(eq(false)));
        expect_that!(cookie.is_http_only(), eq(false));
        expect_that!(cookie.is_partitioned(), eq(true));
        expect_that!(cookie.path(), eq("/"));
        expect_that!(cookie.domain(), none());
        expect_that!(cookie.same_site(), none());

        let cookie = parse("a=b; path=; domain=; samesite=; expires");
        expect_that!(cookie.path(), eq("/"));
        expect_that!(cookie.domain(), none());
        expect_that!(cookie.same_site(), none());
        expect_that!(cookie.expires_time(), eq(0));
    }

    #[test]
    fn values() {
        assert_eq!(parse("a").value(), None);
        assert_eq!(parse("a=").value(), Some(""));
        assert_eq!(parse("a=b=c").value(), Some("b=c"));
        assert_eq!(parse(r#"a="quoted; value""#).value(), Some("quoted; value"));
        assert_eq!(parse("  a  =  spaced value  ; secure").value(), Some("spaced value"));
    }

    #[test]
    fn expires() {
        let cookie = parse("a=b; expires=Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(cookie.expires_time(), 1445412480);
        assert!(cookie.is_cleared_at(now()));

        let cookie = parse("a=b; Expires=1900000000");
        assert_eq!(cookie.expires_time(), 1_900_000_000);
    }

    #[test]
    fn max_age() {
        let now_ts = now().unix_timestamp();

        // A positive `Max-Age` always wins.
        let cookie = parse("a=b; max-age=3600; expires=Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(cookie.expires_time(), now_ts + 3600);

        // A non-positive `Max-Age` only wins over an expiration in the future.
        let cookie = parse("a=b; max-age=0; expires=1900000000");
        assert_eq!(cookie.expires_time(), now_ts);
        let cookie = parse("a=b; max-age=-10; expires=1900000000");
        assert_eq!(cookie.expires_time(), now_ts - 10);
        let cookie = parse("a=b; max-age=0");
        assert_eq!(cookie.expires_time(), 0);
        let cookie = parse("a=b; max-age=0; expires=1000");
        assert_eq!(cookie.expires_time(), 1000);

        // Flags and garbage.
        let cookie = parse("a=b; max-age");
        assert_eq!(cookie.expires_time(), 0);
        let cookie = parse("a=b; max-age=abc");
        assert_eq!(cookie.expires_time(), 0);
        let cookie = parse("a=b; max-age=abc; expires=1900000000");
        assert_eq!(cookie.expires_time(), now_ts);
        let cookie = parse("a=b; max-age; expires=1900000000");
        assert_eq!(cookie.expires_time(), 1_900_000_000);
        let cookie = parse("a=b; max-age=60s");
        assert_eq!(cookie.expires_time(), now_ts + 60);
    }

    #[test]
    fn max_age_uses_the_current_time() {
        let before = OffsetDateTime::now_utc().unix_timestamp();
        let cookie = Cookie::parse("a=b; Max-Age=100", false).unwrap();
        let after = OffsetDateTime::now_utc().unix_timestamp();
        assert!((before + 100..=after + 100).contains(&cookie.expires_time()));
    }

    #[test]
    fn decoding() {
        let cookie = Cookie::parse_at("a%3Bname=a+value%21", true, now()).unwrap();
        assert_eq!(cookie.name(), "a;name");
        assert_eq!(cookie.value(), Some("a value!"));
        assert!(!cookie.is_raw());

        let cookie = Cookie::parse_at("a%3Bname=a+value%21", false, now()).unwrap();
        assert_eq!(cookie.name(), "a%3Bname");
        assert_eq!(cookie.value(), Some("a+value%21"));
        assert!(cookie.is_raw());

        // The header can override the raw default.
        let cookie = Cookie::parse_at("a=b; raw", true, now()).unwrap();
        assert!(cookie.is_raw());
        let cookie = Cookie::parse_at("a=b; raw=0", false, now()).unwrap();
        assert!(!cookie.is_raw());
    }

    #[googletest::test]
    fn errors() {
        for header in ["", "   ", "=value", " = ; secure"] {
            let err = Cookie::parse_at(header, false, now()).unwrap_err();
            expect_that!(
                matches!(err, ParseError::Validation(ValidationError::EmptyName)),
                eq(true)
            );
        }

        let err = Cookie::parse_at("a=b; samesite=bogus", false, now()).unwrap_err();
        expect_that!(err, displays_as(eq("Failed to parse a cookie out of a header value")));
        expect_that!(
            err.source().map(ToString::to_string),
            some(eq(
                "`bogus` is not a valid `SameSite` value: expected `lax`, `strict` or `none`"
            ))
        );

        let err = Cookie::parse_at("a=b; expires=someday", false, now()).unwrap_err();
        expect_that!(
            err.source().map(ToString::to_string),
            some(eq("The cookie expiration time is not valid: `someday`"))
        );

        let err = Cookie::parse_at("a=b; expires=", false, now()).unwrap_err();
        expect_that!(
            matches!(err, ParseError::Validation(ValidationError::InvalidExpiration { .. })),
            eq(true)
        );

        // Decoded names are validated against raw mode too.
        let err = Cookie::parse_at("a%3Bb=c; raw", true, now()).unwrap_err();
        expect_that!(
            matches!(err, ParseError::Validation(ValidationError::ReservedCharacters { .. })),
            eq(true)
        );

        let err = Cookie::parse_at("a=%FF", true, now()).unwrap_err();
        expect_that!(matches!(err, ParseError::Decoding(_)), eq(true));
        expect_that!(
            err.source().map(ToString::to_string),
            some(contains_substring("Failed to percent-decode `%FF`"))
        );
    }

    #[test]
    fn round_trip() {
        let original = Cookie::create("session", "abc123")
            .unwrap()
            .with_raw(true)
            .unwrap()
            .with_path("/app")
            .with_domain("example.com")
            .with_secure(true)
            .with_same_site("strict")
            .unwrap()
            .with_partitioned(true)
            .with_expires(now().unix_timestamp() + 3600)
            .unwrap();

        let parsed = Cookie::parse_at(&original.to_header_string_at(now()), false, now()).unwrap();
        assert_eq!(parsed, original);

        let deletion = original.with_value(None).with_http_only(false);
        let parsed = Cookie::parse_at(&deletion.to_header_string_at(now()), false, now()).unwrap();
        assert_eq!(parsed.value(), Some("deleted"));
        assert_eq!(parsed.path(), "/app");
        assert!(!parsed.is_http_only());
        assert!(parsed.is_cleared_at(now()));
    }

    #[test]
    fn from_str() {
        let cookie: Cookie = "a=b; secure".parse().unwrap();
        assert_eq!(cookie.value(), Some("b"));
        assert!(cookie.is_secure());
        assert!("=b".parse::<Cookie>().is_err());
    }

    #[test]
    fn leading_integers() {
        for (input, expected) in [
            ("60", 60),
            (" 60", 60),
            ("+60", 60),
            ("-60", -60),
            ("60s", 60),
            ("6.5", 6),
            ("abc", 0),
            ("", 0),
            ("-", 0),
        ] {
            assert_eq!(leading_integer(input), expected, "Failed for {input:?}");
        }
    }
}
