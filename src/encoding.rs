use std::borrow::Cow;

use anyhow::Context;
use percent_encoding::{percent_decode, AsciiSet, NON_ALPHANUMERIC};

/// https://www.rfc-editor.org/rfc/rfc3986#section-2.3: everything but unreserved characters.
const VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Characters that cannot appear in a raw cookie name.
pub(crate) const RESERVED_NAME_CHARS: [char; 9] =
    ['=', ',', ';', ' ', '\t', '\r', '\n', '\x0B', '\x0C'];

/// Escape the characters of a cookie name that would break the `Set-Cookie` syntax.
///
/// Only [`RESERVED_NAME_CHARS`] are replaced, everything else is kept as is.
pub(crate) fn encode_name(name: &str) -> Cow<'_, str> {
    if !name.contains(&RESERVED_NAME_CHARS[..]) {
        return Cow::Borrowed(name);
    }
    let mut encoded = String::with_capacity(name.len() + 8);
    for c in name.chars() {
        match c {
            '=' => encoded.push_str("%3D"),
            ',' => encoded.push_str("%2C"),
            ';' => encoded.push_str("%3B"),
            ' ' => encoded.push_str("%20"),
            '\t' => encoded.push_str("%09"),
            '\r' => encoded.push_str("%0D"),
            '\n' => encoded.push_str("%0A"),
            '\x0B' => encoded.push_str("%0B"),
            '\x0C' => encoded.push_str("%0C"),
            _ => encoded.push(c),
        }
    }
    Cow::Owned(encoded)
}

/// Percent-encode a cookie value.
pub(crate) fn encode_value(value: &str) -> impl std::fmt::Display + '_ {
    percent_encoding::utf8_percent_encode(value, VALUE)
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to percent-decode `{raw_value}`: {source}")]
/// An error that occurred while decoding a percent-encoded cookie name or value.
///
/// This error is returned by [`Cookie::parse`].
///
/// [`Cookie::parse`]: crate::Cookie::parse
pub struct DecodingError {
    pub(crate) raw_value: String,
    #[source]
    pub(crate) source: anyhow::Error,
}

/// Decode a URL-encoded cookie name or value: `+` is a space, `%XX` a byte.
pub(crate) fn decode(raw: &str) -> Result<String, DecodingError> {
    let plus_as_space = raw.replace('+', " ");
    percent_decode(plus_as_space.as_bytes())
        .decode_utf8()
        .map(Cow::into_owned)
        .context("The percent-decoded bytes are not valid UTF-8")
        .map_err(|e| DecodingError {
            raw_value: raw.to_string(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::{decode, encode_name, encode_value};

    #[test]
    fn names_only_escape_reserved_characters() {
        assert_eq!(encode_name("plain"), "plain");
        assert_eq!(encode_name("a=b;c d"), "a%3Db%3Bc%20d");
        assert_eq!(encode_name("tab\tnl\n"), "tab%09nl%0A");
        assert_eq!(encode_name("ünï%"), "ünï%");
    }

    #[test]
    fn values_are_fully_encoded() {
        assert_eq!(encode_value("a-b_c.d~e").to_string(), "a-b_c.d~e");
        assert_eq!(encode_value("a value/ü").to_string(), "a%20value%2F%C3%BC");
        assert_eq!(encode_value("x=1;y").to_string(), "x%3D1%3By");
    }

    #[test]
    fn decoding() {
        assert_eq!(decode("a%20b").unwrap(), "a b");
        assert_eq!(decode("a+b").unwrap(), "a b");
        assert_eq!(decode("a%2Bb").unwrap(), "a+b");
        assert_eq!(decode("100%").unwrap(), "100%");
        assert_eq!(decode("%C3%BC").unwrap(), "ü");

        let err = decode("%F1%F2%F3").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to percent-decode `%F1%F2%F3`: The percent-decoded bytes are not valid UTF-8"
        );
    }
}
