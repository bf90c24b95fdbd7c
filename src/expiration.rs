use std::fmt;
use std::time::SystemTime;

use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime};

use crate::errors::ValidationError;

/// The latest expiration RFC 6265 allows: `9999-12-31 23:59:59 UTC`.
pub(crate) const MAX_TIMESTAMP: i64 = 253_402_300_799;

/// From http://tools.ietf.org/html/rfc2616#section-3.3.1.
static HTTP_DATE: &[FormatItem<'_>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year padding:none] [hour]:[minute]:[second] GMT"
);

static HTTP_DATE_INPUT: &[FormatItem<'_>] = format_description!(
    "[weekday repr:short case_sensitive:false], [day] [month repr:short case_sensitive:false] [year] [hour]:[minute]:[second] GMT"
);

/// The date format of the original Netscape cookie draft.
static NETSCAPE_DATE_INPUT: &[FormatItem<'_>] = format_description!(
    "[weekday repr:short case_sensitive:false], [day]-[month repr:short case_sensitive:false]-[year] [hour]:[minute]:[second] GMT"
);

static DATE_TIME_INPUT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

static DATE_INPUT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// When a cookie expires, in any of the shapes callers tend to have at hand.
///
/// An `Expiration` is converted to a unix timestamp when a cookie is built:
///
/// - `Timestamp`s are used as is;
/// - `DateTime`s are converted via their unix timestamp;
/// - `Text` is used as a number if it looks like one, and parsed as a
///   date expression otherwise (see [`Expiration::timestamp_at`]).
///
/// A timestamp of `0` (or less) means "session cookie".
///
/// ```rust
/// use amaretti::Expiration;
/// use amaretti::time::macros::datetime;
///
/// assert_eq!(Expiration::from(1445412480).timestamp().unwrap(), 1445412480);
/// assert_eq!(
///     Expiration::from(datetime!(2015-10-21 07:28:00 UTC)).timestamp().unwrap(),
///     1445412480
/// );
/// assert_eq!(
///     Expiration::from("Wed, 21 Oct 2015 07:28:00 GMT").timestamp().unwrap(),
///     1445412480
/// );
/// assert_eq!(Expiration::from(None).timestamp().unwrap(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Expiration {
    /// Seconds since the unix epoch.
    Timestamp(i64),
    /// A numeric string or a date expression.
    Text(String),
    /// A point in time.
    #[cfg_attr(feature = "serde", serde(skip_deserializing))]
    DateTime(OffsetDateTime),
}

impl Default for Expiration {
    fn default() -> Self {
        Expiration::Timestamp(0)
    }
}

impl Expiration {
    /// Returns `true` if `self` stands for a session cookie, i.e. it will never
    /// resolve to a timestamp after the unix epoch.
    ///
    /// Only `Timestamp`s and `DateTime`s are inspected: `Text` always returns `false`.
    ///
    /// ```rust
    /// use amaretti::{CookieConfig, Expiration};
    ///
    /// assert!(CookieConfig::default().expires.is_session());
    /// assert!(Expiration::from(-1).is_session());
    /// assert!(!Expiration::from(1445412480).is_session());
    /// assert!(!Expiration::from("0").is_session());
    /// ```
    pub fn is_session(&self) -> bool {
        match self {
            Expiration::Timestamp(t) => *t <= 0,
            Expiration::DateTime(dt) => dt.unix_timestamp() <= 0,
            Expiration::Text(_) => false,
        }
    }

    /// Converts `self` into a unix timestamp, evaluating relative expressions
    /// against the current time.
    pub fn timestamp(&self) -> Result<i64, ValidationError> {
        self.timestamp_at(OffsetDateTime::now_utc())
    }

    /// Converts `self` into a unix timestamp, evaluating relative expressions
    /// against `now`.
    ///
    /// The result is floored at `0` (session cookie) and capped at
    /// `9999-12-31 23:59:59 UTC`.
    ///
    /// `Text` is interpreted as:
    ///
    /// - a number, e.g. `1445412480` or `1445412480.5` (the fraction is dropped);
    /// - `now`;
    /// - `@` followed by a unix timestamp, e.g. `@1445412480`;
    /// - a relative offset, e.g. `+1 day`, `-2 hours`, `30 min`
    ///   (units: `sec`, `second`, `min`, `minute`, `hour`, `day`, `week`, optionally plural);
    /// - an HTTP date, e.g. `Wed, 21 Oct 2015 07:28:00 GMT` or `Wed, 21-Oct-2015 07:28:00 GMT`;
    /// - an RFC 2822 date, e.g. `Wed, 21 Oct 2015 07:28:00 +0000`;
    /// - an RFC 3339 date-time, e.g. `2015-10-21T07:28:00Z`;
    /// - `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`, in UTC.
    ///
    /// # Example
    ///
    /// ```rust
    /// use amaretti::Expiration;
    /// use amaretti::time::macros::datetime;
    ///
    /// let now = datetime!(2015-10-21 07:28:00 UTC);
    /// assert_eq!(Expiration::from("+1 hour").timestamp_at(now).unwrap(), 1445416080);
    /// assert_eq!(Expiration::from(-10).timestamp_at(now).unwrap(), 0);
    /// assert!(Expiration::from("next blue moon").timestamp_at(now).is_err());
    /// ```
    pub fn timestamp_at(&self, now: OffsetDateTime) -> Result<i64, ValidationError> {
        let timestamp = match self {
            Expiration::Timestamp(t) => *t,
            Expiration::DateTime(dt) => dt.unix_timestamp(),
            Expiration::Text(s) => match parse_numeric(s).or_else(|| parse_date(s, now)) {
                Some(t) => t,
                None => {
                    return Err(ValidationError::InvalidExpiration { input: s.clone() });
                }
            },
        };
        Ok(timestamp.clamp(0, MAX_TIMESTAMP))
    }
}

impl From<i64> for Expiration {
    fn from(value: i64) -> Self {
        Expiration::Timestamp(value)
    }
}

impl From<i32> for Expiration {
    fn from(value: i32) -> Self {
        Expiration::Timestamp(value.into())
    }
}

impl From<f64> for Expiration {
    fn from(value: f64) -> Self {
        Expiration::Timestamp(value as i64)
    }
}

impl From<OffsetDateTime> for Expiration {
    fn from(value: OffsetDateTime) -> Self {
        Expiration::DateTime(value)
    }
}

impl From<SystemTime> for Expiration {
    fn from(value: SystemTime) -> Self {
        Expiration::DateTime(value.into())
    }
}

/// `None` is a session cookie.
impl From<Option<OffsetDateTime>> for Expiration {
    fn from(value: Option<OffsetDateTime>) -> Self {
        match value {
            Some(dt) => Expiration::DateTime(dt),
            None => Expiration::Timestamp(0),
        }
    }
}

impl From<&str> for Expiration {
    fn from(value: &str) -> Self {
        Expiration::Text(value.to_owned())
    }
}

impl From<String> for Expiration {
    fn from(value: String) -> Self {
        Expiration::Text(value)
    }
}

/// Write `timestamp` in the `Expires` attribute format, e.g. `Wed, 21 Oct 2015 07:28:00 GMT`.
pub(crate) fn write_http_date<W: fmt::Write>(w: &mut W, timestamp: i64) -> fmt::Result {
    let time = OffsetDateTime::from_unix_timestamp(timestamp).map_err(|_| fmt::Error)?;
    w.write_str(&time.format(&HTTP_DATE).map_err(|_| fmt::Error)?)
}

/// A plain number, with optional sign, fraction and exponent.
fn parse_numeric(s: &str) -> Option<i64> {
    let s = s.trim_matches(|c: char| c.is_ascii_whitespace());
    let looks_numeric = s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !looks_numeric {
        return None;
    }
    if let Ok(integer) = s.parse::<i64>() {
        return Some(integer);
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f as i64)
}

fn parse_date(s: &str, now: OffsetDateTime) -> Option<i64> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("now") {
        return Some(now.unix_timestamp());
    }
    if let Some(timestamp) = s.strip_prefix('@') {
        return timestamp.trim().parse().ok();
    }
    if let Some(offset) = parse_relative(s) {
        return now.checked_add(offset).map(|t| t.unix_timestamp());
    }
    parse_absolute(s).map(|t| t.unix_timestamp())
}

/// `[+-]<n> <unit>`, e.g. `+1 day`.
fn parse_relative(s: &str) -> Option<Duration> {
    let amount_end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && matches!(c, '+' | '-'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let amount: i64 = s[..amount_end].parse().ok()?;

    let unit = s[amount_end..].trim().to_ascii_lowercase();
    let unit = unit.strip_suffix('s').unwrap_or(&unit);
    let seconds = match unit {
        "sec" | "second" => 1,
        "min" | "minute" => 60,
        "hour" => 60 * 60,
        "day" => 24 * 60 * 60,
        "week" => 7 * 24 * 60 * 60,
        _ => return None,
    };
    Some(Duration::seconds(amount.checked_mul(seconds)?))
}

fn parse_absolute(s: &str) -> Option<OffsetDateTime> {
    for format in [HTTP_DATE_INPUT, NETSCAPE_DATE_INPUT, DATE_TIME_INPUT] {
        if let Ok(time) = PrimitiveDateTime::parse(s, &format) {
            return Some(time.assume_utc());
        }
    }
    if let Ok(time) = OffsetDateTime::parse(s, &Rfc2822) {
        return Some(time);
    }
    if let Ok(time) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(time);
    }
    Date::parse(s, &DATE_INPUT)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

#[cfg(test)]
mod tests {
    use super::{write_http_date, Expiration, MAX_TIMESTAMP};
    use time::macros::datetime;
    use time::OffsetDateTime;

    const OCT_21_2015: i64 = 1445412480;

    fn now() -> OffsetDateTime {
        datetime!(2023-11-14 22:13:20 UTC)
    }

    #[test]
    fn numbers() {
        let cases: [(Expiration, i64); 8] = [
            (0.into(), 0),
            (42.into(), 42),
            ((-5).into(), 0),
            (i64::MAX.into(), MAX_TIMESTAMP),
            (12.9.into(), 12),
            ("1445412480".into(), OCT_21_2015),
            (" 12.9 ".into(), 12),
            ("-3".into(), 0),
        ];
        for (input, expected) in cases {
            assert_eq!(
                input.timestamp_at(now()).unwrap(),
                expected,
                "Failed for {input:?}"
            );
        }
    }

    #[test]
    fn absolute_dates() {
        let cases = [
            ("Wed, 21 Oct 2015 07:28:00 GMT", OCT_21_2015),
            ("wed, 21 oct 2015 07:28:00 GMT", OCT_21_2015),
            ("Wed, 21-Oct-2015 07:28:00 GMT", OCT_21_2015),
            ("Wed, 21 Oct 2015 07:28:00 +0000", OCT_21_2015),
            ("Wed, 21 Oct 2015 09:28:00 +0200", OCT_21_2015),
            ("2015-10-21T07:28:00Z", OCT_21_2015),
            ("2015-10-21 07:28:00", OCT_21_2015),
            ("2015-10-21", 1445385600),
            ("@1445412480", OCT_21_2015),
            ("1969-12-31", 0),
        ];
        for (input, expected) in cases {
            assert_eq!(
                Expiration::from(input).timestamp_at(now()).unwrap(),
                expected,
                "Failed for {input:?}"
            );
        }
    }

    #[test]
    fn relative_dates() {
        let now_ts = now().unix_timestamp();
        let cases = [
            ("now", now_ts),
            ("NOW", now_ts),
            ("+1 day", now_ts + 86_400),
            ("1 day", now_ts + 86_400),
            ("-2 hours", now_ts - 7_200),
            ("+30 mins", now_ts + 1_800),
            ("+2 weeks", now_ts + 1_209_600),
            ("+10 sec", now_ts + 10),
        ];
        for (input, expected) in cases {
            assert_eq!(
                Expiration::from(input).timestamp_at(now()).unwrap(),
                expected,
                "Failed for {input:?}"
            );
        }
    }

    #[test]
    fn datetimes() {
        let dt = datetime!(2015-10-21 07:28:00 UTC);
        assert_eq!(Expiration::from(dt).timestamp_at(now()).unwrap(), OCT_21_2015);
        assert_eq!(Expiration::from(Some(dt)).timestamp_at(now()).unwrap(), OCT_21_2015);
        assert_eq!(Expiration::from(None).timestamp_at(now()).unwrap(), 0);
        assert_eq!(
            Expiration::from(datetime!(1960-01-01 00:00:00 UTC))
                .timestamp_at(now())
                .unwrap(),
            0
        );
    }

    #[test]
    fn garbage_is_rejected() {
        for input in ["", "tomorrow-ish", "+1 fortnight", "e5", "Wed, 32 Oct 2015 07:28:00 GMT"] {
            let err = Expiration::from(input).timestamp_at(now()).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("The cookie expiration time is not valid: `{input}`"),
            );
        }
    }

    #[test]
    fn session_expirations() {
        assert!(Expiration::default().is_session());
        assert!(Expiration::from(None).is_session());
        assert!(Expiration::from(datetime!(1960-01-01 00:00:00 UTC)).is_session());
        assert!(!Expiration::from(datetime!(2015-10-21 07:28:00 UTC)).is_session());
        assert!(!Expiration::from("now").is_session());
    }

    #[test]
    fn http_dates() {
        let mut out = String::new();
        write_http_date(&mut out, OCT_21_2015).unwrap();
        assert_eq!(out, "Wed, 21 Oct 2015 07:28:00 GMT");

        let mut out = String::new();
        write_http_date(&mut out, MAX_TIMESTAMP).unwrap();
        assert_eq!(out, "Fri, 31 Dec 9999 23:59:59 GMT");
    }
}
