//! A quote-aware splitter for HTTP header values.
//!
//! [`split`] breaks a header value apart on an ordered list of separators,
//! highest precedence first, while treating `quoted-string`s
//! ([RFC 2616, section 2.2](https://www.rfc-editor.org/rfc/rfc2616#section-2.2))
//! as atomic. The output is nested: the value is split on the first separator,
//! each resulting piece is split on the second one, and so on.
//!
//! ```rust
//! use amaretti::tokenizer::{split, Segment};
//!
//! let segments = split(r#"foo=bar; baz="a;b=c""#, &[';', '=']).unwrap();
//! assert_eq!(
//!     segments,
//!     vec![
//!         Segment::from(vec!["foo", "bar"]),
//!         Segment::from(vec!["baz", "a;b=c"]),
//!     ]
//! );
//! ```
use std::collections::hash_map;
use std::collections::HashMap;

/// A piece of a header value, as returned by [`split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// An unquoted, unescaped leaf string.
    Text(String),
    /// A piece that was further split on a lower-precedence separator.
    Group(Vec<Segment>),
}

impl Segment {
    /// Returns the inner string if `self` is a [`Segment::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(s) => Some(s),
            Segment::Group(_) => None,
        }
    }

    /// Returns the sub-segments if `self` is a [`Segment::Group`].
    pub fn as_group(&self) -> Option<&[Segment]> {
        match self {
            Segment::Text(_) => None,
            Segment::Group(g) => Some(g),
        }
    }
}

impl From<&str> for Segment {
    fn from(value: &str) -> Self {
        Segment::Text(value.to_owned())
    }
}

impl From<String> for Segment {
    fn from(value: String) -> Self {
        Segment::Text(value)
    }
}

impl<T: Into<Segment>> From<Vec<T>> for Segment {
    fn from(value: Vec<T>) -> Self {
        Segment::Group(value.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[error("At least one separator must be specified")]
/// The error returned by [`split`] when it is given an empty list of separators.
pub struct InvalidInputError;

/// Split `header` on `separators`, in order of precedence.
///
/// Whitespace around separators is dropped, whitespace inside a piece is kept.
/// Double-quoted runs are never split; quotes and backslash escapes are removed
/// from the output (see [`unquote`]).
///
/// At the innermost level every piece is a name/value pair: a [`Segment::Group`]
/// with one string (`"name"`) or two strings (`"name="` gives `["name", ""]`).
/// The only exception is a single separator, where the top level holds
/// [`Segment::Text`]s directly.
///
/// # Example
///
/// ```rust
/// use amaretti::tokenizer::{split, Segment};
///
/// let segments = split("a, b ,c", &[',']).unwrap();
/// assert_eq!(segments, vec![Segment::from("a"), Segment::from("b"), Segment::from("c")]);
///
/// let segments = split("secure; path=/", &[';', '=']).unwrap();
/// assert_eq!(
///     segments,
///     vec![Segment::from(vec!["secure"]), Segment::from(vec!["path", "/"])]
/// );
///
/// assert!(split("a;b", &[]).is_err());
/// ```
pub fn split(header: &str, separators: &[char]) -> Result<Vec<Segment>, InvalidInputError> {
    if separators.is_empty() {
        return Err(InvalidInputError);
    }
    Ok(split_on(header, separators))
}

/// [`split`] for callers that always pass at least one separator.
pub(crate) fn split_on(header: &str, separators: &[char]) -> Vec<Segment> {
    let header = header.trim_matches(is_space);
    let lexemes = scan(header, separators);
    let segments = group(header, &lexemes, separators, true);
    tracing::trace!(
        lexemes = lexemes.len(),
        segments = segments.len(),
        "Split a header value"
    );
    segments
}

/// Strip quotes and backslash escapes from `s`.
///
/// Every unescaped `"` is removed and `\x` becomes `x`. A backslash with
/// nothing (or a line feed) after it is kept as is.
///
/// # Example
///
/// ```rust
/// use amaretti::tokenizer::unquote;
///
/// assert_eq!(unquote(r#""a \"quoted\" value""#), r#"a "quoted" value"#);
/// assert_eq!(unquote("token"), "token");
/// assert_eq!(unquote(r"trailing\"), r"trailing\");
/// ```
pub fn unquote(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {}
            '\\' => match chars.peek() {
                Some(&escaped) if escaped != '\n' => {
                    out.push(escaped);
                    chars.next();
                }
                _ => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    out
}

/// The value of an attribute in [`Attributes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// The attribute was present without a `=` (e.g. `HttpOnly`).
    Flag,
    /// The attribute had a value, possibly empty (e.g. `Path=/`).
    Value(String),
}

impl AttributeValue {
    /// Returns the value, if one was given.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Flag => None,
            AttributeValue::Value(v) => Some(v),
        }
    }
}

/// A case-insensitive map from attribute names to their values.
///
/// Built by [`combine`]. Keys are stored ASCII-lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    map: HashMap<String, AttributeValue>,
}

impl Attributes {
    /// Creates an empty map.
    pub fn new() -> Self {
        Default::default()
    }

    /// Inserts an attribute, replacing the previous value for the same name.
    pub fn insert(&mut self, name: &str, value: AttributeValue) -> Option<AttributeValue> {
        self.map.insert(name.to_ascii_lowercase(), value)
    }

    /// Looks up an attribute by name, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            self.map.get(&name.to_ascii_lowercase())
        } else {
            self.map.get(name)
        }
    }

    /// Returns `true` if an attribute with the given name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of distinct attributes.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over `(lowercased name, value)` pairs, in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, String, AttributeValue> {
        self.map.iter()
    }
}

/// Collapse name/value pairs, as produced by [`split`], into [`Attributes`].
///
/// The first string of each pair is the (lowercased) name, the second one its
/// value. Pairs without a second string become [`AttributeValue::Flag`].
/// Later pairs overwrite earlier ones with the same name.
///
/// # Example
///
/// ```rust
/// use amaretti::tokenizer::{combine, split, AttributeValue};
///
/// let segments = split("Path=/; HttpOnly; SameSite=Lax", &[';', '=']).unwrap();
/// let attributes = combine(&segments);
/// assert_eq!(attributes.get("path"), Some(&AttributeValue::Value("/".into())));
/// assert_eq!(attributes.get("HTTPONLY"), Some(&AttributeValue::Flag));
/// assert_eq!(attributes.get("samesite").and_then(|v| v.as_str()), Some("Lax"));
/// ```
pub fn combine<'a, I>(parts: I) -> Attributes
where
    I: IntoIterator<Item = &'a Segment>,
{
    let mut attributes = Attributes::new();
    for part in parts {
        let (name, value) = match part {
            Segment::Text(name) => (name.as_str(), None),
            Segment::Group(pair) => (
                pair.first().and_then(Segment::as_text).unwrap_or_default(),
                pair.get(1).and_then(Segment::as_text),
            ),
        };
        let value = match value {
            Some(v) => AttributeValue::Value(v.to_owned()),
            None => AttributeValue::Flag,
        };
        attributes.insert(name, value);
    }
    attributes
}

/// `\s` as understood by HTTP header grammars: no Unicode whitespace.
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexemeKind {
    Literal,
    Separator(char),
}

/// A byte range of the (trimmed) header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Lexeme {
    kind: LexemeKind,
    start: usize,
    end: usize,
}

impl Lexeme {
    fn text<'h>(&self, header: &'h str) -> &'h str {
        &header[self.start..self.end]
    }

    fn is_separator(&self) -> bool {
        matches!(self.kind, LexemeKind::Separator(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Inside an unquoted run of a literal.
    Token,
    /// Inside a `"..."` run of a literal.
    Quoted,
    /// Right after a backslash in a quoted run.
    Escape,
}

/// Break `header` into literals and separators.
///
/// A literal is a run of token characters and quoted strings, without leading
/// or trailing whitespace. A separator lexeme spans the separator character
/// and the whitespace around it.
fn scan(header: &str, separators: &[char]) -> Vec<Lexeme> {
    let mut lexemes = Vec::new();
    let mut position = 0;

    while let Some(c) = header[position..].chars().next() {
        let lexeme = if is_space(c) || separators.contains(&c) {
            scan_separator(header, position, separators)
        } else {
            Some(scan_literal(header, position, separators))
        };
        match lexeme {
            Some(lexeme) => {
                position = lexeme.end;
                lexemes.push(lexeme);
            }
            // Whitespace that doesn't lead to a separator is dropped.
            None => position += c.len_utf8(),
        }
    }
    lexemes
}

/// Scan the literal starting at `start`, which must not be whitespace or a separator.
fn scan_literal(header: &str, start: usize, separators: &[char]) -> Lexeme {
    let mut state = State::Token;
    let mut end = header.len();

    for (i, c) in header[start..].char_indices() {
        state = match state {
            State::Token if separators.contains(&c) => {
                end = start + i;
                break;
            }
            State::Token if c == '"' => State::Quoted,
            State::Token => State::Token,
            State::Quoted => match c {
                '\\' => State::Escape,
                '"' => State::Token,
                _ => State::Quoted,
            },
            // A backslash cannot escape a line feed: it closes the quoted run instead.
            State::Escape if c == '\n' => State::Token,
            State::Escape => State::Quoted,
        };
    }

    Lexeme {
        kind: LexemeKind::Literal,
        start,
        end: start + header[start..end].trim_end_matches(is_space).len(),
    }
}

/// Scan a separator, with the whitespace around it, starting at `start`.
///
/// A whitespace run folds into a single separator: the separator that follows
/// the run if there is one, the last separator within the run otherwise.
/// Returns `None` if the run contains no separator at all.
fn scan_separator(header: &str, start: usize, separators: &[char]) -> Option<Lexeme> {
    let run_end = header[start..]
        .find(|c: char| !is_space(c))
        .map_or(header.len(), |offset| start + offset);

    let separator_end = match header[run_end..].chars().next() {
        Some(c) if separators.contains(&c) => run_end + c.len_utf8(),
        _ => {
            let (offset, c) = header[start..run_end]
                .char_indices()
                .rev()
                .find(|(_, c)| separators.contains(c))?;
            start + offset + c.len_utf8()
        }
    };
    let separator = header[..separator_end].chars().next_back()?;
    let end = header[separator_end..]
        .find(|c: char| !is_space(c))
        .map_or(header.len(), |offset| separator_end + offset);

    Some(Lexeme {
        kind: LexemeKind::Separator(separator),
        start,
        end,
    })
}

fn group(header: &str, lexemes: &[Lexeme], separators: &[char], top_level: bool) -> Vec<Segment> {
    let Some((&separator, remaining)) = separators.split_first() else {
        return Vec::new();
    };

    if remaining.is_empty() && !top_level {
        // Name/value level: everything after the first separator is the value,
        // further separators included.
        let mut pair = vec![String::new()];
        for lexeme in lexemes {
            if pair.len() == 1 && lexeme.is_separator() {
                pair.push(String::new());
            } else if let Some(current) = pair.last_mut() {
                current.push_str(&unquote(lexeme.text(header)));
            }
        }
        return pair.into_iter().map(Segment::Text).collect();
    }

    lexemes
        .split(|lexeme| lexeme.kind == LexemeKind::Separator(separator))
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            if remaining.is_empty() {
                Segment::Text(unquote(chunk[0].text(header)))
            } else {
                Segment::Group(group(header, chunk, remaining, false))
            }
        })
        .collect()
}
