//! Path expressions addressing nested game state.
//!
//! An expression such as `GAME.hands[1].id` is scanned left to right into
//! names (`[A-Za-z0-9_]+`) and bracketed decimal indices (`[<digits>]`).
//! Anything else is a separator. Malformed fragments are skipped rather than
//! rejected: an unmatched `[` contributes nothing, and a bracket holding
//! non-digits yields no index (identifier characters inside it still scan as
//! names).

use std::fmt;

use serde::{Deserialize, Serialize};

/// One component of a parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
    /// Key into a map.
    Name(String),
    /// Position in a sequence.
    Index(u64),
}

/// Ordered walk from the root of the game state through nested values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathExpression(Vec<PathKey>);

impl PathExpression {
    /// Keys in walk order.
    #[must_use]
    pub fn keys(&self) -> &[PathKey] {
        &self.0
    }

    /// Number of keys.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the expression addresses the root itself.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the expression, returning its keys.
    #[must_use]
    pub fn into_keys(self) -> Vec<PathKey> {
        self.0
    }
}

impl IntoIterator for PathExpression {
    type Item = PathKey;
    type IntoIter = std::vec::IntoIter<PathKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PathExpression {
    type Item = &'a PathKey;
    type IntoIter = std::slice::Iter<'a, PathKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, key) in self.0.iter().enumerate() {
            match key {
                PathKey::Name(name) if position == 0 => formatter.write_str(name)?,
                PathKey::Name(name) => write!(formatter, ".{name}")?,
                PathKey::Index(index) => write!(formatter, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Parses a path expression into its keys. Never fails.
///
/// # Examples
///
/// ```rust
/// use jester_protocol::{PathKey, parse_path};
///
/// let path = parse_path("GAME.hands[1].id");
/// assert_eq!(
///     path.keys(),
///     &[
///         PathKey::Name("GAME".to_owned()),
///         PathKey::Name("hands".to_owned()),
///         PathKey::Index(1),
///         PathKey::Name("id".to_owned()),
///     ]
/// );
/// ```
#[must_use]
pub fn parse(expression: &str) -> PathExpression {
    let bytes = expression.as_bytes();
    let mut keys = Vec::new();
    let mut cursor = 0;

    while let Some(&byte) = bytes.get(cursor) {
        if is_word(byte) {
            let end = scan_while(bytes, cursor, is_word);
            // Word bytes are ASCII, so both ends sit on char boundaries.
            if let Some(name) = expression.get(cursor..end) {
                keys.push(PathKey::Name(name.to_owned()));
            }
            cursor = end;
        } else if byte == b'[' {
            match bracketed_index(expression, cursor) {
                Some((index, end)) => {
                    if let Some(index) = index {
                        keys.push(PathKey::Index(index));
                    }
                    cursor = end;
                }
                None => cursor += 1,
            }
        } else {
            cursor += 1;
        }
    }

    PathExpression(keys)
}

const fn is_word(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn scan_while(bytes: &[u8], start: usize, predicate: fn(u8) -> bool) -> usize {
    bytes.get(start..).map_or(start, |rest| {
        start + rest.iter().take_while(|&&byte| predicate(byte)).count()
    })
}

/// Matches `[<digits>]` at `open`. Returns the index (absent when the digits
/// overflow) and the position after the closing bracket, or `None` when the
/// bracket is malformed.
fn bracketed_index(expression: &str, open: usize) -> Option<(Option<u64>, usize)> {
    let bytes = expression.as_bytes();
    let digits_start = open + 1;
    let digits_end = scan_while(bytes, digits_start, |byte| byte.is_ascii_digit());
    if digits_end == digits_start || bytes.get(digits_end) != Some(&b']') {
        return None;
    }
    let index = expression
        .get(digits_start..digits_end)
        .and_then(|digits| digits.parse::<u64>().ok());
    Some((index, digits_end + 1))
}
