//! Dotted field paths.

use std::cmp::Ordering;
use std::fmt;

/// Address of a nested field: keys and array indices joined with `.`.
///
/// `embedded.items.2` names the third element of the `items` array inside
/// the `embedded` document. The empty path is the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(String);

impl FieldPath {
    /// Separator between path segments.
    pub const SEPARATOR: char = '.';

    /// The document root.
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Returns true for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the path extended by a key.
    #[must_use]
    pub fn join(&self, key: &str) -> Self {
        if self.0.is_empty() {
            Self(key.to_string())
        } else {
            let mut path = String::with_capacity(self.0.len() + 1 + key.len());
            path.push_str(&self.0);
            path.push(Self::SEPARATOR);
            path.push_str(key);
            Self(path)
        }
    }

    /// Returns the path extended by an array index.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.join(&index.to_string())
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the path, returning the dotted string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Iterates over the segments. The root has none.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0
            .split(Self::SEPARATOR)
            .filter(move |_| !self.0.is_empty())
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Orders paths segment by segment, comparing numeric segments as numbers.
    ///
    /// `a.9` sorts before `a.10`, which plain string order gets wrong.
    #[must_use]
    pub fn cmp_segments(&self, other: &Self) -> Ordering {
        let mut left = self.segments();
        let mut right = other.segments();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(a), Some(b)) => {
                    let ord = match (a.parse::<usize>(), b.parse::<usize>()) {
                        (Ok(x), Ok(y)) => x.cmp(&y),
                        _ => a.cmp(b),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
            }
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.0
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
