//! Cache paths: ordered segments joined into a flat key.

use std::fmt;

/// Separator between segments in a flattened key.
pub const PATH_SEPARATOR: char = '%';

/// One segment of a cache path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&String> for PathSegment {
    fn from(s: &String) -> Self {
        Self::Str(s.clone())
    }
}

impl From<i64> for PathSegment {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u64> for PathSegment {
    fn from(n: u64) -> Self {
        Self::Int(n as i64)
    }
}

impl From<bool> for PathSegment {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// An ordered list of segments identifying a cached value.
///
/// Segments are escaped when flattened, so `["a%b"]` and `["a", "b"]`
/// never produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CachePath {
    segments: Vec<PathSegment>,
}

impl CachePath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment (builder).
    pub fn with(mut self, segment: impl Into<PathSegment>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.segments.push(segment.into());
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// A new path with `prefix` as its first segment.
    pub fn prefixed(&self, prefix: &str) -> CachePath {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.push(PathSegment::from(prefix));
        segments.extend(self.segments.iter().cloned());
        CachePath { segments }
    }

    /// Flattened, escaped key used for storage.
    pub fn key(&self) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push(PATH_SEPARATOR);
            }
            for ch in segment.to_string().chars() {
                if ch == '\\' || ch == PATH_SEPARATOR {
                    out.push('\\');
                }
                out.push(ch);
            }
        }
        out
    }

    /// Unescaped segments joined with `sep`, for display in attributes.
    pub fn join(&self, sep: &str) -> String {
        self.segments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(sep)
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for CachePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CachePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_segments() {
        let path = CachePath::new().with("style").with("tk").with(3i64).with(true);
        assert_eq!(path.key(), "style%tk%3%true");
    }

    #[test]
    fn key_escapes_separator() {
        let joined: CachePath = ["a%b"].into_iter().collect();
        let split: CachePath = ["a", "b"].into_iter().collect();
        assert_eq!(joined.key(), "a\\%b");
        assert_ne!(joined.key(), split.key());
    }

    #[test]
    fn key_escapes_backslash() {
        let trailing: CachePath = ["a\\", "b"].into_iter().collect();
        let escaped: CachePath = ["a\\%b"].into_iter().collect();
        assert_eq!(trailing.key(), "a\\\\%b");
        assert_ne!(trailing.key(), escaped.key());
    }

    #[test]
    fn prefixed_prepends() {
        let path: CachePath = ["x", "y"].into_iter().collect();
        assert_eq!(path.prefixed("token").key(), "token%x%y");
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn join_for_display() {
        let path: CachePath = ["Shared", "ant"].into_iter().collect();
        assert_eq!(path.join("|"), "Shared|ant");
    }
}
