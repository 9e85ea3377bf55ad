//! Token values: the flat-ish maps themes derive and components consume.

use std::collections::BTreeMap;
use std::fmt;

/// A single design-token value.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Str(String),
    Num(f64),
    Bool(bool),
    /// Nested map, used for per-component token slices.
    Map(Token),
}

impl TokenValue {
    /// The string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric payload, if this is a `Num`.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// The nested map, if this is a `Map`.
    pub fn as_map(&self) -> Option<&Token> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Strings and numbers are primitives; they can become CSS variables.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Str(_) | Self::Num(_))
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Num(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Map(m) => f.write_str(&m.flatten()),
        }
    }
}

impl From<&str> for TokenValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for TokenValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<f64> for TokenValue {
    fn from(n: f64) -> Self {
        Self::Num(n)
    }
}

impl From<i32> for TokenValue {
    fn from(n: i32) -> Self {
        Self::Num(f64::from(n))
    }
}

impl From<bool> for TokenValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Token> for TokenValue {
    fn from(t: Token) -> Self {
        Self::Map(t)
    }
}

/// An ordered map of token names to values.
///
/// Keys iterate in sorted order, so anything derived from iteration
/// (flattened cache keys, generated CSS variables) is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Token {
    fields: BTreeMap<String, TokenValue>,
}

impl Token {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field (builder).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<TokenValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TokenValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&TokenValue> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(TokenValue::as_str)
    }

    pub fn get_num(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(TokenValue::as_num)
    }

    pub fn remove(&mut self, key: &str) -> Option<TokenValue> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TokenValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Shallow merge: fields of `other` win.
    pub fn merge(&self, other: &Token) -> Token {
        let mut merged = self.clone();
        merged.extend_from(other);
        merged
    }

    /// Shallow in-place merge: fields of `other` win.
    pub fn extend_from(&mut self, other: &Token) {
        for (key, value) in &other.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Stable string form used for hashing: keys and values concatenated in
    /// key order, nested maps flattened recursively.
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.fields {
            out.push_str(key);
            match value {
                TokenValue::Map(nested) => out.push_str(&nested.flatten()),
                other => out.push_str(&other.to_string()),
            }
        }
        out
    }
}

impl<K, V> FromIterator<(K, V)> for Token
where
    K: Into<String>,
    V: Into<TokenValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Token {
    type Item = (&'a String, &'a TokenValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, TokenValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
