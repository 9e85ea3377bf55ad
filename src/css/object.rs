//! Structured style input: CSS objects, interpolations and keyframes.
//!
//! A [`CssObject`] is an insertion-ordered map from property names or
//! selectors to [`CssValue`]s. Nested values become nested rules when the
//! object is serialized; everything else becomes a declaration.

use std::fmt;

use crate::token::TokenValue;

// ---------------------------------------------------------------------------
// Interpolation
// ---------------------------------------------------------------------------

/// Anything that can be registered as a style.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Interpolation {
    Object(CssObject),
    List(Vec<Interpolation>),
    Keyframes(Keyframes),
    /// Raw CSS text, emitted verbatim at the top level.
    Raw(String),
    #[default]
    Empty,
}

impl From<CssObject> for Interpolation {
    fn from(obj: CssObject) -> Self {
        Self::Object(obj)
    }
}

impl From<Vec<Interpolation>> for Interpolation {
    fn from(items: Vec<Interpolation>) -> Self {
        Self::List(items)
    }
}

impl From<Keyframes> for Interpolation {
    fn from(kf: Keyframes) -> Self {
        Self::Keyframes(kf)
    }
}

impl From<&str> for Interpolation {
    fn from(css: &str) -> Self {
        Self::Raw(css.to_owned())
    }
}

impl From<String> for Interpolation {
    fn from(css: String) -> Self {
        Self::Raw(css)
    }
}

// ---------------------------------------------------------------------------
// CssValue
// ---------------------------------------------------------------------------

/// The value side of a [`CssObject`] entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CssValue {
    Str(String),
    /// Numbers get `px` appended unless zero or unitless.
    Num(f64),
    Nested(Interpolation),
    /// Used under `animationName`; emits the keyframes once and the hashed name as value.
    Keyframes(Keyframes),
    /// Emits one declaration per value, in order, for fallbacks.
    Multi(Vec<CssValue>),
    /// Bypasses linters for the wrapped value.
    SkipCheck(Box<CssValue>),
}

impl CssValue {
    pub fn multi(values: impl IntoIterator<Item = impl Into<CssValue>>) -> Self {
        Self::Multi(values.into_iter().map(Into::into).collect())
    }

    pub fn skip_check(value: impl Into<CssValue>) -> Self {
        Self::SkipCheck(Box::new(value.into()))
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Nested(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::SkipCheck(inner) => inner.as_str(),
            _ => None,
        }
    }
}

/// Human-readable rendering used in lint messages.
impl fmt::Display for CssValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Num(n) => write!(f, "{n}"),
            Self::Nested(_) => f.write_str("{...}"),
            Self::Keyframes(kf) => f.write_str(&kf.name),
            Self::Multi(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            }
            Self::SkipCheck(inner) => write!(f, "{inner}"),
        }
    }
}

impl From<&str> for CssValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for CssValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&String> for CssValue {
    fn from(s: &String) -> Self {
        Self::Str(s.clone())
    }
}

impl From<f64> for CssValue {
    fn from(n: f64) -> Self {
        Self::Num(n)
    }
}

impl From<i32> for CssValue {
    fn from(n: i32) -> Self {
        Self::Num(f64::from(n))
    }
}

impl From<CssObject> for CssValue {
    fn from(obj: CssObject) -> Self {
        Self::Nested(Interpolation::Object(obj))
    }
}

impl From<Interpolation> for CssValue {
    fn from(interp: Interpolation) -> Self {
        Self::Nested(interp)
    }
}

impl From<Keyframes> for CssValue {
    fn from(kf: Keyframes) -> Self {
        Self::Keyframes(kf)
    }
}

impl From<&TokenValue> for CssValue {
    fn from(value: &TokenValue) -> Self {
        match value {
            TokenValue::Num(n) => Self::Num(*n),
            other => Self::Str(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// CssObject
// ---------------------------------------------------------------------------

/// Insertion-ordered style object.
///
/// Setting an existing key replaces its value in place, so the key keeps
/// its original position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CssObject {
    entries: Vec<(String, CssValue)>,
}

impl CssObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration (builder).
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<CssValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Add a nested rule (builder).
    pub fn nest(mut self, selector: impl Into<String>, style: impl Into<Interpolation>) -> Self {
        self.set(selector, CssValue::Nested(style.into()));
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<CssValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CssValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<CssValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CssValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for CssObject {
    type Item = (String, CssValue);
    type IntoIter = std::vec::IntoIter<(String, CssValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<CssValue>> FromIterator<(K, V)> for CssObject {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut obj = Self::new();
        for (k, v) in iter {
            obj.set(k, v);
        }
        obj
    }
}

// ---------------------------------------------------------------------------
// Keyframes
// ---------------------------------------------------------------------------

/// A named `@keyframes` block.
///
/// The emitted name is prefixed with the owning style's hash id, so two
/// themes can carry differently-valued animations with the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframes {
    pub name: String,
    pub style: CssObject,
}

impl Keyframes {
    pub fn new(name: impl Into<String>, style: CssObject) -> Self {
        Self {
            name: name.into(),
            style,
        }
    }

    /// `"{hash_id}-{name}"`, or the bare name without a hash id.
    pub fn get_name(&self, hash_id: Option<&str>) -> String {
        match hash_id {
            Some(hash_id) if !hash_id.is_empty() => format!("{hash_id}-{}", self.name),
            _ => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_keeps_insertion_order() {
        let obj = CssObject::new()
            .prop("color", "red")
            .prop("padding", 4)
            .nest("&:hover", CssObject::new().prop("color", "blue"));
        let keys: Vec<_> = obj.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["color", "padding", "&:hover"]);
        assert!(obj.get("&:hover").is_some_and(CssValue::is_nested));
    }

    #[test]
    fn set_replaces_in_place() {
        let mut obj = CssObject::new().prop("a", 1).prop("b", 2);
        obj.set("a", 3);
        let entries: Vec<_> = obj.iter().map(|(k, v)| (k.to_owned(), v.clone())).collect();
        assert_eq!(
            entries,
            vec![("a".into(), CssValue::Num(3.0)), ("b".into(), CssValue::Num(2.0))]
        );
    }

    #[test]
    fn remove_entry() {
        let mut obj = CssObject::new().prop("a", 1);
        assert_eq!(obj.remove("a"), Some(CssValue::Num(1.0)));
        assert!(obj.is_empty());
        assert_eq!(obj.remove("a"), None);
    }

    #[test]
    fn keyframes_name() {
        let kf = Keyframes::new("fade", CssObject::new());
        assert_eq!(kf.get_name(Some("css-abc")), "css-abc-fade");
        assert_eq!(kf.get_name(Some("")), "fade");
        assert_eq!(kf.get_name(None), "fade");
    }

    #[test]
    fn display_values() {
        assert_eq!(CssValue::from("red").to_string(), "red");
        assert_eq!(CssValue::from(1.5).to_string(), "1.5");
        assert_eq!(CssValue::multi(["a", "b"]).to_string(), "a, b");
        assert_eq!(CssValue::skip_check("x").to_string(), "x");
    }

    #[test]
    fn token_values_convert() {
        assert_eq!(CssValue::from(&TokenValue::Num(4.0)), CssValue::Num(4.0));
        assert_eq!(
            CssValue::from(&TokenValue::Str("#fff".into())),
            CssValue::Str("#fff".into())
        );
    }
}
