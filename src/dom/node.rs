//! Node types: NodeId, ElementData.

use std::collections::BTreeMap;

use slotmap::new_key_type;

new_key_type! {
    /// Unique identifier for a document node. Copy, lightweight (u64).
    pub struct NodeId;
}

/// Data associated with a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Tag name, lowercase (`"style"`, `"head"`).
    pub tag: String,
    /// Attributes, serialized in name order.
    pub attributes: BTreeMap<String, String>,
    /// Text content (the CSS text of a `<style>`).
    pub text: String,
    /// Nonce property; set on the element but never serialized.
    pub nonce: Option<String>,
    /// Id of the style cache that owns this element. A runtime property,
    /// never serialized, so markup from a server render arrives unowned.
    pub instance: Option<String>,
}

impl ElementData {
    /// Create a new element with the given tag and no attributes.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            text: String::new(),
            nonce: None,
            instance: None,
        }
    }

    /// Shorthand for `ElementData::new("style")`.
    pub fn style() -> Self {
        Self::new("style")
    }

    /// Set an attribute (builder).
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the text content (builder).
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the nonce property (builder).
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    pub fn is_style(&self) -> bool {
        self.tag == "style"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults() {
        let data = ElementData::new("div");
        assert_eq!(data.tag, "div");
        assert!(data.attributes.is_empty());
        assert!(data.text.is_empty());
        assert!(data.nonce.is_none());
        assert!(data.instance.is_none());
        assert!(!data.is_style());
    }

    #[test]
    fn builders() {
        let data = ElementData::style()
            .with_attr("data-css-hash", "abc")
            .with_text(".a{}")
            .with_nonce("n0");
        assert!(data.is_style());
        assert_eq!(data.attr("data-css-hash"), Some("abc"));
        assert_eq!(data.text, ".a{}");
        assert_eq!(data.nonce.as_deref(), Some("n0"));
    }

    #[test]
    fn attribute_mutation() {
        let mut data = ElementData::style();
        data.set_attr("a", "1");
        assert!(data.has_attr("a"));
        data.set_attr("a", "2");
        assert_eq!(data.attr("a"), Some("2"));
        assert_eq!(data.remove_attr("a"), Some("2".to_owned()));
        assert!(!data.has_attr("a"));
    }
}
