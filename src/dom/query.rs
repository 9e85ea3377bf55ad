//! Document queries and serialization.

use super::node::{ElementData, NodeId};
use super::tree::Document;

impl Document {
    /// All nodes matching a predicate, in tree order.
    pub fn query_all(&self, predicate: impl Fn(&ElementData) -> bool) -> Vec<NodeId> {
        self.walk_depth_first(self.root())
            .into_iter()
            .filter(|&id| self.get(id).is_some_and(&predicate))
            .collect()
    }

    /// Descendants of `start` (excluding `start`) matching a predicate.
    pub fn query_within(
        &self,
        start: NodeId,
        predicate: impl Fn(&ElementData) -> bool,
    ) -> Vec<NodeId> {
        self.walk_depth_first(start)
            .into_iter()
            .skip(1)
            .filter(|&id| self.get(id).is_some_and(&predicate))
            .collect()
    }

    /// `<style>` elements that are direct children of `container`.
    pub fn styles_in(&self, container: NodeId) -> Vec<NodeId> {
        self.children(container)
            .iter()
            .copied()
            .filter(|&id| self.get(id).is_some_and(ElementData::is_style))
            .collect()
    }

    /// Every `<style>` in the document whose `name` attribute equals `value`.
    pub fn styles_with_attr(&self, name: &str, value: &str) -> Vec<NodeId> {
        self.query_all(|data| data.is_style() && data.attr(name) == Some(value))
    }

    /// Serialize a node and its subtree to HTML.
    ///
    /// Attributes are written in name order; text is written verbatim.
    /// Runtime properties (nonce, owning instance) are not serialized.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(data) = self.get(id) else {
            return;
        };
        out.push('<');
        out.push_str(&data.tag);
        for (name, value) in &data.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(value);
            out.push('"');
        }
        out.push('>');
        out.push_str(&data.text);
        for &child in self.children(id) {
            self.write_html(child, out);
        }
        out.push_str("</");
        out.push_str(&data.tag);
        out.push('>');
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::node::ElementData;
    use crate::dom::tree::Document;

    #[test]
    fn query_all_in_tree_order() {
        let mut doc = Document::new();
        let (head, body) = (doc.head(), doc.body());
        let late = doc.append_child(body, ElementData::style().with_attr("k", "1"));
        let early = doc.append_child(head, ElementData::style().with_attr("k", "1"));
        assert_eq!(doc.styles_with_attr("k", "1"), vec![early, late]);
    }

    #[test]
    fn styles_in_skips_other_tags() {
        let mut doc = Document::new();
        let head = doc.head();
        let s = doc.append_child(head, ElementData::style());
        doc.append_child(head, ElementData::new("meta"));
        assert_eq!(doc.styles_in(head), vec![s]);
    }

    #[test]
    fn query_within_excludes_start() {
        let mut doc = Document::new();
        let body = doc.body();
        let div = doc.append_child(body, ElementData::new("div"));
        let inner = doc.append_child(div, ElementData::style());
        assert_eq!(doc.query_within(body, ElementData::is_style), vec![inner]);
        assert!(doc.query_within(inner, ElementData::is_style).is_empty());
    }

    #[test]
    fn to_html_serialization() {
        let mut doc = Document::new();
        let head = doc.head();
        doc.append_child(
            head,
            ElementData::style()
                .with_attr("data-css-hash", "x")
                .with_attr("data-a", "1")
                .with_text(".a{color:red;}")
                .with_nonce("secret"),
        );
        insta::assert_snapshot!(
            doc.to_html(head),
            @r#"<head><style data-a="1" data-css-hash="x">.a{color:red;}</style></head>"#
        );
    }
}
