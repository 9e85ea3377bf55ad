//! Managed `<style>` elements: inject, find, update, remove.
//!
//! Every managed element carries a [`ATTR_MARK`] attribute with its style
//! id. Prepended elements also carry an order marker and, in the priority
//! queue, a numeric priority; elements with lower priority sit earlier in
//! the container.

use super::node::{ElementData, NodeId};
use super::tree::Document;

/// Style id of a managed element.
pub const ATTR_MARK: &str = "data-css-hash";
/// Token key (or CSS-variable key) the element was generated for.
pub const ATTR_TOKEN: &str = "data-token-hash";
/// Readable cache path, for debugging.
pub const ATTR_CACHE_PATH: &str = "data-cache-path";
/// `"prepend"` or `"prependQueue"` on prepended elements.
pub const APPEND_ORDER: &str = "data-rc-order";
/// Queue priority of a `"prependQueue"` element.
pub const APPEND_PRIORITY: &str = "data-rc-priority";

/// Where a new element goes inside its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prepend {
    /// After everything else.
    #[default]
    Append,
    /// Before everything else.
    Prepend,
    /// Among the prepended elements, ordered by priority.
    Queue,
}

impl Prepend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Prepend => "prepend",
            Self::Queue => "prependQueue",
        }
    }
}

/// Placement options for managed elements.
#[derive(Debug, Clone, Default)]
pub struct InjectOptions {
    pub prepend: Prepend,
    pub priority: i32,
    pub nonce: Option<String>,
    /// Defaults to the document head.
    pub container: Option<NodeId>,
}

impl InjectOptions {
    /// Priority-queue placement, the mode every style register uses.
    pub fn queue(priority: i32) -> Self {
        Self {
            prepend: Prepend::Queue,
            priority,
            ..Self::default()
        }
    }

    pub fn with_nonce(mut self, nonce: Option<String>) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_container(mut self, container: Option<NodeId>) -> Self {
        self.container = container;
        self
    }
}

fn container(doc: &Document, options: &InjectOptions) -> NodeId {
    options
        .container
        .filter(|&c| doc.contains(c))
        .unwrap_or_else(|| doc.head())
}

fn priority_of(data: &ElementData) -> i32 {
    data.attr(APPEND_PRIORITY)
        .and_then(|p| p.parse().ok())
        .unwrap_or(0)
}

fn is_prepended(data: &ElementData) -> bool {
    matches!(data.attr(APPEND_ORDER), Some("prepend") | Some("prependQueue"))
}

/// Insert a new `<style>` with `css` into the container.
///
/// Queue placement goes right after the last prepended element whose
/// priority is not greater than `options.priority`, or first if none is.
pub fn inject_css(doc: &mut Document, css: &str, options: &InjectOptions) -> NodeId {
    let parent = container(doc, options);

    let mut data = ElementData::style().with_text(css);
    if options.prepend != Prepend::Append {
        data.set_attr(APPEND_ORDER, options.prepend.as_str());
    }
    if options.prepend == Prepend::Queue && options.priority != 0 {
        data.set_attr(APPEND_PRIORITY, options.priority.to_string());
    }
    if let Some(nonce) = &options.nonce {
        data.nonce = Some(nonce.clone());
    }

    let reference = match options.prepend {
        Prepend::Append => None,
        Prepend::Prepend => doc.first_child(parent),
        Prepend::Queue => {
            let last = doc
                .styles_in(parent)
                .into_iter()
                .filter(|&id| {
                    doc.get(id)
                        .is_some_and(|d| is_prepended(d) && priority_of(d) <= options.priority)
                })
                .last();
            match last {
                Some(last) => match doc.next_sibling(last) {
                    Some(next) => Some(next),
                    None => return doc.append_child(parent, data),
                },
                None => doc.first_child(parent),
            }
        }
    };
    doc.insert_before(parent, data, reference)
}

/// The managed element with style id `key` in the container, if any.
pub fn find_existing_css(doc: &Document, key: &str, options: &InjectOptions) -> Option<NodeId> {
    let parent = container(doc, options);
    doc.styles_in(parent)
        .into_iter()
        .find(|&id| doc.get(id).is_some_and(|d| d.attr(ATTR_MARK) == Some(key)))
}

/// Create or refresh the managed element for `key`.
///
/// An existing element keeps its position; its nonce is refreshed and its
/// text replaced only when it differs. Otherwise a new element is injected.
pub fn update_css(doc: &mut Document, css: &str, key: &str, options: &InjectOptions) -> NodeId {
    if let Some(existing) = find_existing_css(doc, key, options) {
        if let (Some(nonce), Some(data)) = (&options.nonce, doc.get_mut(existing)) {
            if data.nonce.as_ref() != Some(nonce) {
                data.nonce = Some(nonce.clone());
            }
        }
        doc.set_text(existing, css);
        return existing;
    }
    let node = inject_css(doc, css, options);
    if let Some(data) = doc.get_mut(node) {
        data.set_attr(ATTR_MARK, key);
    }
    node
}

/// Remove the managed element for `key`. Returns whether one was removed.
pub fn remove_css(doc: &mut Document, key: &str, options: &InjectOptions) -> bool {
    match find_existing_css(doc, key, options) {
        Some(existing) => doc.remove(existing).is_some(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn marks(doc: &Document) -> Vec<String> {
        doc.styles_in(doc.head())
            .into_iter()
            .filter_map(|id| doc.get(id).and_then(|d| d.attr(ATTR_MARK)).map(str::to_owned))
            .collect()
    }

    #[test]
    fn update_css_injects_once() {
        let mut doc = Document::new();
        let a = update_css(&mut doc, ".a{}", "a", &InjectOptions::queue(0));
        let again = update_css(&mut doc, ".a{}", "a", &InjectOptions::queue(0));
        assert_eq!(a, again);
        assert_eq!(doc.styles_in(doc.head()).len(), 1);
    }

    #[test]
    fn update_css_replaces_changed_text() {
        let mut doc = Document::new();
        let a = update_css(&mut doc, ".a{}", "a", &InjectOptions::queue(0));
        update_css(&mut doc, ".a{color:red;}", "a", &InjectOptions::queue(0));
        assert_eq!(doc.get(a).unwrap().text, ".a{color:red;}");
    }

    #[test]
    fn queue_orders_by_priority() {
        let mut doc = Document::new();
        update_css(&mut doc, "", "zero-1", &InjectOptions::queue(0));
        update_css(&mut doc, "", "low", &InjectOptions::queue(-999));
        update_css(&mut doc, "", "zero-2", &InjectOptions::queue(0));
        update_css(&mut doc, "", "high", &InjectOptions::queue(10));
        assert_eq!(marks(&doc), vec!["low", "zero-1", "zero-2", "high"]);
    }

    #[test]
    fn queue_stays_ahead_of_appended_styles() {
        let mut doc = Document::new();
        let plain = InjectOptions::default();
        update_css(&mut doc, "", "user", &plain);
        update_css(&mut doc, "", "lib", &InjectOptions::queue(0));
        assert_eq!(marks(&doc), vec!["lib", "user"]);
    }

    #[test]
    fn priority_attribute_only_when_nonzero() {
        let mut doc = Document::new();
        let zero = update_css(&mut doc, "", "a", &InjectOptions::queue(0));
        let low = update_css(&mut doc, "", "b", &InjectOptions::queue(-999));
        assert_eq!(doc.get(zero).unwrap().attr(APPEND_PRIORITY), None);
        assert_eq!(doc.get(low).unwrap().attr(APPEND_PRIORITY), Some("-999"));
        assert_eq!(doc.get(low).unwrap().attr(APPEND_ORDER), Some("prependQueue"));
    }

    #[test]
    fn nonce_is_set_and_refreshed() {
        let mut doc = Document::new();
        let opts = InjectOptions::queue(0).with_nonce(Some("n1".into()));
        let a = update_css(&mut doc, "", "a", &opts);
        assert_eq!(doc.get(a).unwrap().nonce.as_deref(), Some("n1"));
        let opts = InjectOptions::queue(0).with_nonce(Some("n2".into()));
        update_css(&mut doc, "", "a", &opts);
        assert_eq!(doc.get(a).unwrap().nonce.as_deref(), Some("n2"));
    }

    #[test]
    fn custom_container() {
        let mut doc = Document::new();
        let body = doc.body();
        let opts = InjectOptions::queue(0).with_container(Some(body));
        let a = update_css(&mut doc, "", "a", &opts);
        assert_eq!(doc.parent(a), Some(body));
        assert!(find_existing_css(&doc, "a", &InjectOptions::queue(0)).is_none());
        assert!(remove_css(&mut doc, "a", &opts));
        assert!(!remove_css(&mut doc, "a", &opts));
    }
}
