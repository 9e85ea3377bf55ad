//! Document arena: slotmap-backed element tree with managed `<style>` tags.

pub mod node;
pub mod tree;
pub mod query;
pub mod dynamic_css;
pub mod markup;

pub use node::{ElementData, NodeId};
pub use tree::{Document, DocumentHandle, Mutation};
pub use dynamic_css::{
    find_existing_css, inject_css, remove_css, update_css, InjectOptions, Prepend, APPEND_ORDER,
    APPEND_PRIORITY, ATTR_CACHE_PATH, ATTR_MARK, ATTR_TOKEN,
};
pub use markup::{parse_markup, MarkupError};
