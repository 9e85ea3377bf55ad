//! Style context: which cache, document and options style registration uses.
//!
//! Contexts nest. A child context overrides only the fields it sets and
//! inherits everything else from its parent; a child that brings its own
//! cache is no longer using the default one.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntity, StyleCache};
use crate::css::lint::Linter;
use crate::css::serialize::HashPriority;
use crate::css::transform::{AutoPrefix, Transformer};
use crate::dom::{Document, DocumentHandle, NodeId, ATTR_MARK};

/// Forces server or client behaviour regardless of document presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    Server,
    Client,
}

// ---------------------------------------------------------------------------
// StyleContextProps
// ---------------------------------------------------------------------------

/// Partial context configuration. `None` fields inherit from the parent.
#[derive(Clone, Default)]
pub struct StyleContextProps {
    pub cache: Option<StyleCache>,
    pub default_cache: Option<bool>,
    pub hash_priority: Option<HashPriority>,
    pub document: Option<DocumentHandle>,
    /// Where managed styles go; defaults to the document head.
    pub container: Option<NodeId>,
    pub mock: Option<MockMode>,
    pub transformers: Option<Vec<Rc<dyn Transformer>>>,
    pub linters: Option<Vec<Rc<dyn Linter>>>,
    /// Wrap registered styles in their `@layer`.
    pub layer: Option<bool>,
    pub auto_prefix: Option<bool>,
    /// Remove a style's element once its slot is removed.
    pub auto_clear: Option<bool>,
    /// Per-cache: written into the resolved cache, so every context sharing
    /// that cache sees it, ancestors included.
    pub hot_reload: Option<bool>,
    /// Per-cache, like `hot_reload`.
    pub removal_delay: Option<Duration>,
}

impl StyleContextProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, cache: StyleCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_hash_priority(mut self, priority: HashPriority) -> Self {
        self.hash_priority = Some(priority);
        self
    }

    pub fn with_document(mut self, document: DocumentHandle) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_container(mut self, container: NodeId) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_mock(mut self, mock: MockMode) -> Self {
        self.mock = Some(mock);
        self
    }

    /// Add a transformer. Replaces, rather than extends, the parent's list.
    pub fn with_transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformers
            .get_or_insert_with(Vec::new)
            .push(Rc::new(transformer));
        self
    }

    /// Add a linter. Replaces, rather than extends, the parent's list.
    pub fn with_linter(mut self, linter: impl Linter + 'static) -> Self {
        self.linters.get_or_insert_with(Vec::new).push(Rc::new(linter));
        self
    }

    pub fn with_layer(mut self, layer: bool) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn with_auto_prefix(mut self, auto_prefix: bool) -> Self {
        self.auto_prefix = Some(auto_prefix);
        self
    }

    pub fn with_auto_clear(mut self, auto_clear: bool) -> Self {
        self.auto_clear = Some(auto_clear);
        self
    }

    /// Set hot-reload mode on the resolved cache. Pair with
    /// [`with_cache`](Self::with_cache) to keep it out of a parent's cache.
    pub fn with_hot_reload(mut self, hot_reload: bool) -> Self {
        self.hot_reload = Some(hot_reload);
        self
    }

    /// Set the removal delay on the resolved cache.
    pub fn with_removal_delay(mut self, delay: Duration) -> Self {
        self.removal_delay = Some(delay);
        self
    }

    /// Overlay `child` on `self`: fields the child sets win.
    pub fn merge(&self, child: &StyleContextProps) -> StyleContextProps {
        StyleContextProps {
            cache: child.cache.clone().or_else(|| self.cache.clone()),
            default_cache: if child.cache.is_some() {
                Some(false)
            } else {
                child.default_cache.or(self.default_cache)
            },
            hash_priority: child.hash_priority.or(self.hash_priority),
            document: child.document.clone().or_else(|| self.document.clone()),
            container: child.container.or(self.container),
            mock: child.mock.or(self.mock),
            transformers: child
                .transformers
                .clone()
                .or_else(|| self.transformers.clone()),
            linters: child.linters.clone().or_else(|| self.linters.clone()),
            layer: child.layer.or(self.layer),
            auto_prefix: child.auto_prefix.or(self.auto_prefix),
            auto_clear: child.auto_clear.or(self.auto_clear),
            hot_reload: child.hot_reload.or(self.hot_reload),
            removal_delay: child.removal_delay.or(self.removal_delay),
        }
    }
}

impl fmt::Debug for StyleContextProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleContextProps")
            .field("cache", &self.cache.as_ref().map(|c| c.instance_id().to_owned()))
            .field("default_cache", &self.default_cache)
            .field("hash_priority", &self.hash_priority)
            .field("document", &self.document.is_some())
            .field("mock", &self.mock)
            .field("layer", &self.layer)
            .field("auto_clear", &self.auto_clear)
            .field("hot_reload", &self.hot_reload)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// StyleConfig
// ---------------------------------------------------------------------------

/// Fully resolved context configuration.
#[derive(Clone)]
pub struct StyleConfig {
    pub cache: StyleCache,
    pub default_cache: bool,
    pub hash_priority: HashPriority,
    pub document: Option<DocumentHandle>,
    pub container: Option<NodeId>,
    pub mock: Option<MockMode>,
    pub transformers: Vec<Rc<dyn Transformer>>,
    pub linters: Vec<Rc<dyn Linter>>,
    pub layer: bool,
    pub auto_prefix: bool,
    pub auto_clear: bool,
}

impl StyleConfig {
    fn from_props(props: &StyleContextProps) -> Self {
        let cache = props
            .cache
            .clone()
            .unwrap_or_else(|| create_cache(props.document.as_ref()));
        if let Some(delay) = props.removal_delay {
            cache.set_removal_delay(delay);
        }
        if let Some(hot_reload) = props.hot_reload {
            cache.set_hot_reload(hot_reload);
        }
        Self {
            cache,
            default_cache: props.default_cache.unwrap_or(true),
            hash_priority: props.hash_priority.unwrap_or_default(),
            document: props.document.clone(),
            container: props.container,
            mock: props.mock,
            transformers: props.transformers.clone().unwrap_or_default(),
            linters: props.linters.clone().unwrap_or_default(),
            layer: props.layer.unwrap_or(false),
            auto_prefix: props.auto_prefix.unwrap_or(false),
            auto_clear: props.auto_clear.unwrap_or(true),
        }
    }

    /// Whether effects may touch the document.
    pub fn is_client(&self) -> bool {
        match self.mock {
            Some(MockMode::Server) => false,
            Some(MockMode::Client) | None => self.document.is_some(),
        }
    }

    /// Configured transformers, plus vendor prefixing when enabled.
    pub fn effective_transformers(&self) -> Vec<Rc<dyn Transformer>> {
        let mut transformers = self.transformers.clone();
        if self.auto_prefix {
            transformers.push(Rc::new(AutoPrefix));
        }
        transformers
    }
}

impl fmt::Debug for StyleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleConfig")
            .field("cache", &self.cache.instance_id())
            .field("default_cache", &self.default_cache)
            .field("hash_priority", &self.hash_priority)
            .field("client", &self.is_client())
            .field("layer", &self.layer)
            .field("auto_clear", &self.auto_clear)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// StyleContext
// ---------------------------------------------------------------------------

thread_local! {
    static DEFAULT_CONTEXT: RefCell<Option<StyleContext>> = const { RefCell::new(None) };
}

/// A resolved context, cheap to clone and pass down.
#[derive(Clone, Debug)]
pub struct StyleContext {
    props: StyleContextProps,
    config: Rc<StyleConfig>,
}

impl StyleContext {
    /// A root context. Without a cache, a fresh one is created.
    pub fn new(props: StyleContextProps) -> Self {
        let config = Rc::new(StyleConfig::from_props(&props));
        let mut props = props;
        props.cache = Some(Rc::clone(&config.cache));
        Self { props, config }
    }

    /// A nested context overriding only the fields `overrides` sets.
    pub fn provide(&self, overrides: StyleContextProps) -> Self {
        Self::new(self.props.merge(&overrides))
    }

    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    pub fn cache(&self) -> &StyleCache {
        &self.config.cache
    }

    pub fn props(&self) -> &StyleContextProps {
        &self.props
    }

    /// The thread's default context, created on first use.
    ///
    /// The first call decides the document; later calls return the same
    /// context whatever they pass.
    pub fn create_default(document: Option<DocumentHandle>) -> StyleContext {
        DEFAULT_CONTEXT.with(|slot| {
            slot.borrow_mut()
                .get_or_insert_with(|| {
                    let props = StyleContextProps {
                        document,
                        default_cache: Some(true),
                        ..StyleContextProps::default()
                    };
                    StyleContext::new(props)
                })
                .clone()
        })
    }

    /// Forget the thread's default context.
    pub fn reset_for_testing() {
        DEFAULT_CONTEXT.with(|slot| slot.borrow_mut().take());
    }
}

/// Create a cache and claim server-rendered styles found in the document.
///
/// Unowned managed `<style>` elements in the body are moved to the start
/// of the head and marked as owned by the new cache; duplicates of the
/// same style id owned by it are then removed.
pub fn create_cache(document: Option<&DocumentHandle>) -> StyleCache {
    let cache = Rc::new(CacheEntity::new());
    if let Some(document) = document {
        let moved = relocate_server_styles(&mut document.borrow_mut(), cache.instance_id());
        if moved > 0 {
            debug!(instance = %cache.instance_id(), moved, "claimed server-rendered styles");
        }
    }
    cache
}

fn relocate_server_styles(doc: &mut Document, instance_id: &str) -> usize {
    let (head, body) = (doc.head(), doc.body());
    let first = doc.first_child(head);
    let candidates = doc.query_within(body, |data| data.is_style() && data.has_attr(ATTR_MARK));

    let mut moved = 0;
    for style in candidates {
        let owned = match doc.get_mut(style) {
            Some(data) => {
                let owner = data.instance.get_or_insert_with(|| instance_id.to_owned());
                owner.as_str() == instance_id
            }
            None => false,
        };
        if owned {
            doc.move_before(style, head, first);
            moved += 1;
        }
    }

    let mut seen = HashSet::new();
    let styles = doc.query_all(|data| data.is_style() && data.has_attr(ATTR_MARK));
    for style in styles {
        let Some(data) = doc.get(style) else {
            continue;
        };
        let hash = data.attr(ATTR_MARK).unwrap_or_default().to_owned();
        let mine = data.instance.as_deref() == Some(instance_id);
        if !seen.insert(hash) && mine {
            doc.remove(style);
        }
    }
    moved
}
