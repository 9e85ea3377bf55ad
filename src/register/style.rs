//! Registering component styles.
//!
//! [`use_style_register`] serializes a style once per path, keeps it in the
//! cache, and (on the client) mirrors it into a managed `<style>` element
//! for as long as anyone holds it.

use std::rc::Rc;

use tracing::warn;

use crate::cache::{acquire, CacheHandle, CacheHooks, CachePath, StyleCache, StyleCacheValue};
use crate::context::StyleContext;
use crate::css::lint::Linter;
use crate::css::object::Interpolation;
use crate::css::serialize::{parse_style, LayerConfig, ParseConfig};
use crate::dom::{
    remove_css, update_css, DocumentHandle, InjectOptions, NodeId, ATTR_CACHE_PATH, ATTR_TOKEN,
};
use crate::hash::unique_hash;

/// Namespace of style slots in the cache.
pub const STYLE_PREFIX: &str = "style";

/// Priority of `@layer` order statements, ahead of every layered style.
pub const LAYER_EFFECT_PRIORITY: i32 = i32::MIN;

/// A held style registration.
pub type StyleHandle = CacheHandle<Rc<StyleCacheValue>>;

/// What a style is registered under and how it is emitted.
#[derive(Debug, Clone, Default)]
pub struct StyleRegisterInfo {
    pub token_key: String,
    /// Class scoping the style's top-level selectors; `None` leaves them bare.
    pub hash_id: Option<String>,
    pub path: Vec<String>,
    pub nonce: Option<String>,
    pub client_only: bool,
    pub layer: Option<LayerConfig>,
    pub order: i32,
}

impl StyleRegisterInfo {
    pub fn new(token_key: impl Into<String>, path: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            token_key: token_key.into(),
            path: path.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_hash_id(mut self, hash_id: impl Into<String>) -> Self {
        self.hash_id = Some(hash_id.into());
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_client_only(mut self, client_only: bool) -> Self {
        self.client_only = client_only;
        self
    }

    pub fn with_layer(mut self, layer: LayerConfig) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    fn cache_path(&self) -> CachePath {
        std::iter::once(self.token_key.as_str())
            .chain(self.path.iter().map(String::as_str))
            .collect()
    }
}

/// Register the style produced by `style_fn` under `info`.
///
/// `style_fn` only runs when the path is not already cached.
pub fn use_style_register(
    ctx: &StyleContext,
    info: &StyleRegisterInfo,
    style_fn: impl FnOnce() -> Interpolation,
) -> StyleHandle {
    let config = ctx.config();
    let full_path = info.cache_path();

    let factory = || {
        let style = style_fn();
        let transformers = config.effective_transformers();
        let linters: &[Rc<dyn Linter>] = &config.linters;
        let layer = if config.layer { info.layer.as_ref() } else { None };
        let label = info.path.join("-");
        let parsed = parse_style(
            &style,
            &ParseConfig {
                hash_id: info.hash_id.as_deref(),
                hash_priority: config.hash_priority,
                layer,
                path: &label,
                transformers: &transformers,
                linters,
            },
        );
        if !parsed.warnings.is_empty() {
            warn!(path = %label, count = parsed.warnings.len(), "style registered with lint warnings");
        }
        let style_id = unique_hash(&full_path.key(), &parsed.css);
        Rc::new(StyleCacheValue {
            css_text: parsed.css,
            token_key: info.token_key.clone(),
            style_id,
            effect_styles: parsed.effect_styles,
            client_only: info.client_only,
            order: info.order,
            cache_path: full_path.join("|"),
        })
    };

    let mut hooks = CacheHooks::new();
    if let (true, Some(document)) = (config.is_client(), config.document.clone()) {
        let cache = Rc::clone(&config.cache);
        let container = config.container;
        let nonce = info.nonce.clone();
        hooks = hooks.on_effect(move |value: &Rc<StyleCacheValue>| {
            inject_style(&document, &cache, container, nonce, value);
        });

        if config.auto_clear || config.cache.hot_reload() {
            let document = config.document.clone();
            hooks = hooks.on_release(move |value: &Rc<StyleCacheValue>, _hot| {
                if let Some(document) = &document {
                    let options = InjectOptions::queue(value.order).with_container(container);
                    remove_css(&mut document.borrow_mut(), &value.style_id, &options);
                }
            });
        }
    }

    acquire(&config.cache, STYLE_PREFIX, &full_path, factory, hooks)
}

fn inject_style(
    document: &DocumentHandle,
    cache: &StyleCache,
    container: Option<NodeId>,
    nonce: Option<String>,
    value: &StyleCacheValue,
) {
    let mut doc = document.borrow_mut();
    let options = InjectOptions::queue(value.order)
        .with_nonce(nonce)
        .with_container(container);
    let node = update_css(&mut doc, &value.css_text, &value.style_id, &options);
    if let Some(element) = doc.get_mut(node) {
        element.instance = Some(cache.instance_id().to_owned());
        element.set_attr(ATTR_TOKEN, value.token_key.as_str());
        element.set_attr(ATTR_CACHE_PATH, value.cache_path.as_str());
    }

    for (effect_key, css) in &value.effect_styles {
        if !cache.claim_effect_key(effect_key) {
            continue;
        }
        let priority = if effect_key.starts_with("@layer") {
            LAYER_EFFECT_PRIORITY
        } else {
            value.order
        };
        let options = InjectOptions {
            priority,
            ..options.clone()
        };
        let node = update_css(&mut doc, css, &format!("_effect-{effect_key}"), &options);
        if let Some(element) = doc.get_mut(node) {
            element.instance = Some(cache.instance_id().to_owned());
        }
    }
}
