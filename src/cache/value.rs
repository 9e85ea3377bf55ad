//! Values stored in the style cache.

use std::rc::Rc;

use crate::token::Token;

/// A registered component style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleCacheValue {
    pub css_text: String,
    pub token_key: String,
    /// Hash of the cache path and css text; the managed element's id.
    pub style_id: String,
    /// Side styles keyed by name, injected once per cache.
    pub effect_styles: Vec<(String, String)>,
    /// Never emitted by server extraction.
    pub client_only: bool,
    /// Lower orders are injected and extracted first.
    pub order: i32,
    /// Readable path, written to `data-cache-path`.
    pub cache_path: String,
}

/// A block of CSS custom properties for one key and scope.
#[derive(Debug, Clone, PartialEq)]
pub struct CssVarCacheValue {
    /// The token with primitives replaced by `var(--...)` references.
    pub css_var_token: Rc<Token>,
    pub css_text: String,
    pub style_id: String,
    pub css_var_key: String,
}

/// A derived theme token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenCacheValue {
    /// The token components consume: `var()` references in CSS-variable
    /// mode, the real values otherwise.
    pub token: Token,
    /// The real derived values, whatever the mode.
    pub real_token: Token,
    pub token_key: String,
    pub real_token_key: String,
    /// Class name scoping component styles; empty when hashing is off.
    pub hash_id: String,
    /// CSS-variable key if variables are enabled, otherwise the token key.
    pub theme_key: String,
    /// CSS-variable declarations for the whole token; empty when off.
    pub css_var_text: String,
    pub css_var_key: Option<String>,
    pub css_var_prefix: String,
}

/// Anything held in a cache slot.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Style(Rc<StyleCacheValue>),
    CssVar(Rc<CssVarCacheValue>),
    Token(Rc<TokenCacheValue>),
}

/// A type that can be stored in, and read back from, a [`CacheValue`].
pub trait CacheItem: Clone + 'static {
    fn into_value(self) -> CacheValue;
    fn from_value(value: &CacheValue) -> Option<Self>;
}

impl CacheItem for Rc<StyleCacheValue> {
    fn into_value(self) -> CacheValue {
        CacheValue::Style(self)
    }

    fn from_value(value: &CacheValue) -> Option<Self> {
        match value {
            CacheValue::Style(v) => Some(Rc::clone(v)),
            _ => None,
        }
    }
}

impl CacheItem for Rc<CssVarCacheValue> {
    fn into_value(self) -> CacheValue {
        CacheValue::CssVar(self)
    }

    fn from_value(value: &CacheValue) -> Option<Self> {
        match value {
            CacheValue::CssVar(v) => Some(Rc::clone(v)),
            _ => None,
        }
    }
}

impl CacheItem for Rc<TokenCacheValue> {
    fn into_value(self) -> CacheValue {
        CacheValue::Token(self)
    }

    fn from_value(value: &CacheValue) -> Option<Self> {
        match value {
            CacheValue::Token(v) => Some(Rc::clone(v)),
            _ => None,
        }
    }
}
