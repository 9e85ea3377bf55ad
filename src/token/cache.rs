//! Cached final tokens.
//!
//! [`use_cache_token`] turns a theme and its seeds into a final token once
//! per distinct input, derives the class hash components scope their
//! styles with, and (in CSS-variable mode) keeps the token's variable
//! declarations injected while any holder remains.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::theme::{compute_final_token, Theme, TokenFormatter, TokenOverrides};
use super::value::Token;
use crate::cache::{try_acquire, CacheHandle, CacheHooks, CachePath, StyleCache, TokenCacheValue};
use crate::context::StyleContext;
use crate::dom::{update_css, DocumentHandle, InjectOptions, NodeId, ATTR_TOKEN};
use crate::error::StyleError;
use crate::hash::hash;
use crate::register::{transform_token, TransformOptions, CSS_VAR_PRIORITY};

/// Namespace of token slots in the cache.
pub const TOKEN_PREFIX: &str = "token";

/// A held token registration.
pub type TokenHandle = CacheHandle<Rc<TokenCacheValue>>;

/// Id of the `<style>` element carrying a theme's variable declarations.
pub fn token_style_id(theme_key: &str) -> String {
    hash(&format!("css-variables-{theme_key}"))
}

/// CSS-variable mode settings for a theme.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CssVarOptions {
    /// Class the declarations are scoped under; doubles as the theme key.
    pub key: String,
    pub prefix: String,
    pub unitless: HashSet<String>,
    pub ignore: HashSet<String>,
    pub preserve: HashSet<String>,
}

impl CssVarOptions {
    pub fn new(key: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn with_unitless(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.unitless.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_ignore(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ignore.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_preserve(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.preserve.extend(fields.into_iter().map(Into::into));
        self
    }

    fn flatten(&self) -> String {
        fn sorted(set: &HashSet<String>) -> String {
            let mut items: Vec<&str> = set.iter().map(String::as_str).collect();
            items.sort_unstable();
            items.join(",")
        }
        format!(
            "{}|{}|{}|{}|{}",
            self.key,
            self.prefix,
            sorted(&self.unitless),
            sorted(&self.ignore),
            sorted(&self.preserve)
        )
    }
}

/// Everything besides the theme and seeds that shapes a final token.
#[derive(Clone)]
pub struct TokenOptions {
    /// Mixed into the token key so unrelated deployments never collide.
    pub salt: String,
    pub overrides: TokenOverrides,
    pub formatter: Option<TokenFormatter>,
    pub css_var: Option<CssVarOptions>,
    pub hash_prefix: String,
    /// When false the hash id is empty and styles are not scoped.
    pub hashed: bool,
}

impl Default for TokenOptions {
    fn default() -> Self {
        Self {
            salt: String::new(),
            overrides: TokenOverrides::default(),
            formatter: None,
            css_var: None,
            hash_prefix: "css".to_owned(),
            hashed: true,
        }
    }
}

impl TokenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    pub fn with_overrides(mut self, overrides: TokenOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_formatter(mut self, formatter: impl Fn(Token) -> Token + 'static) -> Self {
        self.formatter = Some(Rc::new(formatter));
        self
    }

    pub fn with_css_var(mut self, css_var: CssVarOptions) -> Self {
        self.css_var = Some(css_var);
        self
    }

    pub fn with_hash_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.hash_prefix = prefix.into();
        self
    }

    pub fn with_hashed(mut self, hashed: bool) -> Self {
        self.hashed = hashed;
        self
    }
}

impl fmt::Debug for TokenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenOptions")
            .field("salt", &self.salt)
            .field("overrides", &self.overrides)
            .field("formatter", &self.formatter.is_some())
            .field("css_var", &self.css_var)
            .field("hash_prefix", &self.hash_prefix)
            .field("hashed", &self.hashed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Resolve the final token for `theme` and `seeds` (merged left to right).
///
/// Identical inputs share one cache slot, so derivation runs once however
/// many holders ask. Derivation errors are returned and leave the cache
/// untouched.
pub fn use_cache_token(
    ctx: &StyleContext,
    theme: &Theme,
    seeds: &[Token],
    options: &TokenOptions,
) -> Result<TokenHandle, StyleError> {
    let config = ctx.config();
    let seed = seeds.iter().fold(Token::new(), |acc, seed| acc.merge(seed));
    let css_var_flat = options.css_var.as_ref().map(CssVarOptions::flatten).unwrap_or_default();
    let path = CachePath::new()
        .with(&options.salt)
        .with(theme.id())
        .with(hash(&seed.flatten()))
        .with(hash(&options.overrides.flatten()))
        .with(hash(&css_var_flat));

    let cache = Rc::clone(&config.cache);
    let factory = || -> Result<Rc<TokenCacheValue>, StyleError> {
        let real_token = compute_final_token(
            theme,
            &seed,
            &options.overrides,
            options.formatter.as_ref(),
        )?;
        let real_token_key = hash(&format!("{}_{}", options.salt, real_token.flatten()));

        let (token, css_var_text) = match &options.css_var {
            Some(css_var) => transform_token(
                &real_token,
                &css_var.key,
                &TransformOptions {
                    prefix: &css_var.prefix,
                    unitless: Some(&css_var.unitless),
                    ignore: Some(&css_var.ignore),
                    preserve: Some(&css_var.preserve),
                    scope: &[],
                },
            ),
            None => (real_token.clone(), String::new()),
        };
        let token_key = hash(&format!("{}_{}", options.salt, token.flatten()));
        let theme_key = options
            .css_var
            .as_ref()
            .map_or_else(|| token_key.clone(), |css_var| css_var.key.clone());
        let hash_id = if options.hashed {
            format!("{}-{}", options.hash_prefix, hash(&token_key))
        } else {
            String::new()
        };

        cache.retain_theme_key(&theme_key);
        Ok(Rc::new(TokenCacheValue {
            token,
            real_token,
            token_key,
            real_token_key,
            hash_id,
            theme_key,
            css_var_text,
            css_var_key: options.css_var.as_ref().map(|css_var| css_var.key.clone()),
            css_var_prefix: options
                .css_var
                .as_ref()
                .map(|css_var| css_var.prefix.clone())
                .unwrap_or_default(),
        }))
    };

    let client_document = config.document.clone().filter(|_| config.is_client());
    let container = config.container;

    let release_cache = Rc::clone(&config.cache);
    let release_document = client_document.clone();
    let mut hooks = CacheHooks::new().on_release(move |value: &Rc<TokenCacheValue>, _hot| {
        if !release_cache.release_theme_key(&value.theme_key) {
            return;
        }
        if let Some(document) = &release_document {
            clean_token_styles(document, &release_cache, &value.theme_key);
        }
    });

    if let Some(document) = client_document {
        let cache = Rc::clone(&config.cache);
        hooks = hooks.on_effect(move |value: &Rc<TokenCacheValue>| {
            inject_token_style(&document, &cache, container, value);
        });
    }

    try_acquire(&config.cache, TOKEN_PREFIX, &path, factory, hooks)
}

fn inject_token_style(
    document: &DocumentHandle,
    cache: &StyleCache,
    container: Option<NodeId>,
    value: &TokenCacheValue,
) {
    if value.css_var_text.is_empty() {
        return;
    }
    let mut doc = document.borrow_mut();
    let options = InjectOptions::queue(CSS_VAR_PRIORITY).with_container(container);
    let node = update_css(
        &mut doc,
        &value.css_var_text,
        &token_style_id(&value.theme_key),
        &options,
    );
    if let Some(element) = doc.get_mut(node) {
        element.instance = Some(cache.instance_id().to_owned());
        element.set_attr(ATTR_TOKEN, value.theme_key.as_str());
    }
}

/// Remove every element this cache injected for `theme_key`.
fn clean_token_styles(document: &DocumentHandle, cache: &StyleCache, theme_key: &str) {
    let mut doc = document.borrow_mut();
    let owned = doc.query_all(|data| {
        data.is_style()
            && data.attr(ATTR_TOKEN) == Some(theme_key)
            && data.instance.as_deref() == Some(cache.instance_id())
    });
    let removed = owned.len();
    for node in owned {
        doc.remove(node);
    }
    debug!(theme_key, removed, "cleaned token styles");
}
