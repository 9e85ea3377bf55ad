//! CSS custom properties generated from tokens.
//!
//! A token is turned into a block of `--prefix-name: value` declarations
//! under a class selector, and into a copy of itself whose primitive fields
//! read `var(--prefix-name)`. Styles built from the copy follow the
//! variables, so switching themes only swaps the declaration block.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::cache::{acquire, CacheHandle, CacheHooks, CachePath, CssVarCacheValue};
use crate::context::StyleContext;
use crate::css::serialize::format_number;
use crate::dom::{remove_css, update_css, InjectOptions, ATTR_TOKEN};
use crate::hash::unique_hash;
use crate::token::{Token, TokenValue};

/// Namespace of CSS-variable slots in the cache.
pub const CSS_VAR_PREFIX: &str = "cssVar";

/// Priority of variable blocks: ahead of every style that reads them.
pub const CSS_VAR_PRIORITY: i32 = -999;

/// A held CSS-variable registration.
pub type CssVarHandle = CacheHandle<Rc<CssVarCacheValue>>;

/// `("colorPrimary", "rc")` -> `--rc-color-primary`.
///
/// Word boundaries are split with dashes (`fontSizeLG` -> `font-size-lg`,
/// `margin2` -> `margin-2`) and everything is lowercased.
pub fn token_to_css_var(token: &str, prefix: &str) -> String {
    let raw = if prefix.is_empty() {
        format!("--{token}")
    } else {
        format!("--{prefix}-{token}")
    };
    let chars: Vec<char> = raw.chars().collect();

    // lower/digit followed by upper: `aB` -> `a-B`
    let mut pass: Vec<char> = Vec::with_capacity(chars.len() + 8);
    for (i, &ch) in chars.iter().enumerate() {
        if i > 0 && ch.is_ascii_uppercase() {
            let prev = chars[i - 1];
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() {
                pass.push('-');
            }
        }
        pass.push(ch);
    }

    // end of an acronym: `ABCDef` -> `ABC-Def`
    let chars = pass;
    let mut pass: Vec<char> = Vec::with_capacity(chars.len() + 8);
    for (i, &ch) in chars.iter().enumerate() {
        let acronym_end = i > 0
            && ch.is_ascii_uppercase()
            && chars[i - 1].is_ascii_uppercase()
            && chars
                .get(i + 1)
                .is_some_and(|next| next.is_ascii_lowercase() || next.is_ascii_digit());
        if acronym_end {
            pass.push('-');
        }
        pass.push(ch);
    }

    // lower followed by upper or digit: `a1` -> `a-1`
    let chars = pass;
    let mut out = String::with_capacity(chars.len() + 8);
    for (i, &ch) in chars.iter().enumerate() {
        if i > 0 && (ch.is_ascii_uppercase() || ch.is_ascii_digit()) && chars[i - 1].is_ascii_lowercase() {
            out.push('-');
        }
        out.push(ch);
    }
    out.to_lowercase()
}

/// `.key.scope1.scope2{--a:1;--b:2;}`; empty when there are no variables.
pub fn serialize_css_var(vars: &[(String, String)], key: &str, scope: &[String]) -> String {
    if vars.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for segment in std::iter::once(key).chain(scope.iter().map(String::as_str)) {
        if !segment.is_empty() {
            out.push('.');
            out.push_str(segment);
        }
    }
    out.push('{');
    for (name, value) in vars {
        let _ = write!(out, "{name}:{value};");
    }
    out.push('}');
    out
}

/// Field-level options for [`transform_token`].
#[derive(Debug, Clone, Default)]
pub struct TransformOptions<'a> {
    pub prefix: &'a str,
    /// Numbers in these fields get no `px`.
    pub unitless: Option<&'a HashSet<String>>,
    /// Fields left out entirely.
    pub ignore: Option<&'a HashSet<String>>,
    /// Fields copied as-is, never turned into variables.
    pub preserve: Option<&'a HashSet<String>>,
    pub scope: &'a [String],
}

fn contains(set: Option<&HashSet<String>>, key: &str) -> bool {
    set.is_some_and(|s| s.contains(key))
}

/// Split `token` into a `var()`-reference token and its declaration block.
///
/// Non-primitive fields (booleans, nested maps) are copied unchanged.
pub fn transform_token(token: &Token, theme_key: &str, options: &TransformOptions<'_>) -> (Token, String) {
    let mut var_token = Token::new();
    let mut vars = Vec::new();
    for (key, value) in token.iter() {
        if contains(options.preserve, key) {
            var_token.insert(key, value.clone());
            continue;
        }
        if contains(options.ignore, key) {
            continue;
        }
        if !value.is_primitive() {
            var_token.insert(key, value.clone());
            continue;
        }
        let rendered = match value {
            TokenValue::Num(n) if contains(options.unitless, key) => format_number(*n),
            TokenValue::Num(n) => format!("{}px", format_number(*n)),
            other => other.to_string(),
        };
        let name = token_to_css_var(key, options.prefix);
        var_token.insert(key, format!("var({name})"));
        vars.push((name, rendered));
    }
    let css = serialize_css_var(&vars, theme_key, options.scope);
    (var_token, css)
}

/// What a CSS-variable block is registered under.
#[derive(Debug, Clone, Default)]
pub struct CssVarRegisterInfo {
    pub path: Vec<String>,
    pub prefix: String,
    pub key: String,
    pub unitless: HashSet<String>,
    pub ignore: HashSet<String>,
    pub preserve: HashSet<String>,
    pub token_key: String,
    pub scope: Vec<String>,
}

impl CssVarRegisterInfo {
    pub fn new(key: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_scope(mut self, scope: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_token_key(mut self, token_key: impl Into<String>) -> Self {
        self.token_key = token_key.into();
        self
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

    fn cache_path(&self) -> CachePath {
        let mut path: CachePath = self.path.iter().collect();
        path.push(&self.key);
        path.push(self.scope.join(" "));
        path.push(&self.token_key);
        path
    }
}

/// Register the variables for the token produced by `gen`.
///
/// `gen` only runs when the path is not already cached.
pub fn use_css_var_register(
    ctx: &StyleContext,
    info: &CssVarRegisterInfo,
    gen: impl FnOnce() -> Token,
) -> CssVarHandle {
    let config = ctx.config();
    let path = info.cache_path();

    let factory = || {
        let token = gen();
        let (css_var_token, css_text) = transform_token(
            &token,
            &info.key,
            &TransformOptions {
                prefix: &info.prefix,
                unitless: Some(&info.unitless),
                ignore: Some(&info.ignore),
                preserve: Some(&info.preserve),
                scope: &info.scope,
            },
        );
        let style_id = unique_hash(&path.key(), &css_text);
        Rc::new(CssVarCacheValue {
            css_var_token: Rc::new(css_var_token),
            css_text,
            style_id,
            css_var_key: info.key.clone(),
        })
    };

    let mut hooks = CacheHooks::new();
    if let (true, Some(document)) = (config.is_client(), config.document.clone()) {
        let cache = Rc::clone(&config.cache);
        let options = InjectOptions::queue(CSS_VAR_PRIORITY).with_container(config.container);
        let release_options = options.clone();
        let release_document = document.clone();
        hooks = hooks
            .on_effect(move |value: &Rc<CssVarCacheValue>| {
                if value.css_text.is_empty() {
                    return;
                }
                let mut doc = document.borrow_mut();
                let node = update_css(&mut doc, &value.css_text, &value.style_id, &options);
                if let Some(element) = doc.get_mut(node) {
                    element.instance = Some(cache.instance_id().to_owned());
                    element.set_attr(ATTR_TOKEN, value.css_var_key.as_str());
                }
            })
            .on_release(move |value: &Rc<CssVarCacheValue>, _hot| {
                remove_css(&mut release_document.borrow_mut(), &value.style_id, &release_options);
            });
    }

    acquire(&config.cache, CSS_VAR_PREFIX, &path, factory, hooks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntity;
    use crate::context::StyleContextProps;
    use crate::dom::{Document, DocumentHandle};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn css_var_names() {
        assert_eq!(token_to_css_var("color", "rc-box"), "--rc-box-color");
        assert_eq!(token_to_css_var("colorPrimary", "ant"), "--ant-color-primary");
        assert_eq!(token_to_css_var("fontSizeLG", "ant"), "--ant-font-size-lg");
        assert_eq!(token_to_css_var("marginXXSmall", "ant"), "--ant-margin-xx-small");
        assert_eq!(token_to_css_var("size2", "ant"), "--ant-size-2");
        assert_eq!(token_to_css_var("ButtonPaddingInline", "ant"), "--ant-button-padding-inline");
        assert_eq!(token_to_css_var("lineHeight", ""), "--line-height");
    }

    #[test]
    fn serialize_with_scope() {
        let vars = vec![("--a".to_owned(), "1".to_owned())];
        assert_eq!(
            serialize_css_var(&vars, "orange", &["box".to_owned(), String::new(), "container".to_owned()]),
            ".orange.box.container{--a:1;}"
        );
        assert_eq!(serialize_css_var(&[], "orange", &[]), "");
    }

    #[test]
    fn transform_replaces_primitives() {
        let token = Token::new()
            .with("color", "#fff")
            .with("size", 4)
            .with("lineHeight", 1.5)
            .with("motion", true);
        let unitless: HashSet<String> = ["lineHeight".to_owned()].into();
        let (var_token, css) = transform_token(
            &token,
            "apple",
            &TransformOptions {
                prefix: "rc",
                unitless: Some(&unitless),
                ..TransformOptions::default()
            },
        );
        assert_eq!(var_token.get_str("color"), Some("var(--rc-color)"));
        assert_eq!(var_token.get_str("size"), Some("var(--rc-size)"));
        assert_eq!(var_token.get("motion"), Some(&TokenValue::Bool(true)));
        assert!(!css.contains("motion"));
        insta::assert_snapshot!(
            css,
            @".apple{--rc-color:#fff;--rc-line-height:1.5;--rc-size:4px;}"
        );
    }

    #[test]
    fn transform_preserve_and_ignore() {
        let token = Token::new().with("keep", 8).with("skip", 2).with("gap", 4);
        let preserve: HashSet<String> = ["keep".to_owned()].into();
        let ignore: HashSet<String> = ["skip".to_owned()].into();
        let (var_token, css) = transform_token(
            &token,
            "k",
            &TransformOptions {
                prefix: "rc",
                preserve: Some(&preserve),
                ignore: Some(&ignore),
                ..TransformOptions::default()
            },
        );
        assert_eq!(var_token.get_num("keep"), Some(8.0));
        assert!(!var_token.contains_key("skip"));
        assert_eq!(css, ".k{--rc-gap:4px;}");
    }

    fn setup() -> (StyleContext, DocumentHandle) {
        let doc = Document::shared();
        let cache = CacheEntity::shared();
        cache.set_removal_delay(Duration::ZERO);
        let ctx = StyleContext::new(
            StyleContextProps::new()
                .with_cache(cache)
                .with_document(doc.clone()),
        );
        (ctx, doc)
    }

    #[test]
    fn register_injects_and_removes() {
        let (ctx, doc) = setup();
        let info = CssVarRegisterInfo::new("orange", "rc-box")
            .with_path(["Box"])
            .with_scope(["box"])
            .with_token_key("tk");
        let handle = use_css_var_register(&ctx, &info, || Token::new().with("color", "orange"));
        assert_eq!(handle.key(), "cssVar%Box%orange%box%tk");
        assert_eq!(handle.value().css_text, ".orange.box{--rc-box-color:orange;}");
        assert_eq!(
            handle.value().css_var_token.get_str("color"),
            Some("var(--rc-box-color)")
        );

        {
            let d = doc.borrow();
            let nodes = d.styles_with_attr(ATTR_TOKEN, "orange");
            assert_eq!(nodes.len(), 1);
            let element = d.get(nodes[0]).unwrap();
            assert_eq!(element.attr(crate::dom::APPEND_PRIORITY), Some("-999"));
        }

        drop(handle);
        ctx.cache().flush_removals();
        assert!(doc.borrow().styles_with_attr(ATTR_TOKEN, "orange").is_empty());
    }

    #[test]
    fn empty_token_injects_nothing() {
        let (ctx, doc) = setup();
        let info = CssVarRegisterInfo::new("empty", "rc");
        let handle = use_css_var_register(&ctx, &info, Token::new);
        assert!(handle.value().css_text.is_empty());
        let d = doc.borrow();
        assert!(d.styles_in(d.head()).is_empty());
    }
}
