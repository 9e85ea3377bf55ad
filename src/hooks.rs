//! Per-component style hooks.
//!
//! [`gen_style_hooks`] packages a component's style generator with its
//! default component token and options. Each [`StyleHooks::use_style`] call
//! resolves the component token against the ambient theme token, registers
//! the shared link style and the component style, and in CSS-variable mode
//! also registers the component's own variables.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::cache::{CssVarCacheValue, StyleCache, TokenCacheValue};
use crate::context::StyleContext;
use crate::css::{CssObject, CssValue, Interpolation, LayerConfig};
use crate::extract::to_style_str;
use crate::register::{
    use_css_var_register, use_style_register, CssVarHandle, CssVarRegisterInfo, StyleHandle,
    StyleRegisterInfo, CSS_VAR_PRIORITY,
};
use crate::token::{Token, TokenValue};

/// Information about the consumer passed to a style generator.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleInfo {
    pub hash_id: String,
    pub prefix_cls: String,
    pub root_prefix_cls: String,
    pub icon_prefix_cls: String,
}

/// Builds a component's CSS from the merged token.
pub type StyleFn = Rc<dyn Fn(&Token, &StyleInfo) -> Interpolation>;

/// Computes a component's default token from the global token.
pub type DefaultTokenFn = Rc<dyn Fn(&Token) -> Token>;

/// A component name, optionally with an alias distinguishing sub-parts
/// (`Button` vs `Button-compact`).
///
/// The first name keys component token overrides; both names form the
/// style path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentName {
    Single(String),
    Aliased(String, String),
}

impl ComponentName {
    pub fn component(&self) -> &str {
        match self {
            Self::Single(name) | Self::Aliased(name, _) => name,
        }
    }

    /// Path segment for the component style. A single name is paired with
    /// itself.
    pub fn concat(&self) -> String {
        match self {
            Self::Single(name) => format!("{name}-{name}"),
            Self::Aliased(name, alias) => format!("{name}-{alias}"),
        }
    }
}

impl From<&str> for ComponentName {
    fn from(name: &str) -> Self {
        Self::Single(name.to_owned())
    }
}

impl From<(&str, &str)> for ComponentName {
    fn from((name, alias): (&str, &str)) -> Self {
        Self::Aliased(name.to_owned(), alias.to_owned())
    }
}

#[derive(Debug, Clone)]
pub struct ComponentStyleOptions {
    /// Prepend the box-sizing and font reset for the component's classes.
    pub reset_style: bool,
    /// Component token fields whose numbers carry no unit.
    pub unitless: HashSet<String>,
    /// `(old, new)` token renames; the old name still works.
    pub deprecated_tokens: Vec<(String, String)>,
    pub client_only: bool,
    pub order: i32,
    /// When false nothing is registered and only the hash is returned.
    pub inject_style: bool,
    pub layer: Option<LayerConfig>,
}

impl Default for ComponentStyleOptions {
    fn default() -> Self {
        Self {
            reset_style: true,
            unitless: HashSet::new(),
            deprecated_tokens: Vec::new(),
            client_only: false,
            order: -999,
            inject_style: true,
            layer: None,
        }
    }
}

impl ComponentStyleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reset_style(mut self, reset_style: bool) -> Self {
        self.reset_style = reset_style;
        self
    }

    pub fn with_unitless(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.unitless.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_deprecated(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.deprecated_tokens.push((old.into(), new.into()));
        self
    }

    pub fn with_client_only(mut self, client_only: bool) -> Self {
        self.client_only = client_only;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_inject_style(mut self, inject_style: bool) -> Self {
        self.inject_style = inject_style;
        self
    }

    pub fn with_layer(mut self, layer: LayerConfig) -> Self {
        self.layer = Some(layer);
        self
    }
}

/// Class names a consumer renders with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentScope {
    /// The component's own class, e.g. `ant-btn`.
    pub prefix_cls: String,
    /// Extra class scoping the component's CSS variables.
    pub root_cls: Option<String>,
    /// The library-wide class prefix, e.g. `ant`.
    pub root_prefix_cls: String,
    pub icon_prefix_cls: String,
    pub nonce: Option<String>,
}

impl ComponentScope {
    pub fn new(prefix_cls: impl Into<String>, root_prefix_cls: impl Into<String>) -> Self {
        Self {
            prefix_cls: prefix_cls.into(),
            root_prefix_cls: root_prefix_cls.into(),
            icon_prefix_cls: "anticon".to_owned(),
            ..Self::default()
        }
    }

    pub fn with_root_cls(mut self, root_cls: impl Into<String>) -> Self {
        self.root_cls = Some(root_cls.into());
        self
    }

    pub fn with_icon_prefix_cls(mut self, icon_prefix_cls: impl Into<String>) -> Self {
        self.icon_prefix_cls = icon_prefix_cls.into();
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }
}

/// A component's style generator bound to its options.
#[derive(Clone)]
pub struct StyleHooks {
    name: ComponentName,
    style_fn: StyleFn,
    default_token: Option<DefaultTokenFn>,
    options: ComponentStyleOptions,
}

impl fmt::Debug for StyleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleHooks")
            .field("name", &self.name)
            .field("default_token", &self.default_token.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

pub fn gen_style_hooks(
    name: impl Into<ComponentName>,
    style_fn: impl Fn(&Token, &StyleInfo) -> Interpolation + 'static,
    default_token: Option<DefaultTokenFn>,
    options: ComponentStyleOptions,
) -> StyleHooks {
    StyleHooks {
        name: name.into(),
        style_fn: Rc::new(style_fn),
        default_token,
        options,
    }
}

// ---------------------------------------------------------------------------
// use_style
// ---------------------------------------------------------------------------

/// What a consumer gets back from [`StyleHooks::use_style`].
///
/// Holds the registrations; dropping it releases them.
pub struct ComponentStyle {
    /// Class to add to the component's root; empty when unhashed.
    pub hash_id: String,
    /// CSS-variable class; empty outside CSS-variable mode.
    pub css_var_class: String,
    pub wrap_ssr: WrapSsr,
    handles: Vec<StyleHandle>,
    css_var: Option<CssVarHandle>,
}

impl ComponentStyle {
    pub fn handles(&self) -> &[StyleHandle] {
        &self.handles
    }

    pub fn css_var_handle(&self) -> Option<&CssVarHandle> {
        self.css_var.as_ref()
    }

    /// `hash_id` and `css_var_class`, space-separated, skipping empties.
    pub fn class_name(&self) -> String {
        [self.hash_id.as_str(), self.css_var_class.as_str()]
            .into_iter()
            .filter(|class| !class.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Debug for ComponentStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStyle")
            .field("hash_id", &self.hash_id)
            .field("css_var_class", &self.css_var_class)
            .field("handles", &self.handles.len())
            .finish_non_exhaustive()
    }
}

/// Puts a component's CSS-variable block in front of its server-rendered
/// markup, so the declarations precede the content that reads them.
#[derive(Clone)]
pub struct WrapSsr {
    server: bool,
    cache: StyleCache,
    css_var: Option<(String, Rc<CssVarCacheValue>)>,
}

impl WrapSsr {
    /// `html` with the variable `<style>` prepended the first time, in
    /// server mode only. The block is marked extracted.
    pub fn wrap(&self, html: &str) -> String {
        let Some((key, value)) = &self.css_var else {
            return html.to_owned();
        };
        if !self.server || value.css_text.is_empty() || self.cache.is_extracted(key) {
            return html.to_owned();
        }
        self.cache.mark_extracted(key);
        let style = to_style_str(
            &value.css_text,
            &value.css_var_key,
            &value.style_id,
            CSS_VAR_PRIORITY,
            false,
        );
        format!("{style}{html}")
    }
}

impl StyleHooks {
    pub fn name(&self) -> &ComponentName {
        &self.name
    }

    /// Register this component's styles for `scope` under `token`.
    pub fn use_style(
        &self,
        ctx: &StyleContext,
        token: &TokenCacheValue,
        scope: &ComponentScope,
    ) -> ComponentStyle {
        let config = ctx.config();
        let component = self.name.component();
        let mut result = ComponentStyle {
            hash_id: token.hash_id.clone(),
            css_var_class: String::new(),
            wrap_ssr: WrapSsr {
                server: !config.is_client(),
                cache: Rc::clone(&config.cache),
                css_var: None,
            },
            handles: Vec::new(),
            css_var: None,
        };
        if !self.options.inject_style {
            return result;
        }

        let component_token = self.component_token(&token.real_token);

        // Component fields as the style reads them: var references in
        // CSS-variable mode, literals otherwise.
        let style_component_token = match &token.css_var_key {
            Some(css_var_key) => {
                let handle = self.register_css_var(ctx, token, scope, css_var_key, &component_token);
                let var_token = Rc::clone(&handle.value().css_var_token);
                result.css_var_class = css_var_key.clone();
                result.wrap_ssr.css_var = Some((handle.key().to_owned(), Rc::clone(handle.value())));
                result.css_var = Some(handle);
                component_token
                    .keys()
                    .filter_map(|key| {
                        var_token
                            .get(&prefix_token(component, key))
                            .map(|value| (key.to_owned(), value.clone()))
                    })
                    .collect()
            }
            None => component_token,
        };

        let mut shared = StyleRegisterInfo::new(
            token.token_key.clone(),
            ["Shared", scope.root_prefix_cls.as_str()],
        )
        .with_order(self.options.order);
        let mut info = StyleRegisterInfo::new(
            token.token_key.clone(),
            [
                self.name.concat(),
                scope.prefix_cls.clone(),
                scope.icon_prefix_cls.clone(),
            ],
        )
        .with_order(self.options.order)
        .with_client_only(self.options.client_only);
        if !token.hash_id.is_empty() {
            shared = shared.with_hash_id(token.hash_id.clone());
            info = info.with_hash_id(token.hash_id.clone());
        }
        if let Some(nonce) = &scope.nonce {
            shared = shared.with_nonce(nonce.clone());
            info = info.with_nonce(nonce.clone());
        }
        if let Some(layer) = &self.options.layer {
            shared = shared.with_layer(layer.clone());
            info = info.with_layer(layer.clone());
        }

        let global = &token.token;
        result
            .handles
            .push(use_style_register(ctx, &shared, || link_style(global)));

        let merged = global
            .merge(&style_component_token)
            .with("componentCls", format!(".{}", scope.prefix_cls))
            .with("prefixCls", scope.prefix_cls.clone())
            .with("iconCls", format!(".{}", scope.icon_prefix_cls))
            .with("antCls", format!(".{}", scope.root_prefix_cls));
        let style_info = StyleInfo {
            hash_id: token.hash_id.clone(),
            prefix_cls: scope.prefix_cls.clone(),
            root_prefix_cls: scope.root_prefix_cls.clone(),
            icon_prefix_cls: scope.icon_prefix_cls.clone(),
        };
        let handle = use_style_register(ctx, &info, || {
            let style = (self.style_fn)(&merged, &style_info);
            if self.options.reset_style {
                Interpolation::List(vec![
                    common_style(&merged, &scope.prefix_cls, scope.root_cls.as_deref()),
                    style,
                ])
            } else {
                style
            }
        });
        result.handles.push(handle);
        result
    }

    /// Default component token, overridden by the `component` slice of the
    /// real token, without fields that repeat the global token.
    fn component_token(&self, real_token: &Token) -> Token {
        let component = self.name.component();
        let defaults = self
            .default_token
            .as_ref()
            .map(|default_token| default_token(real_token))
            .unwrap_or_default();
        let mut custom = real_token
            .get(component)
            .and_then(TokenValue::as_map)
            .cloned()
            .unwrap_or_default();

        for (old, new) in &self.options.deprecated_tokens {
            let Some(value) = custom.get(old).cloned() else {
                continue;
            };
            if warn_once(component, old) {
                warn!(
                    component,
                    deprecated = %old,
                    replacement = %new,
                    "component token is deprecated"
                );
            }
            if !custom.contains_key(new) {
                custom.insert(new.clone(), value);
            }
        }

        defaults
            .merge(&custom)
            .iter()
            .filter(|(key, value)| real_token.get(key) != Some(*value))
            .map(|(key, value)| (key.to_owned(), value.clone()))
            .collect()
    }

    fn register_css_var(
        &self,
        ctx: &StyleContext,
        token: &TokenCacheValue,
        scope: &ComponentScope,
        css_var_key: &str,
        component_token: &Token,
    ) -> CssVarHandle {
        let component = self.name.component();
        let info = CssVarRegisterInfo::new(css_var_key, token.css_var_prefix.clone())
            .with_path([component])
            .with_scope(scope.root_cls.iter().cloned())
            .with_token_key(token.real_token_key.clone())
            .with_unitless(
                self.options
                    .unitless
                    .iter()
                    .map(|key| prefix_token(component, key))
                    .chain(std::iter::once(prefix_token(component, "zIndexPopup"))),
            )
            .with_ignore(token.real_token.keys().map(str::to_owned));
        use_css_var_register(ctx, &info, || {
            component_token
                .iter()
                .map(|(key, value)| (prefix_token(component, key), value.clone()))
                .collect()
        })
    }
}

/// `("Button", "paddingInline")` -> `ButtonPaddingInline`.
pub fn prefix_token(component: &str, key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => format!("{component}{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => component.to_owned(),
    }
}

fn token_prop(style: CssObject, property: &str, token: &Token, field: &str) -> CssObject {
    match token.get(field) {
        Some(value) => style.prop(property, CssValue::from(value)),
        None => style,
    }
}

/// Anchor colors shared by every component under one root prefix.
fn link_style(token: &Token) -> Interpolation {
    let anchor = token_prop(CssObject::new(), "color", token, "colorLink")
        .prop("backgroundColor", "transparent")
        .prop("outline", "none")
        .prop("cursor", "pointer");
    let anchor = token_prop(anchor, "textDecoration", token, "linkDecoration")
        .nest("&:hover", token_prop(CssObject::new(), "color", token, "colorLinkHover"))
        .nest("&:active", token_prop(CssObject::new(), "color", token, "colorLinkActive"))
        .nest(
            "&[disabled]",
            token_prop(CssObject::new(), "color", token, "colorTextDisabled")
                .prop("cursor", "not-allowed"),
        );
    CssObject::new().nest("a", anchor).into()
}

/// Box-sizing and font reset for everything carrying the component prefix.
fn common_style(token: &Token, prefix_cls: &str, root_cls: Option<&str>) -> Interpolation {
    let prefix_selector = format!(r#"[class^="{prefix_cls}"], [class*=" {prefix_cls}"]"#);
    let root_selector = match root_cls {
        Some(root_cls) => format!("{prefix_selector}, .{root_cls}"),
        None => prefix_selector,
    };
    let border_box = || CssObject::new().prop("boxSizing", "border-box");
    let reset = token_prop(CssObject::new(), "fontFamily", token, "fontFamily");
    let reset = token_prop(reset, "fontSize", token, "fontSize")
        .prop("boxSizing", "border-box")
        .nest("&::before, &::after", border_box());
    CssObject::new().nest(root_selector, reset).into()
}

thread_local! {
    static WARNED: RefCell<HashSet<(String, String)>> = RefCell::new(HashSet::new());
}

/// True the first time `(component, field)` is seen on this thread.
fn warn_once(component: &str, field: &str) -> bool {
    WARNED.with(|warned| {
        warned
            .borrow_mut()
            .insert((component.to_owned(), field.to_owned()))
    })
}
