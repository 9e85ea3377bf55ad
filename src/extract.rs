//! Server-side extraction of everything a cache holds.
//!
//! [`extract_style`] renders cached styles as `<style>` markup carrying the
//! same identity attributes client injection writes, so a client cache
//! created over the rendered document adopts them instead of injecting
//! duplicates.

use std::collections::HashSet;
use std::fmt::Write as _;

use tracing::debug;

use crate::cache::{CacheEntity, CacheValue};
use crate::dom::{Prepend, APPEND_ORDER, APPEND_PRIORITY, ATTR_MARK, ATTR_TOKEN};
use crate::register::{CSS_VAR_PRIORITY, LAYER_EFFECT_PRIORITY};
use crate::token::token_style_id;

/// Kinds of cache slots that can be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractType {
    Style,
    Token,
    CssVar,
}

impl ExtractType {
    pub const ALL: [ExtractType; 3] = [ExtractType::Style, ExtractType::Token, ExtractType::CssVar];

    fn of(value: &CacheValue) -> Self {
        match value {
            CacheValue::Style(_) => Self::Style,
            CacheValue::Token(_) => Self::Token,
            CacheValue::CssVar(_) => Self::CssVar,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Bare CSS text instead of `<style>` markup.
    pub plain: bool,
    pub types: Vec<ExtractType>,
    /// Skip slots an earlier extraction already emitted.
    pub once: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            plain: false,
            types: ExtractType::ALL.to_vec(),
            once: false,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(mut self) -> Self {
        self.plain = true;
        self
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = ExtractType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

/// Render one chunk of CSS, as markup unless `plain`.
///
/// Attributes are written in a fixed order: insertion queue, priority,
/// token, then identity.
pub fn to_style_str(css: &str, token_key: &str, style_id: &str, priority: i32, plain: bool) -> String {
    if plain {
        return css.to_owned();
    }
    let mut out = String::with_capacity(css.len() + 128);
    let _ = write!(
        out,
        r#"<style {APPEND_ORDER}="{}" {APPEND_PRIORITY}="{priority}""#,
        Prepend::Queue.as_str()
    );
    if !token_key.is_empty() {
        let _ = write!(out, r#" {ATTR_TOKEN}="{token_key}""#);
    }
    let _ = write!(out, r#" {ATTR_MARK}="{style_id}">{css}</style>"#);
    out
}

/// Extract the cache's content, ordered by `(order, insertion)`.
///
/// Client-only styles are skipped. Each effect style is emitted once per
/// call: `@layer` statements ahead of the style that declared them, other
/// effects right after it.
pub fn extract_style(cache: &CacheEntity, options: &ExtractOptions) -> String {
    let mut chunks: Vec<(i32, u64, String)> = Vec::new();
    let mut effects_seen: HashSet<String> = HashSet::new();

    for (key, entry, seq) in cache.snapshot() {
        let kind = ExtractType::of(&entry.value);
        if !options.types.contains(&kind) {
            continue;
        }
        if options.once && cache.is_extracted(&key) {
            continue;
        }

        let chunk = match &entry.value {
            CacheValue::Style(style) => {
                if style.client_only || style.css_text.is_empty() {
                    continue;
                }
                let mut before = String::new();
                let mut after = String::new();
                for (effect_key, css) in &style.effect_styles {
                    if !effects_seen.insert(effect_key.clone()) {
                        continue;
                    }
                    let id = format!("_effect-{effect_key}");
                    if effect_key.starts_with("@layer") {
                        before.push_str(&to_style_str(
                            css,
                            &style.token_key,
                            &id,
                            LAYER_EFFECT_PRIORITY,
                            options.plain,
                        ));
                    } else {
                        after.push_str(&to_style_str(
                            css,
                            &style.token_key,
                            &id,
                            style.order,
                            options.plain,
                        ));
                    }
                }
                let body = to_style_str(
                    &style.css_text,
                    &style.token_key,
                    &style.style_id,
                    style.order,
                    options.plain,
                );
                (style.order, format!("{before}{body}{after}"))
            }
            CacheValue::Token(token) => {
                if token.css_var_text.is_empty() {
                    continue;
                }
                let body = to_style_str(
                    &token.css_var_text,
                    &token.theme_key,
                    &token_style_id(&token.theme_key),
                    CSS_VAR_PRIORITY,
                    options.plain,
                );
                (CSS_VAR_PRIORITY, body)
            }
            CacheValue::CssVar(css_var) => {
                if css_var.css_text.is_empty() {
                    continue;
                }
                let body = to_style_str(
                    &css_var.css_text,
                    &css_var.css_var_key,
                    &css_var.style_id,
                    CSS_VAR_PRIORITY,
                    options.plain,
                );
                (CSS_VAR_PRIORITY, body)
            }
        };

        cache.mark_extracted(&key);
        chunks.push((chunk.0, seq, chunk.1));
    }

    chunks.sort_by_key(|(order, seq, _)| (*order, *seq));
    debug!(instance = %cache.instance_id(), chunks = chunks.len(), "extracted styles");
    chunks.into_iter().map(|(_, _, text)| text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MockMode, StyleContext, StyleContextProps};
    use crate::css::{CssObject, Interpolation, Keyframes};
    use crate::register::{use_style_register, StyleRegisterInfo};
    use pretty_assertions::assert_eq;

    fn server() -> StyleContext {
        StyleContext::new(StyleContextProps::new().with_mock(MockMode::Server))
    }

    fn rule(class: &str, color: &str) -> Interpolation {
        CssObject::new()
            .nest(format!(".{class}"), CssObject::new().prop("color", color))
            .into()
    }

    #[test]
    fn markup_carries_identity_attributes() {
        let ctx = server();
        let handle = use_style_register(&ctx, &StyleRegisterInfo::new("tk", ["Box"]), || {
            rule("box", "red")
        });
        let markup = extract_style(ctx.cache(), &ExtractOptions::new());
        assert_eq!(
            markup,
            format!(
                r#"<style data-rc-order="prependQueue" data-rc-priority="0" data-token-hash="tk" data-css-hash="{}">.box{{color:red;}}</style>"#,
                handle.value().style_id
            )
        );
    }

    #[test]
    fn plain_orders_by_order_then_insertion() {
        let ctx = server();
        let _late = use_style_register(
            &ctx,
            &StyleRegisterInfo::new("tk", ["Late"]).with_order(5),
            || rule("late", "red"),
        );
        let _a = use_style_register(&ctx, &StyleRegisterInfo::new("tk", ["A"]), || rule("a", "red"));
        let _b = use_style_register(&ctx, &StyleRegisterInfo::new("tk", ["B"]), || rule("b", "blue"));
        insta::assert_snapshot!(
            extract_style(ctx.cache(), &ExtractOptions::new().plain()),
            @".a{color:red;}.b{color:blue;}.late{color:red;}"
        );
    }

    #[test]
    fn client_only_is_skipped() {
        let ctx = server();
        let _h = use_style_register(
            &ctx,
            &StyleRegisterInfo::new("tk", ["Only"]).with_client_only(true),
            || rule("only", "red"),
        );
        assert_eq!(extract_style(ctx.cache(), &ExtractOptions::new()), "");
    }

    #[test]
    fn effects_emitted_once_per_extraction() {
        let ctx = server();
        let style = |class: &'static str| {
            move || -> Interpolation {
                let fade = Keyframes::new("fade", CssObject::new().nest("to", CssObject::new().prop("opacity", 1)));
                CssObject::new()
                    .nest(format!(".{class}"), CssObject::new().prop("animationName", fade))
                    .into()
            }
        };
        let _a = use_style_register(&ctx, &StyleRegisterInfo::new("tk", ["A"]), style("a"));
        let _b = use_style_register(&ctx, &StyleRegisterInfo::new("tk", ["B"]), style("b"));
        insta::assert_snapshot!(
            extract_style(ctx.cache(), &ExtractOptions::new().plain()),
            @".a{animation-name:fade;}@keyframes fade{to{opacity:1;}}.b{animation-name:fade;}"
        );
    }

    #[test]
    fn once_skips_already_extracted() {
        let ctx = server();
        let _a = use_style_register(&ctx, &StyleRegisterInfo::new("tk", ["A"]), || rule("a", "red"));
        let options = ExtractOptions::new().plain().once();
        assert_eq!(extract_style(ctx.cache(), &options), ".a{color:red;}");

        let _b = use_style_register(&ctx, &StyleRegisterInfo::new("tk", ["B"]), || rule("b", "blue"));
        assert_eq!(extract_style(ctx.cache(), &options), ".b{color:blue;}");
        assert_eq!(
            extract_style(ctx.cache(), &ExtractOptions::new().plain()),
            ".a{color:red;}.b{color:blue;}"
        );
    }

    #[test]
    fn types_filter() {
        let ctx = server();
        let _a = use_style_register(&ctx, &StyleRegisterInfo::new("tk", ["A"]), || rule("a", "red"));
        let only_tokens = ExtractOptions::new().with_types([ExtractType::Token]);
        assert_eq!(extract_style(ctx.cache(), &only_tokens), "");
    }
}
