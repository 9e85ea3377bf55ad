//! Style object serialization.
//!
//! [`parse_style`] flattens an [`Interpolation`] into CSS text. Nested
//! selectors are resolved against their parents (`&` is replaced, anything
//! else becomes a descendant), at-rules wrap their children, and top-level
//! selectors are scoped with the style's hash class.
//!
//! Output is minified: no whitespace between tokens, declarations first and
//! then nested rules, in insertion order.

use std::fmt::Write as _;
use std::rc::Rc;

use tracing::warn;

use super::lint::{
    format_warning, ContentQuotesLinter, HashedAnimationLinter, LintInfo, Linter,
};
use super::object::{CssObject, CssValue, Interpolation, Keyframes};
use super::transform::Transformer;
use super::unitless::{camel_to_kebab, is_unitless};

/// How strongly the hash class binds in generated selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashPriority {
    /// `:where(.hash)`: zero specificity, easy to override.
    #[default]
    Low,
    /// `.hash`: normal class specificity.
    High,
}

/// A cascade layer and the layers it must come after.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayerConfig {
    pub name: String,
    pub dependencies: Vec<String>,
}

impl LayerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }
}

/// Options for a single [`parse_style`] call.
#[derive(Clone, Default)]
pub struct ParseConfig<'a> {
    pub hash_id: Option<&'a str>,
    pub hash_priority: HashPriority,
    pub layer: Option<&'a LayerConfig>,
    /// Component path, used in lint messages.
    pub path: &'a str,
    pub transformers: &'a [Rc<dyn Transformer>],
    /// Extra linters; the content-quotes and hashed-animation checks always run.
    pub linters: &'a [Rc<dyn Linter>],
}

/// Result of serializing one style.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedStyle {
    pub css: String,
    /// Side styles (`@keyframes`, `@layer` order statements) keyed by name,
    /// in first-seen order. Each key is injected at most once per cache.
    pub effect_styles: Vec<(String, String)>,
    pub warnings: Vec<String>,
}

/// Serialize `interpolation` to CSS.
pub fn parse_style(interpolation: &Interpolation, config: &ParseConfig<'_>) -> ParsedStyle {
    let mut parser = StyleParser {
        config,
        effects: Vec::new(),
        warnings: Vec::new(),
    };
    let mut block = Block::default();
    parser.walk(interpolation, &Frame::root(), &mut block);
    let mut css = block.into_css(None);

    if let Some(layer) = config.layer {
        if !css.is_empty() {
            css = format!("@layer {} {{{css}}}", layer.name);
        }
        if !layer.dependencies.is_empty() {
            let order = layer
                .dependencies
                .iter()
                .map(|dep| format!("@layer {dep}, {};", layer.name))
                .collect::<Vec<_>>()
                .join("\n");
            parser.add_effect(format!("@layer {}", layer.name), order);
        }
    }

    ParsedStyle {
        css,
        effect_styles: parser.effects,
        warnings: parser.warnings,
    }
}

// ---------------------------------------------------------------------------
// Selector helpers
// ---------------------------------------------------------------------------

/// Split a selector list on top-level commas.
pub fn split_selector_list(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in selector.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(selector[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(selector[start..].trim());
    parts
}

/// Scope each selector in `key` with the hash class.
///
/// The class goes right after a leading element name (`div.a` becomes
/// `div:where(.h).a`), otherwise at the front of the first compound.
pub fn inject_selector_hash(key: &str, hash_id: &str, priority: HashPriority) -> String {
    let hash_selector = match priority {
        HashPriority::Low => format!(":where(.{hash_id})"),
        HashPriority::High => format!(".{hash_id}"),
    };
    split_selector_list(key)
        .into_iter()
        .map(|selector| {
            let mut nodes = selector.split_whitespace();
            let first = nodes.next().unwrap_or("");
            let element_len = first
                .bytes()
                .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
                .count();
            let mut out = String::with_capacity(selector.len() + hash_selector.len());
            out.push_str(&first[..element_len]);
            out.push_str(&hash_selector);
            out.push_str(&first[element_len..]);
            for node in nodes {
                out.push(' ');
                out.push_str(node);
            }
            out
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Resolve a nested selector against its parent selector.
fn combine_selectors(parent: Option<&str>, key: &str) -> String {
    let children = split_selector_list(key);
    let Some(parent) = parent else {
        return children
            .iter()
            .map(|child| child.replace('&', "").trim().to_owned())
            .collect::<Vec<_>>()
            .join(",");
    };
    let parents = split_selector_list(parent);
    let mut combined = Vec::with_capacity(children.len() * parents.len());
    for child in &children {
        for parent in &parents {
            if child.contains('&') {
                combined.push(child.replace('&', parent));
            } else {
                combined.push(format!("{parent} {child}"));
            }
        }
    }
    combined.join(",")
}

/// Format a number the way it appears in CSS text.
pub(crate) fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_owned();
    }
    n.to_string()
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Where in the tree a walk currently is.
struct Frame {
    /// Resolved selector of the enclosing rule; `None` at the root and
    /// directly inside at-rules that have no enclosing rule.
    selector: Option<String>,
    /// Raw keys from the root down, for lint messages.
    parents: Vec<String>,
    root: bool,
    /// Children of a root-level at-rule are still scoped with the hash.
    inject_hash: bool,
}

impl Frame {
    fn root() -> Self {
        Self {
            selector: None,
            parents: Vec::new(),
            root: true,
            inject_hash: false,
        }
    }
}

/// Output of one rule body: its own declarations, then nested rules.
#[derive(Default)]
struct Block {
    decls: String,
    rules: String,
}

impl Block {
    fn into_css(self, selector: Option<&str>) -> String {
        let mut out = String::new();
        if !self.decls.is_empty() {
            match selector {
                Some(selector) => {
                    let _ = write!(out, "{selector}{{{}}}", self.decls);
                }
                None => out.push_str(&self.decls),
            }
        }
        out.push_str(&self.rules);
        out
    }
}

struct StyleParser<'c, 'a> {
    config: &'c ParseConfig<'a>,
    effects: Vec<(String, String)>,
    warnings: Vec<String>,
}

impl StyleParser<'_, '_> {
    fn hash_id(&self) -> Option<&str> {
        self.config.hash_id.filter(|h| !h.is_empty())
    }

    fn has_effect(&self, key: &str) -> bool {
        self.effects.iter().any(|(k, _)| k == key)
    }

    fn add_effect(&mut self, key: String, css: String) {
        if !self.has_effect(&key) {
            self.effects.push((key, css));
        }
    }

    fn walk(&mut self, interpolation: &Interpolation, frame: &Frame, block: &mut Block) {
        match interpolation {
            Interpolation::Empty => {}
            Interpolation::Raw(css) => {
                block.rules.push_str(css);
                block.rules.push('\n');
            }
            Interpolation::List(items) => {
                for item in items {
                    self.walk(item, frame, block);
                }
            }
            Interpolation::Keyframes(keyframes) => self.register_keyframes(keyframes, frame),
            Interpolation::Object(obj) => {
                let transformed = self
                    .config
                    .transformers
                    .iter()
                    .fold(obj.clone(), |acc, t| t.visit(acc));
                for (key, value) in transformed.iter() {
                    match value {
                        CssValue::Nested(inner) => self.walk_nested(key, inner, frame, block),
                        other => self.append_declaration(key, other, frame, block, true),
                    }
                }
            }
        }
    }

    fn walk_nested(&mut self, key: &str, inner: &Interpolation, frame: &Frame, block: &mut Block) {
        let trimmed = key.trim();
        let mut merged_key = trimmed.to_owned();
        let mut sub_inject = false;
        let mut next_root = false;

        match self.hash_id() {
            Some(hash_id) if frame.root || frame.inject_hash => {
                if trimmed.starts_with('@') {
                    sub_inject = true;
                } else {
                    merged_key =
                        inject_selector_hash(trimmed, hash_id, self.config.hash_priority);
                }
            }
            None if frame.root && (trimmed.is_empty() || trimmed == "&") => {
                merged_key.clear();
                next_root = true;
            }
            _ => {}
        }

        let mut parents = frame.parents.clone();
        parents.push(trimmed.to_owned());

        if merged_key.starts_with('@') {
            let child = Frame {
                selector: frame.selector.clone(),
                parents,
                root: false,
                inject_hash: sub_inject,
            };
            let mut inner_block = Block::default();
            self.walk(inner, &child, &mut inner_block);
            let body = inner_block.into_css(frame.selector.as_deref());
            let _ = write!(block.rules, "{merged_key}{{{body}}}");
            return;
        }

        let selector = if next_root {
            frame.selector.clone()
        } else {
            Some(combine_selectors(frame.selector.as_deref(), &merged_key))
        };
        let child = Frame {
            selector: selector.clone(),
            parents,
            root: next_root,
            inject_hash: false,
        };
        let mut inner_block = Block::default();
        self.walk(inner, &child, &mut inner_block);
        block.rules.push_str(&inner_block.into_css(selector.as_deref()));
    }

    fn append_declaration(
        &mut self,
        key: &str,
        value: &CssValue,
        frame: &Frame,
        block: &mut Block,
        check: bool,
    ) {
        let formatted = match value {
            CssValue::SkipCheck(inner) => {
                self.append_declaration(key, inner, frame, block, false);
                return;
            }
            CssValue::Multi(values) => {
                for value in values {
                    self.append_declaration(key, value, frame, block, check);
                }
                return;
            }
            CssValue::Nested(inner) => {
                self.walk_nested(key, inner, frame, block);
                return;
            }
            CssValue::Keyframes(keyframes) => {
                self.register_keyframes(keyframes, frame);
                keyframes.get_name(self.hash_id())
            }
            CssValue::Str(s) => s.clone(),
            CssValue::Num(n) if *n != 0.0 && !is_unitless(key) => {
                format!("{}px", format_number(*n))
            }
            CssValue::Num(n) => format_number(*n),
        };

        if check {
            self.lint(key, value, frame);
        }
        let _ = write!(block.decls, "{}:{formatted};", camel_to_kebab(key));
    }

    fn lint(&mut self, key: &str, value: &CssValue, frame: &Frame) {
        let info = LintInfo {
            path: self.config.path,
            hash_id: self.hash_id(),
            parent_selectors: &frame.parents,
        };
        let builtin: [&dyn Linter; 2] = [&ContentQuotesLinter, &HashedAnimationLinter];
        let extra = self.config.linters.iter().map(|l| l.as_ref());
        let messages: Vec<String> = builtin
            .into_iter()
            .chain(extra)
            .filter_map(|linter| linter.lint(key, value, &info))
            .map(|message| format_warning(&message, &info))
            .collect();
        for message in messages {
            warn!(target: "gilt_cssinjs::lint", "{message}");
            self.warnings.push(message);
        }
    }

    fn register_keyframes(&mut self, keyframes: &Keyframes, frame: &Frame) {
        let name = keyframes.get_name(self.hash_id());
        if self.has_effect(&name) {
            return;
        }
        let child = Frame {
            selector: None,
            parents: frame.parents.clone(),
            root: false,
            inject_hash: false,
        };
        let mut inner = Block::default();
        self.walk(&Interpolation::Object(keyframes.style.clone()), &child, &mut inner);
        let css = format!("@keyframes {name}{{{}}}", inner.into_css(None));
        self.add_effect(name, css);
    }
}

/// Convenience for callers holding a bare object.
pub fn serialize_object(obj: &CssObject) -> String {
    parse_style(&Interpolation::Object(obj.clone()), &ParseConfig::default()).css
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::lint::NaNLinter;
    use crate::css::transform::Px2Rem;
    use pretty_assertions::assert_eq;

    fn hashed(style: impl Into<Interpolation>) -> ParsedStyle {
        parse_style(
            &style.into(),
            &ParseConfig {
                hash_id: Some("css-h"),
                ..ParseConfig::default()
            },
        )
    }

    #[test]
    fn declarations_and_units() {
        let style = CssObject::new().nest(
            ".a",
            CssObject::new()
                .prop("color", "red")
                .prop("padding", 4)
                .prop("margin", 0)
                .prop("lineHeight", 1.5)
                .prop("zIndex", 10),
        );
        assert_eq!(
            serialize_object(&style),
            ".a{color:red;padding:4px;margin:0;line-height:1.5;z-index:10;}"
        );
    }

    #[test]
    fn nested_parent_reference() {
        let style = CssObject::new().nest(
            ".a",
            CssObject::new()
                .prop("color", "red")
                .nest("&:hover", CssObject::new().prop("color", "blue"))
                .nest(".b", CssObject::new().prop("color", "green")),
        );
        insta::assert_snapshot!(
            serialize_object(&style),
            @".a{color:red;}.a:hover{color:blue;}.a .b{color:green;}"
        );
    }

    #[test]
    fn declarations_come_before_nested_rules() {
        let style = CssObject::new().nest(
            ".a",
            CssObject::new()
                .nest("&:hover", CssObject::new().prop("color", "blue"))
                .prop("color", "red"),
        );
        assert_eq!(
            serialize_object(&style),
            ".a{color:red;}.a:hover{color:blue;}"
        );
    }

    #[test]
    fn selector_lists_are_combined() {
        let style = CssObject::new().nest(
            ".a, .b",
            CssObject::new().nest("&:hover, .c", CssObject::new().prop("color", "red")),
        );
        assert_eq!(
            serialize_object(&style),
            ".a:hover,.b:hover,.a .c,.b .c{color:red;}"
        );
    }

    #[test]
    fn hash_injection_low_priority() {
        let style = CssObject::new().nest(".a", CssObject::new().prop("color", "red"));
        assert_eq!(hashed(style).css, ":where(.css-h).a{color:red;}");
    }

    #[test]
    fn hash_injection_high_priority() {
        let style = CssObject::new().nest(".a", CssObject::new().prop("color", "red"));
        let parsed = parse_style(
            &style.into(),
            &ParseConfig {
                hash_id: Some("css-h"),
                hash_priority: HashPriority::High,
                ..ParseConfig::default()
            },
        );
        assert_eq!(parsed.css, ".css-h.a{color:red;}");
    }

    #[test]
    fn hash_goes_after_element_name() {
        assert_eq!(
            inject_selector_hash("div.a .b, span", "h", HashPriority::High),
            "div.h.a .b,span.h"
        );
        assert_eq!(
            inject_selector_hash("&:hover", "h", HashPriority::Low),
            ":where(.h)&:hover"
        );
    }

    #[test]
    fn only_root_selectors_are_hashed() {
        let style = CssObject::new().nest(
            ".a",
            CssObject::new().nest(".b", CssObject::new().prop("color", "red")),
        );
        assert_eq!(hashed(style).css, ":where(.css-h).a .b{color:red;}");
    }

    #[test]
    fn root_at_rule_children_are_hashed() {
        let style = CssObject::new().nest(
            "@media (max-width: 100px)",
            CssObject::new().nest(".a", CssObject::new().prop("color", "red")),
        );
        assert_eq!(
            hashed(style).css,
            "@media (max-width: 100px){:where(.css-h).a{color:red;}}"
        );
    }

    #[test]
    fn nested_at_rule_keeps_enclosing_selector() {
        let style = CssObject::new().nest(
            ".a",
            CssObject::new().nest(
                "@media print",
                CssObject::new()
                    .prop("display", "none")
                    .nest("&:hover", CssObject::new().prop("color", "red")),
            ),
        );
        insta::assert_snapshot!(
            serialize_object(&style),
            @"@media print{.a{display:none;}.a:hover{color:red;}}"
        );
    }

    #[test]
    fn root_ampersand_without_hash_is_transparent() {
        let style = CssObject::new().nest("&", CssObject::new().nest(".a", CssObject::new().prop("color", "red")));
        assert_eq!(serialize_object(&style), ".a{color:red;}");
    }

    #[test]
    fn multi_values_emit_fallbacks() {
        let style = CssObject::new().nest(
            ".a",
            CssObject::new().prop("display", CssValue::multi(["-webkit-box", "flex"])),
        );
        assert_eq!(
            serialize_object(&style),
            ".a{display:-webkit-box;display:flex;}"
        );
    }

    #[test]
    fn raw_strings_pass_through() {
        let style = Interpolation::List(vec![
            ".raw{color:red}".into(),
            CssObject::new().nest(".a", CssObject::new().prop("color", "blue")).into(),
        ]);
        let parsed = parse_style(&style, &ParseConfig::default());
        assert_eq!(parsed.css, ".raw{color:red}\n.a{color:blue;}");
    }

    #[test]
    fn keyframes_become_effects() {
        let fade = Keyframes::new(
            "fade",
            CssObject::new()
                .nest("from", CssObject::new().prop("opacity", 0))
                .nest("to", CssObject::new().prop("opacity", 1)),
        );
        let style = CssObject::new().nest(
            ".a",
            CssObject::new()
                .prop("animationName", fade.clone())
                .prop("animationDuration", "1s"),
        );
        let parsed = hashed(style);
        assert_eq!(
            parsed.css,
            ":where(.css-h).a{animation-name:css-h-fade;animation-duration:1s;}"
        );
        assert_eq!(
            parsed.effect_styles,
            vec![(
                "css-h-fade".to_owned(),
                "@keyframes css-h-fade{from{opacity:0;}to{opacity:1;}}".to_owned()
            )]
        );
    }

    #[test]
    fn keyframes_effect_is_deduplicated() {
        let fade = Keyframes::new("fade", CssObject::new().nest("to", CssObject::new().prop("opacity", 1)));
        let style = Interpolation::List(vec![fade.clone().into(), fade.into()]);
        let parsed = parse_style(&style, &ParseConfig::default());
        assert_eq!(parsed.effect_styles.len(), 1);
        assert_eq!(parsed.css, "");
    }

    #[test]
    fn layer_wraps_and_orders() {
        let layer = LayerConfig::new("shared").with_dependency("reset");
        let style = CssObject::new().nest(".a", CssObject::new().prop("color", "red"));
        let parsed = parse_style(
            &style.into(),
            &ParseConfig {
                layer: Some(&layer),
                ..ParseConfig::default()
            },
        );
        assert_eq!(parsed.css, "@layer shared {.a{color:red;}}");
        assert_eq!(
            parsed.effect_styles,
            vec![("@layer shared".to_owned(), "@layer reset, shared;".to_owned())]
        );
    }

    #[test]
    fn skip_check_bypasses_linters() {
        let style = CssObject::new().nest(
            ".a",
            CssObject::new()
                .prop("content", "hello")
                .prop("animation", CssValue::skip_check("spin 1s")),
        );
        let parsed = hashed(style);
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("'content' without quotes"));
        assert!(parsed.warnings[0].contains("Selector: .a"));
        assert_eq!(
            parsed.css,
            ":where(.css-h).a{content:hello;animation:spin 1s;}"
        );
    }

    #[test]
    fn configured_linters_run() {
        let linters: Vec<Rc<dyn Linter>> = vec![Rc::new(NaNLinter)];
        let style = CssObject::new().nest(".a", CssObject::new().prop("width", f64::NAN));
        let parsed = parse_style(
            &style.into(),
            &ParseConfig {
                linters: &linters,
                path: "Box",
                ..ParseConfig::default()
            },
        );
        assert_eq!(
            parsed.warnings,
            vec!["[cssinjs] Error in Box: Unexpected 'NaN' in property 'width: NaN'. Selector: .a".to_owned()]
        );
        assert_eq!(parsed.css, ".a{width:NaNpx;}");
    }

    #[test]
    fn transformers_apply_to_nested_objects() {
        let transformers: Vec<Rc<dyn Transformer>> = vec![Rc::new(Px2Rem::default())];
        let style = CssObject::new().nest(
            ".a",
            CssObject::new()
                .prop("fontSize", 32)
                .nest(".b", CssObject::new().prop("margin", "16px")),
        );
        let parsed = parse_style(
            &style.into(),
            &ParseConfig {
                transformers: &transformers,
                ..ParseConfig::default()
            },
        );
        assert_eq!(parsed.css, ".a{font-size:2rem;}.a .b{margin:1rem;}");
    }

    #[test]
    fn empty_rules_are_dropped() {
        let style = CssObject::new().nest(".a", CssObject::new());
        assert_eq!(serialize_object(&style), "");
    }

    #[test]
    fn split_respects_parentheses() {
        assert_eq!(
            split_selector_list(".a:not(.b, .c), .d"),
            vec![".a:not(.b, .c)", ".d"]
        );
    }
}
