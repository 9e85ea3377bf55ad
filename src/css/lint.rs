//! Development-time style linters.
//!
//! Linters look at one declaration at a time and return a message for
//! anything suspicious. Messages are collected by the serializer, never
//! treated as errors.

use super::object::CssValue;

/// Where a declaration was found.
#[derive(Debug, Clone, Copy)]
pub struct LintInfo<'a> {
    /// Component path the style was registered under.
    pub path: &'a str,
    pub hash_id: Option<&'a str>,
    /// Selector keys from the root down to the declaration's rule.
    pub parent_selectors: &'a [String],
}

/// A single lint rule.
pub trait Linter {
    fn lint(&self, key: &str, value: &CssValue, info: &LintInfo<'_>) -> Option<String>;
}

impl<F> Linter for F
where
    F: Fn(&str, &CssValue, &LintInfo<'_>) -> Option<String>,
{
    fn lint(&self, key: &str, value: &CssValue, info: &LintInfo<'_>) -> Option<String> {
        self(key, value, info)
    }
}

/// Render a lint message with its location.
pub fn format_warning(message: &str, info: &LintInfo<'_>) -> String {
    let mut out = String::from("[cssinjs] ");
    if !info.path.is_empty() {
        out.push_str("Error in ");
        out.push_str(info.path);
        out.push_str(": ");
    }
    out.push_str(message);
    if !info.parent_selectors.is_empty() {
        out.push_str(" Selector: ");
        out.push_str(&info.parent_selectors.join(" | "));
    }
    out
}

// ---------------------------------------------------------------------------
// Built-in linters
// ---------------------------------------------------------------------------

const CONTENT_KEYWORDS: &[&str] = &["normal", "none", "initial", "inherit", "unset"];

const CONTENT_FUNCTIONS: &[&str] = &[
    "attr(",
    "counter(",
    "counters(",
    "url(",
    "linear-gradient(",
    "radial-gradient(",
    "repeating-linear-gradient(",
    "repeating-radial-gradient(",
    "conic-gradient(",
    "open-quote",
    "close-quote",
    "no-open-quote",
    "no-close-quote",
];

/// `content` values must be quoted strings, keywords or functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentQuotesLinter;

impl Linter for ContentQuotesLinter {
    fn lint(&self, key: &str, value: &CssValue, _info: &LintInfo<'_>) -> Option<String> {
        if key != "content" {
            return None;
        }
        let text = value.as_str()?;
        if CONTENT_KEYWORDS.contains(&text) || CONTENT_FUNCTIONS.iter().any(|f| text.contains(f)) {
            return None;
        }
        let first = text.chars().next();
        let quoted = text.chars().count() >= 2
            && matches!(first, Some('"') | Some('\''))
            && first == text.chars().last();
        if quoted {
            return None;
        }
        Some(format!(
            "You seem to be using a value for 'content' without quotes, try replacing it with `content: '\"{text}\"'`."
        ))
    }
}

/// Plain `animation` values cannot see hashed keyframe names.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedAnimationLinter;

impl Linter for HashedAnimationLinter {
    fn lint(&self, key: &str, value: &CssValue, info: &LintInfo<'_>) -> Option<String> {
        if key != "animation" || info.hash_id.is_none_or(str::is_empty) {
            return None;
        }
        let text = value.to_string();
        if text == "none" {
            return None;
        }
        Some(format!(
            "You seem to be using hashed animation '{text}', in which case 'animationName' with Keyframe as value is recommended."
        ))
    }
}

/// `:not(.a .b)` and `:not(.a, .b)` are not understood by older browsers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyNotSelectorLinter;

impl Linter for LegacyNotSelectorLinter {
    fn lint(&self, _key: &str, _value: &CssValue, info: &LintInfo<'_>) -> Option<String> {
        let offending = info
            .parent_selectors
            .iter()
            .flat_map(|selector| not_arguments(selector))
            .find(|arg| arg.contains(',') || arg.trim().contains(char::is_whitespace))?;
        Some(format!(
            "Concat ':not' selector not support in legacy browsers: ':not({offending})'."
        ))
    }
}

/// Contents of every `:not(...)` in `selector`, with nesting respected.
fn not_arguments(selector: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = selector;
    while let Some(start) = rest.find(":not(") {
        let body = &rest[start + 5..];
        let mut depth = 1usize;
        let mut end = body.len();
        for (i, ch) in body.char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        end = i;
                        break;
                    }
                }
                _ => {}
            }
        }
        found.push(body[..end].to_owned());
        rest = &body[end.min(body.len())..];
    }
    found
}

const PHYSICAL_PROPERTIES: &[&str] = &[
    "marginLeft",
    "marginRight",
    "paddingLeft",
    "paddingRight",
    "left",
    "right",
    "borderLeft",
    "borderLeftWidth",
    "borderLeftStyle",
    "borderLeftColor",
    "borderRight",
    "borderRightWidth",
    "borderRightStyle",
    "borderRightColor",
    "borderTopLeftRadius",
    "borderTopRightRadius",
    "borderBottomLeftRadius",
    "borderBottomRightRadius",
];

/// Physical left/right properties break right-to-left layouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicalPropertiesLinter;

impl Linter for LogicalPropertiesLinter {
    fn lint(&self, key: &str, value: &CssValue, _info: &LintInfo<'_>) -> Option<String> {
        if PHYSICAL_PROPERTIES.contains(&key) {
            return Some(format!(
                "You seem to be using non-logical property '{key}' which is not compatible with RTL mode. Please use logical properties and values instead. For more information: https://developer.mozilla.org/en-US/docs/Web/CSS/CSS_Logical_Properties."
            ));
        }
        if matches!(key, "float" | "clear" | "textAlign") {
            if let Some(text) = value.as_str() {
                if matches!(text, "left" | "right") {
                    return Some(format!(
                        "You seem to be using non-logical value '{text}' of {key}, which is not compatible with RTL mode. Please use logical properties and values instead."
                    ));
                }
            }
        }
        if key == "margin" || key == "padding" || key == "borderRadius" {
            if let Some(text) = value.as_str() {
                let parts: Vec<&str> = text.split_whitespace().collect();
                let asymmetric = match parts.as_slice() {
                    [_, right, _, left] => right != left,
                    _ => false,
                };
                if asymmetric {
                    return Some(format!(
                        "You seem to be using non-logical value '{text}' of {key}, which is not compatible with RTL mode. Please use logical properties and values instead."
                    ));
                }
            }
        }
        None
    }
}

/// A literal `NaN` almost always means a token was missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaNLinter;

impl Linter for NaNLinter {
    fn lint(&self, key: &str, value: &CssValue, _info: &LintInfo<'_>) -> Option<String> {
        let is_nan = match value {
            CssValue::Num(n) => n.is_nan(),
            CssValue::Str(s) => s.contains("NaN"),
            _ => false,
        };
        is_nan.then(|| format!("Unexpected 'NaN' in property '{key}: {value}'."))
    }
}

/// More than one `&` in a selector is almost always a mistake.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentSelectorLinter;

impl Linter for ParentSelectorLinter {
    fn lint(&self, _key: &str, _value: &CssValue, info: &LintInfo<'_>) -> Option<String> {
        let repeated = info
            .parent_selectors
            .iter()
            .flat_map(|selector| selector.split(','))
            .any(|part| part.matches('&').count() > 1);
        repeated.then(|| "Should not use more than one `&` in a selector.".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info<'a>(parents: &'a [String]) -> LintInfo<'a> {
        LintInfo {
            path: "Button",
            hash_id: Some("css-abc"),
            parent_selectors: parents,
        }
    }

    #[test]
    fn content_requires_quotes() {
        let parents = [];
        let linter = ContentQuotesLinter;
        assert!(linter.lint("content", &"hello".into(), &info(&parents)).is_some());
        assert!(linter.lint("content", &"'hello'".into(), &info(&parents)).is_none());
        assert!(linter.lint("content", &"\"\"".into(), &info(&parents)).is_none());
        assert!(linter.lint("content", &"none".into(), &info(&parents)).is_none());
        assert!(linter.lint("content", &"attr(title)".into(), &info(&parents)).is_none());
        assert!(linter.lint("color", &"hello".into(), &info(&parents)).is_none());
    }

    #[test]
    fn hashed_animation() {
        let parents = [];
        let linter = HashedAnimationLinter;
        assert!(linter.lint("animation", &"fade 1s".into(), &info(&parents)).is_some());
        assert!(linter.lint("animation", &"none".into(), &info(&parents)).is_none());
        let unhashed = LintInfo {
            hash_id: None,
            ..info(&parents)
        };
        assert!(linter.lint("animation", &"fade 1s".into(), &unhashed).is_none());
    }

    #[test]
    fn legacy_not_selector() {
        let linter = LegacyNotSelectorLinter;
        let bad = [".a:not(.b .c)".to_owned()];
        let list = [".a:not(.b, .c)".to_owned()];
        let ok = [".a:not(.b)".to_owned()];
        assert!(linter.lint("color", &"red".into(), &info(&bad)).is_some());
        assert!(linter.lint("color", &"red".into(), &info(&list)).is_some());
        assert!(linter.lint("color", &"red".into(), &info(&ok)).is_none());
    }

    #[test]
    fn logical_properties() {
        let parents = [];
        let linter = LogicalPropertiesLinter;
        assert!(linter.lint("marginLeft", &4.into(), &info(&parents)).is_some());
        assert!(linter.lint("textAlign", &"left".into(), &info(&parents)).is_some());
        assert!(linter.lint("textAlign", &"start".into(), &info(&parents)).is_none());
        assert!(linter.lint("margin", &"1px 2px 3px 4px".into(), &info(&parents)).is_some());
        assert!(linter.lint("margin", &"1px 2px 3px 2px".into(), &info(&parents)).is_none());
        assert!(linter.lint("marginInlineStart", &4.into(), &info(&parents)).is_none());
    }

    #[test]
    fn nan_values() {
        let parents = [];
        let linter = NaNLinter;
        let msg = linter
            .lint("width", &CssValue::Num(f64::NAN), &info(&parents))
            .unwrap();
        assert_eq!(msg, "Unexpected 'NaN' in property 'width: NaN'.");
        assert!(linter.lint("width", &"NaNpx".into(), &info(&parents)).is_some());
        assert!(linter.lint("width", &4.into(), &info(&parents)).is_none());
    }

    #[test]
    fn parent_selector() {
        let linter = ParentSelectorLinter;
        let bad = ["&-a &-b".to_owned()];
        let ok = ["&-a, &-b".to_owned()];
        assert!(linter.lint("color", &"red".into(), &info(&bad)).is_some());
        assert!(linter.lint("color", &"red".into(), &info(&ok)).is_none());
    }

    #[test]
    fn closures_are_linters() {
        let parents = [];
        let linter = |key: &str, _: &CssValue, _: &LintInfo<'_>| {
            (key == "zoom").then(|| "zoom is deprecated".to_owned())
        };
        assert_eq!(
            linter.lint("zoom", &1.into(), &info(&parents)).as_deref(),
            Some("zoom is deprecated")
        );
    }

    #[test]
    fn warning_format() {
        let parents = [".a".to_owned(), "&:hover".to_owned()];
        assert_eq!(
            format_warning("bad", &info(&parents)),
            "[cssinjs] Error in Button: bad Selector: .a | &:hover"
        );
        let root = LintInfo {
            path: "",
            hash_id: None,
            parent_selectors: &[],
        };
        assert_eq!(format_warning("bad", &root), "[cssinjs] bad");
    }
}
