//! Object-level style transformers.
//!
//! A transformer rewrites each style object before it is serialized. The
//! serializer applies transformers to every object it visits, nested ones
//! included, so a transformer only needs to handle one level.

use super::lexer::replace_px;
use super::object::{CssObject, CssValue};
use super::unitless::is_unitless;

/// Rewrites a style object before serialization.
pub trait Transformer {
    fn visit(&self, obj: CssObject) -> CssObject;
}

impl<F> Transformer for F
where
    F: Fn(CssObject) -> CssObject,
{
    fn visit(&self, obj: CssObject) -> CssObject {
        self(obj)
    }
}

// ---------------------------------------------------------------------------
// Logical properties
// ---------------------------------------------------------------------------

/// How a logical shorthand maps onto physical properties.
enum Mapping {
    /// One value per listed property, taken from the split value.
    Split(&'static [&'static str]),
    /// The whole value copied to every listed property.
    Whole(&'static [&'static str]),
}

fn logical_mapping(key: &str) -> Option<Mapping> {
    use Mapping::{Split, Whole};
    let mapping = match key {
        "inset" => Split(&["top", "right", "bottom", "left"]),
        "insetBlock" => Split(&["top", "bottom"]),
        "insetBlockStart" => Split(&["top"]),
        "insetBlockEnd" => Split(&["bottom"]),
        "insetInline" => Split(&["left", "right"]),
        "insetInlineStart" => Split(&["left"]),
        "insetInlineEnd" => Split(&["right"]),
        "marginBlock" => Split(&["marginTop", "marginBottom"]),
        "marginBlockStart" => Split(&["marginTop"]),
        "marginBlockEnd" => Split(&["marginBottom"]),
        "marginInline" => Split(&["marginLeft", "marginRight"]),
        "marginInlineStart" => Split(&["marginLeft"]),
        "marginInlineEnd" => Split(&["marginRight"]),
        "paddingBlock" => Split(&["paddingTop", "paddingBottom"]),
        "paddingBlockStart" => Split(&["paddingTop"]),
        "paddingBlockEnd" => Split(&["paddingBottom"]),
        "paddingInline" => Split(&["paddingLeft", "paddingRight"]),
        "paddingInlineStart" => Split(&["paddingLeft"]),
        "paddingInlineEnd" => Split(&["paddingRight"]),
        "borderBlock" => Whole(&["borderTop", "borderBottom"]),
        "borderBlockStart" => Split(&["borderTop"]),
        "borderBlockEnd" => Split(&["borderBottom"]),
        "borderInline" => Whole(&["borderLeft", "borderRight"]),
        "borderInlineStart" => Split(&["borderLeft"]),
        "borderInlineEnd" => Split(&["borderRight"]),
        "borderBlockWidth" => Split(&["borderTopWidth", "borderBottomWidth"]),
        "borderBlockStartWidth" => Split(&["borderTopWidth"]),
        "borderBlockEndWidth" => Split(&["borderBottomWidth"]),
        "borderInlineWidth" => Split(&["borderLeftWidth", "borderRightWidth"]),
        "borderInlineStartWidth" => Split(&["borderLeftWidth"]),
        "borderInlineEndWidth" => Split(&["borderRightWidth"]),
        "borderBlockStyle" => Split(&["borderTopStyle", "borderBottomStyle"]),
        "borderBlockStartStyle" => Split(&["borderTopStyle"]),
        "borderBlockEndStyle" => Split(&["borderBottomStyle"]),
        "borderInlineStyle" => Split(&["borderLeftStyle", "borderRightStyle"]),
        "borderInlineStartStyle" => Split(&["borderLeftStyle"]),
        "borderInlineEndStyle" => Split(&["borderRightStyle"]),
        "borderBlockColor" => Split(&["borderTopColor", "borderBottomColor"]),
        "borderBlockStartColor" => Split(&["borderTopColor"]),
        "borderBlockEndColor" => Split(&["borderBottomColor"]),
        "borderInlineColor" => Split(&["borderLeftColor", "borderRightColor"]),
        "borderInlineStartColor" => Split(&["borderLeftColor"]),
        "borderInlineEndColor" => Split(&["borderRightColor"]),
        "borderStartStartRadius" => Split(&["borderTopLeftRadius"]),
        "borderStartEndRadius" => Split(&["borderTopRightRadius"]),
        "borderEndStartRadius" => Split(&["borderBottomLeftRadius"]),
        "borderEndEndRadius" => Split(&["borderBottomRightRadius"]),
        _ => return None,
    };
    Some(mapping)
}

/// Split a shorthand value on top-level whitespace, keeping parenthesized
/// groups together. Returns the parts and whether `!important` was present.
fn split_values(value: &str) -> (Vec<String>, bool) {
    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in value.trim().chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if ch.is_whitespace() && depth == 0 {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    let important = parts.last().is_some_and(|last| last == "!important");
    if important {
        parts.pop();
    }
    (parts, important)
}

/// Rewrites logical properties (`marginInline`, `insetBlockStart`, ...) to
/// their left-to-right physical equivalents for browsers without support.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyLogicalProperties;

impl LegacyLogicalProperties {
    fn expand(targets: &[&str], value: &CssValue) -> Vec<(String, CssValue)> {
        let text = match value {
            CssValue::Num(_) => {
                return targets
                    .iter()
                    .map(|t| ((*t).to_owned(), CssValue::skip_check(value.clone())))
                    .collect();
            }
            CssValue::Str(s) => s,
            other => {
                return targets
                    .iter()
                    .map(|t| ((*t).to_owned(), other.clone()))
                    .collect();
            }
        };

        let (values, important) = split_values(text);
        let pick = |index: usize| -> String {
            let v = match (targets.len(), values.len(), index) {
                (_, 0, _) => String::new(),
                // `a` / `a b` / `a b c` / `a b c d` for four-sided shorthands
                (4, 1, _) => values[0].clone(),
                (4, 2, i) => values[i % 2].clone(),
                (4, 3, 3) => values[1].clone(),
                (_, n, i) => values[i.min(n - 1)].clone(),
            };
            if important {
                format!("{v} !important")
            } else {
                v
            }
        };
        targets
            .iter()
            .enumerate()
            .map(|(i, t)| ((*t).to_owned(), CssValue::skip_check(pick(i))))
            .collect()
    }
}

impl Transformer for LegacyLogicalProperties {
    fn visit(&self, obj: CssObject) -> CssObject {
        let mut out = CssObject::new();
        for (key, value) in obj {
            match logical_mapping(&key) {
                Some(_) if value.is_nested() => out.set(key, value),
                Some(Mapping::Split(targets)) => {
                    for (k, v) in Self::expand(targets, &value) {
                        out.set(k, v);
                    }
                }
                Some(Mapping::Whole(targets)) => {
                    for target in targets {
                        out.set(*target, value.clone());
                    }
                }
                None => out.set(key, value),
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// px to rem
// ---------------------------------------------------------------------------

/// Converts pixel lengths to `rem`.
#[derive(Debug, Clone, Copy)]
pub struct Px2Rem {
    /// Pixels per rem.
    pub root_value: f64,
    /// Decimal places kept in the converted value.
    pub precision: i32,
    /// Also rewrite pixel lengths in `@media` queries.
    pub media_query: bool,
}

impl Default for Px2Rem {
    fn default() -> Self {
        Self {
            root_value: 16.0,
            precision: 5,
            media_query: false,
        }
    }
}

impl Px2Rem {
    pub fn new(root_value: f64) -> Self {
        Self {
            root_value,
            ..Self::default()
        }
    }

    pub fn with_precision(mut self, precision: i32) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_media_query(mut self, media_query: bool) -> Self {
        self.media_query = media_query;
        self
    }

    fn to_fixed(&self, n: f64) -> f64 {
        let multiplier = 10f64.powi(self.precision + 1);
        let whole = (n * multiplier).floor();
        ((whole / 10.0).round() * 10.0) / multiplier
    }

    /// `None` leaves lengths of one pixel or less alone (hairlines).
    fn convert(&self, px: f64) -> Option<String> {
        if px <= 1.0 {
            return None;
        }
        Some(format!("{}rem", self.to_fixed(px / self.root_value)))
    }
}

impl Transformer for Px2Rem {
    fn visit(&self, obj: CssObject) -> CssObject {
        let mut out = CssObject::new();
        for (key, value) in obj {
            let key = if self.media_query && key.starts_with('@') && key.contains("px") {
                replace_px(&key, |n| self.convert(n))
            } else {
                key
            };
            let value = match value {
                CssValue::Str(s) if s.contains("px") => {
                    CssValue::Str(replace_px(&s, |n| self.convert(n)))
                }
                CssValue::Num(n) if n != 0.0 && !is_unitless(&key) => match self.convert(n) {
                    Some(rem) => CssValue::Str(rem),
                    None => CssValue::Num(n),
                },
                other => other,
            };
            out.set(key, value);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Vendor prefixes
// ---------------------------------------------------------------------------

fn vendor_prefixes(key: &str) -> &'static [&'static str] {
    match key {
        "userSelect" => &["WebkitUserSelect", "MozUserSelect", "msUserSelect"],
        "appearance" => &["WebkitAppearance", "MozAppearance"],
        "backdropFilter" => &["WebkitBackdropFilter"],
        "textSizeAdjust" => &["WebkitTextSizeAdjust", "MozTextSizeAdjust", "msTextSizeAdjust"],
        "maskImage" => &["WebkitMaskImage"],
        "hyphens" => &["WebkitHyphens", "msHyphens"],
        "boxDecorationBreak" => &["WebkitBoxDecorationBreak"],
        "textStroke" => &["WebkitTextStroke"],
        _ => &[],
    }
}

/// Emits vendor-prefixed copies ahead of properties that still need them.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoPrefix;

impl Transformer for AutoPrefix {
    fn visit(&self, obj: CssObject) -> CssObject {
        let mut out = CssObject::new();
        for (key, value) in obj {
            if !value.is_nested() {
                for prefixed in vendor_prefixes(&key) {
                    if !out.contains_key(prefixed) {
                        out.set(*prefixed, value.clone());
                    }
                }
            }
            out.set(key, value);
        }
        out
    }
}
