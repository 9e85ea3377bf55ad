//! Properties whose numeric values are emitted without a `px` unit.

const UNITLESS: &[&str] = &[
    "animationIterationCount",
    "aspectRatio",
    "borderImageOutset",
    "borderImageSlice",
    "borderImageWidth",
    "boxFlex",
    "boxFlexGroup",
    "boxOrdinalGroup",
    "columnCount",
    "columns",
    "flex",
    "flexGrow",
    "flexPositive",
    "flexShrink",
    "flexNegative",
    "flexOrder",
    "gridRow",
    "gridRowEnd",
    "gridRowSpan",
    "gridRowStart",
    "gridColumn",
    "gridColumnEnd",
    "gridColumnSpan",
    "gridColumnStart",
    "msGridRow",
    "msGridRowSpan",
    "msGridColumn",
    "msGridColumnSpan",
    "fontWeight",
    "lineHeight",
    "opacity",
    "order",
    "orphans",
    "scale",
    "tabSize",
    "widows",
    "zIndex",
    "zoom",
    "WebkitLineClamp",
    "fillOpacity",
    "floodOpacity",
    "stopOpacity",
    "strokeDasharray",
    "strokeDashoffset",
    "strokeMiterlimit",
    "strokeOpacity",
    "strokeWidth",
];

/// Whether `key` (camelCase or kebab-case) takes unitless numbers.
pub fn is_unitless(key: &str) -> bool {
    if UNITLESS.contains(&key) {
        return true;
    }
    key.contains('-') && UNITLESS.contains(&kebab_to_camel(key).as_str())
}

/// `line-height` -> `lineHeight`, `-webkit-line-clamp` -> `WebkitLineClamp`.
pub fn kebab_to_camel(key: &str) -> String {
    let vendor = key.starts_with('-');
    let mut out = String::with_capacity(key.len());
    for (i, segment) in key.split('-').filter(|s| !s.is_empty()).enumerate() {
        // `-ms-` is the one vendor prefix that stays lowercase
        if i == 0 && (!vendor || segment == "ms") {
            out.push_str(segment);
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// `lineHeight` -> `line-height`, `WebkitLineClamp` -> `-webkit-line-clamp`,
/// `msFlex` -> `-ms-flex`. Custom properties (`--x`) pass through unchanged.
pub fn camel_to_kebab(key: &str) -> String {
    if key.starts_with("--") {
        return key.to_owned();
    }
    let mut out = String::with_capacity(key.len() + 4);
    if key.starts_with("ms") && key[2..].starts_with(|c: char| c.is_ascii_uppercase()) {
        out.push('-');
    }
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_keys() {
        assert!(is_unitless("lineHeight"));
        assert!(is_unitless("zIndex"));
        assert!(!is_unitless("width"));
    }

    #[test]
    fn kebab_case_keys() {
        assert!(is_unitless("line-height"));
        assert!(is_unitless("-webkit-line-clamp"));
        assert!(!is_unitless("margin-top"));
    }

    #[test]
    fn kebab_conversion() {
        assert_eq!(camel_to_kebab("lineHeight"), "line-height");
        assert_eq!(camel_to_kebab("WebkitUserSelect"), "-webkit-user-select");
        assert_eq!(camel_to_kebab("msGridRow"), "-ms-grid-row");
        assert_eq!(camel_to_kebab("--rc-color"), "--rc-color");
        assert_eq!(camel_to_kebab("color"), "color");
    }

    #[test]
    fn camel_conversion() {
        assert_eq!(kebab_to_camel("line-height"), "lineHeight");
        assert_eq!(kebab_to_camel("-webkit-line-clamp"), "WebkitLineClamp");
        assert_eq!(kebab_to_camel("-ms-grid-row"), "msGridRow");
    }
}
