//! Parsing server-rendered `<style>` markup back into a document.
//!
//! Only the subset extraction produces is understood: a sequence of
//! `<style name="value" ...>css</style>` elements separated by whitespace.

use super::node::{ElementData, NodeId};
use super::tree::Document;

/// Error raised on markup outside the supported subset.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkupError {
    /// Something other than a `<style>` element or whitespace.
    #[error("unexpected content at byte {position}: {message}")]
    UnexpectedContent { position: usize, message: String },

    /// Input ended inside an element.
    #[error("unterminated <style> element starting at byte {0}")]
    Unterminated(usize),
}

const OPEN: &str = "<style";
const CLOSE: &str = "</style>";

/// Parse markup into detached elements, in order.
pub fn parse_markup(markup: &str) -> Result<Vec<ElementData>, MarkupError> {
    let mut elements = Vec::new();
    let mut pos = 0;
    while pos < markup.len() {
        let rest = &markup[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();
        if trimmed.is_empty() {
            break;
        }
        if !trimmed.starts_with(OPEN) {
            return Err(MarkupError::UnexpectedContent {
                position: pos,
                message: format!("expected `{OPEN}`"),
            });
        }

        let start = pos;
        let tag_end = trimmed.find('>').ok_or(MarkupError::Unterminated(start))?;
        let mut data = ElementData::style();
        parse_attributes(&trimmed[OPEN.len()..tag_end], start + OPEN.len(), &mut data)?;

        let body = &trimmed[tag_end + 1..];
        let close = body.find(CLOSE).ok_or(MarkupError::Unterminated(start))?;
        data.text = body[..close].to_owned();
        elements.push(data);

        pos += tag_end + 1 + close + CLOSE.len();
    }
    Ok(elements)
}

fn parse_attributes(
    source: &str,
    offset: usize,
    data: &mut ElementData,
) -> Result<(), MarkupError> {
    let mut rest = source;
    loop {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            return Ok(());
        }
        let position = offset + (source.len() - trimmed.len());
        let name_len = trimmed
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(trimmed.len());
        let name = &trimmed[..name_len];
        if name.is_empty() {
            return Err(MarkupError::UnexpectedContent {
                position,
                message: "expected an attribute name".into(),
            });
        }
        let after_name = &trimmed[name_len..];
        match after_name.strip_prefix("=\"") {
            Some(value_start) => {
                let end = value_start
                    .find('"')
                    .ok_or_else(|| MarkupError::UnexpectedContent {
                        position,
                        message: format!("unterminated value for attribute `{name}`"),
                    })?;
                data.set_attr(name, &value_start[..end]);
                rest = &value_start[end + 1..];
            }
            None if after_name.starts_with('=') => {
                return Err(MarkupError::UnexpectedContent {
                    position,
                    message: format!("attribute `{name}` value must be double-quoted"),
                });
            }
            None => {
                data.set_attr(name, "");
                rest = after_name;
            }
        }
    }
}

impl Document {
    /// Parse `markup` and append the resulting elements to `parent`.
    pub fn insert_markup(
        &mut self,
        parent: NodeId,
        markup: &str,
    ) -> Result<Vec<NodeId>, MarkupError> {
        let elements = parse_markup(markup)?;
        Ok(elements
            .into_iter()
            .map(|data| self.append_child(parent, data))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_sequence() {
        let markup = r#"<style data-css-hash="a" data-rc-priority="-999">.a{color:red;}</style>
            <style data-css-hash="b">.b{}</style>"#;
        let elements = parse_markup(markup).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].attr("data-css-hash"), Some("a"));
        assert_eq!(elements[0].attr("data-rc-priority"), Some("-999"));
        assert_eq!(elements[0].text, ".a{color:red;}");
        assert_eq!(elements[1].text, ".b{}");
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse_markup("  \n ").unwrap(), Vec::new());
    }

    #[test]
    fn boolean_attribute() {
        let elements = parse_markup("<style data-flag>x</style>").unwrap();
        assert_eq!(elements[0].attr("data-flag"), Some(""));
    }

    #[test]
    fn rejects_other_tags() {
        let err = parse_markup("<div></div>").unwrap_err();
        assert!(matches!(err, MarkupError::UnexpectedContent { position: 0, .. }));
    }

    #[test]
    fn rejects_unterminated() {
        assert_eq!(
            parse_markup("  <style a=\"1\">x").unwrap_err(),
            MarkupError::Unterminated(2)
        );
    }

    #[test]
    fn rejects_unquoted_value() {
        let err = parse_markup("<style a=1>x</style>").unwrap_err();
        assert!(err.to_string().contains("double-quoted"));
    }

    #[test]
    fn insert_markup_appends() {
        let mut doc = Document::new();
        let body = doc.body();
        let ids = doc
            .insert_markup(body, r#"<style data-css-hash="x">.x{}</style>"#)
            .unwrap();
        assert_eq!(doc.children(body), ids.as_slice());
        assert_eq!(doc.to_html(ids[0]), r#"<style data-css-hash="x">.x{}</style>"#);
    }
}
