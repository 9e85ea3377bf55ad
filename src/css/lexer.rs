//! logos-based lexer for CSS declaration values.
//!
//! Value transforms only care about a few shapes inside a value: pixel
//! lengths, `url(...)` and `var(...)` references (which must be left alone),
//! and whitespace. Everything else lexes one character at a time.
//!
//! Token priority in logos is longest-match first, so `12px` lexes as
//! [`ValueToken::Px`] rather than four `Other` characters.

use logos::Logos;

/// Token produced by the value lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum ValueToken {
    /// `url(...)`; contents are never rewritten.
    #[regex(r"url\([^)]*\)")]
    Url,

    /// `var(...)`; contents are never rewritten.
    #[regex(r"var\([^)]*\)")]
    Var,

    /// Pixel length: `12px`, `.5px`, `1.25px`.
    #[regex(r"[0-9]*\.?[0-9]+px")]
    Px,

    /// Whitespace run.
    #[regex(r"[ \t\n\r\f]+")]
    Whitespace,

    /// Any other single character.
    #[regex(r"[^ \t\n\r\f]")]
    Other,
}

/// Tokenize a value into `(token, text)` pairs.
///
/// Characters the lexer rejects come back as [`ValueToken::Other`] so that
/// re-joining the texts always reproduces the input.
pub fn tokenize(input: &str) -> Vec<(ValueToken, &str)> {
    ValueToken::lexer(input)
        .spanned()
        .map(|(result, span)| (result.unwrap_or(ValueToken::Other), &input[span]))
        .collect()
}

/// Rewrite every pixel length in `value` through `replace`.
///
/// `replace` receives the numeric part and returns the new text, or `None`
/// to keep the original. Lengths inside `url()` and `var()` are untouched.
pub fn replace_px(value: &str, mut replace: impl FnMut(f64) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    for (token, text) in tokenize(value) {
        let rewritten = match token {
            ValueToken::Px => text
                .strip_suffix("px")
                .and_then(|number| number.parse::<f64>().ok())
                .and_then(&mut replace),
            _ => None,
        };
        match rewritten {
            Some(new_text) => out.push_str(&new_text),
            None => out.push_str(text),
        }
    }
    out
}
