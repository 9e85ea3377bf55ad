//! `style!` macro: a CSS-like object literal compiled to `CssObject` builder calls.

use proc_macro2::{Literal, Span, TokenStream};
use quote::{quote, quote_spanned};
use syn::parse::{Parse, ParseStream};
use syn::{braced, parenthesized, Error, Expr, Ident, LitFloat, LitInt, LitStr, Result, Token};

// ---------------------------------------------------------------------------
// AST types
// ---------------------------------------------------------------------------

/// A single value token on the right of a `:`.
#[derive(Debug, Clone)]
pub(crate) enum StyleValue {
    /// A bare identifier like `red` or `flex`.
    Ident(String, Span),
    /// A plain number, emitted as a numeric value so units apply.
    Number(f64, Span),
    /// A number with a suffix: `1px`, `50%`, `1.5rem`.
    WithUnit(f64, String, Span),
    /// `#fff`, `#1677ff`.
    Hash(String, Span),
    Str(String, Span),
    /// `(expr)`: any Rust expression convertible into a CSS value.
    Expr(Box<Expr>, Span),
}

impl StyleValue {
    fn span(&self) -> Span {
        match self {
            StyleValue::Ident(_, s)
            | StyleValue::Number(_, s)
            | StyleValue::WithUnit(_, _, s)
            | StyleValue::Hash(_, s)
            | StyleValue::Str(_, s)
            | StyleValue::Expr(_, s) => *s,
        }
    }

    /// CSS text of a literal value; `None` for expressions.
    fn to_css(&self) -> Option<String> {
        match self {
            StyleValue::Ident(s, _) | StyleValue::Hash(s, _) | StyleValue::Str(s, _) => {
                Some(s.clone())
            }
            StyleValue::Number(n, _) => Some(n.to_string()),
            StyleValue::WithUnit(n, unit, _) => Some(format!("{n}{unit}")),
            StyleValue::Expr(..) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Entry {
    /// `font-size: 14;` with the property already in camelCase.
    Declaration {
        name: String,
        name_span: Span,
        values: Vec<StyleValue>,
    },
    /// `".a:hover" { ... }`
    Nested { selector: String, body: StyleBody },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StyleBody {
    pub entries: Vec<Entry>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

impl Parse for StyleBody {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut entries = Vec::new();
        while !input.is_empty() {
            entries.push(parse_entry(input)?);
        }
        Ok(StyleBody { entries })
    }
}

fn parse_entry(input: ParseStream) -> Result<Entry> {
    let (key, span, quoted) = if input.peek(LitStr) {
        let lit: LitStr = input.parse()?;
        (lit.value(), lit.span(), true)
    } else {
        let (name, span) = parse_kebab_name(input)?;
        (name, span, false)
    };

    if input.peek(syn::token::Brace) {
        let content;
        braced!(content in input);
        let body: StyleBody = content.parse()?;
        return Ok(Entry::Nested { selector: key, body });
    }

    input.parse::<Token![:]>()?;
    let mut values = Vec::new();
    while !input.peek(Token![;]) {
        if input.is_empty() {
            return Err(Error::new(span, format!("missing `;` after `{key}`")));
        }
        values.push(parse_value(input)?);
    }
    input.parse::<Token![;]>()?;

    if values.is_empty() {
        return Err(Error::new(span, format!("property `{key}` has no value")));
    }
    if values.len() > 1 {
        if let Some(expr) = values.iter().find(|v| matches!(v, StyleValue::Expr(..))) {
            return Err(Error::new(expr.span(), "an expression must be the whole value"));
        }
    }

    let name = if quoted { key } else { kebab_to_camel(&key) };
    Ok(Entry::Declaration {
        name,
        name_span: span,
        values,
    })
}

/// `font-size`, `-webkit-box-flex`, `a`.
fn parse_kebab_name(input: ParseStream) -> Result<(String, Span)> {
    let mut name = String::new();
    let mut span = None;
    if input.peek(Token![-]) {
        let dash = input.parse::<Token![-]>()?;
        span = Some(dash.span);
        name.push('-');
    }
    let first: Ident = input.parse()?;
    name.push_str(&first.to_string());
    while input.peek(Token![-]) {
        input.parse::<Token![-]>()?;
        let next: Ident = input.parse()?;
        name.push('-');
        name.push_str(&next.to_string());
    }
    Ok((name, span.unwrap_or_else(|| first.span())))
}

fn parse_value(input: ParseStream) -> Result<StyleValue> {
    if input.peek(syn::token::Paren) {
        let content;
        let paren = parenthesized!(content in input);
        let expr: Expr = content.parse()?;
        return Ok(StyleValue::Expr(Box::new(expr), paren.span.join()));
    }

    if input.peek(Token![#]) {
        let hash = input.parse::<Token![#]>()?;
        // `#1a1a2e` lexes as an integer with a suffix; its text is intact.
        let hex = if input.peek(Ident) {
            input.parse::<Ident>()?.to_string()
        } else if input.peek(LitInt) {
            input.parse::<LitInt>()?.to_string()
        } else {
            return Err(input.error("expected hex color value after `#`"));
        };
        return Ok(StyleValue::Hash(format!("#{hex}"), hash.span));
    }

    if input.peek(LitStr) {
        let lit: LitStr = input.parse()?;
        return Ok(StyleValue::Str(lit.value(), lit.span()));
    }

    if input.peek(Ident) {
        let ident: Ident = input.parse()?;
        return Ok(StyleValue::Ident(ident.to_string(), ident.span()));
    }

    let negative = if input.peek(Token![-]) {
        input.parse::<Token![-]>()?;
        true
    } else {
        false
    };
    let sign = if negative { -1.0 } else { 1.0 };

    if input.peek(LitFloat) {
        let lit: LitFloat = input.parse()?;
        let value = sign * lit.base10_digits().parse::<f64>().map_err(|_| Error::new(lit.span(), "invalid number"))?;
        return finish_number(input, value, lit.suffix(), lit.span());
    }
    if input.peek(LitInt) {
        let lit: LitInt = input.parse()?;
        let value = sign * lit.base10_digits().parse::<f64>().map_err(|_| Error::new(lit.span(), "invalid number"))?;
        return finish_number(input, value, lit.suffix(), lit.span());
    }
    if negative {
        return Err(input.error("expected a number after `-`"));
    }

    Err(input.error("unexpected token in style value"))
}

fn finish_number(input: ParseStream, value: f64, suffix: &str, span: Span) -> Result<StyleValue> {
    if !suffix.is_empty() {
        return Ok(StyleValue::WithUnit(value, suffix.to_owned(), span));
    }
    if input.peek(Token![%]) {
        input.parse::<Token![%]>()?;
        return Ok(StyleValue::WithUnit(value, "%".to_owned(), span));
    }
    Ok(StyleValue::Number(value, span))
}

/// `font-size` -> `fontSize`; `-webkit-box-flex` -> `WebkitBoxFlex`;
/// `-ms-flex` -> `msFlex`.
fn kebab_to_camel(name: &str) -> String {
    let (vendor, rest) = match name.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, name),
    };
    let mut out = String::with_capacity(rest.len());
    for (i, part) in rest.split('-').enumerate() {
        let capitalize = i > 0 || (vendor && part != "ms");
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            if capitalize {
                out.push(first.to_ascii_uppercase());
            } else {
                out.push(first);
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Code generation
// ---------------------------------------------------------------------------

fn generate_value(values: &[StyleValue]) -> TokenStream {
    match values {
        [StyleValue::Expr(expr, _)] => quote! { (#expr) },
        [StyleValue::Number(n, _)] => {
            let literal = Literal::f64_suffixed(n.abs());
            if *n < 0.0 {
                quote! { -#literal }
            } else {
                quote! { #literal }
            }
        }
        _ => {
            let text = values
                .iter()
                .filter_map(StyleValue::to_css)
                .collect::<Vec<_>>()
                .join(" ");
            quote! { #text }
        }
    }
}

fn generate_body(body: &StyleBody) -> TokenStream {
    let calls = body.entries.iter().map(|entry| match entry {
        Entry::Declaration {
            name,
            name_span,
            values,
        } => {
            let value = generate_value(values);
            quote_spanned! {*name_span=> .prop(#name, #value) }
        }
        Entry::Nested { selector, body } => {
            let inner = generate_body(body);
            quote! { .nest(#selector, #inner) }
        }
    });
    quote! {
        ::gilt_cssinjs::css::CssObject::new() #(#calls)*
    }
}

pub(crate) fn style_impl(input: TokenStream) -> Result<TokenStream> {
    let parsed: StyleBody = syn::parse2(input)?;
    if parsed.entries.is_empty() {
        return Err(Error::new(
            Span::call_site(),
            "style! macro requires at least one declaration or nested block",
        ));
    }
    Ok(generate_body(&parsed))
}

// ===========================================================================
// Tests
// ===========================================================================
