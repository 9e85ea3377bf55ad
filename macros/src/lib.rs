//! Proc macros for gilt-cssinjs: `style!` object literals.
//!
//! This crate is not meant to be used directly; enable the `macros` feature on `gilt-cssinjs`.

use proc_macro::TokenStream;

mod style_macro;

/// CSS-like object literal producing a `gilt_cssinjs::css::CssObject`.
///
/// # Syntax
///
/// - `name: value;` is a declaration. Kebab-case names become camelCase
///   (`font-size` -> `fontSize`); quoted names are kept as written.
/// - `"selector" { ... }` is a nested block.
/// - A single number stays numeric so `px` is added where it applies.
/// - Several value tokens are joined with spaces into one string.
/// - `(expr)` inserts any expression convertible into a CSS value.
///
/// # Example
///
/// ```ignore
/// let style = style! {
///     ".rc-box" {
///         color: (token.get_str("colorPrimary").unwrap_or("red"));
///         padding: 4px 8px;
///         line-height: 1.5;
///         "&:hover" { opacity: 0.8; }
///     }
/// };
/// ```
#[proc_macro]
pub fn style(input: TokenStream) -> TokenStream {
    style_macro::style_impl(input.into())
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
