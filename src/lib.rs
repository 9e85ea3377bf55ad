//! # gilt-cssinjs
//!
//! A CSS-in-Rust style engine: components describe their styles as objects
//! computed from design tokens, and a shared, reference-counted cache turns
//! them into CSS text exactly once per distinct input.
//!
//! Styles are injected into a document as managed `<style>` elements while
//! any holder keeps them, removed after a short grace window once the last
//! holder lets go, and can be extracted as markup for server rendering and
//! adopted again by the client.
//!
//! ## Core Systems
//!
//! - **[`cache`]**: Reference-counted cache slots, deferred removal, acquire/release handles
//! - **[`context`]**: Layered configuration resolving to a cache, document and pipeline
//! - **[`css`]**: Style objects, transformers, linters and the flattening serializer
//! - **[`register`]**: Registering styles and CSS-variable blocks against the cache
//! - **[`token`]**: Themes, memoized token derivation and the token cache
//! - **[`hooks`]**: Per-component hooks tying tokens, variables and styles together
//! - **[`extract`]**: Server-side extraction to `<style>` markup or plain CSS
//! - **[`dom`]**: Slotmap-backed element tree standing in for the host document
//! - **[`hash`]**: Short stable content hashes

// Lets `style!` expansions inside this crate resolve `::gilt_cssinjs`.
extern crate self as gilt_cssinjs;

// Foundation
pub mod error;
pub mod hash;

// Document and cache
pub mod cache;
pub mod dom;

// Styles and tokens
pub mod css;
pub mod token;

// Registration
pub mod context;
pub mod hooks;
pub mod register;

// Server rendering
pub mod extract;

pub use cache::{CacheEntity, CacheHandle, StyleCache};
pub use context::{create_cache, MockMode, StyleContext, StyleContextProps};
pub use css::{CssObject, CssValue, Interpolation, Keyframes};
pub use error::StyleError;
pub use extract::{extract_style, ExtractOptions, ExtractType};
pub use hooks::{gen_style_hooks, ComponentScope, ComponentStyle, ComponentStyleOptions, StyleHooks};
pub use register::{use_css_var_register, use_style_register, CssVarRegisterInfo, StyleRegisterInfo};
pub use token::{create_theme, use_cache_token, Theme, Token, TokenOptions, TokenValue};

// Proc macros (feature-gated)
#[cfg(feature = "macros")]
pub use gilt_cssinjs_macros::style;
