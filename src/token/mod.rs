//! Design tokens: values, themes and the token cache.

pub mod value;
pub mod theme;
pub mod cache;

pub use cache::{token_style_id, use_cache_token, CssVarOptions, TokenHandle, TokenOptions, TOKEN_PREFIX};
pub use theme::{
    compute_final_token, create_theme, round_numbers, ComponentOverride, DerivativeFn, Theme,
    TokenFormatter, TokenOverrides,
};
pub use value::{Token, TokenValue};
