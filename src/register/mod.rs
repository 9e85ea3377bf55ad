//! Registration of generated CSS against the shared cache.

pub mod style;
pub mod css_var;

pub use css_var::{
    serialize_css_var, token_to_css_var, transform_token, use_css_var_register, CssVarHandle,
    CssVarRegisterInfo, TransformOptions, CSS_VAR_PREFIX, CSS_VAR_PRIORITY,
};
pub use style::{use_style_register, StyleHandle, StyleRegisterInfo, LAYER_EFFECT_PRIORITY, STYLE_PREFIX};
