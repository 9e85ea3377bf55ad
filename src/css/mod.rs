//! CSS objects and the pipeline that turns them into text: transformers,
//! linters, and the flattening serializer.

pub mod object;
pub mod unitless;
pub mod lexer;
pub mod lint;
pub mod transform;
pub mod serialize;

pub use lint::{
    ContentQuotesLinter, HashedAnimationLinter, LegacyNotSelectorLinter, LintInfo, Linter,
    LogicalPropertiesLinter, NaNLinter, ParentSelectorLinter,
};
pub use object::{CssObject, CssValue, Interpolation, Keyframes};
pub use serialize::{
    inject_selector_hash, parse_style, serialize_object, split_selector_list, HashPriority,
    LayerConfig, ParseConfig, ParsedStyle,
};
pub use transform::{AutoPrefix, LegacyLogicalProperties, Px2Rem, Transformer};
