//! Reference-counted style cache.

pub mod path;
pub mod value;
pub mod entity;
pub mod hook;

pub use entity::{
    run_removal_loop, CacheEntity, CacheEntry, ReleaseFn, StyleCache, DEFAULT_REMOVAL_DELAY,
};
pub use hook::{acquire, try_acquire, CacheBinding, CacheHandle, CacheHooks, ReleaseHook};
pub use path::{CachePath, PathSegment, PATH_SEPARATOR};
pub use value::{CacheItem, CacheValue, CssVarCacheValue, StyleCacheValue, TokenCacheValue};
