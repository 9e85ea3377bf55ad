//! Acquire/release of reference-counted cache slots.
//!
//! [`acquire`] computes a value on first use, shares it with every later
//! holder of the same path, and hands back a [`CacheHandle`]. Dropping the
//! handle releases it; the last release schedules the slot for delayed
//! removal, so a quick re-acquire (a re-render, a theme toggled back)
//! reuses the value without running the factory again.

use std::cell::Cell;
use std::convert::Infallible;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::entity::{CacheEntry, ReleaseFn, StyleCache};
use super::path::CachePath;
use super::value::{CacheItem, CacheValue};

/// Called when a value is removed: the value and whether the removal came
/// from a hot reload.
pub type ReleaseHook<T> = Rc<dyn Fn(&T, bool)>;

/// Called once when a slot goes from unused to used.
pub type EffectHook<T> = Box<dyn FnOnce(&T)>;

/// Optional callbacks for [`acquire`].
pub struct CacheHooks<T> {
    pub on_release: Option<ReleaseHook<T>>,
    pub on_effect: Option<EffectHook<T>>,
}

impl<T> Default for CacheHooks<T> {
    fn default() -> Self {
        Self {
            on_release: None,
            on_effect: None,
        }
    }
}

impl<T> CacheHooks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_release(mut self, hook: impl Fn(&T, bool) + 'static) -> Self {
        self.on_release = Some(Rc::new(hook));
        self
    }

    pub fn on_effect(mut self, hook: impl FnOnce(&T) + 'static) -> Self {
        self.on_effect = Some(Box::new(hook));
        self
    }
}

/// Acquire the slot at `prefix` + `key_path`, computing it with `factory`
/// if it does not exist.
pub fn acquire<T: CacheItem>(
    cache: &StyleCache,
    prefix: &str,
    key_path: &CachePath,
    factory: impl FnOnce() -> T,
    hooks: CacheHooks<T>,
) -> CacheHandle<T> {
    match try_acquire::<T, Infallible>(cache, prefix, key_path, || Ok(factory()), hooks) {
        Ok(handle) => handle,
        Err(never) => match never {},
    }
}

/// [`acquire`] with a fallible factory. A factory error leaves the cache
/// untouched.
pub fn try_acquire<T: CacheItem, E>(
    cache: &StyleCache,
    prefix: &str,
    key_path: &CachePath,
    factory: impl FnOnce() -> Result<T, E>,
    hooks: CacheHooks<T>,
) -> Result<CacheHandle<T>, E> {
    let key = key_path.prefixed(prefix).key();
    let hot_reload = cache.hot_reload();

    let existing = cache
        .get_key(&key)
        .and_then(|entry| T::from_value(&entry.value));
    let value = match existing {
        Some(value) if !hot_reload => value,
        Some(stale) => {
            if let Some(on_release) = &hooks.on_release {
                on_release(&stale, true);
            }
            factory()?
        }
        None => factory()?,
    };

    let revived = cache.cancel_removal(&key);
    let previous_count = Rc::new(Cell::new(0usize));
    let seen = Rc::clone(&previous_count);
    let computed = value.clone();
    cache.update_key(&key, move |previous| {
        let count = previous.as_ref().map_or(0, |entry| entry.use_count);
        seen.set(count);
        let keep = !hot_reload
            && previous
                .as_ref()
                .is_some_and(|entry| T::from_value(&entry.value).is_some());
        let value = match previous {
            Some(entry) if keep => entry.value,
            _ => computed.into_value(),
        };
        Some(CacheEntry {
            use_count: count + 1,
            value,
        })
    });

    let current = cache
        .get_key(&key)
        .and_then(|entry| T::from_value(&entry.value))
        .unwrap_or(value);

    let first_holder = previous_count.get() == 0;
    trace!(key = %key, count = previous_count.get() + 1, revived, "acquired cache slot");
    if first_holder && cache.mark_effected(&key) {
        if let Some(on_effect) = hooks.on_effect {
            on_effect(&current);
        }
    }

    Ok(CacheHandle {
        cache: Rc::clone(cache),
        key,
        value: current,
        on_release: hooks.on_release,
        released: false,
    })
}

// ---------------------------------------------------------------------------
// CacheHandle
// ---------------------------------------------------------------------------

/// One holder's claim on a cache slot. Released on drop.
pub struct CacheHandle<T: CacheItem> {
    cache: StyleCache,
    key: String,
    value: T,
    on_release: Option<ReleaseHook<T>>,
    released: bool,
}

impl<T: CacheItem> CacheHandle<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Flattened key of the slot, prefix included.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn cache(&self) -> &StyleCache {
        &self.cache
    }

    /// Release now rather than at drop.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let remaining = Rc::new(Cell::new(None::<usize>));
        let seen = Rc::clone(&remaining);
        self.cache.update_key(&self.key, move |previous| {
            let mut entry = previous?;
            entry.use_count = entry.use_count.saturating_sub(1);
            seen.set(Some(entry.use_count));
            Some(entry)
        });
        if remaining.get() != Some(0) {
            return;
        }

        if self.cache.hot_reload() {
            if let Some(value) = self.cache.remove_unused(&self.key) {
                if let (Some(on_release), Some(value)) = (&self.on_release, T::from_value(&value)) {
                    on_release(&value, true);
                }
            }
            return;
        }

        let callback = self.on_release.clone().map(|on_release| {
            Box::new(move |value: CacheValue, hot: bool| {
                if let Some(value) = T::from_value(&value) {
                    on_release(&value, hot);
                }
            }) as ReleaseFn
        });
        self.cache.schedule_removal(&self.key, callback);
    }
}

impl<T: CacheItem> Drop for CacheHandle<T> {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl<T: CacheItem + fmt::Debug> fmt::Debug for CacheHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheHandle")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("released", &self.released)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CacheBinding
// ---------------------------------------------------------------------------

/// A re-keyable claim: binding a new path acquires it before releasing the
/// old one, so a slot shared by both is never dropped in between.
pub struct CacheBinding<T: CacheItem> {
    handle: Option<CacheHandle<T>>,
}

impl<T: CacheItem> Default for CacheBinding<T> {
    fn default() -> Self {
        Self { handle: None }
    }
}

impl<T: CacheItem> CacheBinding<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to `prefix` + `key_path`. Rebinding the current key is a no-op.
    pub fn bind(
        &mut self,
        cache: &StyleCache,
        prefix: &str,
        key_path: &CachePath,
        factory: impl FnOnce() -> T,
        hooks: CacheHooks<T>,
    ) -> &T {
        let key = key_path.prefixed(prefix).key();
        let handle = match self.handle.take() {
            Some(current) if current.key == key && Rc::ptr_eq(&current.cache, cache) => current,
            previous => {
                let next = acquire(cache, prefix, key_path, factory, hooks);
                // release the old slot only once the new one is held
                drop(previous);
                next
            }
        };
        &self.handle.insert(handle).value
    }

    pub fn current(&self) -> Option<&T> {
        self.handle.as_ref().map(CacheHandle::value)
    }

    /// Release the current slot, if any.
    pub fn unbind(&mut self) {
        self.handle = None;
    }
}
