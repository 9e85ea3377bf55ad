//! The cache entity: one isolated store of reference-counted slots.
//!
//! Every mutation of a slot goes through [`CacheEntity::update`], which
//! hands the current entry to an updater and stores what it returns.
//! Updates are serialized: an update requested while another one runs is
//! queued and applied, in order, once the running one finishes.
//!
//! Slots whose use count drops to zero are not removed immediately. They
//! get a removal deadline instead; [`CacheEntity::flush_removals`] (or the
//! async [`run_removal_loop`]) removes them once the deadline passes, unless
//! they were acquired again in the meantime.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use super::path::CachePath;
use super::value::CacheValue;

/// How long an unused slot survives before it is removed.
pub const DEFAULT_REMOVAL_DELAY: Duration = Duration::from_millis(500);

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

/// Shared handle to a cache entity.
pub type StyleCache = Rc<CacheEntity>;

/// A stored value and how many holders it has.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub use_count: usize,
    pub value: CacheValue,
}

/// Called once a slot is really removed, with the removed value and whether
/// the removal came from a hot reload.
pub type ReleaseFn = Box<dyn FnOnce(CacheValue, bool)>;

type Updater = Box<dyn FnOnce(Option<CacheEntry>) -> Option<CacheEntry>>;

struct Slot {
    entry: CacheEntry,
    /// Creation order, kept across updates.
    seq: u64,
}

struct PendingRemoval {
    deadline: Instant,
    on_release: Option<ReleaseFn>,
}

/// Resets the in-progress flag even if an updater panics.
struct UpdateGuard<'a>(&'a Cell<bool>);

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// ---------------------------------------------------------------------------
// CacheEntity
// ---------------------------------------------------------------------------

pub struct CacheEntity {
    instance_id: String,
    slots: RefCell<HashMap<String, Slot>>,
    next_seq: Cell<u64>,
    updating: Cell<bool>,
    queued: RefCell<VecDeque<(String, Updater)>>,
    pending: RefCell<HashMap<String, PendingRemoval>>,
    /// Bumped by [`CacheEntity::tick`]; effect markers older than the
    /// current generation no longer suppress effects.
    generation: Cell<u64>,
    effected: RefCell<HashMap<String, u64>>,
    effect_keys: RefCell<HashSet<String>>,
    extracted: RefCell<HashSet<String>>,
    theme_keys: RefCell<HashMap<String, usize>>,
    removal_delay: Cell<Duration>,
    hot_reload: Cell<bool>,
}

impl CacheEntity {
    pub fn new() -> Self {
        let n = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        Self::with_instance_id(format!("cssinjs-{n}"))
    }

    /// Build an entity with a caller-chosen instance id.
    pub fn with_instance_id(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            slots: RefCell::new(HashMap::new()),
            next_seq: Cell::new(0),
            updating: Cell::new(false),
            queued: RefCell::new(VecDeque::new()),
            pending: RefCell::new(HashMap::new()),
            generation: Cell::new(0),
            effected: RefCell::new(HashMap::new()),
            effect_keys: RefCell::new(HashSet::new()),
            extracted: RefCell::new(HashSet::new()),
            theme_keys: RefCell::new(HashMap::new()),
            removal_delay: Cell::new(DEFAULT_REMOVAL_DELAY),
            hot_reload: Cell::new(false),
        }
    }

    /// Shorthand for `Rc::new(CacheEntity::new())`.
    pub fn shared() -> StyleCache {
        Rc::new(Self::new())
    }

    /// Id written to the elements this cache owns.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn removal_delay(&self) -> Duration {
        self.removal_delay.get()
    }

    pub fn set_removal_delay(&self, delay: Duration) {
        self.removal_delay.set(delay);
    }

    pub fn hot_reload(&self) -> bool {
        self.hot_reload.get()
    }

    pub fn set_hot_reload(&self, enabled: bool) {
        self.hot_reload.set(enabled);
    }

    // -- slots ---------------------------------------------------------------

    pub fn get(&self, path: &CachePath) -> Option<CacheEntry> {
        self.get_key(&path.key())
    }

    pub fn get_key(&self, key: &str) -> Option<CacheEntry> {
        self.slots.borrow().get(key).map(|slot| slot.entry.clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    /// Flattened keys of every slot, in creation order.
    pub fn keys(&self) -> Vec<String> {
        self.snapshot().into_iter().map(|(key, _, _)| key).collect()
    }

    /// Every slot as `(key, entry, creation seq)`, in creation order.
    pub fn snapshot(&self) -> Vec<(String, CacheEntry, u64)> {
        let mut entries: Vec<_> = self
            .slots
            .borrow()
            .iter()
            .map(|(key, slot)| (key.clone(), slot.entry.clone(), slot.seq))
            .collect();
        entries.sort_by_key(|(_, _, seq)| *seq);
        entries
    }

    /// Read-modify-write the slot at `path`.
    ///
    /// The updater sees the current entry (or `None`) and returns the new
    /// one; returning `None` deletes the slot. While an updater runs the
    /// slot reads as absent.
    pub fn update(
        &self,
        path: &CachePath,
        updater: impl FnOnce(Option<CacheEntry>) -> Option<CacheEntry> + 'static,
    ) {
        self.update_key(&path.key(), updater);
    }

    /// [`CacheEntity::update`] by flattened key.
    pub fn update_key(
        &self,
        key: &str,
        updater: impl FnOnce(Option<CacheEntry>) -> Option<CacheEntry> + 'static,
    ) {
        let updater: Updater = Box::new(updater);
        if self.updating.get() {
            trace!(key, "update queued behind running update");
            self.queued
                .borrow_mut()
                .push_back((key.to_owned(), updater));
            return;
        }

        self.updating.set(true);
        let _guard = UpdateGuard(&self.updating);
        self.apply(key.to_owned(), updater);
        loop {
            let next = self.queued.borrow_mut().pop_front();
            match next {
                Some((key, updater)) => self.apply(key, updater),
                None => break,
            }
        }
    }

    fn apply(&self, key: String, updater: Updater) {
        let previous = self.slots.borrow_mut().remove(&key);
        let (entry, seq) = match previous {
            Some(slot) => (Some(slot.entry), Some(slot.seq)),
            None => (None, None),
        };
        if let Some(entry) = updater(entry) {
            let seq = seq.unwrap_or_else(|| {
                let seq = self.next_seq.get();
                self.next_seq.set(seq + 1);
                seq
            });
            self.slots.borrow_mut().insert(key, Slot { entry, seq });
        }
    }

    /// Remove the slot at `key` if nobody holds it. Returns the removed value.
    pub fn remove_unused(&self, key: &str) -> Option<CacheValue> {
        let removed: Rc<RefCell<Option<CacheValue>>> = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&removed);
        self.update_key(key, move |entry| match entry {
            Some(entry) if entry.use_count == 0 => {
                *sink.borrow_mut() = Some(entry.value);
                None
            }
            other => other,
        });
        let value = removed.borrow_mut().take();
        if value.is_some() {
            self.effected.borrow_mut().remove(key);
            self.extracted.borrow_mut().remove(key);
            debug!(key, instance = %self.instance_id, "removed cache slot");
        }
        value
    }

    // -- delayed removal -----------------------------------------------------

    /// Schedule removal of `key` after the removal delay. A second schedule
    /// for the same key replaces the first.
    pub fn schedule_removal(&self, key: &str, on_release: Option<ReleaseFn>) {
        let deadline = Instant::now() + self.removal_delay.get();
        trace!(key, "scheduled removal");
        self.pending.borrow_mut().insert(
            key.to_owned(),
            PendingRemoval {
                deadline,
                on_release,
            },
        );
    }

    /// Cancel a scheduled removal. Returns whether one was pending.
    pub fn cancel_removal(&self, key: &str) -> bool {
        self.pending.borrow_mut().remove(key).is_some()
    }

    pub fn has_pending_removal(&self, key: &str) -> bool {
        self.pending.borrow().contains_key(key)
    }

    /// Earliest pending deadline.
    pub fn next_removal_deadline(&self) -> Option<Instant> {
        self.pending.borrow().values().map(|p| p.deadline).min()
    }

    /// Remove every slot whose deadline has passed. Returns how many slots
    /// were removed.
    pub fn flush_removals(&self) -> usize {
        self.flush_removals_at(Instant::now())
    }

    /// [`CacheEntity::flush_removals`] against an explicit clock.
    pub fn flush_removals_at(&self, now: Instant) -> usize {
        let mut expired: Vec<(String, PendingRemoval)> = {
            let mut pending = self.pending.borrow_mut();
            let keys: Vec<String> = pending
                .iter()
                .filter(|(_, p)| p.deadline <= now)
                .map(|(k, _)| k.clone())
                .collect();
            keys.into_iter()
                .filter_map(|k| pending.remove(&k).map(|p| (k, p)))
                .collect()
        };
        expired.sort_by(|(ka, a), (kb, b)| a.deadline.cmp(&b.deadline).then_with(|| ka.cmp(kb)));

        let mut removed = 0;
        for (key, removal) in expired {
            if let Some(value) = self.remove_unused(&key) {
                removed += 1;
                if let Some(on_release) = removal.on_release {
                    on_release(value, false);
                }
            }
        }
        removed
    }

    // -- effects -------------------------------------------------------------

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Start a new generation and run due removals.
    ///
    /// Effects for slots first acquired in an earlier generation may fire
    /// again after a tick. Hosts call this once per render pass; a slot
    /// revived inside its removal window only re-applies its effect once the
    /// generation has moved on.
    pub fn tick(&self) -> usize {
        self.generation.set(self.generation.get() + 1);
        self.flush_removals()
    }

    /// Record that `key`'s effect ran in the current generation. Returns
    /// `false` if it already had.
    pub fn mark_effected(&self, key: &str) -> bool {
        let generation = self.generation.get();
        let previous = self
            .effected
            .borrow_mut()
            .insert(key.to_owned(), generation);
        previous != Some(generation)
    }

    /// Claim a side-style key for this cache. Returns `false` if it was
    /// already claimed.
    pub fn claim_effect_key(&self, key: &str) -> bool {
        self.effect_keys.borrow_mut().insert(key.to_owned())
    }

    // -- extraction ----------------------------------------------------------

    pub fn mark_extracted(&self, key: &str) {
        self.extracted.borrow_mut().insert(key.to_owned());
    }

    pub fn is_extracted(&self, key: &str) -> bool {
        self.extracted.borrow().contains(key)
    }

    // -- theme keys ----------------------------------------------------------

    /// Count one more live token slot for `theme_key`.
    pub fn retain_theme_key(&self, theme_key: &str) {
        *self
            .theme_keys
            .borrow_mut()
            .entry(theme_key.to_owned())
            .or_insert(0) += 1;
    }

    /// Count one fewer. Returns `true` when the count reaches zero.
    pub fn release_theme_key(&self, theme_key: &str) -> bool {
        let mut keys = self.theme_keys.borrow_mut();
        let Some(count) = keys.get_mut(theme_key) else {
            return false;
        };
        *count = count.saturating_sub(1);
        if *count == 0 {
            keys.remove(theme_key);
            true
        } else {
            false
        }
    }

    pub fn theme_key_count(&self, theme_key: &str) -> usize {
        self.theme_keys.borrow().get(theme_key).copied().unwrap_or(0)
    }
}

impl Default for CacheEntity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntity")
            .field("instance_id", &self.instance_id)
            .field("slots", &self.len())
            .field("pending_removals", &self.pending.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Sleep until each pending removal is due and flush it, until none remain.
///
/// Every flush goes through [`CacheEntity::tick`], so each wake-up is a new
/// generation. Removals scheduled while the loop runs are picked up; once
/// nothing is pending the future completes, so callers re-spawn it after
/// releases.
pub async fn run_removal_loop(cache: StyleCache) {
    while let Some(deadline) = cache.next_removal_deadline() {
        tokio::time::sleep_until(deadline).await;
        cache.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::value::StyleCacheValue;
    use pretty_assertions::assert_eq;

    fn style(css: &str) -> CacheValue {
        CacheValue::Style(Rc::new(StyleCacheValue {
            css_text: css.to_owned(),
            token_key: String::new(),
            style_id: css.to_owned(),
            effect_styles: Vec::new(),
            client_only: false,
            order: 0,
            cache_path: String::new(),
        }))
    }

    fn css_of(entry: &CacheEntry) -> String {
        match &entry.value {
            CacheValue::Style(v) => v.css_text.clone(),
            _ => String::new(),
        }
    }

    fn put(cache: &CacheEntity, key: &str, css: &str, count: usize) {
        let value = style(css);
        cache.update_key(key, move |_| {
            Some(CacheEntry {
                use_count: count,
                value,
            })
        });
    }

    #[test]
    fn update_inserts_and_deletes() {
        let cache = CacheEntity::new();
        put(&cache, "a", ".a{}", 1);
        assert_eq!(cache.get_key("a").map(|e| e.use_count), Some(1));
        cache.update_key("a", |_| None);
        assert!(cache.get_key("a").is_none());
    }

    #[test]
    fn update_by_path() {
        let cache = CacheEntity::new();
        let path = CachePath::new().with("style").with("x");
        let value = style(".x{}");
        cache.update(&path, move |_| {
            Some(CacheEntry {
                use_count: 1,
                value,
            })
        });
        assert!(cache.get(&path).is_some());
        assert!(cache.contains_key("style%x"));
    }

    #[test]
    fn nested_updates_are_queued_in_order() {
        let cache = Rc::new(CacheEntity::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_cache = Rc::clone(&cache);
        let inner_log = Rc::clone(&log);
        let value = style("outer");
        cache.update_key("outer", move |_| {
            inner_log.borrow_mut().push("outer-start");
            let log_a = Rc::clone(&inner_log);
            let value_a = style("a");
            inner_cache.update_key("a", move |_| {
                log_a.borrow_mut().push("a");
                Some(CacheEntry {
                    use_count: 1,
                    value: value_a,
                })
            });
            let log_b = Rc::clone(&inner_log);
            inner_cache.update_key("a", move |prev| {
                log_b.borrow_mut().push("b");
                prev.map(|mut e| {
                    e.use_count += 1;
                    e
                })
            });
            inner_log.borrow_mut().push("outer-end");
            Some(CacheEntry {
                use_count: 1,
                value,
            })
        });

        assert_eq!(*log.borrow(), vec!["outer-start", "outer-end", "a", "b"]);
        assert_eq!(cache.get_key("a").map(|e| e.use_count), Some(2));
        assert!(cache.get_key("outer").is_some());
    }

    #[test]
    fn creation_order_survives_updates() {
        let cache = CacheEntity::new();
        put(&cache, "b", "b", 1);
        put(&cache, "a", "a", 1);
        put(&cache, "b", "b2", 2);
        assert_eq!(cache.keys(), vec!["b", "a"]);
        let snapshot = cache.snapshot();
        assert_eq!(css_of(&snapshot[0].1), "b2");
    }

    #[test]
    fn remove_unused_respects_use_count() {
        let cache = CacheEntity::new();
        put(&cache, "held", "h", 1);
        put(&cache, "free", "f", 0);
        assert!(cache.remove_unused("held").is_none());
        assert!(cache.remove_unused("free").is_some());
        assert!(cache.contains_key("held"));
        assert!(!cache.contains_key("free"));
    }

    #[test]
    fn flush_removes_only_expired() {
        let cache = CacheEntity::new();
        cache.set_removal_delay(Duration::from_millis(100));
        put(&cache, "a", "a", 0);
        cache.schedule_removal("a", None);
        let deadline = cache.next_removal_deadline().unwrap();

        assert_eq!(cache.flush_removals_at(deadline - Duration::from_millis(1)), 0);
        assert!(cache.contains_key("a"));
        assert_eq!(cache.flush_removals_at(deadline), 1);
        assert!(!cache.contains_key("a"));
        assert!(cache.next_removal_deadline().is_none());
    }

    #[test]
    fn flush_calls_release_hook() {
        let cache = CacheEntity::new();
        cache.set_removal_delay(Duration::ZERO);
        put(&cache, "a", ".a{}", 0);
        let released = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&released);
        cache.schedule_removal(
            "a",
            Some(Box::new(move |value: CacheValue, hot: bool| {
                if let CacheValue::Style(v) = value {
                    sink.borrow_mut().push((v.css_text.clone(), hot));
                }
            })),
        );
        cache.flush_removals();
        assert_eq!(*released.borrow(), vec![(".a{}".to_owned(), false)]);
    }

    #[test]
    fn cancelled_removal_keeps_slot() {
        let cache = CacheEntity::new();
        cache.set_removal_delay(Duration::ZERO);
        put(&cache, "a", "a", 0);
        cache.schedule_removal("a", None);
        assert!(cache.cancel_removal("a"));
        assert!(!cache.cancel_removal("a"));
        assert_eq!(cache.flush_removals(), 0);
        assert!(cache.contains_key("a"));
    }

    #[test]
    fn reacquired_slot_is_not_removed() {
        let cache = CacheEntity::new();
        cache.set_removal_delay(Duration::ZERO);
        put(&cache, "a", "a", 0);
        cache.schedule_removal("a", None);
        put(&cache, "a", "a", 1);
        assert_eq!(cache.flush_removals(), 0);
        assert!(cache.contains_key("a"));
    }

    #[test]
    fn effect_markers_reset_per_generation() {
        let cache = CacheEntity::new();
        assert!(cache.mark_effected("a"));
        assert!(!cache.mark_effected("a"));
        cache.tick();
        assert_eq!(cache.generation(), 1);
        assert!(cache.mark_effected("a"));
    }

    #[test]
    fn effect_keys_are_claimed_once() {
        let cache = CacheEntity::new();
        assert!(cache.claim_effect_key("fade"));
        assert!(!cache.claim_effect_key("fade"));
    }

    #[test]
    fn theme_key_counting() {
        let cache = CacheEntity::new();
        cache.retain_theme_key("t");
        cache.retain_theme_key("t");
        assert_eq!(cache.theme_key_count("t"), 2);
        assert!(!cache.release_theme_key("t"));
        assert!(cache.release_theme_key("t"));
        assert!(!cache.release_theme_key("t"));
    }

    #[test]
    fn instance_ids_are_unique() {
        assert_ne!(CacheEntity::new().instance_id(), CacheEntity::new().instance_id());
    }

    #[tokio::test(start_paused = true)]
    async fn removal_loop_waits_for_deadline() {
        let cache = CacheEntity::shared();
        put(&cache, "a", "a", 0);
        cache.schedule_removal("a", None);

        let started = Instant::now();
        run_removal_loop(Rc::clone(&cache)).await;
        assert!(Instant::now() - started >= DEFAULT_REMOVAL_DELAY);
        assert!(!cache.contains_key("a"));
    }
}
