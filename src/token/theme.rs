//! Themes: ordered chains of derivative functions with memoized output.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::value::{Token, TokenValue};
use crate::error::StyleError;
use crate::hash::hash;

/// A derivative maps a seed (and the previous derivative's output, if any)
/// to a derived token.
pub type DerivativeFn = Rc<dyn Fn(&Token, Option<&Token>) -> Result<Token, StyleError>>;

/// Post-processing applied to a merged token before component overrides.
pub type TokenFormatter = Rc<dyn Fn(Token) -> Token>;

/// Derivation results kept per theme.
const DERIVE_CACHE_SIZE: usize = 20;

/// Themes kept by [`create_theme`].
const THEME_CACHE_SIZE: usize = 20;

thread_local! {
    static NEXT_THEME_ID: Cell<u64> = const { Cell::new(0) };
    static THEME_CACHE: RefCell<Vec<(Vec<*const ()>, Theme)>> = const { RefCell::new(Vec::new()) };
}

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

/// An ordered sequence of derivatives with a stable id.
///
/// Cloning a `Theme` is cheap and keeps the same id and memo.
#[derive(Clone)]
pub struct Theme {
    inner: Rc<ThemeInner>,
}

struct ThemeInner {
    id: u64,
    derivatives: Vec<DerivativeFn>,
    memo: RefCell<DeriveMemo>,
}

impl Theme {
    /// Build a theme with a fresh id. Prefer [`create_theme`], which reuses
    /// the theme for an identical derivative list.
    pub fn new(derivatives: Vec<DerivativeFn>) -> Self {
        let id = NEXT_THEME_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self {
            inner: Rc::new(ThemeInner {
                id,
                derivatives,
                memo: RefCell::new(DeriveMemo::default()),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn derivative_count(&self) -> usize {
        self.inner.derivatives.len()
    }

    /// Run the derivative chain over `seed`.
    ///
    /// Results are memoized by the flattened seed; a second call with an
    /// equal seed returns the same `Rc` without running any derivative.
    pub fn derive(&self, seed: &Token) -> Result<Rc<Token>, StyleError> {
        let memo_key = hash(&seed.flatten());
        if let Some(hit) = self.inner.memo.borrow_mut().get(&memo_key) {
            return Ok(hit);
        }

        let mut result: Option<Token> = None;
        for derivative in &self.inner.derivatives {
            let next = derivative(seed, result.as_ref()).map_err(|err| StyleError::Derivation {
                theme_id: self.id(),
                message: err.to_string(),
            })?;
            result = Some(next);
        }
        let derived = Rc::new(result.unwrap_or_else(|| seed.clone()));
        trace!(theme = self.id(), key = %memo_key, "derived token");
        self.inner
            .memo
            .borrow_mut()
            .insert(memo_key, Rc::clone(&derived));
        Ok(derived)
    }

    fn same_derivatives(&self, pointers: &[*const ()]) -> bool {
        self.inner.derivatives.len() == pointers.len()
            && self
                .inner
                .derivatives
                .iter()
                .zip(pointers)
                .all(|(d, p)| derivative_ptr(d) == *p)
    }
}

impl PartialEq for Theme {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Theme")
            .field("id", &self.id())
            .field("derivatives", &self.derivative_count())
            .finish()
    }
}

fn derivative_ptr(derivative: &DerivativeFn) -> *const () {
    Rc::as_ptr(derivative) as *const ()
}

/// Return the theme for this exact derivative list, creating it on first use.
///
/// Identity is by derivative pointer: passing clones of the same `Rc`s
/// yields the same theme (and therefore the same id and memo).
pub fn create_theme(derivatives: Vec<DerivativeFn>) -> Theme {
    let pointers: Vec<*const ()> = derivatives.iter().map(derivative_ptr).collect();
    THEME_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some((_, theme)) = cache.iter().find(|(_, t)| t.same_derivatives(&pointers)) {
            return theme.clone();
        }
        let theme = Theme::new(derivatives);
        if cache.len() >= THEME_CACHE_SIZE {
            cache.remove(0);
        }
        cache.push((pointers, theme.clone()));
        theme
    })
}

// ---------------------------------------------------------------------------
// DeriveMemo
// ---------------------------------------------------------------------------

/// Small LRU keyed by seed hash.
#[derive(Default)]
struct DeriveMemo {
    entries: HashMap<String, (Rc<Token>, u64)>,
    clock: u64,
}

impl DeriveMemo {
    fn get(&mut self, key: &str) -> Option<Rc<Token>> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(key).map(|(token, used)| {
            *used = clock;
            Rc::clone(token)
        })
    }

    fn insert(&mut self, key: String, token: Rc<Token>) {
        if self.entries.len() >= DERIVE_CACHE_SIZE && !self.entries.contains_key(&key) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (_, used))| *used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        self.clock += 1;
        self.entries.insert(key, (token, self.clock));
    }
}

// ---------------------------------------------------------------------------
// Final token
// ---------------------------------------------------------------------------

/// Per-component override: a token slice, optionally with its own theme.
#[derive(Debug, Clone, Default)]
pub struct ComponentOverride {
    pub theme: Option<Theme>,
    pub token: Token,
}

impl ComponentOverride {
    pub fn new(token: Token) -> Self {
        Self { theme: None, token }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }
}

/// Global token overrides plus per-component slices.
#[derive(Debug, Clone, Default)]
pub struct TokenOverrides {
    pub token: Token,
    pub components: BTreeMap<String, ComponentOverride>,
}

impl TokenOverrides {
    pub fn new(token: Token) -> Self {
        Self {
            token,
            components: BTreeMap::new(),
        }
    }

    pub fn with_component(mut self, name: impl Into<String>, component: ComponentOverride) -> Self {
        self.components.insert(name.into(), component);
        self
    }

    /// Stable string form used in token cache paths.
    pub fn flatten(&self) -> String {
        let mut out = self.token.flatten();
        for (name, component) in &self.components {
            out.push_str(name);
            if let Some(theme) = &component.theme {
                out.push_str(&theme.id().to_string());
            }
            out.push_str(&component.token.flatten());
        }
        out
    }
}

/// Derive, apply overrides, format, then resolve component overrides.
///
/// Overrides win over derived values. A component override that carries its
/// own theme is derived again from the merged global token plus its slice.
pub fn compute_final_token(
    theme: &Theme,
    seed: &Token,
    overrides: &TokenOverrides,
    formatter: Option<&TokenFormatter>,
) -> Result<Token, StyleError> {
    let derived = theme.derive(seed)?;
    let mut merged = derived.merge(&overrides.token);
    if let Some(format) = formatter {
        merged = format(merged);
    }

    for (name, component) in &overrides.components {
        let resolved = match &component.theme {
            Some(component_theme) => {
                let component_seed = merged.merge(&component.token);
                let nested = TokenOverrides::new(component.token.clone());
                compute_final_token(component_theme, &component_seed, &nested, formatter)?
            }
            None => component.token.clone(),
        };
        merged.insert(name.clone(), TokenValue::Map(resolved));
    }
    Ok(merged)
}

/// A ready-made formatter rounding every number to six decimal places,
/// which hides float noise from derived arithmetic.
pub fn round_numbers(token: Token) -> Token {
    token
        .iter()
        .map(|(key, value)| {
            let value = match value {
                TokenValue::Num(n) => TokenValue::Num((n * 1e6).round() / 1e6),
                TokenValue::Map(nested) => TokenValue::Map(round_numbers(nested.clone())),
                other => other.clone(),
            };
            (key.to_owned(), value)
        })
        .collect()
}
