//! Context sanitization.
//!
//! [`sanitize`] turns a host-supplied [`RawContext`] into the [`Context`]
//! the evaluator reads from.  It is pure and total: unsafe keys, callables,
//! and oversized data are silently dropped or truncated, never reported.
//!
//! | Limit | Value |
//! |-------|-------|
//! | nesting depth | 50 (deeper values become `{}`) |
//! | list length | 1 000 |
//! | map keys | 50 safe keys, insertion order |
//! | key length | 50 characters |
//!
//! Opaque host objects are not copied.  They are wrapped in a [`HostView`]
//! that re-applies the same key filter and callable stripping on every read.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::value::{RawContext, RawValue, Value};
use crate::error::ExprError;

pub const MAX_DEPTH: usize = 50;
pub const MAX_LIST_LEN: usize = 1_000;
pub const MAX_MAP_KEYS: usize = 50;
pub const MAX_KEY_LEN: usize = 50;

const DENIED_KEYS: [&str; 7] = [
    "prototype",
    "constructor",
    "__proto__",
    "window",
    "document",
    "eval",
    "Function",
];

/// Whether `key` may be read from a context, map, or host object.
pub fn is_safe_key(key: &str) -> bool {
    !key.starts_with("__") && !DENIED_KEYS.contains(&key) && key.chars().count() <= MAX_KEY_LEN
}

// ── HostObject ────────────────────────────────────────────────────────────────

/// Read access to a host-owned object (a UI handle, a record type, …).
///
/// Implementations may expose anything, including callables; the
/// [`HostView`] wrapper decides what an expression can actually see.
pub trait HostObject: Send + Sync {
    fn get(&self, key: &str) -> Option<RawValue>;

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Read-only, key-filtered view over a [`HostObject`].
#[derive(Clone)]
pub struct HostView {
    inner: Arc<dyn HostObject>,
    depth: usize,
}

impl HostView {
    fn new(inner: Arc<dyn HostObject>, depth: usize) -> Self {
        HostView { inner, depth }
    }

    /// Filtered property read: unsafe keys and callables are `Absent`.
    pub fn get(&self, key: &str) -> Value {
        if !is_safe_key(key) {
            return Value::Absent;
        }
        self.inner
            .get(key)
            .and_then(|raw| sanitize_value(&raw, self.depth + 1))
            .unwrap_or_default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner
            .keys()
            .into_iter()
            .filter(|k| is_safe_key(k))
            .filter(|k| !matches!(self.inner.get(k), None | Some(RawValue::Function(_))))
            .collect()
    }

    /// Writes are always rejected.
    pub fn set(&self, key: &str, _value: Value) -> Result<(), ExprError> {
        Err(ExprError::Security(format!(
            "cannot assign `{key}`: host objects are read-only"
        )))
    }

    pub fn same_object(&self, other: &HostView) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for HostView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostView")
            .field("keys", &self.keys())
            .field("depth", &self.depth)
            .finish()
    }
}

// ── Context ───────────────────────────────────────────────────────────────────

/// Sanitized variable bindings for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: IndexMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }
}

/// Build a sanitized [`Context`] from host data.  Never fails.
pub fn sanitize(raw: &RawContext) -> Context {
    Context { vars: sanitize_map(raw, 0) }
}

fn sanitize_map(map: &IndexMap<String, RawValue>, depth: usize) -> IndexMap<String, Value> {
    if depth > MAX_DEPTH {
        return IndexMap::new();
    }
    map.iter()
        .filter(|(k, _)| is_safe_key(k))
        .take(MAX_MAP_KEYS)
        .filter_map(|(k, v)| sanitize_value(v, depth + 1).map(|v| (k.clone(), v)))
        .collect()
}

/// `None` for callables, which are removed rather than nulled.
fn sanitize_value(raw: &RawValue, depth: usize) -> Option<Value> {
    if raw.is_callable() {
        return None;
    }
    if depth > MAX_DEPTH {
        return Some(Value::Map(IndexMap::new()));
    }
    Some(match raw {
        RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(*b),
        RawValue::Number(n) => Value::Number(*n),
        RawValue::Str(s) => Value::Str(s.clone()),
        // Callable elements keep their slot so indices stay stable.
        RawValue::List(items) => Value::List(
            items
                .iter()
                .take(MAX_LIST_LEN)
                .map(|v| sanitize_value(v, depth + 1).unwrap_or_default())
                .collect(),
        ),
        RawValue::Map(map) => Value::Map(sanitize_map(map, depth)),
        RawValue::Object(obj) => Value::Host(HostView::new(Arc::clone(obj), depth)),
        RawValue::Function(_) => return None,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
