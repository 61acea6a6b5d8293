//! Parsed-expression cache.
//!
//! A bounded LRU map from source text to shared AST.  Backed by an
//! [`IndexMap`] kept in recency order: the front is the least recently
//! used entry, the back the most recent.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::expr::Expr;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
pub struct ExprCache {
    entries: IndexMap<String, Arc<Expr>>,
    capacity: usize,
    stats: CacheStats,
}

impl Default for ExprCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ExprCache {
    /// A capacity of zero disables caching: every `get` misses.
    pub fn new(capacity: usize) -> Self {
        ExprCache {
            entries: IndexMap::with_capacity(capacity),
            capacity,
            stats: CacheStats::default(),
        }
    }

    /// Look up `text`, marking it most recently used on a hit.
    pub fn get(&mut self, text: &str) -> Option<Arc<Expr>> {
        match self.entries.shift_remove_entry(text) {
            Some((key, ast)) => {
                self.stats.hits += 1;
                tracing::trace!(expr = %key, "expression cache hit");
                self.entries.insert(key, Arc::clone(&ast));
                Some(ast)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Insert `ast` as most recently used, evicting the least recently
    /// used entry when full.
    pub fn put(&mut self, text: impl Into<String>, ast: Arc<Expr>) {
        if self.capacity == 0 {
            return;
        }
        let text = text.into();
        if self.entries.shift_remove(&text).is_none() && self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                self.stats.evictions += 1;
                tracing::debug!(expr = %evicted, "expression cache eviction");
            }
        }
        self.entries.insert(text, ast);
    }

    /// Presence check that does not touch recency or counters.
    pub fn contains(&self, text: &str) -> bool {
        self.entries.contains_key(text)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
