use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry<V> {
    value: V,
    expires_unix: u64,
}

/// String-keyed values with per-entry expiry. Expired entries read as absent
/// and are dropped lazily or by `purge_expired`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TtlCache<V> {
    entries: BTreeMap<String, Entry<V>>,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: V, ttl_s: u64, now: u64) {
        self.entries.insert(
            key.into(),
            Entry {
                value,
                expires_unix: now.saturating_add(ttl_s),
            },
        );
    }

    pub fn get(&self, key: &str, now: u64) -> Option<V> {
        self.entries
            .get(key)
            .filter(|e| e.expires_unix > now)
            .map(|e| e.value.clone())
    }

    /// Removes and returns a live entry. Single-use tokens go through here.
    pub fn take(&mut self, key: &str, now: u64) -> Option<V> {
        let e = self.entries.remove(key)?;
        (e.expires_unix > now).then_some(e.value)
    }

    pub fn purge_expired(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_unix > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
