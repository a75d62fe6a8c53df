//! TTL cache for catalog metadata.
//!
//! Catalog metadata changes rarely within a session, so the introspector
//! caches each result by its input key. Hits are reported back so the
//! response metadata can flag `cachedResult`.

use sqlens_core::types::{SchemaStructure, TableDetails, TriggerList};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A keyed cache whose entries expire after a fixed TTL.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh entry for `key`, or `None` when absent or expired. Expired
    /// entries are dropped on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((inserted, value)) if inserted.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.into(), (Instant::now(), value));
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// One cache per introspection operation, keyed by that operation's input.
pub struct MetadataCache {
    pub schemas: TtlCache<SchemaStructure>,
    pub tables: TtlCache<TableDetails>,
    pub triggers: TtlCache<TriggerList>,
}

impl MetadataCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            schemas: TtlCache::new(ttl),
            tables: TtlCache::new(ttl),
            triggers: TtlCache::new(ttl),
        }
    }

    /// Drop every cached entry across all three caches.
    pub fn clear(&self) {
        self.schemas.clear();
        self.tables.clear();
        self.triggers.clear();
    }
}
