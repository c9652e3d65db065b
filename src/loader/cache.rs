//! Cache of loaded ATNs keyed by grammar identity
//!
//! Loading and optimizing is done once per grammar; sessions share the result
//! as `Arc<Atn>`. Each entry remembers a fingerprint of the words it was loaded
//! from, so asking for the same grammar with changed content reloads it.
//!
//! The cache is a plain object. Hosts that share it between threads wrap it in
//! a mutex.

use super::errors::LoadError;
use super::{load_words, LoaderOptions};
use crate::atn::Atn;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: u64,
    atn: Arc<Atn>,
}

#[derive(Debug, Default)]
pub struct AtnCache {
    entries: FxHashMap<String, CacheEntry>,
    options: LoaderOptions,
}

/// Content fingerprint of a serialized ATN
pub fn fingerprint(words: &[u16]) -> u64 {
    let mut hasher = FxHasher::default();
    words.hash(&mut hasher);
    hasher.finish()
}

impl AtnCache {
    pub fn new(options: LoaderOptions) -> Self {
        AtnCache {
            entries: FxHashMap::default(),
            options,
        }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// The cached ATN for `key`, loading it from `words` on a miss or when
    /// the content changed since it was cached
    pub fn get_or_load(&mut self, key: &str, words: &[u16]) -> Result<Arc<Atn>, LoadError> {
        let fingerprint = fingerprint(words);
        if let Some(entry) = self.entries.get(key) {
            if entry.fingerprint == fingerprint {
                trace!(key, "ATN cache hit");
                return Ok(Arc::clone(&entry.atn));
            }
            trace!(key, "ATN cache stale");
        } else {
            trace!(key, "ATN cache miss");
        }

        let atn = Arc::new(load_words(words, &self.options)?);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                fingerprint,
                atn: Arc::clone(&atn),
            },
        );
        Ok(atn)
    }

    pub fn get(&self, key: &str) -> Option<Arc<Atn>> {
        self.entries.get(key).map(|entry| Arc::clone(&entry.atn))
    }

    /// Drop the entry for a grammar whose source changed
    pub fn invalidate(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            trace!(key, "ATN cache invalidated");
        }
        removed
    }

    /// Drop the entry for a grammar that is no longer used
    pub fn release(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            trace!(key, "ATN cache entry released");
        }
        removed
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
}
