//! Bounded decode cache and cache-key derivation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::CachedImageResult;
use crate::constants::INLINE_CACHE_KEY_LIMIT;

/// Derive the cache key for an image reference.
///
/// Short references (paths, URLs) are used verbatim. Long ones, typically
/// embedded image data, are reduced to a truncated SHA-256 digest so keys stay
/// small.
pub fn cache_key(reference: &str) -> String {
    if reference.len() <= INLINE_CACHE_KEY_LIMIT {
        return reference.to_string();
    }
    let digest = Sha256::digest(reference.as_bytes());
    let hex: String = digest[..16].iter().map(|b| format!("{:02x}", b)).collect();
    format!("img_{}", hex)
}

/// Completed load results, evicted in insertion order (FIFO).
///
/// Reading an entry does not refresh its position; the oldest insertion is
/// always the first to go once the cache is full.
#[derive(Debug)]
pub struct DecodeCache {
    /// Results by cache key
    entries: HashMap<String, Arc<CachedImageResult>>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
    /// Maximum number of entries
    max_size: usize,
}

impl DecodeCache {
    /// Create an empty cache holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    /// Get a cached result.
    pub fn get(&self, key: &str) -> Option<Arc<CachedImageResult>> {
        self.entries.get(key).cloned()
    }

    /// Check if a key is cached.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a result, evicting the oldest insertion when full.
    ///
    /// Re-inserting an existing key replaces the value and keeps its position.
    pub fn insert(&mut self, key: String, value: Arc<CachedImageResult>) {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return;
        }
        if self.max_size == 0 {
            return;
        }
        while self.entries.len() >= self.max_size {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            log::debug!("Decode cache evicted '{}'", oldest);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the capacity, evicting the oldest entries if it shrank.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        while self.entries.len() > max_size {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    /// Keys in insertion order, oldest first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        self.order.clear();
        if count > 0 {
            log::info!("Cleared decode cache ({} entries)", count);
        }
    }
}
