//! Bounded cache of compiled `format` patterns.

use std::{num::NonZeroUsize, sync::Arc};

use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;

/// Default maximum number of cached compiled regexes.
const DEFAULT_CAPACITY: usize = 128;

/// Size-bounded cache for the patterns used by `format` rules.
pub struct RegexCache {
    /// Compiled patterns keyed by source.
    map: Mutex<LruCache<String, Arc<Regex>>>,
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RegexCache {
    /// Create a new cache with default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new cache with a specific capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            map: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Get a compiled regex for `pattern`, compiling and caching on miss.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Arc<Regex>, regex::Error> {
        if let Some(found) = self.map.lock().get(pattern).cloned() {
            return Ok(found);
        }

        // Compile outside the lock; a racing insert of the same pattern is harmless.
        let compiled = Arc::new(Regex::new(pattern)?);
        self.map.lock().put(pattern.to_string(), compiled.clone());
        Ok(compiled)
    }
}
