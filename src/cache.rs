//! LRU cache of decoded documents

use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;

use crate::document::PdfDocument;

pub const DEFAULT_CACHE_SIZE: usize = 8;

/// Documents decoded during one render pass, keyed by resolved path.
///
/// Several blocks embedding the same file only decode it once. The cache is
/// dropped with the pass, so edits to a PDF are picked up next time.
pub struct DocumentCache {
    cache: LruCache<String, Rc<dyn PdfDocument>>,
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl DocumentCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a cached document, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, path: &str) -> Option<Rc<dyn PdfDocument>> {
        self.cache.get(path).cloned()
    }

    pub fn insert(&mut self, path: String, doc: Rc<dyn PdfDocument>) {
        self.cache.put(path, doc);
    }

    #[cfg(test)]
    fn contains(&self, path: &str) -> bool {
        self.cache.contains(path)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.cache.len()
    }
}
