//! Materialized post-page cache.
//!
//! Pages for slugs that were never requested before are generated on
//! demand: the first request registers a `Building` entry and is answered
//! with a placeholder while a background task fetches and renders the
//! page. Later requests serve the stored result. A slug the content
//! source does not know is remembered as `Missing`.

mod lock;

use std::num::NonZeroUsize;
use std::sync::RwLock;

use lru::LruCache;
use metrics::counter;

use lock::rw_write;

const SOURCE: &str = "cache::pages";

/// State of one slug in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEntry {
    /// A materialization task is in flight.
    Building,
    /// Rendered page HTML, served as-is.
    Ready(String),
    /// The content source reported no such document.
    Missing,
}

/// LRU store of materialized post pages, keyed by slug.
pub struct PageCache {
    entries: RwLock<LruCache<String, PageEntry>>,
}

impl PageCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Current state of `slug`, promoting the entry on hit.
    pub fn lookup(&self, slug: &str) -> Option<PageEntry> {
        let mut entries = rw_write(&self.entries, SOURCE, "lookup");
        match entries.get(slug) {
            Some(entry) => {
                counter!("spacetravelling_page_cache_hit_total").increment(1);
                Some(entry.clone())
            }
            None => {
                counter!("spacetravelling_page_cache_miss_total").increment(1);
                None
            }
        }
    }

    /// Register a build for `slug`. Returns true for the single caller
    /// that installed the `Building` entry; false when any entry already
    /// exists, so concurrent requests never race a second task.
    pub fn begin_build(&self, slug: &str) -> bool {
        let mut entries = rw_write(&self.entries, SOURCE, "begin_build");
        if entries.contains(slug) {
            return false;
        }
        if let Some((evicted, _)) = entries.push(slug.to_string(), PageEntry::Building) {
            if evicted != slug {
                counter!("spacetravelling_page_cache_evict_total").increment(1);
            }
        }
        true
    }

    pub fn fill_ready(&self, slug: &str, html: String) {
        self.store(slug, PageEntry::Ready(html), "fill_ready");
    }

    pub fn fill_missing(&self, slug: &str) {
        self.store(slug, PageEntry::Missing, "fill_missing");
    }

    /// Drop whatever is stored for `slug`; the next request starts over.
    pub fn clear(&self, slug: &str) {
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        entries.pop(slug);
    }

    fn store(&self, slug: &str, entry: PageEntry, op: &'static str) {
        let mut entries = rw_write(&self.entries, SOURCE, op);
        if let Some((evicted, _)) = entries.push(slug.to_string(), entry) {
            if evicted != slug {
                counter!("spacetravelling_page_cache_evict_total").increment(1);
            }
        }
    }
}
