//! Cached per-site fix resolution.
//!
//! [`FixIndex`] wraps a [`SiteIndex`] with two caches:
//!
//! - host → matching ordinals
//! - ordinal → parsed fix (or the parse failure)
//!
//! Both are cleared together when the index sits idle for the eviction
//! interval, or on [`FixIndex::clear_caches`]. Results are identical with
//! or without cached entries.

use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{FixMaterializeError, FixParseError};
use crate::eviction::{Evictable, EvictionTimer};
use crate::fix::FixRecord;
use crate::format::RecordLayout;
use crate::index::{BuildReport, SiteIndex};

type FixSlot<F> = Result<Arc<F>, FixParseError>;

struct FixCaches<F> {
    lookups: Mutex<AHashMap<String, Arc<[u32]>>>,
    fixes: Mutex<AHashMap<u32, FixSlot<F>>>,
}

impl<F> Default for FixCaches<F> {
    fn default() -> Self {
        Self {
            lookups: Mutex::new(AHashMap::new()),
            fixes: Mutex::new(AHashMap::new()),
        }
    }
}

impl<F: Send + Sync + 'static> Evictable for FixCaches<F> {
    fn evict(&self) {
        self.lookups.lock().clear();
        self.fixes.lock().clear();
    }
}

/// Number of entries held by each cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub lookups: usize,
    pub fixes: usize,
}

/// Domain index of one fix category, resolving hosts to parsed fixes.
pub struct FixIndex<F: FixRecord> {
    index: SiteIndex,
    caches: Arc<FixCaches<F>>,
    timer: EvictionTimer,
}

impl<F: FixRecord> FixIndex<F> {
    /// Index base and override text of `F`'s category.
    pub fn build(base: Arc<str>, overrides: Option<Arc<str>>, idle: Duration) -> (Self, BuildReport) {
        let (index, report) = SiteIndex::build(F::CATEGORY, RecordLayout::Blocks, base, overrides);
        (Self::from_index(index, idle), report)
    }

    /// Wrap an already built index.
    pub fn from_index(index: SiteIndex, idle: Duration) -> Self {
        Self {
            index,
            caches: Arc::new(FixCaches::default()),
            timer: EvictionTimer::new(idle),
        }
    }

    /// The underlying domain index.
    pub fn index(&self) -> &SiteIndex {
        &self.index
    }

    /// Ordinals of the records matching a normalized host, ascending.
    pub fn lookup(&self, host: &str) -> Arc<[u32]> {
        self.sweep();
        if let Some(hit) = self.caches.lookups.lock().get(host) {
            return Arc::clone(hit);
        }

        let ordinals: Arc<[u32]> = self.index.lookup(host).into();
        self.caches
            .lookups
            .lock()
            .insert(host.to_string(), Arc::clone(&ordinals));
        self.touch();
        ordinals
    }

    /// Parse (or fetch from cache) the fix with the given ordinal.
    pub fn fix(&self, ordinal: u32) -> Result<Arc<F>, FixMaterializeError> {
        self.sweep();
        let cached = self.caches.fixes.lock().get(&ordinal).cloned();
        let slot = match cached {
            Some(slot) => slot,
            None => {
                let slot = match self.index.record(ordinal) {
                    Some(text) => F::parse(text).map(Arc::new),
                    None => Err(FixParseError::MissingRecord),
                };
                self.caches.fixes.lock().insert(ordinal, slot.clone());
                self.touch();
                slot
            }
        };

        slot.map_err(|source| FixMaterializeError {
            category: F::CATEGORY,
            ordinal,
            source,
        })
    }

    /// All fixes matching a normalized host, in declaration order.
    ///
    /// Records that fail to parse are logged and left out.
    pub fn fixes_for_host(&self, host: &str) -> Vec<Arc<F>> {
        self.lookup(host)
            .iter()
            .filter_map(|&ordinal| match self.fix(ordinal) {
                Ok(fix) => Some(fix),
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            })
            .collect()
    }

    /// Drop every cached lookup and fix.
    pub fn clear_caches(&self) {
        self.timer.cancel();
        self.caches.evict();
    }

    /// Current cache sizes.
    pub fn cache_stats(&self) -> CacheStats {
        self.sweep();
        CacheStats {
            lookups: self.caches.lookups.lock().len(),
            fixes: self.caches.fixes.lock().len(),
        }
    }

    /// Stop the idle timer; cached entries stay until the next clear.
    pub fn cancel_eviction(&self) {
        self.timer.cancel();
    }

    fn sweep(&self) {
        if self.timer.take_expired() {
            log::debug!("{}: idle deadline passed, evicting caches", F::CATEGORY);
            self.caches.evict();
        }
    }

    fn touch(&self) {
        self.timer.arm(Arc::downgrade(&self.caches));
    }
}

impl<F: FixRecord> std::fmt::Debug for FixIndex<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixIndex")
            .field("category", &F::CATEGORY)
            .field("records", &self.index.len())
            .field("timer", &self.timer)
            .finish()
    }
}
