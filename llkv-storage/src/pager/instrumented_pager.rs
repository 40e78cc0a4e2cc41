use crate::pager::{BatchGet, BatchPut, GetResult, Pager};
use crate::types::PhysicalKey;
use llkv_result::Result;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe container for I/O statistics.
#[derive(Debug, Default)]
pub struct IoStats {
    // --- Total individual items ---
    pub physical_gets: AtomicU64,
    pub physical_puts: AtomicU64,
    pub physical_frees: AtomicU64,
    pub physical_allocs: AtomicU64,

    // --- Total batch operations (i.e., calls to the pager) ---
    pub put_batches: AtomicU64,

    // --- Write classifications ---
    /// First write to a key obtained from `alloc_many`.
    pub fresh_puts: AtomicU64,
    /// Repeated write to a key that was already written.
    pub overwritten_puts: AtomicU64,
    /// Write to a key the pager never allocated.
    pub unknown_puts: AtomicU64,
    pub put_bytes: AtomicU64,
}

impl IoStats {
    fn record_put(&self, classification: KeyWriteClassification, bytes: usize) {
        let counter = match classification {
            KeyWriteClassification::Fresh => &self.fresh_puts,
            KeyWriteClassification::Overwrite => &self.overwritten_puts,
            KeyWriteClassification::Unknown => &self.unknown_puts,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.put_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Capture a point-in-time snapshot of the accumulated metrics.
    pub fn snapshot(&self) -> IoStatsSnapshot {
        IoStatsSnapshot {
            physical_gets: self.physical_gets.load(Ordering::Relaxed),
            physical_puts: self.physical_puts.load(Ordering::Relaxed),
            physical_frees: self.physical_frees.load(Ordering::Relaxed),
            physical_allocs: self.physical_allocs.load(Ordering::Relaxed),
            put_batches: self.put_batches.load(Ordering::Relaxed),
            fresh_puts: self.fresh_puts.load(Ordering::Relaxed),
            overwritten_puts: self.overwritten_puts.load(Ordering::Relaxed),
            unknown_puts: self.unknown_puts.load(Ordering::Relaxed),
            put_bytes: self.put_bytes.load(Ordering::Relaxed),
        }
    }
}

/// Immutable copy of [`IoStats`] counters captured at a specific moment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStatsSnapshot {
    pub physical_gets: u64,
    pub physical_puts: u64,
    pub physical_frees: u64,
    pub physical_allocs: u64,
    pub put_batches: u64,
    pub fresh_puts: u64,
    pub overwritten_puts: u64,
    pub unknown_puts: u64,
    pub put_bytes: u64,
}

impl IoStatsSnapshot {
    /// Compute the delta between two snapshots (`newer - older`). Saturates at zero.
    pub fn delta_since(&self, older: &Self) -> Self {
        macro_rules! delta {
            ($field:ident) => {
                self.$field.saturating_sub(older.$field)
            };
        }
        Self {
            physical_gets: delta!(physical_gets),
            physical_puts: delta!(physical_puts),
            physical_frees: delta!(physical_frees),
            physical_allocs: delta!(physical_allocs),
            put_batches: delta!(put_batches),
            fresh_puts: delta!(fresh_puts),
            overwritten_puts: delta!(overwritten_puts),
            unknown_puts: delta!(unknown_puts),
            put_bytes: delta!(put_bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyWriteClassification {
    Fresh,
    Overwrite,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyState {
    Allocated,
    Written,
}

#[derive(Debug, Default)]
struct KeyTracker {
    state: Mutex<FxHashMap<PhysicalKey, KeyState>>,
}

impl KeyTracker {
    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<PhysicalKey, KeyState>> {
        self.state.lock().expect("KeyTracker lock poisoned")
    }

    fn mark_allocated(&self, key: PhysicalKey) {
        self.lock().insert(key, KeyState::Allocated);
    }

    fn mark_freed(&self, key: &PhysicalKey) {
        self.lock().remove(key);
    }

    fn classify_put(&self, key: PhysicalKey) -> KeyWriteClassification {
        let mut guard = self.lock();
        match guard.get_mut(&key) {
            Some(state @ KeyState::Allocated) => {
                *state = KeyState::Written;
                KeyWriteClassification::Fresh
            }
            Some(KeyState::Written) => KeyWriteClassification::Overwrite,
            None => {
                // Track the key so subsequent writes are treated as overwrites.
                guard.insert(key, KeyState::Written);
                KeyWriteClassification::Unknown
            }
        }
    }
}

/// A wrapper around any Pager implementation that counts I/O operations.
///
/// Checkpoint tests use the write classification to prove that every shared
/// block is written exactly once (`overwritten_puts == 0`).
#[derive(Debug)]
pub struct InstrumentedPager<P: Pager> {
    inner: P,
    stats: Arc<IoStats>,
    tracker: KeyTracker,
}

impl<P> InstrumentedPager<P>
where
    P: Pager,
{
    /// Wraps a Pager and returns the instrumented version along with a handle
    /// to its statistics.
    pub fn new(inner: P) -> (Self, Arc<IoStats>) {
        let stats = Arc::new(IoStats::default());
        (
            Self {
                inner,
                stats: Arc::clone(&stats),
                tracker: KeyTracker::default(),
            },
            stats,
        )
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P> Pager for InstrumentedPager<P>
where
    P: Pager,
{
    type Blob = P::Blob;

    fn batch_get(&self, gets: &[BatchGet]) -> Result<Vec<GetResult<Self::Blob>>> {
        self.stats
            .physical_gets
            .fetch_add(gets.len() as u64, Ordering::Relaxed);
        self.inner.batch_get(gets)
    }

    fn batch_put(&self, puts: &[BatchPut]) -> Result<()> {
        self.stats
            .physical_puts
            .fetch_add(puts.len() as u64, Ordering::Relaxed);
        self.stats.put_batches.fetch_add(1, Ordering::Relaxed);
        for put in puts {
            match put {
                BatchPut::Raw { key, bytes } => {
                    let classification = self.tracker.classify_put(*key);
                    self.stats.record_put(classification, bytes.len());
                }
            }
        }
        self.inner.batch_put(puts)
    }

    fn alloc_many(&self, count: usize) -> Result<Vec<PhysicalKey>> {
        self.stats
            .physical_allocs
            .fetch_add(count as u64, Ordering::Relaxed);
        let keys = self.inner.alloc_many(count)?;
        for key in &keys {
            self.tracker.mark_allocated(*key);
        }
        Ok(keys)
    }

    fn free_many(&self, keys: &[PhysicalKey]) -> Result<()> {
        self.stats
            .physical_frees
            .fetch_add(keys.len() as u64, Ordering::Relaxed);
        for key in keys {
            self.tracker.mark_freed(key);
        }
        self.inner.free_many(keys)
    }
}
