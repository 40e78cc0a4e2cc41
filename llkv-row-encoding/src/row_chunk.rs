//! Append-only row allocator over fixed-capacity blocks.
//!
//! A [`RowChunk`] hands out contiguous runs of fixed-size row slots. Blocks are
//! filled in order: a reservation first takes the spare capacity of the last
//! block, then creates as many new blocks as it needs. The mutex covers only
//! that bookkeeping. The returned [`RowReservation`] keeps its blocks pinned
//! and owns its slots exclusively, so callers write rows after the lock is
//! released and disjoint reservations can be filled from different threads.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use llkv_result::{Error, Result};
use llkv_storage::{BlockRef, BufferHandle, BufferId, BufferManager};

/// One block of a [`RowChunk`] and how many of its slots are claimed.
#[derive(Debug, Clone)]
pub struct RowDataBlock {
    block: BlockRef,
    capacity: usize,
    count: usize,
}

impl RowDataBlock {
    #[inline]
    pub fn buffer_id(&self) -> BufferId {
        self.block.id()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    fn spare(&self) -> usize {
        self.capacity - self.count
    }
}

#[derive(Debug, Default)]
struct ChunkState {
    count: u64,
    blocks: Vec<RowDataBlock>,
}

/// A contiguous run of claimed slots inside one pinned block.
#[derive(Debug)]
struct AppendEntry {
    pin: BufferHandle,
    base: usize,
    count: usize,
}

/// Append-only allocator of `entry_size`-byte row slots.
#[derive(Debug)]
pub struct RowChunk {
    buffer_manager: Arc<BufferManager>,
    block_capacity: usize,
    entry_size: usize,
    block_bytes: usize,
    state: Mutex<ChunkState>,
}

impl RowChunk {
    /// An empty chunk whose blocks hold `block_capacity` rows of `entry_size`
    /// bytes each.
    pub fn new(
        buffer_manager: Arc<BufferManager>,
        block_capacity: usize,
        entry_size: usize,
    ) -> Result<Self> {
        if block_capacity == 0 || entry_size == 0 {
            return Err(Error::invariant(format!(
                "row chunk needs a non-zero block capacity and entry size \
                 (got {block_capacity} x {entry_size})"
            )));
        }
        let block_bytes = block_capacity.checked_mul(entry_size).ok_or_else(|| {
            Error::invariant(format!(
                "block of {block_capacity} x {entry_size} bytes overflows usize"
            ))
        })?;
        Ok(Self {
            buffer_manager,
            block_capacity,
            entry_size,
            block_bytes,
            state: Mutex::new(ChunkState::default()),
        })
    }

    /// An empty chunk with the same buffer manager and geometry as `other`.
    pub fn new_like(other: &RowChunk) -> Self {
        Self {
            buffer_manager: Arc::clone(&other.buffer_manager),
            block_capacity: other.block_capacity,
            entry_size: other.entry_size,
            block_bytes: other.block_bytes,
            state: Mutex::new(ChunkState::default()),
        }
    }

    #[inline]
    pub fn block_capacity(&self) -> usize {
        self.block_capacity
    }

    #[inline]
    pub fn entry_size(&self) -> usize {
        self.entry_size
    }

    pub fn buffer_manager(&self) -> &Arc<BufferManager> {
        &self.buffer_manager
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChunkState> {
        self.state.lock().expect("RowChunk state lock poisoned")
    }

    /// Total rows reserved so far.
    pub fn count(&self) -> u64 {
        self.lock().count
    }

    /// Claimed rows per block, in block order.
    pub fn block_counts(&self) -> Vec<usize> {
        self.lock().blocks.iter().map(RowDataBlock::count).collect()
    }

    /// Snapshot of the block list.
    pub fn blocks(&self) -> Vec<RowDataBlock> {
        self.lock().blocks.clone()
    }

    /// Reserve `n` contiguous rows.
    ///
    /// The reservation's `start` is the global index of its first row. On error
    /// (the buffer manager refused a block) the chunk is left unchanged.
    pub fn build(&self, n: usize) -> Result<RowReservation<'_>> {
        let mut entries = Vec::new();
        let start = {
            let mut state = self.lock();
            let start = state.count;
            if n == 0 {
                return Ok(RowReservation::new(start, self.entry_size, entries));
            }

            let from_last = state.blocks.last().map_or(0, RowDataBlock::spare).min(n);
            let mut remaining = n - from_last;

            // Every fallible step happens before the state is touched.
            let mut fresh = Vec::new();
            while remaining > 0 {
                let take = remaining.min(self.block_capacity);
                fresh.push((self.buffer_manager.allocate(self.block_bytes)?, take));
                remaining -= take;
            }

            if from_last > 0
                && let Some(last) = state.blocks.last_mut()
            {
                entries.push(AppendEntry {
                    pin: last.block.pin(),
                    base: last.count * self.entry_size,
                    count: from_last,
                });
                last.count += from_last;
            }
            for (pin, take) in fresh {
                tracing::debug!(
                    buffer_id = pin.block().id(),
                    capacity = self.block_capacity,
                    "row chunk opened block"
                );
                state.blocks.push(RowDataBlock {
                    block: Arc::clone(pin.block()),
                    capacity: self.block_capacity,
                    count: take,
                });
                entries.push(AppendEntry {
                    pin,
                    base: 0,
                    count: take,
                });
            }
            state.count += n as u64;
            start
        };
        tracing::trace!(start, rows = n, runs = entries.len(), "row chunk reserved");
        Ok(RowReservation::new(start, self.entry_size, entries))
    }

    /// Read access to every reserved row, in global row order.
    ///
    /// Takes `&mut self`, so no [`RowReservation`] can be alive.
    pub fn pinned_rows(&mut self) -> PinnedRows<'_> {
        let state = self.state.get_mut().expect("RowChunk state lock poisoned");
        let blocks = state
            .blocks
            .iter()
            .map(|b| (b.block.pin(), b.count))
            .collect();
        PinnedRows {
            entry_size: self.entry_size,
            block_capacity: self.block_capacity,
            blocks,
            _chunk: PhantomData,
        }
    }
}

/// Rows claimed by one [`RowChunk::build`] call.
///
/// Holds a pin on every block it touches until dropped.
#[derive(Debug)]
pub struct RowReservation<'a> {
    start: u64,
    entry_size: usize,
    entries: Vec<AppendEntry>,
    /// `(entry index, byte offset)` per row.
    slots: Vec<(usize, usize)>,
    _chunk: PhantomData<&'a RowChunk>,
}

impl<'a> RowReservation<'a> {
    fn new(start: u64, entry_size: usize, entries: Vec<AppendEntry>) -> Self {
        let total = entries.iter().map(|e| e.count).sum();
        let mut slots = Vec::with_capacity(total);
        for (idx, entry) in entries.iter().enumerate() {
            slots.extend((0..entry.count).map(|k| (idx, entry.base + k * entry_size)));
        }
        Self {
            start,
            entry_size,
            entries,
            slots,
            _chunk: PhantomData,
        }
    }

    /// Global index of the first reserved row.
    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of distinct block runs backing this reservation.
    #[inline]
    pub fn run_count(&self) -> usize {
        self.entries.len()
    }

    /// `(buffer id, byte offset)` of every slot, in row order.
    pub fn slot_locations(&self) -> impl Iterator<Item = (BufferId, usize)> + '_ {
        self.slots
            .iter()
            .map(|&(e, off)| (self.entries[e].pin.block().id(), off))
    }

    /// One writable `entry_size` slice per reserved row.
    pub fn slots_mut(&mut self) -> Vec<&mut [u8]> {
        let entry_size = self.entry_size;
        let entries = &self.entries;
        self.slots
            .iter()
            .map(|&(e, off)| {
                // SAFETY: the chunk hands every slot to exactly one reservation,
                // and `&mut self` keeps this call from aliasing itself. The pin
                // held in `entries` keeps the address valid.
                unsafe { entries[e].pin.slice_mut(off, entry_size) }
            })
            .collect()
    }
}

/// Read-only view over all rows of a [`RowChunk`].
#[derive(Debug)]
pub struct PinnedRows<'a> {
    entry_size: usize,
    block_capacity: usize,
    blocks: Vec<(BufferHandle, usize)>,
    _chunk: PhantomData<&'a mut RowChunk>,
}

impl PinnedRows<'_> {
    pub fn len(&self) -> usize {
        self.blocks.iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.blocks.iter().flat_map(move |(pin, count)| {
            (0..*count).map(move |k| {
                // SAFETY: the exclusive chunk borrow rules out live writers.
                unsafe { pin.slice(k * self.entry_size, self.entry_size) }
            })
        })
    }

    /// Row at global index `idx`. Every block but the last is full.
    pub fn row(&self, idx: usize) -> Option<&[u8]> {
        let (pin, count) = self.blocks.get(idx / self.block_capacity)?;
        let k = idx % self.block_capacity;
        if k >= *count {
            return None;
        }
        // SAFETY: the exclusive chunk borrow rules out live writers.
        Some(unsafe { pin.slice(k * self.entry_size, self.entry_size) })
    }
}
