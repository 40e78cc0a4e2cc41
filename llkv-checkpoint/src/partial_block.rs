//! Packing of small segments into shared disk blocks.
//!
//! A [`PartialBlockForCheckpoint`] owns one block-sized in-memory buffer that
//! segments of any column are copied into. The [`PartialBlockManager`] keeps
//! the open (partially filled) blocks ordered by free space and hands them out
//! through [`PartialBlockAllocation`]s. A block taken out of the manager is
//! owned exclusively by its allocation until it is registered back, so bytes
//! are copied without holding the manager's lock.
//!
//! Each block is written to the pager exactly once, when it is flushed.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::{Arc, Mutex};

use llkv_result::{Error, Result};
use llkv_storage::{
    BLOCK_SIZE, BatchPut, BufferHandle, BufferManager, INVALID_BLOCK, Pager, PhysicalKey,
    constants::align_segment_offset,
};

use crate::segment::{SegmentArena, SegmentId};

/// Run-time configuration for partial block packing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialBlockConfig {
    /// Size of every on-disk block.
    pub block_size: usize,
    /// Largest allocation that may share a block with others. Larger
    /// allocations always get a fresh block.
    pub max_partial_block_size: usize,
    /// A block holding this many segments is flushed even if space remains.
    pub max_use_count: usize,
}

impl Default for PartialBlockConfig {
    fn default() -> Self {
        Self::with_block_size(BLOCK_SIZE)
    }
}

impl PartialBlockConfig {
    /// Defaults scaled to `block_size`: sharing allowed up to 80% of a block.
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size,
            max_partial_block_size: block_size / 5 * 4,
            max_use_count: 128,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.block_size == 0 || u32::try_from(self.block_size).is_err() {
            return Err(Error::invariant(format!(
                "block size {} must be non-zero and fit in u32",
                self.block_size
            )));
        }
        if self.max_partial_block_size > self.block_size {
            return Err(Error::invariant(format!(
                "max partial block size {} exceeds block size {}",
                self.max_partial_block_size, self.block_size
            )));
        }
        if self.max_use_count == 0 {
            return Err(Error::invariant("max use count must be at least 1"));
        }
        Ok(())
    }

    /// Free space below which a block is not worth keeping open.
    #[inline]
    fn min_useful_free_space(&self) -> usize {
        self.block_size - self.max_partial_block_size
    }
}

/// Where the next allocation inside a block goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialBlockState {
    pub block_id: PhysicalKey,
    pub block_size: usize,
    /// First free byte (always aligned).
    pub offset: usize,
    /// Segments placed in the block so far.
    pub block_use_count: usize,
}

/// One segment stored inside a partial block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailSegment {
    pub column_idx: usize,
    pub segment: SegmentId,
    pub offset: usize,
}

/// A block being filled during a checkpoint.
///
/// Building while it holds tail segments; flushed (and inert) once emptied.
/// Invariant: occupied + uninitialized + free == block size.
#[derive(Debug)]
pub struct PartialBlockForCheckpoint {
    state: PartialBlockState,
    buffer: Option<BufferHandle>,
    uninitialized: Vec<Range<usize>>,
    segments: Vec<TailSegment>,
}

impl PartialBlockForCheckpoint {
    /// A block backed by `buffer` whose first member is `segment` at offset 0.
    pub fn new(
        buffer: BufferHandle,
        state: PartialBlockState,
        column_idx: usize,
        segment: SegmentId,
    ) -> Result<Self> {
        if buffer.len() != state.block_size {
            return Err(Error::invariant(format!(
                "partial block buffer of {} bytes for a {}-byte block",
                buffer.len(),
                state.block_size
            )));
        }
        if state.offset != 0 {
            return Err(Error::invariant(format!(
                "new partial block starts at offset {}",
                state.offset
            )));
        }
        let mut block = Self {
            state,
            buffer: Some(buffer),
            uninitialized: Vec::new(),
            segments: Vec::new(),
        };
        block.add_segment_to_tail(column_idx, segment, 0);
        Ok(block)
    }

    #[inline]
    pub fn state(&self) -> &PartialBlockState {
        &self.state
    }

    #[inline]
    pub fn is_flushed(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn segments(&self) -> &[TailSegment] {
        &self.segments
    }

    #[inline]
    pub fn uninitialized_regions(&self) -> &[Range<usize>] {
        &self.uninitialized
    }

    pub fn add_uninitialized_region(&mut self, start: usize, end: usize) {
        if start < end {
            self.uninitialized.push(start..end);
        }
    }

    pub fn add_segment_to_tail(&mut self, column_idx: usize, segment: SegmentId, offset: usize) {
        self.segments.push(TailSegment {
            column_idx,
            segment,
            offset,
        });
    }

    fn handle(&self) -> Result<&BufferHandle> {
        self.buffer
            .as_ref()
            .ok_or_else(|| Error::invariant("partial block was already flushed"))
    }

    /// Copy `bytes` into the block at `offset`.
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let block_size = self.state.block_size;
        let handle = self.handle()?;
        if offset
            .checked_add(bytes.len())
            .is_none_or(|end| end > block_size)
        {
            return Err(Error::invariant(format!(
                "{} bytes at offset {offset} overrun a {block_size}-byte block",
                bytes.len()
            )));
        }
        // SAFETY: `&mut self` is the only access path to this block's buffer
        // while it is building.
        unsafe { handle.slice_mut(offset, bytes.len()) }.copy_from_slice(bytes);
        Ok(())
    }

    /// Write the block to `pager` and mark every member persistent.
    ///
    /// Zero-fills the uninitialized regions and the trailing `free_space_left`
    /// bytes first, and allocates a block id if the block has none.
    pub fn flush<P: Pager + ?Sized>(
        &mut self,
        free_space_left: usize,
        pager: &P,
        arena: &SegmentArena,
    ) -> Result<PhysicalKey> {
        if self.is_flushed() {
            return Err(Error::invariant(
                "flush called on a partial block that was already flushed",
            ));
        }
        let block_size = self.state.block_size;
        if free_space_left > block_size {
            return Err(Error::invariant(format!(
                "{free_space_left} bytes free in a {block_size}-byte block"
            )));
        }
        let handle = self.handle()?;
        // SAFETY: exclusive via `&mut self`; see `write_at`.
        let bytes = unsafe { handle.slice_mut(0, block_size) };
        for region in &self.uninitialized {
            bytes[region.clone()].fill(0);
        }
        bytes[block_size - free_space_left..].fill(0);
        let bytes = bytes.to_vec();

        if self.state.block_id == INVALID_BLOCK {
            self.state.block_id = pager
                .alloc_many(1)?
                .first()
                .copied()
                .ok_or_else(|| Error::Internal("pager returned no block id".to_string()))?;
        }
        let block_id = self.state.block_id;
        pager.batch_put(&[BatchPut::Raw {
            key: block_id,
            bytes,
        }])?;

        for tail in &self.segments {
            let offset = u32::try_from(tail.offset)
                .map_err(|_| Error::invariant(format!("offset {} exceeds u32", tail.offset)))?;
            arena.mark_persistent(tail.segment, block_id, offset)?;
        }
        tracing::debug!(
            block_id,
            segments = self.segments.len(),
            free_space_left,
            "flushed partial block"
        );
        self.clear();
        Ok(block_id)
    }

    /// Move the first `size` bytes of `other` to `offset` in this block,
    /// together with its uninitialized regions and tail members. `other` is
    /// left flushed-empty.
    pub fn merge(
        &mut self,
        other: &mut PartialBlockForCheckpoint,
        offset: usize,
        size: usize,
    ) -> Result<()> {
        {
            let source = other.handle()?;
            if size > source.len() {
                return Err(Error::invariant(format!(
                    "merging {size} bytes from a {}-byte block",
                    source.len()
                )));
            }
            // SAFETY: `other` is exclusively borrowed and only read here.
            let src = unsafe { source.slice(0, size) };
            self.write_at(offset, src)?;
        }
        for region in other.uninitialized.drain(..) {
            let rebased = region.start + offset..region.end + offset;
            self.uninitialized.push(rebased);
        }
        for tail in other.segments.drain(..) {
            self.add_segment_to_tail(tail.column_idx, tail.segment, tail.offset + offset);
        }
        other.clear();
        Ok(())
    }

    /// Drop the buffer and all bookkeeping without writing.
    pub fn clear(&mut self) {
        self.uninitialized.clear();
        self.segments.clear();
        self.buffer = None;
    }
}

/// Space handed out by [`PartialBlockManager::get_block_allocation`].
///
/// `partial_block` is `Some` when the space is inside an existing open block
/// (at `state.offset > 0`) and `None` for a fresh block, in which case the
/// caller creates the block and stores it here before registering.
#[derive(Debug)]
pub struct PartialBlockAllocation {
    pub state: PartialBlockState,
    pub allocation_size: usize,
    pub partial_block: Option<PartialBlockForCheckpoint>,
}

#[derive(Debug, Default)]
struct OpenBlocks {
    /// Keyed by `(free space, insertion sequence)`.
    blocks: BTreeMap<(usize, u64), PartialBlockForCheckpoint>,
    next_seq: u64,
}

impl OpenBlocks {
    fn insert(&mut self, free_space: usize, block: PartialBlockForCheckpoint) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.blocks.insert((free_space, seq), block);
    }

    /// Remove the open block with the least free space that still fits `size`.
    fn take_smallest_fit(&mut self, size: usize) -> Option<(usize, PartialBlockForCheckpoint)> {
        let key = *self.blocks.range((size, 0)..).next()?.0;
        self.blocks.remove(&key).map(|b| (key.0, b))
    }
}

/// Tracks open partial blocks and hands out space in them.
#[derive(Debug)]
pub struct PartialBlockManager<P: Pager> {
    pager: Arc<P>,
    buffer_manager: Arc<BufferManager>,
    config: PartialBlockConfig,
    arena: Arc<SegmentArena>,
    open: Mutex<OpenBlocks>,
    written: Mutex<Vec<PhysicalKey>>,
}

impl<P: Pager> PartialBlockManager<P> {
    pub fn new(
        pager: Arc<P>,
        buffer_manager: Arc<BufferManager>,
        config: PartialBlockConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pager,
            buffer_manager,
            config,
            arena: Arc::new(SegmentArena::new()),
            open: Mutex::new(OpenBlocks::default()),
            written: Mutex::new(Vec::new()),
        })
    }

    /// An empty manager sharing this one's pager, buffers, configuration, and
    /// segment arena. Siblings can later be combined with [`merge`].
    ///
    /// [`merge`]: PartialBlockManager::merge
    pub fn new_sibling(&self) -> Self {
        Self {
            pager: Arc::clone(&self.pager),
            buffer_manager: Arc::clone(&self.buffer_manager),
            config: self.config.clone(),
            arena: Arc::clone(&self.arena),
            open: Mutex::new(OpenBlocks::default()),
            written: Mutex::new(Vec::new()),
        }
    }

    #[inline]
    pub fn config(&self) -> &PartialBlockConfig {
        &self.config
    }

    #[inline]
    pub fn pager(&self) -> &Arc<P> {
        &self.pager
    }

    #[inline]
    pub fn buffer_manager(&self) -> &Arc<BufferManager> {
        &self.buffer_manager
    }

    #[inline]
    pub fn arena(&self) -> &SegmentArena {
        &self.arena
    }

    fn open(&self) -> std::sync::MutexGuard<'_, OpenBlocks> {
        self.open
            .lock()
            .expect("PartialBlockManager open-block lock poisoned")
    }

    fn record_written(&self, block_id: PhysicalKey) {
        self.written
            .lock()
            .expect("PartialBlockManager written lock poisoned")
            .push(block_id);
    }

    /// Number of blocks currently open for reuse.
    pub fn open_block_count(&self) -> usize {
        self.open().blocks.len()
    }

    /// Block ids written so far, in write order.
    pub fn written_blocks(&self) -> Vec<PhysicalKey> {
        self.written
            .lock()
            .expect("PartialBlockManager written lock poisoned")
            .clone()
    }

    /// Find room for `size` bytes.
    ///
    /// Allocations no larger than `max_partial_block_size` reuse the open block
    /// with the smallest free space that fits. Everything else gets a fresh
    /// block id from the pager.
    pub fn get_block_allocation(&self, size: usize) -> Result<PartialBlockAllocation> {
        if size > self.config.block_size {
            return Err(Error::invariant(format!(
                "allocation of {size} bytes exceeds the {}-byte block size",
                self.config.block_size
            )));
        }
        if size <= self.config.max_partial_block_size
            && let Some((free, block)) = self.open().take_smallest_fit(size)
        {
            tracing::trace!(
                size,
                free,
                block_id = block.state.block_id,
                offset = block.state.offset,
                "reusing partial block"
            );
            return Ok(PartialBlockAllocation {
                state: block.state,
                allocation_size: size,
                partial_block: Some(block),
            });
        }

        let block_id = self
            .pager
            .alloc_many(1)?
            .first()
            .copied()
            .ok_or_else(|| Error::Internal("pager returned no block id".to_string()))?;
        tracing::trace!(size, block_id, "allocating new block");
        Ok(PartialBlockAllocation {
            state: PartialBlockState {
                block_id,
                block_size: self.config.block_size,
                offset: 0,
                block_use_count: 0,
            },
            allocation_size: size,
            partial_block: None,
        })
    }

    /// Return an allocation after its bytes were placed.
    ///
    /// Advances the block's offset past the allocation (rounded up to the
    /// segment alignment) and either keeps the block open or, when too little
    /// space remains or it reached `max_use_count`, flushes it now.
    pub fn register_partial_block(&self, allocation: PartialBlockAllocation) -> Result<()> {
        let PartialBlockAllocation {
            state,
            allocation_size,
            partial_block,
        } = allocation;
        let mut block = partial_block
            .ok_or_else(|| Error::invariant("registering an allocation without a partial block"))?;

        let block_size = state.block_size;
        let unaligned = state.offset + allocation_size;
        if unaligned > block_size {
            return Err(Error::invariant(format!(
                "allocation ends at {unaligned}, past the {block_size}-byte block"
            )));
        }
        let aligned = align_segment_offset(unaligned).min(block_size);
        block.add_uninitialized_region(unaligned, aligned);
        block.state = PartialBlockState {
            offset: aligned,
            block_use_count: state.block_use_count + 1,
            ..state
        };

        let free_space = block_size - aligned;
        if free_space < self.config.min_useful_free_space()
            || block.state.block_use_count >= self.config.max_use_count
        {
            let block_id = block.flush(free_space, self.pager.as_ref(), &self.arena)?;
            self.record_written(block_id);
        } else {
            self.open().insert(free_space, block);
        }
        Ok(())
    }

    /// Flush every open block.
    pub fn flush_partial_blocks(&self) -> Result<()> {
        let blocks = std::mem::take(&mut self.open().blocks);
        tracing::debug!(count = blocks.len(), "flushing open partial blocks");
        for ((free_space, _), mut block) in blocks {
            let block_id = block.flush(free_space, self.pager.as_ref(), &self.arena)?;
            self.record_written(block_id);
        }
        Ok(())
    }

    /// Absorb the open blocks of a sibling manager.
    ///
    /// Each of `other`'s blocks is copied into one of ours with enough free
    /// space when possible, and otherwise adopted as-is.
    pub fn merge(&self, other: PartialBlockManager<P>) -> Result<()> {
        if !Arc::ptr_eq(&self.arena, &other.arena) {
            return Err(Error::invariant(
                "merging partial block managers with different segment arenas",
            ));
        }
        let incoming = std::mem::take(
            &mut other
                .open
                .into_inner()
                .expect("PartialBlockManager open-block lock poisoned")
                .blocks,
        );
        self.written
            .lock()
            .expect("PartialBlockManager written lock poisoned")
            .extend(
                other
                    .written
                    .into_inner()
                    .expect("PartialBlockManager written lock poisoned"),
            );

        for ((free_space, _), mut block) in incoming {
            let used = block.state.block_size - free_space;
            let target = if used <= self.config.max_partial_block_size {
                self.open().take_smallest_fit(used)
            } else {
                None
            };
            match target {
                Some((_, mut target)) => {
                    let state = target.state;
                    tracing::debug!(
                        from = block.state.block_id,
                        into = state.block_id,
                        offset = state.offset,
                        used,
                        "merging partial block"
                    );
                    target.merge(&mut block, state.offset, used)?;
                    // The absorbed block is never written; return its id.
                    self.pager.free_many(&[block.state.block_id])?;
                    // `register` adds one use; the merged block brings the rest.
                    let allocation = PartialBlockAllocation {
                        state: PartialBlockState {
                            block_use_count: state.block_use_count
                                + block.state.block_use_count.saturating_sub(1),
                            ..state
                        },
                        allocation_size: used,
                        partial_block: Some(target),
                    };
                    self.register_partial_block(allocation)?;
                }
                None => self.open().insert(free_space, block),
            }
        }
        Ok(())
    }

    /// Drop all open blocks without writing them and return their block ids
    /// to the pager.
    pub fn clear(&self) -> Result<()> {
        let blocks = std::mem::take(&mut self.open().blocks);
        let ids: Vec<PhysicalKey> = blocks
            .into_values()
            .map(|mut block| {
                block.clear();
                block.state.block_id
            })
            .filter(|&id| id != INVALID_BLOCK)
            .collect();
        tracing::debug!(count = ids.len(), "dropping open partial blocks");
        if ids.is_empty() {
            return Ok(());
        }
        self.pager.free_many(&ids)
    }
}
