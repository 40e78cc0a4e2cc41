//! Column segments and the arena that owns them during a checkpoint.
//!
//! Segments are referred to by [`SegmentId`] everywhere else (partial block
//! tails, per-column segment lists), never by reference. The arena is shared
//! by every column of a checkpoint pass and is internally synchronized.

use std::sync::{Arc, RwLock};

use llkv_result::{Error, Result};
use llkv_storage::{BlockRef, BufferHandle, BufferManager, INVALID_BLOCK, PhysicalKey};
use llkv_types::PhysicalType;

use crate::compression::CompressionFunction;
use crate::statistics::SegmentStatistics;

/// Index of a segment inside a [`SegmentArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub(crate) u32);

impl SegmentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a segment's bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPersistence {
    /// Only in an in-memory buffer.
    Transient,
    /// On disk at `offset` inside `block_id`. Constant segments use
    /// `INVALID_BLOCK`.
    Persistent { block_id: PhysicalKey, offset: u32 },
}

/// An immutable run of encoded values for one column of one row group.
#[derive(Debug, Clone)]
pub struct ColumnSegment {
    physical_type: PhysicalType,
    count: u64,
    statistics: SegmentStatistics,
    function: Arc<CompressionFunction>,
    buffer: Option<BlockRef>,
    persistence: SegmentPersistence,
}

impl ColumnSegment {
    /// A transient segment of `count` rows backed by `buffer`.
    pub fn new(
        count: u64,
        statistics: SegmentStatistics,
        function: Arc<CompressionFunction>,
        buffer: BlockRef,
    ) -> Result<Self> {
        let physical_type = statistics.physical_type();
        if function.physical_type() != physical_type {
            return Err(Error::invariant(format!(
                "{} compression function attached to a {physical_type} segment",
                function.physical_type()
            )));
        }
        if statistics.row_count() != count {
            return Err(Error::invariant(format!(
                "segment of {count} rows carries statistics for {}",
                statistics.row_count()
            )));
        }
        Ok(Self {
            physical_type,
            count,
            statistics,
            function,
            buffer: Some(buffer),
            persistence: SegmentPersistence::Transient,
        })
    }

    /// Copy `bytes` into a fresh buffer of exactly `bytes.len()` and wrap it.
    pub fn from_bytes(
        buffer_manager: &BufferManager,
        count: u64,
        statistics: SegmentStatistics,
        function: Arc<CompressionFunction>,
        bytes: &[u8],
    ) -> Result<Self> {
        let handle = buffer_manager.allocate(bytes.len())?;
        // SAFETY: freshly allocated and not shared yet.
        unsafe { handle.slice_mut(0, bytes.len()) }.copy_from_slice(bytes);
        Self::new(count, statistics, function, Arc::clone(handle.block()))
    }

    #[inline]
    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn statistics(&self) -> &SegmentStatistics {
        &self.statistics
    }

    #[inline]
    pub fn function(&self) -> &Arc<CompressionFunction> {
        &self.function
    }

    #[inline]
    pub fn persistence(&self) -> SegmentPersistence {
        self.persistence
    }

    /// Allocated size of the in-memory buffer; zero once released.
    pub fn segment_size(&self) -> usize {
        self.buffer.as_ref().map_or(0, |b| b.len())
    }

    pub(crate) fn pin(&self) -> Result<BufferHandle> {
        self.buffer
            .as_ref()
            .map(|b| b.pin())
            .ok_or_else(|| Error::invariant("segment buffer was already released"))
    }

    /// Grow the buffer to `new_size`, zero-filling the tail.
    pub(crate) fn resize(&mut self, buffer_manager: &BufferManager, new_size: usize) -> Result<()> {
        let current = self.pin()?;
        let resized = buffer_manager.resize(&current, new_size)?;
        self.buffer = Some(Arc::clone(resized.block()));
        Ok(())
    }

    pub(crate) fn set_function(&mut self, function: Arc<CompressionFunction>) {
        self.function = function;
    }

    /// Record the on-disk location and drop the in-memory buffer.
    pub(crate) fn mark_persistent(&mut self, block_id: PhysicalKey, offset: u32) {
        self.persistence = SegmentPersistence::Persistent { block_id, offset };
        self.buffer = None;
    }

    pub(crate) fn mark_constant(&mut self) {
        self.mark_persistent(INVALID_BLOCK, 0);
    }
}

/// Owner of every [`ColumnSegment`] of one checkpoint pass.
#[derive(Debug, Default)]
pub struct SegmentArena {
    segments: RwLock<Vec<ColumnSegment>>,
}

impl SegmentArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<ColumnSegment>> {
        self.segments
            .read()
            .expect("SegmentArena read lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<ColumnSegment>> {
        self.segments
            .write()
            .expect("SegmentArena write lock poisoned")
    }

    pub fn insert(&self, segment: ColumnSegment) -> Result<SegmentId> {
        let mut segments = self.write();
        let id = u32::try_from(segments.len())
            .map(SegmentId)
            .map_err(|_| Error::Internal("segment arena is full".to_string()))?;
        segments.push(segment);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// A copy of the segment's metadata (the buffer is shared, not copied).
    pub fn get(&self, id: SegmentId) -> Option<ColumnSegment> {
        self.read().get(id.index()).cloned()
    }

    pub fn persistence(&self, id: SegmentId) -> Option<SegmentPersistence> {
        self.read().get(id.index()).map(ColumnSegment::persistence)
    }

    pub(crate) fn mark_persistent(
        &self,
        id: SegmentId,
        block_id: PhysicalKey,
        offset: u32,
    ) -> Result<()> {
        let mut segments = self.write();
        let segment = segments
            .get_mut(id.index())
            .ok_or_else(|| Error::invariant(format!("unknown segment {id:?}")))?;
        segment.mark_persistent(block_id, offset);
        Ok(())
    }
}
