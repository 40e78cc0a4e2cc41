//! Per-column checkpoint driver.
//!
//! Segments of one column arrive in row order through
//! [`ColumnCheckpointState::flush_segment`]. Each one is folded into the
//! column's global statistics, then either recorded as a constant (no bytes)
//! or handed to the shared [`PartialBlockManager`], and finally described by a
//! [`DataPointer`].

use llkv_result::{Error, Result};
use llkv_storage::{INVALID_BLOCK, Pager};
use llkv_types::PhysicalType;

use crate::compression::{CompressionKind, CompressionRegistry};
use crate::data_pointer::{DataPointer, RowGroupWriter};
use crate::partial_block::{PartialBlockForCheckpoint, PartialBlockManager};
use crate::segment::{ColumnSegment, SegmentId, SegmentPersistence};
use crate::statistics::SegmentStatistics;

pub struct ColumnCheckpointState<'a, P: Pager> {
    column_idx: usize,
    row_group_start: u64,
    physical_type: PhysicalType,
    manager: &'a PartialBlockManager<P>,
    registry: &'a CompressionRegistry,
    global_stats: Option<SegmentStatistics>,
    data_pointers: Vec<DataPointer>,
    new_tree: Vec<SegmentId>,
}

impl<'a, P: Pager> ColumnCheckpointState<'a, P> {
    pub fn new(
        column_idx: usize,
        row_group_start: u64,
        physical_type: PhysicalType,
        manager: &'a PartialBlockManager<P>,
        registry: &'a CompressionRegistry,
    ) -> Self {
        Self {
            column_idx,
            row_group_start,
            physical_type,
            manager,
            registry,
            global_stats: Some(SegmentStatistics::new(physical_type)),
            data_pointers: Vec::new(),
            new_tree: Vec::new(),
        }
    }

    #[inline]
    pub fn column_idx(&self) -> usize {
        self.column_idx
    }

    #[inline]
    pub fn data_pointers(&self) -> &[DataPointer] {
        &self.data_pointers
    }

    /// Segments flushed so far, in row order.
    #[inline]
    pub fn segments(&self) -> &[SegmentId] {
        &self.new_tree
    }

    fn next_row_start(&self) -> u64 {
        self.data_pointers
            .last()
            .map_or(self.row_group_start, DataPointer::row_end)
    }

    /// Persist one segment of `segment_size` meaningful bytes.
    pub fn flush_segment(&mut self, mut segment: ColumnSegment, segment_size: usize) -> Result<()> {
        let block_size = self.manager.config().block_size;
        if segment_size > block_size {
            return Err(Error::invariant(format!(
                "segment of {segment_size} bytes exceeds the {block_size}-byte block size"
            )));
        }
        if segment.physical_type() != self.physical_type {
            return Err(Error::invariant(format!(
                "{} segment flushed into a {} column",
                segment.physical_type(),
                self.physical_type
            )));
        }
        if segment.segment_size() < segment_size {
            return Err(Error::invariant(format!(
                "segment buffer of {} bytes is smaller than its {segment_size}-byte payload",
                segment.segment_size()
            )));
        }
        let tuple_count = segment.count();
        if tuple_count == 0 {
            tracing::trace!(column = self.column_idx, "dropping empty segment");
            return Ok(());
        }

        let global = self
            .global_stats
            .as_mut()
            .ok_or_else(|| Error::invariant("flush_segment after take_statistics"))?;
        global.merge(segment.statistics())?;

        let row_start = self.next_row_start();
        let (segment_id, block_id, offset) = if segment.statistics().is_constant() {
            let constant = self
                .registry
                .get(CompressionKind::Constant, self.physical_type)?;
            segment.set_function(constant);
            segment.mark_constant();
            let id = self.manager.arena().insert(segment)?;
            tracing::trace!(column = self.column_idx, row_start, "constant segment");
            (id, INVALID_BLOCK, 0)
        } else {
            self.place(segment, segment_size)?
        };

        let stored = self
            .manager
            .arena()
            .get(segment_id)
            .ok_or_else(|| Error::invariant(format!("segment {segment_id:?} vanished")))?;
        self.data_pointers.push(DataPointer {
            row_start,
            tuple_count,
            block_id,
            offset,
            compression: stored.function().kind(),
            statistics: stored.statistics().clone(),
        });
        self.new_tree.push(segment_id);
        Ok(())
    }

    /// Copy the segment into a block and return where it landed.
    fn place(
        &self,
        mut segment: ColumnSegment,
        segment_size: usize,
    ) -> Result<(SegmentId, u64, u32)> {
        let manager = self.manager;
        let block_size = manager.config().block_size;
        let mut allocation = manager.get_block_allocation(segment_size)?;
        let block_id = allocation.state.block_id;
        let offset = allocation.state.offset;

        let segment_id = match allocation.partial_block.take() {
            Some(mut block) => {
                if offset == 0 {
                    return Err(Error::invariant("reused partial block returned offset 0"));
                }
                {
                    let source = segment.pin()?;
                    // SAFETY: segments are immutable once handed to the checkpoint.
                    let bytes = unsafe { source.slice(0, segment_size) };
                    block.write_at(offset, bytes)?;
                }
                let id = manager.arena().insert(segment)?;
                block.add_segment_to_tail(self.column_idx, id, offset);
                allocation.partial_block = Some(block);
                id
            }
            None => {
                if offset != 0 {
                    return Err(Error::invariant(format!(
                        "fresh block allocation starts at offset {offset}"
                    )));
                }
                if segment.segment_size() < block_size {
                    segment.resize(manager.buffer_manager(), block_size)?;
                }
                let buffer = segment.pin()?;
                let id = manager.arena().insert(segment)?;
                allocation.partial_block = Some(PartialBlockForCheckpoint::new(
                    buffer,
                    allocation.state,
                    self.column_idx,
                    id,
                )?);
                id
            }
        };
        tracing::trace!(
            column = self.column_idx,
            block_id,
            offset,
            segment_size,
            "placed segment"
        );
        manager.register_partial_block(allocation)?;

        let offset = u32::try_from(offset)
            .map_err(|_| Error::invariant(format!("offset {offset} exceeds u32")))?;
        Ok((segment_id, block_id, offset))
    }

    /// Hand the ordered pointer list to `writer`.
    pub fn write_data_pointers(&self, writer: &mut dyn RowGroupWriter) -> Result<()> {
        writer.write_column_data_pointers(self.column_idx, &self.data_pointers)
    }

    /// The merged statistics of every flushed segment. Callable once.
    pub fn take_statistics(&mut self) -> Result<SegmentStatistics> {
        self.global_stats
            .take()
            .ok_or_else(|| Error::invariant("statistics were already taken"))
    }

    /// On-disk location of a flushed segment.
    pub fn persistence(&self, id: SegmentId) -> Option<SegmentPersistence> {
        self.manager.arena().persistence(id)
    }
}

impl<P: Pager> std::fmt::Debug for ColumnCheckpointState<'_, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnCheckpointState")
            .field("column_idx", &self.column_idx)
            .field("row_group_start", &self.row_group_start)
            .field("physical_type", &self.physical_type)
            .field("data_pointers", &self.data_pointers.len())
            .finish()
    }
}
