//! On-disk pointers emitted by a checkpoint and the writer boundary that
//! persists them.

use llkv_result::Result;
use llkv_storage::{INVALID_BLOCK, PhysicalKey};

use crate::compression::CompressionKind;
use crate::statistics::SegmentStatistics;

/// Locates one persisted segment and caches its statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPointer {
    pub row_start: u64,
    pub tuple_count: u64,
    /// `INVALID_BLOCK` when no bytes were written (constant segments).
    pub block_id: PhysicalKey,
    pub offset: u32,
    pub compression: CompressionKind,
    pub statistics: SegmentStatistics,
}

impl DataPointer {
    #[inline]
    pub fn row_end(&self) -> u64 {
        self.row_start + self.tuple_count
    }

    #[inline]
    pub fn has_block(&self) -> bool {
        self.block_id != INVALID_BLOCK
    }
}

/// Receives each column's ordered pointer list. The implementor owns the
/// on-disk layout of the list.
pub trait RowGroupWriter {
    fn write_column_data_pointers(&mut self, column_idx: usize, pointers: &[DataPointer])
    -> Result<()>;
}

/// A [`RowGroupWriter`] that keeps every list in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingWriter {
    columns: Vec<(usize, Vec<DataPointer>)>,
}

impl CollectingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists in the order they were written.
    pub fn columns(&self) -> &[(usize, Vec<DataPointer>)] {
        &self.columns
    }

    pub fn pointers(&self, column_idx: usize) -> Option<&[DataPointer]> {
        self.columns
            .iter()
            .find(|(idx, _)| *idx == column_idx)
            .map(|(_, p)| p.as_slice())
    }
}

impl RowGroupWriter for CollectingWriter {
    fn write_column_data_pointers(
        &mut self,
        column_idx: usize,
        pointers: &[DataPointer],
    ) -> Result<()> {
        self.columns.push((column_idx, pointers.to_vec()));
        Ok(())
    }
}
