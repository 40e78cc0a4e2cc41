//! Checkpoint of a whole row group, one rayon task per column.

use rayon::prelude::*;

use llkv_result::{Error, Result};
use llkv_storage::Pager;
use llkv_types::PhysicalType;

use crate::checkpoint_state::ColumnCheckpointState;
use crate::compression::CompressionRegistry;
use crate::data_pointer::{DataPointer, RowGroupWriter};
use crate::partial_block::PartialBlockManager;
use crate::segment::ColumnSegment;
use crate::statistics::SegmentStatistics;

/// The segments of one column, in row order, each with its payload size.
#[derive(Debug, Clone)]
pub struct ColumnSegments {
    pub physical_type: PhysicalType,
    pub segments: Vec<(ColumnSegment, usize)>,
}

impl ColumnSegments {
    pub fn new(physical_type: PhysicalType) -> Self {
        Self {
            physical_type,
            segments: Vec::new(),
        }
    }

    pub fn push(&mut self, segment: ColumnSegment, segment_size: usize) {
        self.segments.push((segment, segment_size));
    }
}

/// Result of checkpointing one column.
#[derive(Debug, Clone)]
pub struct ColumnCheckpoint {
    pub statistics: SegmentStatistics,
    pub data_pointers: Vec<DataPointer>,
}

pub struct RowGroupCheckpointer<'a, P: Pager> {
    row_group_start: u64,
    manager: &'a PartialBlockManager<P>,
    registry: &'a CompressionRegistry,
}

impl<'a, P: Pager> RowGroupCheckpointer<'a, P> {
    pub fn new(
        row_group_start: u64,
        manager: &'a PartialBlockManager<P>,
        registry: &'a CompressionRegistry,
    ) -> Self {
        Self {
            row_group_start,
            manager,
            registry,
        }
    }

    /// Flush every column's segments, write the open partial blocks, then hand
    /// each column's pointers to `writer` in column order.
    ///
    /// Any failure drops the remaining open blocks unwritten and is returned.
    pub fn checkpoint(
        &self,
        columns: Vec<ColumnSegments>,
        writer: &mut dyn RowGroupWriter,
    ) -> Result<Vec<ColumnCheckpoint>> {
        tracing::debug!(
            row_group_start = self.row_group_start,
            columns = columns.len(),
            "checkpointing row group"
        );
        let result = self.checkpoint_columns(columns);
        let columns = match result {
            Ok(columns) => columns,
            Err(err) => {
                if err.is_defect() {
                    tracing::warn!(error = %err, "row group checkpoint hit a defect");
                } else {
                    tracing::debug!(error = %err, "row group checkpoint failed");
                }
                if let Err(clear_err) = self.manager.clear() {
                    tracing::warn!(error = %clear_err, "releasing open blocks failed");
                }
                return Err(err);
            }
        };
        for (column_idx, column) in columns.iter().enumerate() {
            writer.write_column_data_pointers(column_idx, &column.data_pointers)?;
        }
        Ok(columns)
    }

    fn checkpoint_columns(&self, columns: Vec<ColumnSegments>) -> Result<Vec<ColumnCheckpoint>> {
        let results = columns
            .into_par_iter()
            .enumerate()
            .map(|(column_idx, column)| {
                let mut state = ColumnCheckpointState::new(
                    column_idx,
                    self.row_group_start,
                    column.physical_type,
                    self.manager,
                    self.registry,
                );
                for (segment, size) in column.segments {
                    state.flush_segment(segment, size)?;
                }
                let statistics = state.take_statistics()?;
                Ok::<_, Error>(ColumnCheckpoint {
                    statistics,
                    data_pointers: state.data_pointers().to_vec(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.manager.flush_partial_blocks()?;
        Ok(results)
    }
}
