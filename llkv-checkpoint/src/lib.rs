//! Checkpoint block packing for immutable column segments.
//!
//! During a checkpoint every column of a row group hands its already
//! compressed segments, in row order, to a [`ColumnCheckpointState`]. Small
//! segments from any column are packed into shared fixed-size blocks by the
//! [`PartialBlockManager`], so a block is written to the [`Pager`] once, when
//! it is full or when the checkpoint finalizes. Segments whose statistics
//! prove every row identical are recorded as constants and write nothing.
//!
//! The output is one ordered [`DataPointer`] list per column, handed to a
//! [`RowGroupWriter`] that owns the on-disk layout of those lists.
//!
//! ```
//! use std::sync::Arc;
//!
//! use llkv_checkpoint::{
//!     CollectingWriter, ColumnSegment, ColumnSegments, CompressionKind, CompressionRegistry,
//!     PartialBlockConfig, PartialBlockManager, RowGroupCheckpointer, SegmentStatistics,
//! };
//! use llkv_storage::{BufferManager, MemPager};
//! use llkv_types::{PhysicalType, Vector};
//!
//! let buffers = Arc::new(BufferManager::new());
//! let manager = PartialBlockManager::new(
//!     Arc::new(MemPager::new()),
//!     Arc::clone(&buffers),
//!     PartialBlockConfig::with_block_size(4096),
//! )
//! .unwrap();
//! let registry = CompressionRegistry::with_defaults();
//!
//! let values = Vector::from_options([Some(1i64), Some(2), Some(3)]);
//! let bytes: Vec<u8> = [1i64, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
//! let function = registry
//!     .get(CompressionKind::Uncompressed, PhysicalType::Int64)
//!     .unwrap();
//! let segment = ColumnSegment::from_bytes(
//!     &buffers,
//!     3,
//!     SegmentStatistics::from_vector(&values),
//!     function,
//!     &bytes,
//! )
//! .unwrap();
//!
//! let mut column = ColumnSegments::new(PhysicalType::Int64);
//! column.push(segment, bytes.len());
//!
//! let mut writer = CollectingWriter::new();
//! let out = RowGroupCheckpointer::new(0, &manager, &registry)
//!     .checkpoint(vec![column], &mut writer)
//!     .unwrap();
//! assert_eq!(out[0].statistics.row_count(), 3);
//! assert_eq!(writer.pointers(0).unwrap()[0].offset, 0);
//! assert_eq!(manager.written_blocks().len(), 1);
//! ```
//!
//! [`Pager`]: llkv_storage::Pager

pub mod checkpoint_state;
pub mod compression;
pub mod data_pointer;
pub mod partial_block;
pub mod row_group;
pub mod segment;
pub mod statistics;

pub use checkpoint_state::ColumnCheckpointState;
pub use compression::{CompressionFunction, CompressionKind, CompressionRegistry};
pub use data_pointer::{CollectingWriter, DataPointer, RowGroupWriter};
pub use partial_block::{
    PartialBlockAllocation, PartialBlockConfig, PartialBlockForCheckpoint, PartialBlockManager,
    PartialBlockState, TailSegment,
};
pub use row_group::{ColumnCheckpoint, ColumnSegments, RowGroupCheckpointer};
pub use segment::{ColumnSegment, SegmentArena, SegmentId, SegmentPersistence};
pub use statistics::SegmentStatistics;
