//! Row encoding for sort keys and row-store payloads.
//!
//! - [`sortable`]: fixed-width keys whose unsigned byte order matches value
//!   order, for sort and join operators.
//! - [`payload`]: host-layout row encoding with a per-row validity bitmap, plus
//!   type-directed decode and skip.
//! - [`row_chunk`]: the append-only allocator that hands out the row slots both
//!   encoders write into.
//!
//! Encoders work one column at a time over a batch of rows, advancing one
//! cursor per row ([`RowCursors`] / [`RowReaders`]). A typical key build:
//!
//! ```
//! use std::sync::Arc;
//! use llkv_row_encoding::{RowChunk, RowCursors, serialize_vector_sortable};
//! use llkv_storage::BufferManager;
//! use llkv_types::Vector;
//!
//! let chunk = RowChunk::new(Arc::new(BufferManager::new()), 1024, 4).unwrap();
//! let column = Vector::from_options([Some(-5i32), Some(0), Some(5)]);
//!
//! let mut reservation = chunk.build(column.len()).unwrap();
//! let mut cursors = RowCursors::for_keys(reservation.slots_mut());
//! serialize_vector_sortable(&column, &[0, 1, 2], &mut cursors, false, false).unwrap();
//! ```

pub mod cursors;
mod dispatch;
pub mod payload;
pub mod row_chunk;
pub mod sortable;

pub use cursors::{RowCursors, RowReaders, validity_bytes};
pub use payload::{
    RowNative, deserialize_into_vector, serialize_indices, serialize_vector, skip_over_type,
};
pub use row_chunk::{PinnedRows, RowChunk, RowDataBlock, RowReservation};
pub use sortable::{
    SortKey, f32_sort_bits, f64_sort_bits, serialize_vector_sortable, sortable_width,
};
