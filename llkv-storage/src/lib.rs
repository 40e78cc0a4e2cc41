//! Block storage boundary for LLKV row encoding and checkpointing.
//!
//! Two halves:
//!
//! - [`buffer`]: the in-memory block arena. Fixed-capacity buffers are handed
//!   out by a [`BufferManager`](buffer::BufferManager) and accessed through
//!   scoped pins ([`BufferHandle`](buffer::BufferHandle)) that guarantee a
//!   stable, resident address until dropped.
//! - [`pager`]: the disk side. A [`Pager`](pager::Pager) allocates fresh block
//!   ids and persists whole blocks.

pub mod buffer;
pub mod constants;
pub mod pager;
pub mod types;

pub use buffer::{BlockBuffer, BlockRef, BufferHandle, BufferManager, BufferManagerConfig};
pub use constants::{BLOCK_SIZE, INVALID_BLOCK, SEGMENT_ALIGNMENT};
pub use pager::{BatchGet, BatchPut, GetResult, InstrumentedPager, IoStats, MemPager, Pager};
pub use types::{BufferId, PhysicalKey};
