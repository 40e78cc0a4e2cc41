/// Opaque 64-bit address of an on-disk block in the pager namespace.
/// Treated as an opaque handle by higher layers.
pub type PhysicalKey = u64;

/// Identifier of an in-memory buffer handed out by the
/// [`BufferManager`](crate::buffer::BufferManager). Never persisted.
pub type BufferId = u64;
