use crate::types::PhysicalKey;

/// System-wide size of one on-disk block, in bytes.
///
/// Checkpointing packs segments into blocks of exactly this size. Higher layers
/// treat it as opaque; tests shrink it through `PartialBlockConfig`.
pub const BLOCK_SIZE: usize = 256 * 1024;

/// Sentinel block id meaning "no bytes were written" (constant segments, or a
/// partial block whose id has not been assigned yet).
pub const INVALID_BLOCK: PhysicalKey = u64::MAX;

/// Segments packed into a shared block start on multiples of this many bytes.
pub const SEGMENT_ALIGNMENT: usize = 8;

/// Round `offset` up to the next multiple of [`SEGMENT_ALIGNMENT`].
#[inline]
pub const fn align_segment_offset(offset: usize) -> usize {
    offset.next_multiple_of(SEGMENT_ALIGNMENT)
}
