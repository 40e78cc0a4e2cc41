//! In-memory block arena with scoped pins.
//!
//! Buffers are fixed-size, zero-initialised byte regions whose address never
//! changes for their whole lifetime. A buffer is shared through [`BlockRef`]
//! (an `Arc`) and freed when the last reference drops. Access goes through a
//! [`BufferHandle`], the pin guard: while a handle is alive the buffer stays
//! resident at the same address, and dropping the handle (on any exit path,
//! including `?` early returns) releases the pin.
//!
//! Buffers are never evicted, so pinning cannot fail. The pin count is still
//! tracked so callers and tests can assert that every pin was released.
//!
//! Byte access through a handle is `unsafe`: a buffer may be pinned by several
//! handles at once, and only the owner of a reservation (a row range, a partial
//! block taken out of the open-block map) knows that its byte range is not
//! written by anyone else concurrently.

use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use llkv_result::{Error, Result};

use crate::types::BufferId;

/// Run-time configuration for a [`BufferManager`].
#[derive(Debug, Clone, Default)]
pub struct BufferManagerConfig {
    /// Upper bound on bytes held by live buffers. `None` disables the check.
    pub memory_limit: Option<usize>,
}

/// Shared ownership of one in-memory block.
pub type BlockRef = Arc<BlockBuffer>;

/// A fixed-size byte region with a stable address.
pub struct BlockBuffer {
    id: BufferId,
    ptr: NonNull<u8>,
    len: usize,
    pins: AtomicUsize,
    used_memory: Arc<AtomicUsize>,
}

// SAFETY: the region is owned exclusively by this struct and freed only in
// `Drop`. Concurrent byte access is mediated by the `unsafe` accessors on
// `BufferHandle`, whose callers guarantee disjointness.
unsafe impl Send for BlockBuffer {}
unsafe impl Sync for BlockBuffer {}

impl BlockBuffer {
    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of live [`BufferHandle`]s pinning this buffer.
    #[inline]
    pub fn pin_count(&self) -> usize {
        self.pins.load(Ordering::Acquire)
    }

    /// Pin this buffer. The returned guard unpins on drop.
    pub fn pin(self: &Arc<Self>) -> BufferHandle {
        self.pins.fetch_add(1, Ordering::AcqRel);
        BufferHandle {
            block: Arc::clone(self),
        }
    }
}

impl Drop for BlockBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` came from `Box::<[u8]>::into_raw` in
        // `BufferManager::allocate` and are released exactly once here.
        unsafe {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr(),
                self.len,
            )));
        }
        self.used_memory.fetch_sub(self.len, Ordering::AcqRel);
    }
}

impl fmt::Debug for BlockBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockBuffer")
            .field("id", &self.id)
            .field("len", &self.len)
            .field("pins", &self.pin_count())
            .finish()
    }
}

/// Pin guard over a [`BlockBuffer`].
pub struct BufferHandle {
    block: BlockRef,
}

impl BufferHandle {
    /// The pinned block; clone it to keep the buffer alive without a pin.
    #[inline]
    pub fn block(&self) -> &BlockRef {
        &self.block
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.block.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.block.len == 0
    }

    /// Stable base address of the pinned buffer.
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.block.ptr.as_ptr()
    }

    /// Borrow `len` bytes starting at `offset`.
    ///
    /// # Safety
    ///
    /// No other party may write to `offset..offset + len` while the returned
    /// slice is alive.
    ///
    /// # Panics
    ///
    /// If the range falls outside the buffer.
    #[inline]
    pub unsafe fn slice(&self, offset: usize, len: usize) -> &[u8] {
        self.check_range(offset, len);
        // SAFETY: bounds checked above; aliasing guaranteed by the caller.
        unsafe { std::slice::from_raw_parts(self.as_ptr().add(offset), len) }
    }

    /// Mutably borrow `len` bytes starting at `offset`.
    ///
    /// # Safety
    ///
    /// The caller must hold exclusive rights to `offset..offset + len` (no
    /// other live slice of that range, shared or mutable) for the lifetime of
    /// the returned slice.
    ///
    /// # Panics
    ///
    /// If the range falls outside the buffer.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slice_mut(&self, offset: usize, len: usize) -> &mut [u8] {
        self.check_range(offset, len);
        // SAFETY: bounds checked above; exclusivity guaranteed by the caller.
        unsafe { std::slice::from_raw_parts_mut(self.as_ptr().add(offset), len) }
    }

    #[inline]
    fn check_range(&self, offset: usize, len: usize) {
        let end = offset.checked_add(len);
        assert!(
            end.is_some_and(|end| end <= self.block.len),
            "range {offset}+{len} outside buffer of {} bytes",
            self.block.len
        );
    }
}

impl Drop for BufferHandle {
    fn drop(&mut self) {
        self.block.pins.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BufferHandle").field(&self.block).finish()
    }
}

/// Hands out fixed-size, zeroed buffers and tracks their memory.
#[derive(Debug, Default)]
pub struct BufferManager {
    cfg: BufferManagerConfig,
    next_id: AtomicU64,
    used_memory: Arc<AtomicUsize>,
}

impl BufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(cfg: BufferManagerConfig) -> Self {
        Self {
            cfg,
            ..Self::default()
        }
    }

    /// Allocate a zeroed buffer of `size` bytes and return it pinned.
    pub fn allocate(&self, size: usize) -> Result<BufferHandle> {
        let limit = self.cfg.memory_limit;
        self.used_memory
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(size)
                    .filter(|next| limit.is_none_or(|limit| *next <= limit))
            })
            .map_err(|_| Error::OutOfMemory {
                requested: size,
                limit: limit.unwrap_or(usize::MAX),
            })?;

        let raw = Box::into_raw(vec![0u8; size].into_boxed_slice());
        // SAFETY: `Box::into_raw` never returns null.
        let ptr = unsafe { NonNull::new_unchecked(raw as *mut u8) };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(buffer_id = id, size, "allocated buffer");

        let block = Arc::new(BlockBuffer {
            id,
            ptr,
            len: size,
            pins: AtomicUsize::new(0),
            used_memory: Arc::clone(&self.used_memory),
        });
        Ok(block.pin())
    }

    /// Pin an existing buffer.
    #[inline]
    pub fn pin(&self, block: &BlockRef) -> BufferHandle {
        block.pin()
    }

    /// Allocate a `new_size` buffer holding a copy of the first
    /// `min(old, new_size)` bytes of `handle`. The rest is zero.
    pub fn resize(&self, handle: &BufferHandle, new_size: usize) -> Result<BufferHandle> {
        let target = self.allocate(new_size)?;
        let keep = handle.len().min(new_size);
        // SAFETY: `target` was just allocated and is not shared; the source
        // range is only read.
        unsafe {
            target
                .slice_mut(0, keep)
                .copy_from_slice(handle.slice(0, keep));
        }
        Ok(target)
    }

    /// Bytes held by live buffers created by this manager.
    #[inline]
    pub fn used_memory(&self) -> usize {
        self.used_memory.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_are_released_on_drop() {
        let bm = BufferManager::new();
        let handle = bm.allocate(64).unwrap();
        let block = Arc::clone(handle.block());
        assert_eq!(block.pin_count(), 1);
        {
            let _second = bm.pin(&block);
            assert_eq!(block.pin_count(), 2);
        }
        assert_eq!(block.pin_count(), 1);
        drop(handle);
        assert_eq!(block.pin_count(), 0);
    }

    #[test]
    fn pins_are_released_on_error_paths() {
        fn fails(bm: &BufferManager, block: &BlockRef) -> Result<()> {
            let _pin = bm.pin(block);
            Err(Error::invariant("boom"))?;
            Ok(())
        }
        let bm = BufferManager::new();
        let block = Arc::clone(bm.allocate(8).unwrap().block());
        assert!(fails(&bm, &block).is_err());
        assert_eq!(block.pin_count(), 0);
    }

    #[test]
    fn address_is_stable_across_pins() {
        let bm = BufferManager::new();
        let first = bm.allocate(32).unwrap();
        let addr = first.as_ptr();
        let again = bm.pin(first.block());
        assert_eq!(again.as_ptr(), addr);
    }

    #[test]
    fn memory_is_accounted_and_limited() {
        let bm = BufferManager::with_config(BufferManagerConfig {
            memory_limit: Some(100),
        });
        let a = bm.allocate(60).unwrap();
        assert_eq!(bm.used_memory(), 60);
        let err = bm.allocate(41).unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfMemory {
                requested: 41,
                limit: 100
            }
        ));
        drop(a);
        assert_eq!(bm.used_memory(), 0);
        assert!(bm.allocate(100).is_ok());
    }

    #[test]
    fn resize_copies_prefix_and_zero_fills() {
        let bm = BufferManager::new();
        let small = bm.allocate(4).unwrap();
        unsafe { small.slice_mut(0, 4).copy_from_slice(&[1, 2, 3, 4]) };
        let big = bm.resize(&small, 8).unwrap();
        assert_eq!(unsafe { big.slice(0, 8) }, &[1, 2, 3, 4, 0, 0, 0, 0]);
        let shrunk = bm.resize(&big, 2).unwrap();
        assert_eq!(unsafe { shrunk.slice(0, 2) }, &[1, 2]);
    }

    #[test]
    #[should_panic(expected = "outside buffer")]
    fn out_of_range_access_panics() {
        let bm = BufferManager::new();
        let handle = bm.allocate(4).unwrap();
        let _ = unsafe { handle.slice(2, 4) };
    }
}
