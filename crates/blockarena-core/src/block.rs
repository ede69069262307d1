//! Raw memory blocks chained newest-to-oldest.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::ArenaError;

/// Round `x` up to the next multiple of `align` (a power of two).
#[inline]
pub(crate) const fn align_up(x: usize, align: usize) -> usize {
    (x + align - 1) & !(align - 1)
}

/// One contiguous buffer with a bump cursor.
///
/// `previous` links to the block allocated immediately before this one; the
/// chain ends at the arena's original block. The buffer is owned exclusively
/// and freed when the block is dropped.
pub struct MemoryBlock {
    buffer: NonNull<u8>,
    layout: Layout,
    cursor: usize,
    previous: Option<Box<MemoryBlock>>,
}

impl MemoryBlock {
    /// Reserve a block of `capacity` usable bytes aligned to `align`.
    ///
    /// Returns [`ArenaError::InvalidCapacity`] when no layout can describe the
    /// block and [`ArenaError::OutOfMemory`] when the system allocator fails.
    /// The request is never retried.
    pub fn allocate(capacity: usize, align: usize) -> Result<Self, ArenaError> {
        if capacity == 0 {
            return Err(ArenaError::InvalidCapacity { capacity });
        }
        let layout = Layout::from_size_align(capacity, align)
            .map_err(|_| ArenaError::InvalidCapacity { capacity })?;

        // SAFETY: `layout` has a non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        let buffer = NonNull::new(raw).ok_or(ArenaError::OutOfMemory {
            requested: capacity,
        })?;

        Ok(Self {
            buffer,
            layout,
            cursor: 0,
            previous: None,
        })
    }

    /// Usable bytes in this block.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// Bytes between the start of the buffer and the cursor.
    #[must_use]
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Bytes left between the cursor and the end of the buffer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.cursor
    }

    /// Whether a block was allocated before this one.
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    /// The block allocated before this one, if any.
    #[must_use]
    pub fn previous(&self) -> Option<&MemoryBlock> {
        self.previous.as_deref()
    }

    /// Address of the next free byte.
    pub(crate) fn cursor_ptr(&self) -> NonNull<u8> {
        self.ptr_at(self.cursor)
    }

    /// Address of the byte `offset` bytes past the start of the buffer.
    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.capacity());
        // SAFETY: `offset` is within the allocation (or one past its end), so
        // the result stays in bounds and non-null.
        unsafe { NonNull::new_unchecked(self.buffer.as_ptr().add(offset)) }
    }

    /// Move the cursor forward by `len` bytes.
    pub(crate) fn advance(&mut self, len: usize) {
        debug_assert!(len <= self.remaining());
        self.cursor += len;
    }

    /// Rewind the cursor to the start of the buffer.
    pub(crate) fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Make `previous` the block this one chains back to.
    pub(crate) fn link(&mut self, previous: Option<Box<MemoryBlock>>) {
        debug_assert!(self.previous.is_none());
        self.previous = previous;
    }

    /// Detach and return the previous block.
    pub(crate) fn take_previous(&mut self) -> Option<Box<MemoryBlock>> {
        self.previous.take()
    }
}

impl Drop for MemoryBlock {
    fn drop(&mut self) {
        // Unlink iteratively so a long chain cannot overflow the stack.
        let mut previous = self.previous.take();
        while let Some(mut block) = previous {
            previous = block.previous.take();
        }
        // SAFETY: `buffer` was returned by `alloc::alloc` with `layout`.
        unsafe { alloc::dealloc(self.buffer.as_ptr(), self.layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_starts_empty() {
        let block = MemoryBlock::allocate(128, 8).unwrap();
        assert_eq!(block.capacity(), 128);
        assert_eq!(block.used(), 0);
        assert_eq!(block.remaining(), 128);
        assert!(!block.has_previous());
    }

    #[test]
    fn buffer_respects_alignment() {
        let block = MemoryBlock::allocate(256, 64).unwrap();
        assert_eq!(block.cursor_ptr().as_ptr() as usize % 64, 0);
    }

    #[test]
    fn advance_and_reset() {
        let mut block = MemoryBlock::allocate(64, 8).unwrap();
        block.advance(24);
        assert_eq!(block.used(), 24);
        assert_eq!(block.remaining(), 40);
        assert_eq!(
            block.cursor_ptr().as_ptr() as usize - block.ptr_at(0).as_ptr() as usize,
            24
        );
        block.advance(40);
        assert_eq!(block.remaining(), 0);
        block.reset();
        assert_eq!(block.used(), 0);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(
            MemoryBlock::allocate(0, 8).err(),
            Some(ArenaError::InvalidCapacity { capacity: 0 })
        );
    }

    #[test]
    fn unrepresentable_capacity_is_rejected() {
        assert_eq!(
            MemoryBlock::allocate(usize::MAX, 8).err(),
            Some(ArenaError::InvalidCapacity {
                capacity: usize::MAX
            })
        );
    }

    #[test]
    fn link_and_take_previous() {
        let first = MemoryBlock::allocate(32, 8).unwrap();
        let mut second = MemoryBlock::allocate(32, 8).unwrap();
        second.link(Some(Box::new(first)));
        assert!(second.has_previous());
        assert_eq!(second.previous().map(MemoryBlock::capacity), Some(32));

        let first = second.take_previous().unwrap();
        assert!(!second.has_previous());
        assert!(!first.has_previous());
    }

    #[test]
    fn long_chain_drops_without_recursion() {
        let mut head = Box::new(MemoryBlock::allocate(16, 8).unwrap());
        for _ in 0..50_000 {
            let mut next = Box::new(MemoryBlock::allocate(16, 8).unwrap());
            next.link(Some(head));
            head = next;
        }
        drop(head);
    }

    #[test]
    fn align_up_rounds_to_multiples() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 4), 12);
    }
}
