//! Homogeneous arena: a chain of blocks holding fixed-stride `T` values.

use std::cell::Cell;
use std::marker::PhantomData;
use std::mem;
use std::ptr;

use crate::arena::{Arena, ArenaCreate};
use crate::block::align_up;
use crate::chain::BlockChain;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::stats::ArenaStats;

/// Bump arena for values of a single type.
///
/// Every `T` occupies exactly [`stride`](Self::stride) bytes, so a block is a
/// packed array of `T` up to its cursor and `clear()` needs no per-object
/// metadata.
///
/// # Destruction order
///
/// `clear()` visits blocks from newest to oldest, but drops the objects inside
/// each block in construction order. With blocks `[a, b] -> [c, d]` the drop
/// order is `c, d, a, b`.
///
/// # Example
///
/// ```rust,ignore
/// let arena = UniformArena::<i32>::new();
/// let a = arena.create(1)?;
/// let b = arena.create(2)?;
/// let c = arena.create(5)?;
/// *c = *a + *b;
/// ```
pub struct UniformArena<T> {
    chain: BlockChain,
    stride: usize,
    // Owns `T` values and is invariant in `T`.
    _marker: PhantomData<Cell<T>>,
}

impl<T> UniformArena<T> {
    /// Stride used for `T`: its size rounded up to its alignment, at least
    /// one alignment unit so zero-sized values still get distinct slots.
    #[must_use]
    pub const fn stride_of() -> usize {
        let align = mem::align_of::<T>();
        let size = align_up(mem::size_of::<T>(), align);
        if size == 0 {
            align
        } else {
            size
        }
    }

    /// Arena with the default 2048-byte blocks.
    ///
    /// # Panics
    ///
    /// Panics if the original block cannot be allocated; see
    /// [`UniformArena::try_new`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::default())
    }

    /// Arena with blocks of `block_capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if the original block cannot be allocated.
    #[must_use]
    pub fn with_capacity(block_capacity: usize) -> Self {
        Self::with_config(ArenaConfig::with_capacity(block_capacity))
    }

    /// Arena with an explicit configuration. The original block is reserved
    /// here and kept for the arena's whole life unless the retention policy
    /// is [`ReleaseAll`](crate::RetentionPolicy::ReleaseAll).
    ///
    /// # Panics
    ///
    /// Panics if the original block cannot be allocated.
    #[must_use]
    pub fn with_config(config: ArenaConfig) -> Self {
        Self::from_chain(BlockChain::reserve(config, mem::align_of::<T>()))
    }

    /// Fallible [`UniformArena::new`].
    pub fn try_new() -> Result<Self, ArenaError> {
        Self::try_with_config(ArenaConfig::default())
    }

    /// Fallible [`UniformArena::with_capacity`].
    pub fn try_with_capacity(block_capacity: usize) -> Result<Self, ArenaError> {
        Self::try_with_config(ArenaConfig::with_capacity(block_capacity))
    }

    /// Fallible [`UniformArena::with_config`]: reports
    /// [`ArenaError::InvalidCapacity`] or [`ArenaError::OutOfMemory`] instead
    /// of panicking.
    pub fn try_with_config(config: ArenaConfig) -> Result<Self, ArenaError> {
        BlockChain::with_original(config, mem::align_of::<T>()).map(Self::from_chain)
    }

    fn from_chain(chain: BlockChain) -> Self {
        Self {
            chain,
            stride: Self::stride_of(),
            _marker: PhantomData,
        }
    }

    /// Bytes each value occupies.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Whether `T` fits in a block at all.
    #[must_use]
    pub fn fits(&self) -> bool {
        self.chain.check_fits(self.stride).is_ok()
    }

    /// Move `value` into the arena.
    ///
    /// Fails with [`ArenaError::ObjectTooLarge`] when the stride exceeds the
    /// block capacity and with [`ArenaError::OutOfMemory`] when a needed block
    /// cannot be allocated. On failure the arena is unchanged and `value` is
    /// dropped.
    pub fn create(&self, value: T) -> Result<&mut T, ArenaError> {
        self.chain.check_fits(self.stride)?;
        let stride = self.stride;
        let slot = self.chain.with_room(
            |block| block.remaining() >= stride,
            |block| {
                let slot = block.cursor_ptr().cast::<T>();
                block.advance(stride);
                slot
            },
        )?;
        // SAFETY: `slot` is aligned for `T` (blocks are aligned to `T` and
        // the stride is a multiple of its alignment), lies inside a block the
        // arena owns, and no other reference points at it. The block outlives
        // the returned borrow because releasing it requires `&mut self`.
        unsafe {
            slot.as_ptr().write(value);
            Ok(&mut *slot.as_ptr())
        }
    }

    /// Build a value with `f` and move it into the arena.
    ///
    /// `f` runs before the arena is touched, so it may itself create values
    /// in the same arena.
    pub fn create_with(&self, f: impl FnOnce() -> T) -> Result<&mut T, ArenaError> {
        self.chain.check_fits(self.stride)?;
        self.create(f())
    }

    /// Drop every value and release blocks per the retention policy.
    pub fn clear(&mut self) {
        let retain = self.chain.config().retains_original();
        self.release(retain);
    }

    fn release(&mut self, retain_original: bool) {
        let stride = self.stride;
        self.chain.clear(retain_original, |block, teardown| {
            let count = block.used() / stride;
            if !mem::needs_drop::<T>() {
                teardown.skip(count);
                return;
            }
            for index in 0..count {
                let object = block.ptr_at(index * stride).cast::<T>();
                // SAFETY: slot `index` of this block holds a live `T` written
                // by `create`; it is dropped once and never read again.
                teardown.destroy(|| unsafe { ptr::drop_in_place(object.as_ptr()) });
            }
        });
    }

    /// Number of live values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether the arena holds no live values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of blocks currently owned.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.chain.block_count()
    }

    /// Bytes reserved from the system allocator.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.chain.allocated_bytes()
    }

    /// Bytes occupied by live values across all blocks.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.chain.used_bytes()
    }

    /// Snapshot of activity counters.
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        self.chain.stats()
    }

    /// Reset activity counters.
    pub fn reset_stats(&self) {
        self.chain.reset_stats();
    }

    /// The arena's configuration.
    #[must_use]
    pub fn config(&self) -> &ArenaConfig {
        self.chain.config()
    }
}

impl<T> Default for UniformArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for UniformArena<T> {
    fn drop(&mut self) {
        self.release(false);
    }
}

impl<T> Arena for UniformArena<T> {
    fn clear(&mut self) {
        UniformArena::clear(self);
    }

    fn len(&self) -> usize {
        UniformArena::len(self)
    }

    fn block_count(&self) -> usize {
        UniformArena::block_count(self)
    }

    fn allocated_bytes(&self) -> usize {
        UniformArena::allocated_bytes(self)
    }

    fn stats(&self) -> ArenaStats {
        UniformArena::stats(self)
    }

    fn config(&self) -> &ArenaConfig {
        UniformArena::config(self)
    }
}

impl<T> ArenaCreate<T> for UniformArena<T> {
    fn create(&self, value: T) -> Result<&mut T, ArenaError> {
        UniformArena::create(self, value)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::config::{RetentionPolicy, DEFAULT_BLOCK_CAPACITY};

    struct Tracked {
        id: u32,
        log: Rc<RefCell<Vec<u32>>>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.log.borrow_mut().push(self.id);
        }
    }

    fn tracked(log: &Rc<RefCell<Vec<u32>>>, id: u32) -> Tracked {
        Tracked {
            id,
            log: Rc::clone(log),
        }
    }

    #[test]
    fn sum_scenario() {
        let mut arena = UniformArena::<i32>::new();
        let a = arena.create(1).unwrap();
        let b = arena.create(2).unwrap();
        let c = arena.create(5).unwrap();
        *c = *a + *b;
        assert_eq!(*a, 1);
        assert_eq!(*b, 2);
        assert_eq!(*c, 3);
        arena.clear();
        assert!(arena.is_empty());
    }

    #[test]
    fn stride_rounds_to_alignment() {
        #[repr(C)]
        struct Odd {
            _a: u32,
            _b: u8,
        }
        assert_eq!(UniformArena::<u8>::stride_of(), 1);
        assert_eq!(UniformArena::<u64>::stride_of(), 8);
        assert_eq!(UniformArena::<Odd>::stride_of(), 8);
        assert_eq!(UniformArena::<()>::stride_of(), 1);
        assert_eq!(UniformArena::<[u64; 0]>::stride_of(), 8);
    }

    #[test]
    fn grows_exactly_when_block_is_full() {
        let arena = UniformArena::<u64>::with_capacity(32);
        for i in 0..4 {
            arena.create(i).unwrap();
        }
        assert_eq!(arena.block_count(), 1);
        arena.create(4).unwrap();
        assert_eq!(arena.block_count(), 2);
        assert_eq!(arena.used_bytes(), 40);
        assert_eq!(arena.allocated_bytes(), 64);
    }

    #[test]
    fn references_survive_growth() {
        let arena = UniformArena::<u64>::with_capacity(16);
        let refs: Vec<&mut u64> = (0..10).map(|i| arena.create(i).unwrap()).collect();
        for (i, value) in refs.into_iter().enumerate() {
            assert_eq!(*value, i as u64);
            *value += 100;
            assert_eq!(*value, i as u64 + 100);
        }
    }

    #[test]
    fn clear_drop_order_is_forward_within_block_newest_block_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let stride = UniformArena::<Tracked>::stride_of();
        let mut arena = UniformArena::with_capacity(stride * 2);
        for id in 1..=5 {
            arena.create(tracked(&log, id)).unwrap();
        }
        assert_eq!(arena.block_count(), 3);
        arena.clear();
        assert_eq!(*log.borrow(), vec![5, 3, 4, 1, 2]);
        assert_eq!(arena.block_count(), 1);
        assert_eq!(arena.used_bytes(), 0);
    }

    #[test]
    fn retained_block_is_reused() {
        let mut arena = UniformArena::<u32>::with_capacity(64);
        arena.create(1).unwrap();
        arena.clear();
        arena.create(2).unwrap();
        let stats = arena.stats();
        assert_eq!(stats.blocks_allocated, 1);
        assert_eq!(stats.blocks_released, 0);
    }

    #[test]
    fn release_all_returns_every_block() {
        let config = ArenaConfig::with_capacity(8).retention(RetentionPolicy::ReleaseAll);
        let mut arena = UniformArena::<u64>::with_config(config);
        arena.create(1).unwrap();
        arena.create(2).unwrap();
        arena.clear();
        assert_eq!(arena.block_count(), 0);
        assert_eq!(arena.allocated_bytes(), 0);
        assert_eq!(*arena.create(3).unwrap(), 3);
        assert_eq!(arena.block_count(), 1);
    }

    #[test]
    fn oversized_type_is_rejected() {
        let arena = UniformArena::<[u8; 64]>::with_capacity(32);
        assert!(!arena.fits());
        assert_eq!(
            arena.create([0; 64]).err(),
            Some(ArenaError::ObjectTooLarge {
                required: 64,
                capacity: 32
            })
        );
        assert_eq!(arena.block_count(), 1);
        assert_eq!(arena.used_bytes(), 0);
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn original_block_exists_before_first_create() {
        let mut arena = UniformArena::<u32>::new();
        assert_eq!(arena.block_count(), 1);
        assert_eq!(arena.allocated_bytes(), DEFAULT_BLOCK_CAPACITY);
        arena.clear();
        assert_eq!(arena.block_count(), 1);
        assert_eq!(arena.used_bytes(), 0);

        arena.create(7).unwrap();
        assert_eq!(arena.stats().blocks_allocated, 1);
    }

    #[test]
    fn try_constructors_report_bad_capacity() {
        assert_eq!(
            UniformArena::<u64>::try_with_capacity(usize::MAX).err(),
            Some(ArenaError::InvalidCapacity {
                capacity: usize::MAX
            })
        );
        let arena = UniformArena::<u64>::try_with_capacity(64).unwrap();
        assert_eq!(arena.block_count(), 1);
        assert!(UniformArena::<u8>::try_new().is_ok());
    }

    #[test]
    fn create_with_can_nest() {
        let arena = UniformArena::<u32>::new();
        let outer = arena
            .create_with(|| *arena.create(20).unwrap() + 1)
            .unwrap();
        assert_eq!(*outer, 21);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn zero_sized_values_are_counted_and_dropped() {
        thread_local! {
            static DROPS: Cell<u32> = const { Cell::new(0) };
        }
        struct Unit;
        impl Drop for Unit {
            fn drop(&mut self) {
                DROPS.with(|drops| drops.set(drops.get() + 1));
            }
        }
        assert_eq!(mem::size_of::<Unit>(), 0);

        {
            let mut arena = UniformArena::with_capacity(16);
            for _ in 0..40 {
                arena.create(Unit).unwrap();
            }
            assert_eq!(arena.block_count(), 3);
            arena.clear();
            assert_eq!(DROPS.with(Cell::get), 40);
            arena.create(Unit).unwrap();
        }
        assert_eq!(DROPS.with(Cell::get), 41);
    }

    #[test]
    fn drop_runs_destructors_and_frees_blocks() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let arena = UniformArena::with_capacity(64);
            for id in 0..10 {
                arena.create(tracked(&log, id)).unwrap();
            }
        }
        assert_eq!(log.borrow().len(), 10);
    }

    #[test]
    fn over_aligned_values_are_aligned() {
        #[repr(align(64))]
        struct Line(u8);

        let arena = UniformArena::<Line>::with_capacity(256);
        for i in 0..10 {
            let line = arena.create(Line(i)).unwrap();
            assert_eq!(std::ptr::from_ref::<Line>(line) as usize % 64, 0);
            assert_eq!(line.0, i);
        }
    }
}
