//! Heterogeneous arena: one chain of blocks holding values of any type.

use std::cell::Cell;
use std::marker::PhantomData;

use crate::arena::{Arena, ArenaCreate};
use crate::chain::BlockChain;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::header::{self, ObjectHeader, HEADER_ALIGN, HEADER_STRIDE};
use crate::stats::ArenaStats;

/// Bump arena for values of mixed types.
///
/// Each value is preceded by an [`ObjectHeader`] recording its padded size
/// and a destructor trampoline for its type, so `clear()` can walk a block
/// record by record and drop whatever it finds. Blocks are visited newest
/// first and records within a block oldest first, as in
/// [`UniformArena`](crate::UniformArena).
///
/// Values may borrow data that lives for `'a`; the arena must be dropped
/// before `'a` ends.
pub struct HeterogeneousArena<'a> {
    chain: BlockChain,
    _marker: PhantomData<Cell<&'a ()>>,
}

impl<'a> HeterogeneousArena<'a> {
    /// Arena with the default 2048-byte blocks.
    ///
    /// # Panics
    ///
    /// Panics if the original block cannot be allocated; see
    /// [`HeterogeneousArena::try_new`].
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

    /// Arena with an explicit configuration; reserves the original block.
    ///
    /// # Panics
    ///
    /// Panics if the original block cannot be allocated.
    #[must_use]
    pub fn with_config(config: ArenaConfig) -> Self {
        Self::from_chain(BlockChain::reserve(config, HEADER_ALIGN))
    }

    /// Fallible [`HeterogeneousArena::new`].
    pub fn try_new() -> Result<Self, ArenaError> {
        Self::try_with_config(ArenaConfig::default())
    }

    /// Fallible [`HeterogeneousArena::with_capacity`].
    pub fn try_with_capacity(block_capacity: usize) -> Result<Self, ArenaError> {
        Self::try_with_config(ArenaConfig::with_capacity(block_capacity))
    }

    /// Fallible [`HeterogeneousArena::with_config`].
    pub fn try_with_config(config: ArenaConfig) -> Result<Self, ArenaError> {
        BlockChain::with_original(config, HEADER_ALIGN).map(Self::from_chain)
    }

    fn from_chain(chain: BlockChain) -> Self {
        Self {
            chain,
            _marker: PhantomData,
        }
    }

    /// Worst-case bytes a `T` record can take, header and padding included.
    #[must_use]
    pub const fn footprint_of<T>() -> usize {
        HEADER_STRIDE + header::alignment_slack::<T>() + header::padded_size::<T>()
    }

    /// Whether a `T` record fits in a block at all.
    #[must_use]
    pub fn fits<T>(&self) -> bool {
        self.chain.check_fits(Self::footprint_of::<T>()).is_ok()
    }

    /// Move `value` into the arena behind a header describing it.
    ///
    /// Fails with [`ArenaError::ObjectTooLarge`] when the record can never fit
    /// in a block and with [`ArenaError::OutOfMemory`] when a needed block
    /// cannot be allocated. On failure the arena is unchanged and `value` is
    /// dropped.
    pub fn create<T: 'a>(&self, value: T) -> Result<&mut T, ArenaError> {
        self.chain.check_fits(Self::footprint_of::<T>())?;
        let object_size = header::padded_size::<T>();
        let (header_at, header) = self.chain.with_room(
            |block| {
                let padding = header::padding_for::<T>(block.cursor_ptr());
                block.remaining() >= HEADER_STRIDE + padding + object_size
            },
            |block| {
                let header_at = block.cursor_ptr();
                let header = ObjectHeader::for_type::<T>(header::padding_for::<T>(header_at));
                block.advance(header.record_size());
                (header_at, header)
            },
        )?;
        // SAFETY: the record `[header][padding][object]` was reserved inside
        // an owned block. `header_at` is header-aligned because every record
        // size is a multiple of `HEADER_ALIGN`, and the object offset includes
        // the padding that aligns it for `T`. Nothing else refers to the
        // record, and the block outlives the returned borrow because releasing
        // it requires `&mut self`.
        unsafe {
            header_at.cast::<ObjectHeader>().as_ptr().write(header);
            let object = header_at.as_ptr().add(header.object_offset()).cast::<T>();
            object.write(value);
            Ok(&mut *object)
        }
    }

    /// Build a value with `f` and move it into the arena.
    ///
    /// `f` runs before the arena is touched, so it may itself create values
    /// in the same arena.
    pub fn create_with<T: 'a>(&self, f: impl FnOnce() -> T) -> Result<&mut T, ArenaError> {
        self.chain.check_fits(Self::footprint_of::<T>())?;
        self.create(f())
    }

    /// Drop every value and release blocks per the retention policy.
    pub fn clear(&mut self) {
        let retain = self.chain.config().retains_original();
        self.release(retain);
    }

    fn release(&mut self, retain_original: bool) {
        self.chain.clear(retain_original, |block, teardown| {
            let mut offset = 0;
            while offset < block.used() {
                let header_at = block.ptr_at(offset);
                // SAFETY: every record in `0..used` starts with a header written
                // by `create`, at a header-aligned offset.
                let header = unsafe { header_at.cast::<ObjectHeader>().as_ptr().read() };
                let object = block.ptr_at(offset + header.object_offset());
                if header.has_destructor() {
                    // SAFETY: the header was written for the object at
                    // `object`, which is live and dropped exactly once here.
                    teardown.destroy(|| unsafe { header.destroy(object) });
                } else {
                    teardown.skip(1);
                }
                offset += header.record_size();
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

    /// Bytes occupied by records (headers, padding and values).
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

impl Default for HeterogeneousArena<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HeterogeneousArena<'_> {
    fn drop(&mut self) {
        self.release(false);
    }
}

impl Arena for HeterogeneousArena<'_> {
    fn clear(&mut self) {
        HeterogeneousArena::clear(self);
    }

    fn len(&self) -> usize {
        HeterogeneousArena::len(self)
    }

    fn block_count(&self) -> usize {
        HeterogeneousArena::block_count(self)
    }

    fn allocated_bytes(&self) -> usize {
        HeterogeneousArena::allocated_bytes(self)
    }

    fn stats(&self) -> ArenaStats {
        HeterogeneousArena::stats(self)
    }

    fn config(&self) -> &ArenaConfig {
        HeterogeneousArena::config(self)
    }
}

impl<'a, T: 'a> ArenaCreate<T> for HeterogeneousArena<'a> {
    fn create(&self, value: T) -> Result<&mut T, ArenaError> {
        HeterogeneousArena::create(self, value)
    }
}
