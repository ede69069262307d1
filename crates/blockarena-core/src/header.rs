//! Per-object headers for the heterogeneous arena.
//!
//! Each record in a [`HeterogeneousArena`](crate::HeterogeneousArena) block is
//! laid out as `[ObjectHeader][padding][object]`. The header stores the sizes
//! needed to step to the next record and a destructor trampoline
//! monomorphized for the object's concrete type, so `clear()` can drop mixed
//! types without knowing them.

use std::mem;
use std::ptr::{self, NonNull};

use crate::block::align_up;

/// Type-erased destructor: drops the value stored at the given address.
pub type DropFn = unsafe fn(*mut u8);

/// Metadata written in front of every object in a heterogeneous block.
#[derive(Debug, Clone, Copy)]
pub struct ObjectHeader {
    object_size: usize,
    padding: usize,
    destructor: Option<DropFn>,
}

/// Alignment of [`ObjectHeader`]; every record starts on this boundary.
pub const HEADER_ALIGN: usize = mem::align_of::<ObjectHeader>();

/// Bytes occupied by a header, padded to its alignment.
pub const HEADER_STRIDE: usize = align_up(mem::size_of::<ObjectHeader>(), HEADER_ALIGN);

/// Drops a `T` in place. One instance exists per type stored in an arena.
///
/// # Safety
///
/// `object` must point to a live, properly aligned `T` that is not used again.
unsafe fn drop_trampoline<T>(object: *mut u8) {
    // SAFETY: guaranteed by the caller.
    unsafe { ptr::drop_in_place(object.cast::<T>()) }
}

/// Size of a `T` rounded so the record following it starts header-aligned.
#[must_use]
pub const fn padded_size<T>() -> usize {
    align_up(mem::size_of::<T>(), HEADER_ALIGN)
}

/// Largest number of padding bytes a `T` can need after a header.
#[must_use]
pub const fn alignment_slack<T>() -> usize {
    mem::align_of::<T>().saturating_sub(HEADER_ALIGN)
}

/// Padding between a header written at `header_at` and a `T` placed after it.
pub(crate) fn padding_for<T>(header_at: NonNull<u8>) -> usize {
    let after_header = header_at.as_ptr() as usize + HEADER_STRIDE;
    align_up(after_header, mem::align_of::<T>()) - after_header
}

impl ObjectHeader {
    /// Header describing a `T` stored `padding` bytes after the header.
    #[must_use]
    pub fn for_type<T>(padding: usize) -> Self {
        let destructor: Option<DropFn> = if mem::needs_drop::<T>() {
            Some(drop_trampoline::<T>)
        } else {
            None
        };
        Self {
            object_size: padded_size::<T>(),
            padding,
            destructor,
        }
    }

    /// Padded size of the object in bytes.
    #[must_use]
    pub fn object_size(&self) -> usize {
        self.object_size
    }

    /// Alignment padding between the header and the object.
    #[must_use]
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Whether dropping the object runs any code.
    #[must_use]
    pub fn has_destructor(&self) -> bool {
        self.destructor.is_some()
    }

    /// Distance from the header to the object.
    #[must_use]
    pub fn object_offset(&self) -> usize {
        HEADER_STRIDE + self.padding
    }

    /// Distance from this header to the next record's header.
    #[must_use]
    pub fn record_size(&self) -> usize {
        self.object_offset() + self.object_size
    }

    /// Run the stored destructor on `object`.
    ///
    /// # Safety
    ///
    /// `object` must be the address of the live object this header was
    /// created for, and the object must not be used afterwards.
    pub unsafe fn destroy(&self, object: NonNull<u8>) {
        if let Some(destructor) = self.destructor {
            // SAFETY: forwarded from the caller; the trampoline was
            // instantiated for the object's type.
            unsafe { destructor(object.as_ptr()) };
        }
    }
}
