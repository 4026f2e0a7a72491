use thiserror::Error;

/// Errors that can occur when allocating from an [`EntryPool`][crate::EntryPool] or when
/// disposing of an [`EntryList`][crate::EntryList].
///
/// None of these are retried internally. A decoder that receives any of them from
/// [`EntryPool::alloc()`][crate::EntryPool::alloc] is expected to abandon the decode in progress
/// and drop the pool.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The caller asked for a pool whose first slab holds zero nodes.
    #[error("the initial capacity of an entry pool must be non-zero")]
    ZeroCapacity,

    /// A size calculation would have exceeded the range of `usize` or the limits of
    /// [`std::alloc::Layout`].
    #[error("entry pool size calculation overflowed")]
    CapacityOverflow,

    /// The global allocator could not provide the memory for a slab.
    #[error("failed to allocate {bytes} bytes for a slab of {capacity} nodes")]
    AllocationFailed {
        /// The number of bytes requested from the allocator.
        bytes: usize,

        /// The number of nodes the slab would have held.
        capacity: usize,
    },

    /// The pool already owns the maximum number of slabs and cannot grow any further.
    #[error("entry pool cannot grow beyond {limit} slabs")]
    SlabLimitReached {
        /// The maximum number of slabs the pool may own.
        limit: usize,
    },

    /// A detached list did not have a head node where a slab was expected to start.
    ///
    /// Slabs released before this was detected stay released. Slabs after it are leaked.
    #[error("entry list is corrupted: slab {slab_index} does not start with a head node")]
    CorruptedChain {
        /// Zero-based position of the offending slab in the list.
        slab_index: usize,
    },
}

/// A specialized `Result` type for entry pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
