use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{EntryPool, MAX_SLABS, Result};

/// The number of nodes in the first slab of a pool unless configured otherwise.
pub const DEFAULT_INITIAL_CAPACITY: usize = 64;

/// Builder for creating an instance of [`EntryPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// [`EntryPool::new()`][1] is sufficient when all you want to choose is the initial capacity.
///
/// # Examples
///
/// ```
/// use entry_pool::{DEFAULT_INITIAL_CAPACITY, EntryPool};
///
/// let pool = EntryPool::<u32>::builder().build()?;
/// assert_eq!(pool.capacity(), DEFAULT_INITIAL_CAPACITY);
///
/// let pool = EntryPool::<u32>::builder().initial_capacity(8).build()?;
/// assert_eq!(pool.capacity(), 8);
/// # Ok::<(), entry_pool::Error>(())
/// ```
///
/// [1]: EntryPool::new
#[must_use]
pub struct EntryPoolBuilder<T> {
    initial_capacity: usize,

    _item: PhantomData<T>,
}

impl<T> fmt::Debug for EntryPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("initial_capacity", &self.initial_capacity)
            .finish()
    }
}

impl<T> EntryPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            _item: PhantomData,
        }
    }

    /// Sets the number of nodes in the first slab. Every following slab is twice the size of the
    /// one before it.
    ///
    /// A zero capacity is accepted here but rejected by [`build()`][Self::build].
    pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }
}

impl<T: Default> EntryPoolBuilder<T> {
    /// Builds the pool with the specified configuration, allocating its first slab.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`][crate::Error::ZeroCapacity] if the initial capacity is
    /// zero, [`Error::CapacityOverflow`][crate::Error::CapacityOverflow] if the size of the first
    /// slab cannot be represented and [`Error::AllocationFailed`][crate::Error::AllocationFailed]
    /// if its memory cannot be allocated.
    pub fn build(self) -> Result<EntryPool<T>> {
        EntryPool::new_inner(self.initial_capacity, MAX_SLABS)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::Error;

    assert_impl_all!(EntryPoolBuilder<u32>: Send, fmt::Debug);

    #[test]
    fn builder_new_creates_default_state() {
        let builder = EntryPoolBuilder::<u32>::new();
        assert_eq!(builder.initial_capacity, DEFAULT_INITIAL_CAPACITY);
    }

    #[test]
    fn initial_capacity_is_applied() {
        let pool = EntryPoolBuilder::<u32>::new()
            .initial_capacity(5)
            .build()
            .unwrap();

        assert_eq!(pool.capacity(), 5);
        assert_eq!(pool.slab_count(), 1);
    }

    #[test]
    fn zero_initial_capacity_fails_on_build() {
        let builder = EntryPoolBuilder::<u32>::new().initial_capacity(0);

        assert_eq!(builder.build().unwrap_err(), Error::ZeroCapacity);
    }

    #[test]
    fn debug_shows_configuration() {
        let builder = EntryPoolBuilder::<u32>::new().initial_capacity(9);

        let debug = format!("{builder:?}");
        assert!(debug.contains("initial_capacity: 9"));
    }
}
