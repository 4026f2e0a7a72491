use std::num::NonZero;
use std::ptr::NonNull;

use tracing::{debug, trace, warn};

use crate::{EntryList, EntryPoolBuilder, Error, Iter, Node, NodeMut, Result, Slab, can_multiply};

/// The maximum number of slabs an [`EntryPool`] can own.
///
/// Slab capacities double every time the pool grows, so even a pool that starts with a single
/// node reaches `2^31` nodes in its last slab. The directory of slabs therefore never needs to
/// grow and reaching this limit is treated as a hard failure.
pub const MAX_SLABS: usize = 32;

/// Every slab holds this many times the nodes of the slab before it.
pub(crate) const GROWTH_FACTOR: NonZero<usize> = NonZero::new(2).expect("2 is not zero");

/// A pool of linked list nodes that grows in geometrically increasing slabs.
///
/// The pool is meant for a decoder that emits one entry at a time and links the entries into a
/// list. Instead of allocating every node separately, [`alloc()`][Self::alloc] carves nodes out
/// of a slab and links each new node to the previous one, so the order of the list is the order
/// of the `alloc()` calls. When a slab is exhausted, a new slab twice the size of the previous one
/// is allocated and linked to the end of the list.
///
/// There is no way to release an individual node. The nodes are released together, in one of
/// two ways:
///
/// * Dropping the pool releases every slab and with it the entire list.
/// * [`detach()`][Self::detach] releases only the pool bookkeeping and hands the list to the
///   caller as an [`EntryList`], which releases the slabs when disposed of or dropped.
///
/// # Examples
///
/// ```
/// use entry_pool::EntryPool;
///
/// let mut pool = EntryPool::<u32>::new(2)?;
///
/// for value in [10, 20, 30] {
///     *pool.alloc()?.payload_mut() = value;
/// }
///
/// // The third node did not fit into the first slab, so a second one was allocated.
/// assert_eq!(pool.slab_count(), 2);
/// assert_eq!(pool.slab_capacity(1), Some(4));
///
/// let values = pool.iter().map(|node| *node.payload()).collect::<Vec<_>>();
/// assert_eq!(values, [10, 20, 30]);
/// # Ok::<(), entry_pool::Error>(())
/// ```
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) if `T` is, but it is not thread-safe ([`Sync`]).
#[derive(Debug)]
pub struct EntryPool<T> {
    /// The slab at the end is the one we are allocating out of. Every slab before it is full.
    slabs: heapless::Vec<Slab<T>, MAX_SLABS>,

    /// How many nodes of the last slab have been handed out.
    used: usize,

    /// The number of slabs we are allowed to grow to. Always `MAX_SLABS` outside of tests.
    slab_limit: usize,

    /// Number of nodes handed out. We track this explicitly to avoid summing across slabs.
    length: usize,
}

impl<T: Default> EntryPool<T> {
    /// Creates a pool whose first slab holds `initial_capacity` nodes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if `initial_capacity` is zero,
    /// [`Error::CapacityOverflow`] if the size of the slab cannot be represented and
    /// [`Error::AllocationFailed`] if the memory for the slab cannot be allocated.
    ///
    /// # Example
    ///
    /// ```
    /// use entry_pool::{EntryPool, Error};
    ///
    /// let pool = EntryPool::<u64>::new(16)?;
    /// assert_eq!(pool.capacity(), 16);
    /// assert!(pool.is_empty());
    ///
    /// assert_eq!(EntryPool::<u64>::new(0).unwrap_err(), Error::ZeroCapacity);
    /// # Ok::<(), Error>(())
    /// ```
    pub fn new(initial_capacity: usize) -> Result<Self> {
        Self::builder().initial_capacity(initial_capacity).build()
    }

    pub(crate) fn new_inner(initial_capacity: usize, slab_limit: usize) -> Result<Self> {
        assert!(
            (1..=MAX_SLABS).contains(&slab_limit),
            "slab limit {slab_limit} must be between 1 and {MAX_SLABS}"
        );

        let slab = Slab::new(initial_capacity)?;

        let mut slabs = heapless::Vec::new();
        if slabs.push(slab).is_err() {
            unreachable!("an empty slab directory always has room for the first slab");
        }

        debug!(initial_capacity, "created entry pool");

        Ok(Self {
            slabs,
            used: 0,
            slab_limit,
            length: 0,
        })
    }

    /// Takes the next node from the pool, linking it after the previously allocated node.
    ///
    /// The payload of the returned node holds `T::default()` until the caller fills it in.
    ///
    /// If the current slab is exhausted, a new slab twice its size is allocated first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlabLimitReached`] if the pool would need more than [`MAX_SLABS`] slabs,
    /// [`Error::CapacityOverflow`] if the size of the new slab cannot be represented and
    /// [`Error::AllocationFailed`] if the memory for the new slab cannot be allocated.
    ///
    /// The pool is unchanged when an error is returned. Callers are expected to treat any error
    /// as fatal to whatever they are building.
    ///
    /// # Example
    ///
    /// ```
    /// use entry_pool::EntryPool;
    ///
    /// let mut pool = EntryPool::<&str>::new(4)?;
    ///
    /// let mut node = pool.alloc()?;
    /// *node.payload_mut() = "first";
    /// assert!(node.is_head());
    ///
    /// let mut node = pool.alloc()?;
    /// *node.payload_mut() = "second";
    /// assert!(!node.is_head());
    ///
    /// assert_eq!(pool.len(), 2);
    /// # Ok::<(), entry_pool::Error>(())
    /// ```
    pub fn alloc(&mut self) -> Result<NodeMut<'_, T>> {
        if self.used >= self.active_slab().capacity() {
            return self.alloc_from_new_slab();
        }

        let slab = self.active_slab();
        let mut node_ptr = slab.node_ptr(self.used);

        if let Some(previous_index) = self.used.checked_sub(1) {
            let mut previous_ptr = slab.node_ptr(previous_index);

            // SAFETY: The previous node is initialized and in bounds. Any reference we handed out
            // to it borrowed the pool exclusively and has therefore ended by now.
            unsafe {
                previous_ptr.as_mut().next = Some(node_ptr);
            }
        }

        self.used = self
            .used
            .checked_add(1)
            .expect("guarded by used < capacity above");
        self.length = self
            .length
            .checked_add(1)
            .expect("cannot have more nodes than fit in virtual memory");

        trace!(used = self.used, "allocated entry pool node");

        // SAFETY: The node is initialized and in bounds. The returned handle borrows the pool
        // exclusively, so nothing else can access the node while it lives.
        Ok(NodeMut::new(unsafe { node_ptr.as_mut() }))
    }

    fn alloc_from_new_slab(&mut self) -> Result<NodeMut<'_, T>> {
        let slab_count = self.slabs.len();

        if slab_count >= self.slab_limit {
            warn!(
                limit = self.slab_limit,
                "entry pool refused to grow beyond its slab limit"
            );
            return Err(Error::SlabLimitReached {
                limit: self.slab_limit,
            });
        }

        let previous = self.active_slab();
        let previous_capacity = previous.capacity();

        if !can_multiply(usize::MAX, previous_capacity, GROWTH_FACTOR.get()) {
            return Err(Error::CapacityOverflow);
        }

        let capacity = previous_capacity
            .checked_mul(GROWTH_FACTOR.get())
            .expect("guarded by can_multiply() above");

        let mut previous_last_ptr = previous.node_ptr(
            previous_capacity
                .checked_sub(1)
                .expect("slab capacity is never zero"),
        );

        let slab = Slab::new(capacity)?;
        let mut first_node_ptr = slab.first_node_ptr();

        if self.slabs.push(slab).is_err() {
            unreachable!("slab limit is never above MAX_SLABS and was checked above");
        }

        // SAFETY: The last node of the previous slab is initialized. Any reference we handed out
        // to it borrowed the pool exclusively and has therefore ended by now.
        unsafe {
            previous_last_ptr.as_mut().next = Some(first_node_ptr);
        }

        self.used = 1;
        self.length = self
            .length
            .checked_add(1)
            .expect("cannot have more nodes than fit in virtual memory");

        debug!(slab_index = slab_count, capacity, "entry pool grew a new slab");

        // SAFETY: The node is initialized and in bounds. The returned handle borrows the pool
        // exclusively, so nothing else can access the node while it lives.
        Ok(NodeMut::new(unsafe { first_node_ptr.as_mut() }))
    }
}

impl<T> EntryPool<T> {
    /// Starts building a new [`EntryPool`].
    ///
    /// # Example
    ///
    /// ```
    /// use entry_pool::EntryPool;
    ///
    /// let pool = EntryPool::<u32>::builder().initial_capacity(128).build()?;
    /// assert_eq!(pool.capacity(), 128);
    /// # Ok::<(), entry_pool::Error>(())
    /// ```
    pub fn builder() -> EntryPoolBuilder<T> {
        EntryPoolBuilder::new()
    }

    fn active_slab(&self) -> &Slab<T> {
        self.slabs
            .last()
            .expect("pool always owns at least one slab")
    }

    /// The number of nodes handed out by [`alloc()`][Self::alloc].
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether no node has been handed out yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The number of nodes the pool can hand out before it needs to grow again, including the
    /// nodes already handed out.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slabs.iter().map(Slab::capacity).sum()
    }

    /// The number of slabs the pool has allocated. This is at least 1 and at most [`MAX_SLABS`].
    #[must_use]
    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    /// The number of nodes in the slab at `index`, or `None` if the pool has not allocated
    /// that slab.
    #[must_use]
    pub fn slab_capacity(&self, index: usize) -> Option<usize> {
        self.slabs.get(index).map(Slab::capacity)
    }

    /// The number of nodes handed out from the slab the pool is currently allocating out of.
    #[must_use]
    pub fn used(&self) -> usize {
        self.used
    }

    /// The first node handed out by the pool, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Node<T>> {
        self.iter().next()
    }

    /// Iterates over the nodes handed out by the pool, in the order they were allocated.
    pub fn iter(&self) -> Iter<'_, T> {
        let first = (self.length > 0).then(|| self.first_node_ptr());

        // SAFETY: The chain starting at the first node has exactly `length` linked nodes (the
        // nodes after the last allocated one are not linked) and they live as long as the pool.
        // We hold a shared reference to the pool, so nobody holds exclusive references to nodes.
        unsafe { Iter::new(first, self.length) }
    }

    fn first_node_ptr(&self) -> NonNull<Node<T>> {
        self.slabs
            .first()
            .expect("pool always owns at least one slab")
            .first_node_ptr()
    }

    /// Releases the pool bookkeeping and hands the list built from the pool to the caller.
    ///
    /// No node is modified by this. The returned [`EntryList`] owns every slab of the pool and
    /// releases them when it is [disposed of][EntryList::dispose] or dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use entry_pool::EntryPool;
    ///
    /// let mut pool = EntryPool::<u8>::new(1)?;
    /// *pool.alloc()?.payload_mut() = 1;
    /// *pool.alloc()?.payload_mut() = 2;
    ///
    /// let list = pool.detach();
    /// assert_eq!(list.len(), 2);
    ///
    /// list.dispose()?;
    /// # Ok::<(), entry_pool::Error>(())
    /// ```
    #[must_use]
    pub fn detach(self) -> EntryList<T> {
        let Self { slabs, length, .. } = self;
        let slab_count = slabs.len();

        let mut slabs = slabs.into_iter();

        let (first_node_ptr, first_slab_capacity) = slabs
            .next()
            .expect("pool always owns at least one slab")
            .into_raw_parts();

        // The list finds the remaining slabs by walking the chain.
        for slab in slabs {
            _ = slab.into_raw_parts();
        }

        debug!(len = length, slab_count, "detached entry list from entry pool");

        // SAFETY: The slabs were allocated by the pool with capacities doubling from the first
        // one, linked in order and ownership of all of them has been given up above.
        unsafe { EntryList::from_raw_parts(first_node_ptr, first_slab_capacity, length) }
    }

    #[cfg(test)]
    pub(crate) fn slab(&self, index: usize) -> &Slab<T> {
        self.slabs.get(index).expect("slab index out of bounds")
    }
}

impl<'a, T> IntoIterator for &'a EntryPool<T> {
    type Item = &'a Node<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
impl<T: Default> EntryPool<T> {
    /// Creates a pool that refuses to grow beyond `slab_limit` slabs, so the exhaustion path can
    /// be reached without allocating `2^32` nodes.
    pub(crate) fn with_slab_limit(initial_capacity: usize, slab_limit: usize) -> Result<Self> {
        Self::new_inner(initial_capacity, slab_limit)
    }
}
