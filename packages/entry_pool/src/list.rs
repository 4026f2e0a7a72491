use std::num::NonZero;
use std::ptr::NonNull;

use tracing::{debug, warn};

use crate::{Error, GROWTH_FACTOR, Iter, IterMut, Node, NodeMut, Result, Slab};

/// A linked list detached from an [`EntryPool`][crate::EntryPool] via
/// [`EntryPool::detach()`][crate::EntryPool::detach].
///
/// The list owns the slabs of the pool it came from but none of the pool bookkeeping. It finds
/// the slabs again by walking the list: every slab starts with a [head node][Node::is_head] and
/// the slab sizes double from the first slab onwards, exactly as they did in the pool.
///
/// Release the list with [`dispose()`][Self::dispose] to learn whether it was intact. Dropping
/// the list releases it the same way, ignoring the outcome.
///
/// # Examples
///
/// ```
/// use entry_pool::EntryPool;
///
/// let mut pool = EntryPool::<String>::new(2)?;
///
/// for word in ["alpha", "beta", "gamma"] {
///     pool.alloc()?.payload_mut().push_str(word);
/// }
///
/// let mut list = pool.detach();
///
/// for mut node in list.iter_mut() {
///     node.payload_mut().make_ascii_uppercase();
/// }
///
/// let words = list.iter().map(|node| node.payload().as_str()).collect::<Vec<_>>();
/// assert_eq!(words, ["ALPHA", "BETA", "GAMMA"]);
///
/// list.dispose()?;
/// # Ok::<(), entry_pool::Error>(())
/// ```
///
/// # Thread safety
///
/// The list is thread-mobile ([`Send`]) if `T` is, but it is not thread-safe ([`Sync`]).
#[derive(Debug)]
pub struct EntryList<T> {
    /// The first node of the first slab. `None` once the list has been released.
    first_node_ptr: Option<NonNull<Node<T>>>,

    first_slab_capacity: NonZero<usize>,

    /// Number of linked nodes, which may be less than the combined capacity of the slabs.
    length: usize,
}

impl<T> EntryList<T> {
    /// # Safety
    ///
    /// The caller must transfer ownership of a chain of slabs whose capacities double starting
    /// from `first_slab_capacity`, linked in order, with exactly `length` nodes linked starting
    /// from `first_node_ptr`.
    pub(crate) unsafe fn from_raw_parts(
        first_node_ptr: NonNull<Node<T>>,
        first_slab_capacity: NonZero<usize>,
        length: usize,
    ) -> Self {
        Self {
            first_node_ptr: Some(first_node_ptr),
            first_slab_capacity,
            length,
        }
    }

    /// The number of nodes in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the list has no nodes.
    ///
    /// An empty list still owns the first slab of the pool it came from.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The first node of the list, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Node<T>> {
        self.iter().next()
    }

    fn linked_first_node_ptr(&self) -> Option<NonNull<Node<T>>> {
        self.first_node_ptr.filter(|_| self.length > 0)
    }

    /// Iterates over the nodes in the order they were allocated.
    pub fn iter(&self) -> Iter<'_, T> {
        // SAFETY: We own the chain, it has exactly `length` linked nodes and we hold a shared
        // reference to the list, so nobody holds exclusive references to nodes.
        unsafe { Iter::new(self.linked_first_node_ptr(), self.length) }
    }

    /// Iterates over the nodes in the order they were allocated, with exclusive access to the
    /// payload of each.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        // SAFETY: We own the chain, it has exactly `length` linked nodes and we hold an exclusive
        // reference to the list, so nobody else can access the nodes.
        unsafe { IterMut::new(self.linked_first_node_ptr(), self.length) }
    }

    /// Releases every slab of the list, dropping all payloads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptedChain`] if a slab does not start with a head node. Slabs before
    /// the corrupted one are released, the corrupted slab and all slabs after it are leaked.
    pub fn dispose(mut self) -> Result<()> {
        self.release()
    }

    /// Walks the chain one slab at a time, releasing each slab after locating the first node of
    /// the slab that follows it. Does nothing if the list has already been released.
    fn release(&mut self) -> Result<()> {
        let Some(mut head_ptr) = self.first_node_ptr.take() else {
            return Ok(());
        };

        let mut capacity = self.first_slab_capacity;
        let mut slab_index = 0_usize;

        loop {
            // SAFETY: The node is the first node of the first slab or the first linked node
            // outside of the previous slab. Either way it is an initialized node of a slab we own
            // that has not been released yet.
            if !unsafe { head_ptr.as_ref() }.is_head() {
                warn!(
                    slab_index,
                    "entry list does not start a slab with a head node, leaking the rest"
                );
                return Err(Error::CorruptedChain { slab_index });
            }

            // SAFETY: Slabs are linked in allocation order and the pool doubled the capacity of
            // every slab it added, so this is the start of a slab of exactly this capacity. We
            // reassemble each slab once because we only ever move forward along the chain.
            let slab = unsafe { Slab::<T>::from_raw_parts(head_ptr, capacity) };

            let next_head_ptr = slab.next_slab_first_node();
            drop(slab);

            slab_index = slab_index
                .checked_add(1)
                .expect("cannot have more slabs than fit in virtual memory");

            let Some(next_head_ptr) = next_head_ptr else {
                debug!(
                    len = self.length,
                    slab_count = slab_index,
                    "disposed of entry list"
                );
                return Ok(());
            };

            head_ptr = next_head_ptr;
            capacity = capacity
                .checked_mul(GROWTH_FACTOR)
                .expect("the pool never allocated a slab whose capacity overflows");
        }
    }

    #[cfg(test)]
    fn node_mut(&mut self, position: usize) -> &mut Node<T> {
        assert!(position < self.length, "position out of bounds");

        let mut node_ptr = self
            .linked_first_node_ptr()
            .expect("non-empty list has a first node");

        for _ in 0..position {
            // SAFETY: Every node before `length` is linked and alive while we own the list.
            node_ptr = unsafe { node_ptr.as_ref() }
                .next
                .expect("linked nodes before length have a successor");
        }

        // SAFETY: We hold the list exclusively, so nothing else accesses the node.
        unsafe { node_ptr.as_mut() }
    }
}

impl<T> Drop for EntryList<T> {
    fn drop(&mut self) {
        if let Err(error) = self.release() {
            debug!(%error, "dropped a corrupted entry list");
        }
    }
}

// SAFETY: Yes, there are raw pointers involved here but nothing inherently non-thread-mobile
// about it, so as long as T itself can move between threads, the list can do so, too.
unsafe impl<T: Send> Send for EntryList<T> {}

impl<'a, T> IntoIterator for &'a EntryList<T> {
    type Item = &'a Node<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut EntryList<T> {
    type Item = NodeMut<'a, T>;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
