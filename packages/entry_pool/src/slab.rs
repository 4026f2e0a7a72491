use std::alloc::{Layout, alloc, dealloc};
use std::any::type_name;
use std::mem::ManuallyDrop;
use std::num::NonZero;
use std::ptr::{self, NonNull};

use crate::{Error, Node, Result, can_multiply};

/// One contiguous allocation of `capacity` nodes. This is the unit in which an
/// [`EntryPool`][crate::EntryPool] grows and in which a detached
/// [`EntryList`][crate::EntryList] is released.
///
/// Every node is initialized when the slab is created: the first one as a head node, the rest
/// as plain nodes, all unlinked and holding a default payload. Linking is the pool's job.
///
/// # Out of band access
///
/// The slab never creates references to its nodes. The pool and the list hand out references
/// through the node pointers, so the slab itself can be moved around freely while references
/// to its nodes exist.
#[derive(Debug)]
pub(crate) struct Slab<T> {
    first_node_ptr: NonNull<Node<T>>,
    capacity: NonZero<usize>,
}

impl<T: Default> Slab<T> {
    /// Allocates a slab for `capacity` nodes.
    ///
    /// Fails if the capacity is zero, if the size of the slab cannot be represented or if the
    /// global allocator cannot provide the memory. Nothing is leaked on failure.
    pub(crate) fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZero::new(capacity).ok_or(Error::ZeroCapacity)?;
        let layout = Self::layout(capacity).ok_or(Error::CapacityOverflow)?;

        // SAFETY: The layout is valid for an array of nodes and is not zero-sized because a node
        // always contains at least the head marker and the capacity is non-zero.
        let first_node_ptr = NonNull::new(unsafe { alloc(layout) })
            .ok_or(Error::AllocationFailed {
                bytes: layout.size(),
                capacity: capacity.get(),
            })?
            .cast::<Node<T>>();

        for index in 0..capacity.get() {
            // SAFETY: We allocated memory for capacity.get() nodes above and the index is bounded
            // by the loop range.
            let node_ptr = unsafe { first_node_ptr.add(index) };

            // SAFETY: The pointer is valid for writes, properly aligned by the array layout and
            // not yet initialized, so writing without dropping is correct.
            unsafe {
                node_ptr.write(Node::new(index == 0, T::default()));
            }
        }

        Ok(Self {
            first_node_ptr,
            capacity,
        })
    }
}

impl<T> Slab<T> {
    /// Reassembles a slab previously taken apart via [`into_raw_parts()`][Self::into_raw_parts].
    ///
    /// # Safety
    ///
    /// The parts must have come from `into_raw_parts()` on a slab of the same `T` and must not be
    /// reassembled more than once.
    pub(crate) unsafe fn from_raw_parts(
        first_node_ptr: NonNull<Node<T>>,
        capacity: NonZero<usize>,
    ) -> Self {
        Self {
            first_node_ptr,
            capacity,
        }
    }

    /// Gives up ownership of the memory without releasing it. The nodes stay alive until the
    /// parts are passed back to [`from_raw_parts()`][Self::from_raw_parts].
    #[must_use]
    pub(crate) fn into_raw_parts(self) -> (NonNull<Node<T>>, NonZero<usize>) {
        let this = ManuallyDrop::new(self);
        (this.first_node_ptr, this.capacity)
    }

    /// Size calculation for a slab, guarded against overflow. Returns `None` if the slab
    /// cannot be represented.
    fn layout(capacity: NonZero<usize>) -> Option<Layout> {
        if !can_multiply(usize::MAX, capacity.get(), size_of::<Node<T>>()) {
            return None;
        }

        Layout::array::<Node<T>>(capacity.get()).ok()
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity.get()
    }

    #[must_use]
    pub(crate) fn first_node_ptr(&self) -> NonNull<Node<T>> {
        self.first_node_ptr
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[must_use]
    pub(crate) fn node_ptr(&self, index: usize) -> NonNull<Node<T>> {
        assert!(
            index < self.capacity.get(),
            "node {index} index out of bounds in slab of {} with capacity {}",
            type_name::<T>(),
            self.capacity.get()
        );

        // SAFETY: Guarded by bounds check above, so we are guaranteed that the pointer is valid.
        unsafe { self.first_node_ptr.add(index) }
    }

    /// Whether the node lives in the memory of this slab.
    #[must_use]
    fn contains(&self, node_ptr: NonNull<Node<T>>) -> bool {
        let start = self.first_node_ptr.as_ptr().cast_const();

        // Cannot overflow because that would imply the slab extends beyond virtual memory.
        let end = start.wrapping_add(self.capacity.get());

        let node_ptr = node_ptr.as_ptr().cast_const();

        start <= node_ptr && node_ptr < end
    }

    /// Follows the `next` links from the first node of this slab to the first linked node
    /// outside of it, which is the first node of the following slab. Returns `None` if the
    /// chain ends in this slab.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to an infinite loop.
    pub(crate) fn next_slab_first_node(&self) -> Option<NonNull<Node<T>>> {
        let mut node_ptr = self.first_node_ptr;

        loop {
            // SAFETY: The node is inside this slab (checked on the previous iteration or it is
            // the first node) and every node of a slab is initialized when the slab is created.
            let next = unsafe { node_ptr.as_ref() }.next?;

            if !self.contains(next) {
                return Some(next);
            }

            node_ptr = next;
        }
    }
}

impl<T> Drop for Slab<T> {
    fn drop(&mut self) {
        let layout = Self::layout(self.capacity)
            .expect("layout was calculable when the slab was allocated so it still is");

        // SAFETY: Every node was initialized in the constructor and nothing has dropped them
        // since, as the slab is the only owner of the nodes.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.first_node_ptr.as_ptr(),
                self.capacity.get(),
            ));
        }

        // SAFETY: The layout must match between alloc and dealloc. It does.
        unsafe {
            dealloc(self.first_node_ptr.as_ptr().cast(), layout);
        }
    }
}

// SAFETY: Yes, there are raw pointers involved here but nothing inherently non-thread-mobile
// about it, so as long as T itself can move between threads, the slab can do so, too.
unsafe impl<T: Send> Send for Slab<T> {}
