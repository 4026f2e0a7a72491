use std::ptr::NonNull;

/// One element of the linked list built from an [`EntryPool`][crate::EntryPool].
///
/// Nodes are handed out by [`EntryPool::alloc()`][crate::EntryPool::alloc] already linked to
/// the node allocated before them, so walking the list visits the nodes in allocation order. The
/// decoder that owns the pool stores its decoded data in the payload.
///
/// # Memory layout
///
/// The node is `#[repr(C)]`: the head marker comes first, followed by the link to the next node
/// and then the payload. Code that addresses the payload relative to the link fields can rely on
/// this order.
///
/// # Head nodes
///
/// The first node of every slab is flagged as a head node. This is how a detached
/// [`EntryList`][crate::EntryList] finds slab boundaries when it releases its memory after the
/// pool bookkeeping is gone.
#[derive(Debug)]
#[repr(C)]
pub struct Node<T> {
    pub(crate) head: bool,

    /// Points into the same slab or to the first node of the following slab.
    pub(crate) next: Option<NonNull<Node<T>>>,

    pub(crate) payload: T,
}

impl<T> Node<T> {
    pub(crate) fn new(head: bool, payload: T) -> Self {
        Self {
            head,
            next: None,
            payload,
        }
    }

    /// Whether this node is the first node of its slab.
    #[must_use]
    #[inline]
    pub fn is_head(&self) -> bool {
        self.head
    }

    /// Whether another node has been linked after this one.
    ///
    /// The most recently allocated node never has a successor.
    #[must_use]
    #[inline]
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// The data stored in this node.
    #[must_use]
    #[inline]
    pub fn payload(&self) -> &T {
        &self.payload
    }
}

/// Exclusive access to the payload of a [`Node`].
///
/// Returned by [`EntryPool::alloc()`][crate::EntryPool::alloc] and
/// [`EntryList::iter_mut()`][crate::EntryList::iter_mut]. The handle never gives out the node
/// itself, only its payload, so the head marker and the link to the next node stay exactly as the
/// pool wrote them. Swapping two handles swaps the handles, not the nodes.
///
/// ```compile_fail
/// use entry_pool::EntryPool;
///
/// let mut first = EntryPool::<u32>::new(1)?;
/// let mut second = EntryPool::<u32>::new(1)?;
///
/// let mut a = first.alloc()?;
/// let mut b = second.alloc()?;
///
/// // There is no `Node` behind the handle to swap.
/// std::mem::swap(&mut *a, &mut *b);
/// # Ok::<(), entry_pool::Error>(())
/// ```
#[derive(Debug)]
pub struct NodeMut<'a, T> {
    node: &'a mut Node<T>,
}

impl<'a, T> NodeMut<'a, T> {
    pub(crate) fn new(node: &'a mut Node<T>) -> Self {
        Self { node }
    }

    /// Whether this node is the first node of its slab.
    #[must_use]
    #[inline]
    pub fn is_head(&self) -> bool {
        self.node.head
    }

    /// Whether another node has been linked after this one.
    #[must_use]
    #[inline]
    pub fn has_next(&self) -> bool {
        self.node.next.is_some()
    }

    /// The data stored in this node.
    #[must_use]
    #[inline]
    pub fn payload(&self) -> &T {
        &self.node.payload
    }

    /// Exclusive access to the data stored in this node.
    #[must_use]
    #[inline]
    pub fn payload_mut(&mut self) -> &mut T {
        &mut self.node.payload
    }

    /// Converts the handle into exclusive access to the payload for the full lifetime `'a`.
    #[must_use]
    #[inline]
    pub fn into_payload_mut(self) -> &'a mut T {
        let Self { node } = self;
        &mut node.payload
    }
}
