use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::{Node, NodeMut};

/// Iterates over the nodes of an [`EntryPool`][crate::EntryPool] or
/// [`EntryList`][crate::EntryList] in allocation order, following the `next` links across slab
/// boundaries.
///
/// Yields exactly as many nodes as the pool or list has handed out, even if more nodes are linked.
#[derive(Debug)]
pub struct Iter<'a, T> {
    next: Option<NonNull<Node<T>>>,
    remaining: usize,

    _nodes: PhantomData<&'a Node<T>>,
}

impl<T> Iter<'_, T> {
    /// # Safety
    ///
    /// `first` must be the start of a chain of at least `len` linked nodes that stay alive and are
    /// not mutated for the lifetime of the iterator.
    pub(crate) unsafe fn new(first: Option<NonNull<Node<T>>>, len: usize) -> Self {
        Self {
            next: first,
            remaining: len,
            _nodes: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a Node<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.remaining.checked_sub(1)?;
        let node_ptr = self.next?;

        // SAFETY: The constructor requires the first `len` nodes of the chain to stay alive and
        // unaliased by exclusive references for 'a and we have visited fewer than that.
        let node = unsafe { node_ptr.as_ref() };

        self.next = node.next;
        self.remaining = remaining;

        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// Iterates over the nodes of an [`EntryList`][crate::EntryList] in allocation order, granting
/// exclusive access to the payload of each node through a [`NodeMut`].
#[derive(Debug)]
pub struct IterMut<'a, T> {
    next: Option<NonNull<Node<T>>>,
    remaining: usize,

    _nodes: PhantomData<&'a mut Node<T>>,
}

impl<T> IterMut<'_, T> {
    /// # Safety
    ///
    /// `first` must be the start of a chain of at least `len` linked nodes that stay alive and are
    /// not otherwise accessed for the lifetime of the iterator.
    pub(crate) unsafe fn new(first: Option<NonNull<Node<T>>>, len: usize) -> Self {
        Self {
            next: first,
            remaining: len,
            _nodes: PhantomData,
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = NodeMut<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.remaining.checked_sub(1)?;
        let mut node_ptr = self.next?;

        // SAFETY: The constructor grants us exclusive access to the first `len` nodes of the
        // chain for 'a and every node is visited at most once because the links only ever point
        // forward.
        let node = unsafe { node_ptr.as_mut() };

        self.next = node.next;
        self.remaining = remaining;

        Some(NodeMut::new(node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> FusedIterator for IterMut<'_, T> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::ptr::NonNull;

    use super::*;
    use crate::EntryPool;

    fn pool_with(values: impl IntoIterator<Item = u32>) -> EntryPool<u32> {
        let mut pool = EntryPool::<u32>::new(2).unwrap();

        for value in values {
            *pool.alloc().unwrap().payload_mut() = value;
        }

        pool
    }

    fn first_ptr(pool: &EntryPool<u32>) -> NonNull<Node<u32>> {
        pool.slab(0).first_node_ptr()
    }

    #[test]
    fn stops_at_recorded_length_of_longer_chain() {
        let pool = pool_with(0..6);

        // SAFETY: The pool links six nodes, so a chain of at least three exists and we only hold
        // shared references to the pool.
        let mut iter = unsafe { Iter::new(Some(first_ptr(&pool)), 3) };

        assert_eq!(iter.len(), 3);
        assert_eq!(iter.next().map(Node::payload), Some(&0));
        assert_eq!(iter.len(), 2);

        let rest = iter.by_ref().map(|node| *node.payload()).collect::<Vec<_>>();
        assert_eq!(rest, [1, 2]);

        assert_eq!(iter.len(), 0);
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn mut_stops_at_recorded_length_of_longer_chain() {
        let pool = pool_with(0..6);
        let first = first_ptr(&pool);

        {
            // SAFETY: The pool links six nodes and nothing else accesses them while the iterator
            // is alive.
            let iter = unsafe { IterMut::<u32>::new(Some(first), 4) };

            assert_eq!(iter.len(), 4);

            let mut visited = 0;
            for mut node in iter {
                *node.payload_mut() += 100;
                visited += 1;
            }
            assert_eq!(visited, 4);
        }

        let values = pool.iter().map(|node| *node.payload()).collect::<Vec<_>>();
        assert_eq!(values, [100, 101, 102, 103, 4, 5]);
    }

    #[test]
    fn zero_length_yields_nothing() {
        let pool = pool_with(0..2);

        // SAFETY: Nothing is visited.
        let mut iter = unsafe { Iter::new(Some(first_ptr(&pool)), 0) };

        assert_eq!(iter.len(), 0);
        assert!(iter.next().is_none());
    }

    #[test]
    fn count_matches_len_across_slabs() {
        let pool = pool_with(0..11);

        assert_eq!(pool.iter().len(), 11);
        assert_eq!(pool.iter().count(), 11);

        let mut list = pool.detach();
        assert_eq!(list.iter_mut().len(), 11);
        assert_eq!(list.iter_mut().count(), 11);
        list.dispose().unwrap();
    }
}
