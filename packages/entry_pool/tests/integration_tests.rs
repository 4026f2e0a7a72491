//! Integration tests for the `entry_pool` package.
//!
//! These exercise the public surface the way a decoder uses it: allocate nodes one at a time,
//! fill in their payloads, then either drop the pool or detach the list and dispose of it later.

use std::thread;

use entry_pool::{DEFAULT_INITIAL_CAPACITY, EntryList, EntryPool, Error, MAX_SLABS, can_multiply};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
enum Decoded {
    #[default]
    Pending,
    Map(u32),
    Text(String),
    Number(u64),
}

fn decode_into(pool: &mut EntryPool<Decoded>, count: u64) -> Result<(), Error> {
    for index in 0..count {
        let entry = match index % 3 {
            0 => Decoded::Map(u32::try_from(index).unwrap()),
            1 => Decoded::Text(format!("entry {index}")),
            _ => Decoded::Number(index),
        };

        *pool.alloc()?.payload_mut() = entry;
    }

    Ok(())
}

#[test]
fn can_multiply_contract() {
    for n in [0, 1, 7, usize::MAX] {
        assert!(!can_multiply(usize::MAX, 0, n));
        assert!(!can_multiply(0, 0, n));
    }

    for (max, m) in [(usize::MAX, 1), (usize::MAX, 3), (1000, 7), (64, 64)] {
        let limit = max / m;

        assert!(can_multiply(max, m, limit));
        assert!(!can_multiply(max, m, limit + 1));
    }
}

#[test]
fn default_pool_uses_default_capacity() {
    let mut pool = EntryPool::<Decoded>::builder().build().unwrap();

    assert_eq!(pool.capacity(), DEFAULT_INITIAL_CAPACITY);
    assert_eq!(pool.slab_count(), 1);

    // Fresh nodes hold the default payload until the decoder fills them in.
    assert_eq!(pool.alloc().unwrap().payload(), &Decoded::Pending);
}

#[test]
fn zero_capacity_is_rejected() {
    assert_eq!(
        EntryPool::<Decoded>::new(0).unwrap_err(),
        Error::ZeroCapacity
    );
}

#[test]
fn oversized_capacity_is_rejected() {
    assert_eq!(
        EntryPool::<Decoded>::new(usize::MAX).unwrap_err(),
        Error::CapacityOverflow
    );
}

#[test]
fn decode_preserves_order_across_slabs() {
    let mut pool = EntryPool::new(4).unwrap();
    decode_into(&mut pool, 100).unwrap();

    // 4 + 8 + 16 + 32 = 60, 4 + ... + 64 = 124.
    assert_eq!(pool.slab_count(), 5);
    assert_eq!(pool.len(), 100);
    assert_eq!(pool.used(), 40);

    for (index, node) in pool.iter().enumerate() {
        let index = index as u64;

        let expected = match index % 3 {
            0 => Decoded::Map(u32::try_from(index).unwrap()),
            1 => Decoded::Text(format!("entry {index}")),
            _ => Decoded::Number(index),
        };

        assert_eq!(node.payload(), &expected);
    }
}

#[test]
fn slab_capacities_follow_doubling_sequence() {
    let mut pool = EntryPool::<Decoded>::new(5).unwrap();
    decode_into(&mut pool, 5 + 10 + 20 + 1).unwrap();

    let capacities = (0..pool.slab_count())
        .map(|index| pool.slab_capacity(index).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(capacities, [5, 10, 20, 40]);
    assert!(pool.slab_count() <= MAX_SLABS);
}

#[test]
fn head_nodes_mark_slab_starts() {
    let mut pool = EntryPool::<Decoded>::new(1).unwrap();
    decode_into(&mut pool, 16).unwrap();

    let heads = pool
        .iter()
        .enumerate()
        .filter_map(|(position, node)| node.is_head().then_some(position))
        .collect::<Vec<_>>();

    // Slabs of 1, 2, 4, 8 and 16 nodes.
    assert_eq!(heads, [0, 1, 3, 7, 15]);
}

#[test]
fn last_node_has_no_successor() {
    let mut pool = EntryPool::<Decoded>::new(3).unwrap();
    decode_into(&mut pool, 7).unwrap();

    let links = pool.iter().map(|node| node.has_next()).collect::<Vec<_>>();

    assert_eq!(links.len(), 7);
    assert!(links[..6].iter().all(|&linked| linked));
    assert!(!links[6]);
}

#[test]
fn detach_keeps_list_traversable() {
    let mut pool = EntryPool::new(2).unwrap();
    decode_into(&mut pool, 9).unwrap();

    let before = pool
        .iter()
        .map(|node| node.payload().clone())
        .collect::<Vec<_>>();
    let list = pool.detach();
    let after = list
        .iter()
        .map(|node| node.payload().clone())
        .collect::<Vec<_>>();

    assert_eq!(before, after);
    assert_eq!(list.len(), 9);

    list.dispose().unwrap();
}

#[test]
fn detached_list_moves_between_threads() {
    let mut pool = EntryPool::new(2).unwrap();
    decode_into(&mut pool, 20).unwrap();

    let list: EntryList<Decoded> = pool.detach();

    let len = thread::spawn(move || {
        let len = list.iter().count();
        list.dispose().unwrap();
        len
    })
    .join()
    .unwrap();

    assert_eq!(len, 20);
}

#[test]
fn none_pool_teardown_is_noop() {
    let pool: Option<EntryPool<Decoded>> = None;
    drop(pool);
}
