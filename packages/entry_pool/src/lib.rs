#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A pool of linked list nodes for decoders that produce one entry at a time.
//!
//! A decoder walking a binary structure typically emits a flat list of decoded entries. This
//! crate provides [`EntryPool`], which hands out the nodes of such a list from a small number of
//! contiguous slabs instead of allocating every node separately:
//!
//! - **Ordered**: every node returned by [`EntryPool::alloc()`] is already linked after the
//!   previous one, so the list order is the allocation order.
//! - **Geometric growth**: when a slab is exhausted, the next slab is twice its size, up to a
//!   fixed maximum of [`MAX_SLABS`] slabs.
//! - **Bulk release**: nodes are never released individually. Dropping the pool releases all of
//!   them at once.
//! - **Detachable**: [`EntryPool::detach()`] discards the pool bookkeeping and returns the list
//!   as an [`EntryList`] that the caller can keep and later release with
//!   [`EntryList::dispose()`].
//! - **Overflow-checked**: every size calculation is gated by [`can_multiply()`], so a huge
//!   capacity results in an error instead of an undersized allocation.
//!
//! # Example
//!
//! ```rust
//! use entry_pool::EntryPool;
//!
//! #[derive(Debug, Default)]
//! enum Entry {
//!     #[default]
//!     Empty,
//!     Map(u32),
//!     Utf8(String),
//!     Uint(u64),
//! }
//!
//! let mut pool = EntryPool::<Entry>::new(2)?;
//!
//! *pool.alloc()?.payload_mut() = Entry::Map(1);
//! *pool.alloc()?.payload_mut() = Entry::Utf8("answer".to_string());
//! *pool.alloc()?.payload_mut() = Entry::Uint(42);
//!
//! // Keep the list, drop the pool bookkeeping.
//! let list = pool.detach();
//! assert_eq!(list.len(), 3);
//!
//! for node in &list {
//!     println!("{:?}", node.payload());
//! }
//!
//! list.dispose()?;
//! # Ok::<(), entry_pool::Error>(())
//! ```
//!
//! # Failure
//!
//! All failures are reported through [`Error`] and none of them are retried. A decoder is
//! expected to abandon its work on any error from [`EntryPool::alloc()`] and drop the pool.

mod builder;
mod error;
mod iter;
mod list;
mod node;
mod overflow;
mod pool;
mod slab;

pub use builder::*;
pub use error::Error;
pub(crate) use error::Result;
pub use iter::{Iter, IterMut};
pub use list::EntryList;
pub use node::{Node, NodeMut};
pub use overflow::can_multiply;
pub(crate) use pool::GROWTH_FACTOR;
pub use pool::{EntryPool, MAX_SLABS};
pub(crate) use slab::*;
