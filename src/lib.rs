#![warn(clippy::all)]
#![warn(rust_2018_idioms)]
// Temporary disable this lint as the MSRV (1.65) require an older lint name:
// #![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Shardtable is a thread-safe, dynamically resizable hash table for Rust.
//!
//! A [`Table`] stores its entries in an array of buckets using separate
//! chaining. Every bucket has its own lock, so operations on keys that hash to
//! different buckets run fully in parallel. A table-wide coordination lock
//! guards the bucket array itself: it is held shared by ordinary operations
//! and exclusively by a resize or an iteration.
//!
//! The table grows by doubling its bucket array whenever an insert would push
//! the load factor (`len / capacity`) over [`LOAD_FACTOR`]. It never shrinks.
//!
//! # Example
//!
//! ```rust
//! use shardtable::Table;
//!
//! let table = Table::with_capacity(4)?;
//!
//! for (i, key) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
//!     table.insert(key, i + 1)?;
//! }
//!
//! assert_eq!(table.get("e"), Some(5));
//! assert_eq!(table.len(), 5);
//! assert_eq!(table.capacity(), 8);
//! # Ok::<(), shardtable::TableError>(())
//! ```
//!
//! Share a table between threads by wrapping it in an [`Arc`][arc]:
//!
//! ```rust
//! use shardtable::Table;
//! use std::{sync::Arc, thread};
//!
//! let table = Arc::new(Table::new()?);
//!
//! let threads: Vec<_> = (0..4u32)
//!     .map(|i| {
//!         let table = Arc::clone(&table);
//!         thread::spawn(move || {
//!             for j in 0..100 {
//!                 table.insert(i * 100 + j, j).expect("out of memory");
//!             }
//!         })
//!     })
//!     .collect();
//!
//! threads.into_iter().for_each(|t| t.join().expect("thread failed"));
//! assert_eq!(table.len(), 400);
//! # Ok::<(), shardtable::TableError>(())
//! ```
//!
//! [arc]: https://doc.rust-lang.org/std/sync/struct.Arc.html
//!
//! # Logging
//!
//! Enable the `logging` feature to have tables emit records through the
//! [`log`](https://docs.rs/log) facade when they resize or fail to allocate.

pub mod hash;
pub mod table;

pub(crate) mod common;

pub use common::error::{AllocPhase, TableError};
pub use common::{DEFAULT_INITIAL_CAPACITY, LOAD_FACTOR};
pub use table::{Iter, Table, TableBuilder, TableStats};
