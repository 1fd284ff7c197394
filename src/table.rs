//! Shard-locked hash table.
//!
//! A [`Table`] keeps its entries in a bucket array of power-of-two length. Each
//! bucket holds a chain of entries whose hashes select that bucket, and each
//! chain sits behind its own mutex. The array as a whole sits behind a
//! reader-writer lock that coordinates resizing:
//!
//! - Lookups, inserts and removals take the array lock shared, then the one
//!   bucket lock their key selects. The array lock is always taken first, so
//!   no two threads can wait on each other's locks in opposite orders.
//! - A resize takes the array lock exclusively. With no shard operation in
//!   flight it moves every entry into a new array of double the length, swaps
//!   the new array in, and only then lets other operations resume.
//! - An iterator takes the array lock exclusively for its whole lifetime, so
//!   it never observes a partially resized or concurrently mutated table.
//!
//! Entries live in inline-first vectors rather than linked lists. An entry
//! belongs to exactly one chain at a time, and moving it to another chain
//! moves the value itself.

mod bucket;
mod builder;
mod iter;
mod map;
mod stats;

pub use builder::TableBuilder;
pub use iter::Iter;
pub use map::Table;
pub use stats::TableStats;
