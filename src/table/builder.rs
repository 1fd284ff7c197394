use super::Table;
use crate::{
    common::{error::TableError, DEFAULT_INITIAL_CAPACITY},
    hash::Fnv1aBuildHasher,
};

use std::{hash::BuildHasher, marker::PhantomData};

/// Builds a [`Table`][table-struct] with various configuration knobs.
///
/// [table-struct]: ./struct.Table.html
///
/// # Examples
///
/// ```rust
/// use shardtable::TableBuilder;
/// use std::collections::hash_map::RandomState;
///
/// let table = TableBuilder::new()
///     // Start with 1,024 buckets.
///     .initial_capacity(1024)
///     // Prefix log records with the table name.
///     .name("sessions")
///     // Count hits, misses and resizes.
///     .record_stats()
///     // Use a keyed hasher instead of FNV-1a.
///     .hasher(RandomState::new())
///     .build()?;
///
/// table.insert(42_u64, "session-42")?;
/// assert_eq!(table.get(&42), Some("session-42"));
/// assert_eq!(table.stats().hit_count(), 1);
/// # Ok::<(), shardtable::TableError>(())
/// ```
///
#[must_use]
pub struct TableBuilder<K, V, S = Fnv1aBuildHasher> {
    initial_capacity: Option<usize>,
    name: Option<String>,
    record_stats: bool,
    build_hasher: S,
    table_type: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Default for TableBuilder<K, V, Fnv1aBuildHasher> {
    fn default() -> Self {
        Self {
            initial_capacity: None,
            name: None,
            record_stats: false,
            build_hasher: Fnv1aBuildHasher::default(),
            table_type: PhantomData,
        }
    }
}

impl<K, V> TableBuilder<K, V, Fnv1aBuildHasher> {
    /// Constructs a new `TableBuilder` with the default configuration: the
    /// FNV-1a hasher, [`DEFAULT_INITIAL_CAPACITY`][default-cap] buckets, no
    /// name and no statistics.
    ///
    /// [default-cap]: ./constant.DEFAULT_INITIAL_CAPACITY.html
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, V, S> TableBuilder<K, V, S> {
    /// Sets the initial number of buckets. It is rounded up to a power of two.
    pub fn initial_capacity(self, number_of_buckets: usize) -> Self {
        Self {
            initial_capacity: Some(number_of_buckets),
            ..self
        }
    }

    /// Sets the name of the table. Log records of a named table are prefixed
    /// with it.
    pub fn name(self, name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..self
        }
    }

    /// Enables recording of [`TableStats`][stats-struct].
    ///
    /// [stats-struct]: ./struct.TableStats.html
    pub fn record_stats(self) -> Self {
        Self {
            record_stats: true,
            ..self
        }
    }

    /// Sets the `BuildHasher` the table uses to hash keys.
    pub fn hasher<S2>(self, build_hasher: S2) -> TableBuilder<K, V, S2>
    where
        S2: BuildHasher,
    {
        TableBuilder {
            initial_capacity: self.initial_capacity,
            name: self.name,
            record_stats: self.record_stats,
            build_hasher,
            table_type: PhantomData,
        }
    }

    /// Builds a `Table<K, V, S>`.
    ///
    /// Returns `OutOfMemory` if the initial bucket array cannot be allocated.
    pub fn build(self) -> Result<Table<K, V, S>, TableError> {
        Table::with_everything(
            self.initial_capacity.unwrap_or(DEFAULT_INITIAL_CAPACITY),
            self.build_hasher,
            self.name,
            self.record_stats,
        )
    }
}
