use std::fmt::{self, Debug};

use crossbeam_utils::atomic::AtomicCell;

/// Statistics about the operations performed on a table.
///
/// Statistics are recorded only when the table was built with
/// [`TableBuilder::record_stats`][record-stats]; otherwise every counter stays at
/// zero. Counters are updated according to the following rules:
///
/// - A lookup (`get`, `get_and`, `get_key_value`, `contains_key`) that finds the
///   key increments `hit_count`, otherwise `miss_count`.
/// - An `insert` of a new key increments `insertion_count`; an `insert` that
///   replaces an existing value increments `update_count`.
/// - A `remove` family call that removes an entry increments `removal_count`.
///   `clear` does not modify any counter.
/// - Every resize of the bucket array increments `resize_count`.
///
/// [record-stats]: ./struct.TableBuilder.html#method.record_stats
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TableStats {
    hit_count: u64,
    miss_count: u64,
    insertion_count: u64,
    update_count: u64,
    removal_count: u64,
    resize_count: u64,
}

impl Debug for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableStats")
            .field("request_count", &self.request_count())
            .field("hit_count", &self.hit_count)
            .field("hit_rate", &self.hit_rate())
            .field("miss_count", &self.miss_count)
            .field("miss_rate", &self.miss_rate())
            .field("insertion_count", &self.insertion_count)
            .field("update_count", &self.update_count)
            .field("removal_count", &self.removal_count)
            .field("resize_count", &self.resize_count)
            .finish()
    }
}

impl TableStats {
    /// Returns the number of lookups, hits and misses combined.
    pub fn request_count(&self) -> u64 {
        self.hit_count.saturating_add(self.miss_count)
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Returns the ratio of lookups that found their key, or `1.0` when there
    /// were no lookups.
    pub fn hit_rate(&self) -> f64 {
        let req_count = self.request_count();
        if req_count == 0 {
            1.0
        } else {
            self.hit_count as f64 / req_count as f64
        }
    }

    pub fn miss_count(&self) -> u64 {
        self.miss_count
    }

    /// Returns the ratio of lookups that did not find their key, or `0.0` when
    /// there were no lookups.
    pub fn miss_rate(&self) -> f64 {
        let req_count = self.request_count();
        if req_count == 0 {
            0.0
        } else {
            self.miss_count as f64 / req_count as f64
        }
    }

    pub fn insertion_count(&self) -> u64 {
        self.insertion_count
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn removal_count(&self) -> u64 {
        self.removal_count
    }

    pub fn resize_count(&self) -> u64 {
        self.resize_count
    }
}

fn saturating_add(counter: &AtomicCell<u64>, value: u64) {
    let mut v0 = counter.load();
    loop {
        let v1 = v0.saturating_add(value);
        match counter.compare_exchange(v0, v1) {
            Ok(_) => break,
            Err(v2) => v0 = v2,
        }
    }
}

#[derive(Default)]
pub(crate) struct StatsCounter {
    hit_count: AtomicCell<u64>,
    miss_count: AtomicCell<u64>,
    insertion_count: AtomicCell<u64>,
    update_count: AtomicCell<u64>,
    removal_count: AtomicCell<u64>,
    resize_count: AtomicCell<u64>,
}

impl StatsCounter {
    pub(crate) fn record_lookup(&self, hit: bool) {
        if hit {
            saturating_add(&self.hit_count, 1);
        } else {
            saturating_add(&self.miss_count, 1);
        }
    }

    pub(crate) fn record_insertion(&self) {
        saturating_add(&self.insertion_count, 1);
    }

    pub(crate) fn record_update(&self) {
        saturating_add(&self.update_count, 1);
    }

    pub(crate) fn record_removal(&self) {
        saturating_add(&self.removal_count, 1);
    }

    pub(crate) fn record_resize(&self) {
        saturating_add(&self.resize_count, 1);
    }

    pub(crate) fn snapshot(&self) -> TableStats {
        TableStats {
            hit_count: self.hit_count.load(),
            miss_count: self.miss_count.load(),
            insertion_count: self.insertion_count.load(),
            update_count: self.update_count.load(),
            removal_count: self.removal_count.load(),
            resize_count: self.resize_count.load(),
        }
    }
}
