pub(crate) mod error;
pub(crate) mod iteration_guard;

/// The maximum ratio of live entries to buckets. An insert that would exceed it
/// grows the bucket array first.
pub const LOAD_FACTOR: f64 = 0.75;

/// The number of buckets a table starts with when no initial capacity is given.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Returns the largest entry count a bucket array with `capacity` buckets may
/// hold without exceeding `LOAD_FACTOR`.
///
/// Integer arithmetic keeps the bound exact: `max_len(c) as f64 / c as f64`
/// never exceeds 0.75.
#[inline]
pub(crate) fn max_len(capacity: usize) -> usize {
    capacity - capacity / 4 - usize::from(capacity % 4 != 0)
}

/// Returns the smallest power-of-two capacity, not below `current`, that holds
/// `len` entries within `LOAD_FACTOR`, or `None` if it is not representable.
pub(crate) fn capacity_for(len: usize, current: usize) -> Option<usize> {
    let mut capacity = current;
    while max_len(capacity) < len {
        capacity = capacity.checked_mul(2)?;
    }
    Some(capacity)
}
