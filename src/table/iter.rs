use super::bucket::BucketArray;
use crate::common::iteration_guard::IterationMarker;

use std::iter::FusedIterator;

use parking_lot::RwLockWriteGuard;

/// An iterator over the entries of a [`Table`][table-struct], yielding clones
/// of each key and value.
///
/// Created by [`Table::iter`][table-iter]. The iterator owns the table-wide
/// lock: every other operation on the table waits until the iterator is
/// dropped, so the entries it visits cannot change underneath it. It visits
/// buckets in index order and each bucket's chain in chain order, and yields
/// every entry exactly once.
///
/// [table-struct]: ../struct.Table.html
/// [table-iter]: ../struct.Table.html#method.iter
pub struct Iter<'a, K, V> {
    array: RwLockWriteGuard<'a, BucketArray<K, V>>,
    bucket_index: usize,
    entry_index: usize,
    remaining: usize,
    _marker: IterationMarker,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(
        array: RwLockWriteGuard<'a, BucketArray<K, V>>,
        len: usize,
        marker: IterationMarker,
    ) -> Self {
        Self {
            array,
            bucket_index: 0,
            entry_index: 0,
            remaining: len,
            _marker: marker,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: Clone,
    V: Clone,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let array = &mut *self.array;

        while self.bucket_index < array.capacity() {
            let chain = array.chain_at_mut(self.bucket_index);
            if let Some(entry) = chain.entry_at(self.entry_index) {
                self.entry_index += 1;
                self.remaining -= 1;
                return Some((entry.key.clone(), entry.value.clone()));
            }

            self.bucket_index += 1;
            self.entry_index = 0;
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K: Clone, V: Clone> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K: Clone, V: Clone> FusedIterator for Iter<'a, K, V> {}
