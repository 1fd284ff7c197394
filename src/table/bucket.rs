//! Bucket store: a power-of-two array of locked chains.
//!
//! A chain is an inline-first vector of entries rather than a linked list.
//! Entries are addressed by their position in the chain, removal swaps the last
//! entry into the vacated slot, and resizing moves entries between chains by
//! value. No entry is ever reachable from two chains.

use crate::common::error::{AllocPhase, TableError};

use std::borrow::Borrow;

use parking_lot::Mutex;
use smallvec::SmallVec;

pub(crate) struct Entry<K, V> {
    /// The full hash of `key`, cached so that a resize can place the entry
    /// without calling the hasher again.
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
}

pub(crate) struct Chain<K, V> {
    entries: SmallVec<[Entry<K, V>; 1]>,
}

impl<K, V> Chain<K, V> {
    fn new() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn entry_at(&self, index: usize) -> Option<&Entry<K, V>> {
        self.entries.get(index)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Entry<K, V>> + '_ {
        self.entries.iter()
    }

    pub(crate) fn position<Q>(&self, hash: u64, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.entries
            .iter()
            .position(|e| e.hash == hash && e.key.borrow() == key)
    }

    pub(crate) fn get<Q>(&self, hash: u64, key: &Q) -> Option<&Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.position(hash, key).map(|i| &self.entries[i])
    }

    pub(crate) fn get_mut<Q>(&mut self, hash: u64, key: &Q) -> Option<&mut Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.position(hash, key).map(move |i| &mut self.entries[i])
    }

    /// Appends `entry`. The caller must have checked that no entry with an
    /// equal key is present.
    ///
    /// On allocation failure the chain is unchanged and `entry` is dropped.
    pub(crate) fn try_push(&mut self, entry: Entry<K, V>) -> Result<(), TableError> {
        self.entries
            .try_reserve(1)
            .map_err(|_| TableError::OutOfMemory(AllocPhase::InsertingEntry))?;
        self.entries.push(entry);
        Ok(())
    }

    /// Removes and returns the entry at `index`, moving the last entry of the
    /// chain into its slot.
    pub(crate) fn remove_at(&mut self, index: usize) -> Entry<K, V> {
        self.entries.swap_remove(index)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

pub(crate) struct BucketArray<K, V> {
    buckets: Box<[Mutex<Chain<K, V>>]>,
}

impl<K, V> BucketArray<K, V> {
    /// Allocates `capacity` empty buckets. `capacity` must be a power of two.
    pub(crate) fn try_with_capacity(
        capacity: usize,
        phase: AllocPhase,
    ) -> Result<Self, TableError> {
        debug_assert!(capacity.is_power_of_two());

        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(capacity)
            .map_err(|_| TableError::OutOfMemory(phase))?;
        buckets.extend(std::iter::repeat_with(|| Mutex::new(Chain::new())).take(capacity));

        Ok(Self {
            buckets: buckets.into_boxed_slice(),
        })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    fn index(&self, hash: u64) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    /// Returns the shard that owns entries with the given hash.
    #[inline]
    pub(crate) fn shard(&self, hash: u64) -> &Mutex<Chain<K, V>> {
        &self.buckets[self.index(hash)]
    }

    /// Returns the chain at `index` without locking. Exclusive access to the
    /// array already excludes every shard operation.
    #[inline]
    pub(crate) fn chain_at_mut(&mut self, index: usize) -> &mut Chain<K, V> {
        self.buckets[index].get_mut()
    }

    pub(crate) fn chains_mut(&mut self) -> impl Iterator<Item = &mut Chain<K, V>> + '_ {
        self.buckets.iter_mut().map(Mutex::get_mut)
    }

    /// Replaces this array with one of `new_capacity` buckets, moving every
    /// entry into its chain under the new capacity. `new_capacity` must be a
    /// power of two larger than the current capacity.
    ///
    /// All memory is reserved before the first entry moves. On failure `self`
    /// is unchanged.
    pub(crate) fn try_grow_to(&mut self, new_capacity: usize) -> Result<(), TableError> {
        const PHASE: AllocPhase = AllocPhase::GrowingBucketArray;
        debug_assert!(new_capacity > self.capacity());

        let mut new_array = Self::try_with_capacity(new_capacity, PHASE)?;

        // Reserve exact room in every target chain. Chains are short, so the
        // entries sharing a target are counted by rescanning the old chain at
        // the first entry of each target.
        for old_chain in self.chains_mut() {
            let entries = &old_chain.entries;
            for (i, entry) in entries.iter().enumerate() {
                let target = new_array.index(entry.hash);
                if entries[..i]
                    .iter()
                    .any(|e| new_array.index(e.hash) == target)
                {
                    continue;
                }
                let additional = entries[i..]
                    .iter()
                    .filter(|e| new_array.index(e.hash) == target)
                    .count();
                new_array
                    .chain_at_mut(target)
                    .entries
                    .try_reserve_exact(additional)
                    .map_err(|_| TableError::OutOfMemory(PHASE))?;
            }
        }

        for old_chain in self.chains_mut() {
            for entry in old_chain.entries.drain(..) {
                let index = new_array.index(entry.hash);
                new_array.chain_at_mut(index).entries.push(entry);
            }
        }

        *self = new_array;
        Ok(())
    }
}
