use super::{
    bucket::{BucketArray, Entry},
    builder::TableBuilder,
    iter::Iter,
    stats::{StatsCounter, TableStats},
};
use crate::{
    common::{
        capacity_for,
        error::{AllocPhase, TableError},
        iteration_guard::{self, IterationMarker},
        max_len, DEFAULT_INITIAL_CAPACITY,
    },
    hash::Fnv1aBuildHasher,
};

use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash, Hasher},
    mem,
    sync::atomic::{AtomicUsize, Ordering},
};

use crossbeam_utils::CachePadded;
use parking_lot::{RwLock, RwLockWriteGuard};

/// A thread-safe hash table with one lock per bucket.
///
/// `Table` uses separate chaining. Its bucket array always has a power-of-two
/// number of buckets, and every bucket is guarded by its own lock (a shard), so
/// operations on keys that land in different buckets proceed in parallel.
/// Operations on the same bucket are serialized. Once `insert` returns, every
/// thread that subsequently looks up the key observes the new value.
///
/// All methods take `&self`. To share a table across threads, wrap it in an
/// `Arc`.
///
/// # Resizing
///
/// When an insert of a new key would raise the load factor above
/// [`LOAD_FACTOR`][load-factor], the table doubles its bucket array first. A
/// resize holds the table-wide coordination lock exclusively, so every other
/// operation waits for it to finish. The bucket array never shrinks.
///
/// # Iteration
///
/// [`iter`](#method.iter) and [`for_each`](#method.for_each) also hold the
/// table-wide lock exclusively, for as long as the iterator lives. Other threads
/// block on any table operation until the iterator is dropped. Calling a table
/// method from the thread that holds the iterator would deadlock; debug builds
/// detect this and panic instead.
///
/// # Hashing
///
/// The default hasher is 32-bit FNV-1a ([`Fnv1aBuildHasher`][fnv]). It is not
/// resistant to HashDoS attacks. Use [`with_hasher`](#method.with_hasher) or
/// [`TableBuilder::hasher`][builder-hasher] to plug in another `BuildHasher`.
///
/// It is required that the keys implement the [`Eq`] and [`Hash`] traits, and
/// that `k1 == k2 -> hash(k1) == hash(k2)`. Modifying a key so that its hash or
/// equality changes while it is in the table is a logic error.
///
/// # Examples
///
/// ```rust
/// use shardtable::Table;
///
/// let table = Table::new()?;
///
/// assert_eq!(table.insert("apple", 3)?, None);
/// assert_eq!(table.insert("apple", 5)?, Some(3));
/// assert_eq!(table.get("apple"), Some(5));
///
/// assert_eq!(table.remove("apple"), Some(5));
/// assert_eq!(table.remove("apple"), None);
/// # Ok::<(), shardtable::TableError>(())
/// ```
///
/// [load-factor]: ./constant.LOAD_FACTOR.html
/// [fnv]: ./hash/type.Fnv1aBuildHasher.html
/// [builder-hasher]: ./struct.TableBuilder.html#method.hasher
pub struct Table<K, V, S = Fnv1aBuildHasher> {
    array: RwLock<BucketArray<K, V>>,
    len: CachePadded<AtomicUsize>,
    build_hasher: S,
    stats: Option<StatsCounter>,
    name: Option<String>,
    id: usize,
}

impl<K, V> Table<K, V, Fnv1aBuildHasher> {
    /// Creates an empty table with [`DEFAULT_INITIAL_CAPACITY`][default-cap]
    /// buckets.
    ///
    /// [default-cap]: ./constant.DEFAULT_INITIAL_CAPACITY.html
    pub fn new() -> Result<Self, TableError> {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    /// Creates an empty table with at least `capacity` buckets.
    ///
    /// The bucket count is rounded up to a power of two, and is at least one.
    /// Returns `OutOfMemory` if the bucket array cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self, TableError> {
        Self::with_capacity_and_hasher(capacity, Fnv1aBuildHasher::default())
    }

    /// Returns a [`TableBuilder`][builder-struct] to configure a table.
    ///
    /// [builder-struct]: ./struct.TableBuilder.html
    pub fn builder() -> TableBuilder<K, V, Fnv1aBuildHasher> {
        TableBuilder::default()
    }
}

impl<K, V, S> Table<K, V, S> {
    /// Creates an empty table with the default capacity, using `build_hasher`
    /// to hash the keys.
    pub fn with_hasher(build_hasher: S) -> Result<Self, TableError> {
        Self::with_capacity_and_hasher(DEFAULT_INITIAL_CAPACITY, build_hasher)
    }

    /// Creates an empty table with at least `capacity` buckets, using
    /// `build_hasher` to hash the keys.
    pub fn with_capacity_and_hasher(
        capacity: usize,
        build_hasher: S,
    ) -> Result<Self, TableError> {
        Self::with_everything(capacity, build_hasher, None, false)
    }

    pub(crate) fn with_everything(
        capacity: usize,
        build_hasher: S,
        name: Option<String>,
        record_stats: bool,
    ) -> Result<Self, TableError> {
        const PHASE: AllocPhase = AllocPhase::CreatingTable;

        let actual_capacity = capacity
            .max(1)
            .checked_next_power_of_two()
            .ok_or(TableError::OutOfMemory(PHASE))?;
        let array = BucketArray::try_with_capacity(actual_capacity, PHASE)?;

        Ok(Self {
            array: RwLock::new(array),
            len: CachePadded::new(AtomicUsize::new(0)),
            build_hasher,
            stats: record_stats.then(StatsCounter::default),
            name,
            id: iteration_guard::next_table_id(),
        })
    }

    /// Returns the number of entries in the table.
    ///
    /// Other threads may insert or remove entries at any time, so the result
    /// may be stale by the time it is used. An insert in progress may be
    /// counted shortly before it becomes visible.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns `true` if the table contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current number of buckets. Always a power of two.
    pub fn capacity(&self) -> usize {
        iteration_guard::assert_not_iterating(self.id);
        self.array.read().capacity()
    }

    /// Returns the current ratio of entries to buckets.
    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    /// Returns the name given to this table through the builder, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns a reference to the table's `BuildHasher`.
    pub fn hasher(&self) -> &S {
        &self.build_hasher
    }

    /// Returns a snapshot of the table's statistics.
    ///
    /// All counters are zero unless the table was built with
    /// [`TableBuilder::record_stats`][record-stats].
    ///
    /// [record-stats]: ./struct.TableBuilder.html#method.record_stats
    pub fn stats(&self) -> TableStats {
        self.stats
            .as_ref()
            .map(StatsCounter::snapshot)
            .unwrap_or_default()
    }

    /// Removes every entry. The bucket array keeps its capacity.
    ///
    /// Waits for, and then excludes, every other operation on the table.
    pub fn clear(&self) {
        let mut array = self.lock_exclusive();
        for chain in array.chains_mut() {
            chain.clear();
        }
        self.len.store(0, Ordering::Release);

        #[cfg(feature = "logging")]
        log::trace!("{}cleared the table", self.log_prefix());
    }

    /// Calls `f` with every entry, in bucket order.
    ///
    /// Holds the table-wide lock for the whole walk, with the same contract as
    /// [`iter`](#method.iter). `f` must not access this table.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        let mut array = self.lock_exclusive();
        let _marker = IterationMarker::register(self.id);

        for chain in array.chains_mut() {
            for entry in chain.iter() {
                f(&entry.key, &entry.value);
            }
        }
    }

    /// Returns an iterator visiting every entry, yielding clones of the keys
    /// and values.
    ///
    /// The iterator holds the table-wide lock exclusively until it is dropped:
    /// it waits for a resize in progress to finish, and every other operation
    /// on the table, from any thread, waits for the iterator. Entries are
    /// visited bucket by bucket, each exactly once.
    ///
    /// The thread holding the iterator must not call any other method of this
    /// table before dropping it. Debug builds panic if it does.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shardtable::Table;
    ///
    /// let table = Table::new()?;
    /// table.insert(1, "one")?;
    /// table.insert(2, "two")?;
    ///
    /// let mut entries: Vec<_> = table.iter().collect();
    /// entries.sort_unstable();
    /// assert_eq!(entries, vec![(1, "one"), (2, "two")]);
    /// # Ok::<(), shardtable::TableError>(())
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        let array = self.lock_exclusive();
        Iter::new(array, self.len(), IterationMarker::register(self.id))
    }

    fn lock_exclusive(&self) -> RwLockWriteGuard<'_, BucketArray<K, V>> {
        iteration_guard::assert_not_iterating(self.id);
        self.array.write()
    }

    /// Reserves one slot in the live count if that keeps the table within its
    /// load factor at `capacity` buckets.
    fn try_reserve_slot(&self, capacity: usize) -> bool {
        let max = max_len(capacity);
        let mut len = self.len.load(Ordering::Relaxed);
        loop {
            if len >= max {
                return false;
            }
            match self.len.compare_exchange_weak(
                len,
                len + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => len = actual,
            }
        }
    }

    fn release_slot(&self) {
        self.len.fetch_sub(1, Ordering::Release);
    }

    /// Grows the bucket array so that `additional` more entries fit. An insert
    /// asks for one more entry, which always doubles the capacity.
    ///
    /// Takes the resize-coordination lock first and re-checks under it, so
    /// concurrent callers that all saw a full table resize only once.
    fn grow_for(&self, additional: usize) -> Result<(), TableError> {
        let mut array = self.lock_exclusive();

        // Shard operations hold the lock shared, so `len` is exact here.
        let required = self
            .len
            .load(Ordering::Acquire)
            .checked_add(additional)
            .ok_or(TableError::OutOfMemory(AllocPhase::GrowingBucketArray))?;

        let old_capacity = array.capacity();
        let new_capacity = capacity_for(required, old_capacity)
            .ok_or(TableError::OutOfMemory(AllocPhase::GrowingBucketArray))?;
        if new_capacity == old_capacity {
            return Ok(());
        }

        if let Err(e) = array.try_grow_to(new_capacity) {
            #[cfg(feature = "logging")]
            log::warn!(
                "{}failed to grow the bucket array from {} to {} buckets: {}",
                self.log_prefix(),
                old_capacity,
                new_capacity,
                e
            );
            return Err(e);
        }
        self.record(StatsCounter::record_resize);

        #[cfg(feature = "logging")]
        log::debug!(
            "{}grew the bucket array from {} to {} buckets ({} entries)",
            self.log_prefix(),
            old_capacity,
            new_capacity,
            required - additional
        );

        Ok(())
    }

    #[inline]
    fn record(&self, event: impl FnOnce(&StatsCounter)) {
        if let Some(stats) = &self.stats {
            event(stats);
        }
    }

    #[cfg(feature = "logging")]
    fn log_prefix(&self) -> String {
        self.name
            .as_ref()
            .map(|name| format!("[{name}] "))
            .unwrap_or_default()
    }
}

impl<K, V, S> Table<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Inserts a key-value pair into the table.
    ///
    /// If the key was already present, its value is replaced in place, the
    /// entry count is unchanged, and the previous value is returned. Otherwise
    /// a new entry is added and `Ok(None)` is returned.
    ///
    /// Returns `OutOfMemory` if the table had to grow or the bucket had to
    /// make room and the allocation failed. The table is then unchanged and
    /// `key` and `value` are dropped.
    pub fn insert(&self, key: K, value: V) -> Result<Option<V>, TableError> {
        iteration_guard::assert_not_iterating(self.id);
        let hash = self.hash(&key);

        loop {
            {
                let array = self.array.read();
                let mut chain = array.shard(hash).lock();

                if let Some(entry) = chain.get_mut(hash, &key) {
                    let old_value = mem::replace(&mut entry.value, value);
                    self.record(StatsCounter::record_update);
                    return Ok(Some(old_value));
                }

                if self.try_reserve_slot(array.capacity()) {
                    return match chain.try_push(Entry { hash, key, value }) {
                        Ok(()) => {
                            self.record(StatsCounter::record_insertion);
                            Ok(None)
                        }
                        Err(e) => {
                            self.release_slot();
                            #[cfg(feature = "logging")]
                            log::warn!("{}failed to insert an entry: {}", self.log_prefix(), e);
                            Err(e)
                        }
                    };
                }
            }

            // Both locks are released; take the resize lock and retry.
            self.grow_for(1)?;
        }
    }

    /// Returns a clone of the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the table's key type, but [`Hash`]
    /// and [`Eq`] on the borrowed form *must* match those for the key type.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get_key_value_and(key, |_, v| v.clone())
    }

    /// Returns the result of invoking `with_value` with a reference to the
    /// value corresponding to the key.
    ///
    /// The reference is only valid inside the closure, which runs while the
    /// key's shard is locked. `with_value` must not access this table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shardtable::Table;
    ///
    /// let table = Table::new()?;
    /// table.insert("greeting", String::from("hello, world"))?;
    ///
    /// assert_eq!(table.get_and("greeting", |s| s.len()), Some(12));
    /// # Ok::<(), shardtable::TableError>(())
    /// ```
    #[inline]
    pub fn get_and<Q, F, T>(&self, key: &Q, with_value: F) -> Option<T>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> T,
    {
        self.get_key_value_and(key, |_, v| with_value(v))
    }

    /// Returns clones of the key-value pair corresponding to the key.
    ///
    /// The key may be any borrowed form of the table's key type, but [`Hash`]
    /// and [`Eq`] on the borrowed form *must* match those for the key type.
    #[inline]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q> + Clone,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get_key_value_and(key, |k, v| (k.clone(), v.clone()))
    }

    /// Returns `true` if the table contains a value for the key.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value_and(key, |_, _| ()).is_some()
    }

    fn get_key_value_and<Q, F, T>(&self, key: &Q, with_entry: F) -> Option<T>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&K, &V) -> T,
    {
        iteration_guard::assert_not_iterating(self.id);
        let hash = self.hash(key);

        let result = {
            let array = self.array.read();
            let chain = array.shard(hash).lock();
            chain
                .get(hash, key)
                .map(|entry| with_entry(&entry.key, &entry.value))
        };

        self.record(|stats| stats.record_lookup(result.is_some()));
        result
    }

    /// Removes a key from the table, returning the value previously
    /// corresponding to it, or `None` if the key was absent.
    ///
    /// The key may be any borrowed form of the table's key type, but [`Hash`]
    /// and [`Eq`] on the borrowed form *must* match those for the key type.
    #[inline]
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry_if_and(key, |_, _| true, |_, v| v)
    }

    /// Removes a key from the table, returning the stored key and value.
    #[inline]
    pub fn remove_entry<Q>(&self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry_if_and(key, |_, _| true, |k, v| (k, v))
    }

    /// Removes a key from the table if `condition` returns `true` for its
    /// entry, returning the removed value.
    ///
    /// `condition` runs while the key's shard is locked, at most once, and
    /// must not access this table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shardtable::Table;
    ///
    /// let table = Table::new()?;
    /// table.insert("count", 3)?;
    ///
    /// assert_eq!(table.remove_if("count", |_, v| *v > 5), None);
    /// assert_eq!(table.remove_if("count", |_, v| *v == 3), Some(3));
    /// assert!(table.is_empty());
    /// # Ok::<(), shardtable::TableError>(())
    /// ```
    #[inline]
    pub fn remove_if<Q, F>(&self, key: &Q, condition: F) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&K, &V) -> bool,
    {
        self.remove_entry_if_and(key, condition, |_, v| v)
    }

    fn remove_entry_if_and<Q, F, G, T>(
        &self,
        key: &Q,
        condition: F,
        with_previous_entry: G,
    ) -> Option<T>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&K, &V) -> bool,
        G: FnOnce(K, V) -> T,
    {
        iteration_guard::assert_not_iterating(self.id);
        let hash = self.hash(key);

        let Entry { key, value, .. } = {
            let array = self.array.read();
            let mut chain = array.shard(hash).lock();

            let index = chain.position(hash, key)?;
            let entry = chain.entry_at(index)?;
            if !condition(&entry.key, &entry.value) {
                return None;
            }

            let removed = chain.remove_at(index);
            self.release_slot();
            removed
        };

        self.record(StatsCounter::record_removal);
        Some(with_previous_entry(key, value))
    }

    /// Grows the table ahead of time so that `additional` more entries can be
    /// inserted without a resize, unless other threads insert concurrently.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shardtable::Table;
    ///
    /// let table = Table::with_capacity(4)?;
    /// table.reserve(100)?;
    ///
    /// let capacity = table.capacity();
    /// for i in 0..100 {
    ///     table.insert(i, i)?;
    /// }
    /// assert_eq!(table.capacity(), capacity);
    /// # Ok::<(), shardtable::TableError>(())
    /// ```
    pub fn reserve(&self, additional: usize) -> Result<(), TableError> {
        self.grow_for(additional)
    }

    #[inline]
    fn hash<Q>(&self, key: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        let mut hasher = self.build_hasher.build_hasher();
        key.hash(&mut hasher);
        hasher.finish()
    }
}

impl<K, V, S> fmt::Debug for Table<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
