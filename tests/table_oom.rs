// Allocation failure tests.
//
// The global allocator below serves every request normally until a test gives
// the current thread an allocation budget. Once the budget is spent, further
// allocations on that thread fail, so the table sees a real out-of-memory
// condition at a point of the test's choosing.
use shardtable::{AllocPhase, Table, TableError};

use std::{
    alloc::{GlobalAlloc, Layout, System},
    cell::Cell,
    hash::{BuildHasherDefault, Hasher},
};

struct FailingAllocator;

thread_local! {
    // `None` means unlimited.
    static BUDGET: Cell<Option<usize>> = const { Cell::new(None) };
}

impl FailingAllocator {
    fn may_allocate() -> bool {
        BUDGET
            .try_with(|budget| match budget.get() {
                None => true,
                Some(0) => false,
                Some(n) => {
                    budget.set(Some(n - 1));
                    true
                }
            })
            .unwrap_or(true)
    }
}

unsafe impl GlobalAlloc for FailingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if Self::may_allocate() {
            System.alloc(layout)
        } else {
            std::ptr::null_mut()
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if Self::may_allocate() {
            System.realloc(ptr, layout, new_size)
        } else {
            std::ptr::null_mut()
        }
    }
}

#[global_allocator]
static ALLOCATOR: FailingAllocator = FailingAllocator;

/// Runs `f` with at most `allocations` successful allocations on this thread.
fn with_allocation_budget<T>(allocations: usize, f: impl FnOnce() -> T) -> T {
    BUDGET.with(|budget| budget.set(Some(allocations)));
    let result = f();
    BUDGET.with(|budget| budget.set(None));
    result
}

/// Hashes a `u64` key to itself, so tests pick the bucket of every key.
#[derive(Default)]
struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 = (self.0 << 8) | u64::from(*byte);
        }
    }

    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
}

type IdentityBuildHasher = BuildHasherDefault<IdentityHasher>;

fn identity_table(capacity: usize) -> Table<u64, u64, IdentityBuildHasher> {
    Table::with_capacity_and_hasher(capacity, IdentityBuildHasher::default())
        .expect("failed to create a table")
}

#[test]
fn failed_resize_leaves_the_table_unchanged() {
    let table = Table::with_capacity(4).unwrap();
    for (key, value) in [("a", 1), ("b", 2), ("c", 3)] {
        table.insert(key, value).unwrap();
    }

    // A 4th key needs 8 buckets, and the new array cannot be allocated.
    let result = with_allocation_budget(0, || table.insert("d", 4));
    assert_eq!(
        result,
        Err(TableError::OutOfMemory(AllocPhase::GrowingBucketArray))
    );

    assert_eq!(table.len(), 3);
    assert_eq!(table.capacity(), 4);
    assert_eq!(table.get("a"), Some(1));
    assert_eq!(table.get("b"), Some(2));
    assert_eq!(table.get("c"), Some(3));
    assert_eq!(table.get("d"), None);

    // The table is usable once memory is available again.
    assert_eq!(table.insert("d", 4), Ok(None));
    assert_eq!(table.capacity(), 8);
    assert_eq!(table.len(), 4);
}

#[test]
fn resize_rolls_back_when_a_chain_cannot_be_reserved() {
    // Keys 0, 8 and 16 share bucket 0 in both 4 and 8 buckets.
    let table = identity_table(4);
    for key in [0, 8, 16] {
        table.insert(key, key * 10).unwrap();
    }

    // The new bucket array is allocated, but reserving room for the three
    // entries moving into its bucket 0 fails.
    let result = with_allocation_budget(1, || table.insert(1, 10));
    assert_eq!(
        result,
        Err(TableError::OutOfMemory(AllocPhase::GrowingBucketArray))
    );

    assert_eq!(table.len(), 3);
    assert_eq!(table.capacity(), 4);
    for key in [0, 8, 16] {
        assert_eq!(table.get(&key), Some(key * 10));
    }
    assert!(!table.contains_key(&1));

    assert_eq!(table.insert(1, 10), Ok(None));
    assert_eq!(table.capacity(), 8);
    let mut entries: Vec<_> = table.iter().collect();
    entries.sort_unstable();
    assert_eq!(entries, vec![(0, 0), (1, 10), (8, 80), (16, 160)]);
}

#[test]
fn failed_chain_growth_releases_the_reserved_slot() {
    let table = identity_table(4);
    table.insert(0, 0).unwrap();

    // Key 4 lands in the same bucket as key 0, whose chain is full inline.
    let result = with_allocation_budget(0, || table.insert(4, 40));
    assert_eq!(
        result,
        Err(TableError::OutOfMemory(AllocPhase::InsertingEntry))
    );
    assert_eq!(table.len(), 1);
    assert_eq!(table.capacity(), 4);
    assert_eq!(table.get(&0), Some(0));
    assert_eq!(table.get(&4), None);

    assert_eq!(table.insert(4, 40), Ok(None));
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(&4), Some(40));
}

#[test]
fn failed_reserve_leaves_the_table_unchanged() {
    let table = identity_table(4);
    for key in 0..3 {
        table.insert(key, key).unwrap();
    }

    let result = with_allocation_budget(0, || table.reserve(100));
    assert_eq!(
        result,
        Err(TableError::OutOfMemory(AllocPhase::GrowingBucketArray))
    );
    assert_eq!(table.len(), 3);
    assert_eq!(table.capacity(), 4);

    table.reserve(100).unwrap();
    assert_eq!(table.capacity(), 256);
    assert!((0..3).all(|key| table.get(&key) == Some(key)));
}
