//! Debug-only detection of same-thread access to a table that is being
//! iterated.
//!
//! An iterator holds the table-wide lock exclusively, so any other operation on
//! the same table from the same thread would wait on that lock forever. In
//! debug builds the iterator registers its table in a thread-local list and
//! every table operation checks that list first, turning the deadlock into a
//! panic. In release builds the checks compile to nothing.

#[cfg(debug_assertions)]
use std::cell::RefCell;
use std::{
    marker::PhantomData,
    sync::atomic::{AtomicUsize, Ordering},
};

#[cfg(debug_assertions)]
use smallvec::SmallVec;

static NEXT_TABLE_ID: AtomicUsize = AtomicUsize::new(0);

#[cfg(debug_assertions)]
thread_local! {
    static ITERATED_TABLES: RefCell<SmallVec<[usize; 4]>> = RefCell::new(SmallVec::new());
}

/// Returns an identifier unique to one table instance.
pub(crate) fn next_table_id() -> usize {
    NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Panics in debug builds if the current thread holds an iterator of the table
/// `table_id`.
#[inline]
pub(crate) fn assert_not_iterating(_table_id: usize) {
    #[cfg(debug_assertions)]
    ITERATED_TABLES.with(|ids| {
        assert!(
            !ids.borrow().contains(&_table_id),
            "table accessed by the thread that holds one of its iterators; \
             drop the iterator first"
        );
    });
}

/// Registration of one live iterator. Deregisters on drop.
///
/// Not `Send`: the registration lives in the creating thread's local list.
pub(crate) struct IterationMarker {
    #[cfg(debug_assertions)]
    table_id: usize,
    _not_send: PhantomData<*const ()>,
}

impl IterationMarker {
    /// Registers an iterator of `table_id` for the current thread. The caller
    /// must have called `assert_not_iterating` before taking the table lock.
    pub(crate) fn register(_table_id: usize) -> Self {
        #[cfg(debug_assertions)]
        ITERATED_TABLES.with(|ids| ids.borrow_mut().push(_table_id));

        Self {
            #[cfg(debug_assertions)]
            table_id: _table_id,
            _not_send: PhantomData,
        }
    }
}

impl Drop for IterationMarker {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        ITERATED_TABLES.with(|ids| {
            let mut ids = ids.borrow_mut();
            if let Some(pos) = ids.iter().position(|id| *id == self.table_id) {
                ids.swap_remove(pos);
            }
        });
    }
}
