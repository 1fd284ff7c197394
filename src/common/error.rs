use std::fmt;

/// The error type for fallible [`Table`][table-struct] operations.
///
/// A failed operation leaves the table exactly as it was before the call: no
/// entry is partially inserted and no bucket array is partially rebuilt.
///
/// [table-struct]: ./struct.Table.html
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// A memory allocation failed, or the requested size could not be
    /// represented.
    #[error("out of memory while {0}")]
    OutOfMemory(AllocPhase),
}

/// The operation during which an allocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocPhase {
    /// Allocating the initial bucket array.
    CreatingTable,
    /// Making room in a bucket's chain for a new entry.
    InsertingEntry,
    /// Allocating or populating a larger bucket array during a resize.
    GrowingBucketArray,
}

impl fmt::Display for AllocPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CreatingTable => "creating the table",
            Self::InsertingEntry => "inserting an entry",
            Self::GrowingBucketArray => "growing the bucket array",
        };
        f.write_str(s)
    }
}

impl TableError {
    /// Returns the phase in which the allocation failed.
    pub fn phase(&self) -> AllocPhase {
        match self {
            Self::OutOfMemory(phase) => *phase,
        }
    }
}
