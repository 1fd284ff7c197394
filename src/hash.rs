//! The default hasher: 32-bit FNV-1a.
//!
//! FNV-1a is fast for the short keys typical of a hash table and spreads them
//! well enough over the low bits that bucket selection uses. It gives no
//! protection against adversarial keys; supply a keyed hasher such as
//! `std::collections::hash_map::RandomState` through
//! [`Table::with_hasher`][with-hasher] when that matters.
//!
//! [with-hasher]: ../struct.Table.html#method.with_hasher

use std::hash::{BuildHasherDefault, Hasher};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Hashes `bytes` with 32-bit FNV-1a.
///
/// # Examples
///
/// ```rust
/// use shardtable::hash::fnv1a_32;
///
/// assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
/// assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
/// ```
#[inline]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    fold(FNV_OFFSET_BASIS, bytes)
}

#[inline]
fn fold(state: u32, bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(state, |h, b| (h ^ u32::from(*b)).wrapping_mul(FNV_PRIME))
}

/// A [`Hasher`] computing 32-bit FNV-1a over everything written to it.
///
/// `finish` widens the 32-bit state to `u64`.
#[derive(Clone, Copy, Debug)]
pub struct Fnv1aHasher {
    state: u32,
}

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Self {
            state: FNV_OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.state = fold(self.state, bytes);
    }

    #[inline]
    fn finish(&self) -> u64 {
        u64::from(self.state)
    }
}

/// Builds [`Fnv1aHasher`]s. This is the default hasher of a `Table`.
pub type Fnv1aBuildHasher = BuildHasherDefault<Fnv1aHasher>;
