use std::hash::{BuildHasher, Hasher};

/// Pass a precomputed meter id straight through as the hash. [`crate::MeterId`]
/// hashes its name and tags once at construction, so the registry map only
/// ever sees a single `write_u64` per key.
///
/// The decorator looks meters up on every request completion. The mid is
/// already a seeded xxhash64 of the whole identity, so hashing it a second
/// time would redo work on that path without spreading keys any better.
#[derive(Default)]
pub struct MidHasher {
    inner: u64,
}

impl Hasher for MidHasher {
    fn finish(&self) -> u64 {
        self.inner
    }

    fn write(&mut self, _bytes: &[u8]) {
        debug_assert!(false, "MidHasher only supports precomputed meter ids")
    }

    fn write_u64(&mut self, i: u64) {
        self.inner = i;
    }
}

/// An implementation of [`BuildHasher`] that hands out [`MidHasher`]s.
#[derive(Default, Debug, Clone, Copy)]
pub struct BuildMidHasher;

impl BuildHasher for BuildMidHasher {
    type Hasher = MidHasher;

    fn build_hasher(&self) -> Self::Hasher {
        MidHasher { inner: 0 }
    }
}
