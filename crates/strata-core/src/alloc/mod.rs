//! Allocation and collection types.
//!
//! - Re-exports of hash collections using AHash
//! - [`SparseSet`](sparse_set::SparseSet), a generational arena used for every
//!   externally-owned object the batcher refers to

pub mod sparse_set;

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};

/// Hasher builder with fixed seeds.
///
/// Identity hashes computed with it are stable for the whole process, which batch keys
/// rely on when comparing hashes across draws.
pub fn stable_hasher() -> RandomState {
    RandomState::with_seeds(
        0x5354_5241_5441_0001,
        0x9e37_79b9_7f4a_7c15,
        0xbf58_476d_1ce4_e5b9,
        0x94d0_49bb_1331_11eb,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::BuildHasher;

    #[test]
    fn test_hashmap_ahash() {
        let mut map = HashMap::new();
        map.insert("key", "value");
        assert_eq!(map.get("key"), Some(&"value"));
    }

    #[test]
    fn test_stable_hasher_is_deterministic() {
        let a = stable_hasher().hash_one((1u32, 2u64));
        let b = stable_hasher().hash_one((1u32, 2u64));
        assert_eq!(a, b);
        assert_ne!(a, stable_hasher().hash_one((2u32, 1u64)));
    }
}
