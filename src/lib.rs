//! # art-mvcc
//!
//! A concurrent in-memory Adaptive Radix Tree with a multi-version layer on
//! top.
//!
//! Based on "The Adaptive Radix Tree: ARTful Indexing for Main-Memory
//! Databases" (ICDE 2013, Leis et al.)
//!
//! [`Art`] maps byte-string keys to values. Inner nodes come in four sizes
//! (4, 16, 48 and 256 children) and change size as children come and go;
//! shared key bytes are compressed into node prefixes. Every node has its
//! own lock, so readers and writers on disjoint paths do not contend.
//!
//! [`MvccArt`] stores an append-only [`VersionChain`] per key. Writes and
//! deletes are stamped with a caller-supplied [`TxnId`] and never modify
//! an existing version.
//!
//! ## Example
//!
//! ```rust
//! use art_mvcc::{Art, MvccArt, VersionStatus};
//!
//! let tree: Art<u64> = Art::new();
//! tree.insert(b"hello", 1);
//! tree.insert(b"help", 2);
//! assert_eq!(tree.get(b"hello"), Some(1));
//! assert_eq!(tree.prefix_entries(b"hel").len(), 2);
//!
//! let store: MvccArt<&str> = MvccArt::new();
//! store.insert(b"k", "v1", 1).unwrap();
//! store.update(b"k", "v2", 2).unwrap();
//! store.delete(b"k", 3).unwrap();
//!
//! assert!(store.get(b"k").is_none());
//! assert_eq!(store.read_at(b"k", 2).unwrap().value(), Some(&"v2"));
//! assert_eq!(store.current(b"k").unwrap().status(), VersionStatus::Deleted);
//! ```

#![forbid(unsafe_code)]

pub mod art;
pub mod mvcc;

mod config;
mod error;

pub use art::{Art, ArtStats, NodeKind};
pub use config::Config;
pub use error::{MvccError, MvccResult};
pub use mvcc::{History, MvccArt, Snapshot, TxnId, VersionChain, VersionStatus};

#[cfg(test)]
mod proptests;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::collections::BTreeMap;
    use std::ops::ControlFlow;

    fn random_key(rng: &mut StdRng) -> Vec<u8> {
        let len = rng.gen_range(0..=12);
        // Bias toward a few bytes so keys share prefixes and nest.
        (0..len)
            .map(|_| match rng.gen_range(0..10) {
                0..=6 => b"abc\0"[rng.gen_range(0..4)],
                _ => rng.gen(),
            })
            .collect()
    }

    #[test]
    fn test_iter_sorted_random() {
        let mut rng = StdRng::seed_from_u64(0xA57);
        let tree: Art<u32> = Art::new();
        let mut model = BTreeMap::new();

        for i in 0..5_000u32 {
            let key = random_key(&mut rng);
            tree.insert(&key, i);
            model.insert(key, i);
        }

        let expected: Vec<(Vec<u8>, u32)> = model.into_iter().collect();
        assert_eq!(tree.entries(), expected);
        assert!(tree.verify_integrity().is_empty());
    }

    #[test]
    fn test_randomized_insert_remove_get() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        let tree: Art<u64> = Art::new();
        let mut model: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for step in 0..20_000u64 {
            let key = random_key(&mut rng);
            match rng.gen_range(0..10) {
                0..=4 => assert_eq!(tree.insert(&key, step), model.insert(key, step)),
                5..=7 => assert_eq!(tree.remove(&key), model.remove(&key)),
                _ => assert_eq!(tree.get(&key), model.get(&key).copied()),
            }
            if step % 2_000 == 0 {
                let issues = tree.verify_integrity();
                assert!(issues.is_empty(), "step {step}: {issues:?}");
            }
        }

        assert_eq!(tree.len(), model.len());
        for (key, value) in &model {
            assert_eq!(tree.get(key), Some(*value));
        }
    }

    #[test]
    fn test_randomized_versions_match_model() {
        let mut rng = StdRng::seed_from_u64(42);
        let store: MvccArt<u64> = MvccArt::new();
        // Per key: every (txn, value) written, tombstones as None.
        let mut model: BTreeMap<Vec<u8>, Vec<(TxnId, Option<u64>)>> = BTreeMap::new();

        for txn in 1..=3_000u64 {
            let key = random_key(&mut rng);
            let live = matches!(model.get(&key).and_then(|h| h.last()), Some((_, Some(_))));
            if rng.gen_bool(0.3) {
                let result = store.delete(&key, txn);
                assert_eq!(result.is_ok(), live);
                if live {
                    model.entry(key).or_default().push((txn, None));
                }
            } else {
                store.insert(&key, txn * 10, txn).unwrap();
                model.entry(key).or_default().push((txn, Some(txn * 10)));
            }
        }

        for (key, writes) in &model {
            let history: Vec<(TxnId, Option<u64>)> = store
                .history(key)
                .into_iter()
                .map(|s| (s.version(), s.value().copied()))
                .collect();
            let expected: Vec<(TxnId, Option<u64>)> = writes.iter().rev().copied().collect();
            assert_eq!(history, expected);

            let (probe, _) = writes[writes.len() / 2];
            let visible = store.read_at(key, probe).map(|s| s.version());
            assert_eq!(visible, Some(probe));
        }

        let mut live = 0;
        let _ = store.for_each(|_, _| {
            live += 1;
            ControlFlow::<()>::Continue(())
        });
        let expected = model.values().filter(|w| matches!(w.last(), Some((_, Some(_))))).count();
        assert_eq!(live, expected);
    }
}
