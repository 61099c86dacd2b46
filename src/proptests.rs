use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::ops::ControlFlow;

fn validate_tree<V>(t: &Art<V>) {
    let issues = t.verify_integrity();
    assert!(issues.is_empty(), "tree integrity issues: {issues:?}");
}

fn entries<V: Clone>(t: &Art<V>) -> Vec<(Vec<u8>, V)> {
    t.entries()
}

fn prefix_entries<V: Clone>(t: &Art<V>, prefix: &[u8]) -> Vec<(Vec<u8>, V)> {
    let mut out = Vec::new();
    let _ = t.for_each_prefix(prefix, |k, v| {
        out.push((k.to_vec(), v.clone()));
        ControlFlow::<()>::Continue(())
    });
    out
}

#[derive(Clone, Debug)]
enum Op<V> {
    Insert(Vec<u8>, V),
    Remove(Vec<u8>),
    Get(Vec<u8>),
    Prefix(Vec<u8>),
}

fn byte_strategy() -> impl Strategy<Value = u8> + Clone {
    // A narrow alphabet forces shared prefixes, splits and collapses; the
    // occasional arbitrary byte exercises the wider node variants.
    prop_oneof![
        8 => prop::sample::select(vec![0u8, b'a', b'b', b'c', 0xff]),
        2 => any::<u8>(),
    ]
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    prop_oneof![
        4 => prop::collection::vec(byte_strategy(), 0..=6),
        // Long keys give compressed prefixes past the stored bytes.
        1 => (prop::collection::vec(byte_strategy(), 0..=3), prop::collection::vec(byte_strategy(), 0..=4))
            .prop_map(|(head, tail)| {
                let mut key = b"0123456789abcdef".to_vec();
                key.extend(head);
                key.extend(tail);
                key
            }),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op<u64>>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => key.clone().prop_map(Op::Remove),
        20 => key.clone().prop_map(Op::Get),
        5 => key.clone().prop_map(Op::Prefix),
    ];
    prop::collection::vec(op, 0..=1000)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let t: Art<u64> = Art::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let old_t = t.insert(&key, value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Remove(key) => {
                    let old_t = t.remove(&key);
                    let old_m = m.remove(key.as_slice());
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Get(key) => {
                    let got_t = t.get(&key);
                    let got_m = m.get(key.as_slice()).copied();
                    prop_assert_eq!(got_t, got_m);
                }
                Op::Prefix(prefix) => {
                    let got = prefix_entries(&t, &prefix);
                    let expected: Vec<(Vec<u8>, u64)> = m
                        .range(prefix.clone()..)
                        .take_while(|(k, _)| k.starts_with(&prefix))
                        .map(|(k, v)| (k.clone(), *v))
                        .collect();
                    prop_assert_eq!(got, expected);
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        let expected: Vec<(Vec<u8>, u64)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(entries(&t), expected);
        prop_assert_eq!(t.minimum(), m.first_key_value().map(|(k, v)| (k.clone(), *v)));
        prop_assert_eq!(t.maximum(), m.last_key_value().map(|(k, v)| (k.clone(), *v)));
    }

    #[test]
    fn prop_remove_everything(keys in prop::collection::btree_set(key_strategy(), 0..200)) {
        let t: Art<usize> = Art::new();
        for (i, key) in keys.iter().enumerate() {
            prop_assert_eq!(t.insert(key, i), None);
        }
        validate_tree(&t);

        for (i, key) in keys.iter().enumerate().rev() {
            prop_assert_eq!(t.remove(key), Some(i));
        }
        prop_assert!(t.is_empty());
        prop_assert_eq!(t.root_kind(), None);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_set() -> Vec<Vec<u8>> {
    vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"b".to_vec(),
        b"aa".to_vec(),
        b"ab".to_vec(),
        b"aab".to_vec(),
        b"0123456789abcdefXY".to_vec(),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_set();

    for_each_permutation(&keys, |perm| {
        let t: Art<u64> = Art::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(t.insert(&k, v), m.insert(k, v));
        }

        validate_tree(&t);
        let expected: Vec<(Vec<u8>, u64)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
        assert_eq!(entries(&t), expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_set();

    for_each_permutation(&keys, |perm| {
        // Insert in a fixed order, then remove in this permutation.
        let t: Art<u64> = Art::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
        for (i, k) in keys.iter().enumerate() {
            let v = i as u64;
            assert_eq!(t.insert(k, v), m.insert(k.clone(), v));
        }

        for k in perm {
            assert_eq!(t.remove(&k), m.remove(k.as_slice()));
            assert_eq!(t.len(), m.len());
            validate_tree(&t);
            for (rest, v) in &m {
                assert_eq!(t.get(rest), Some(*v));
            }
        }
        assert_eq!(t.len(), 0);
        assert_eq!(t.root_kind(), None);
    });
}
