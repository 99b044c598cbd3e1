#![cfg(test)]

// Property tests for IntMap kept inside the crate so they can inspect the
// bucket layout directly.

use crate::alloc::Bounded;
use crate::error::StashError;
use crate::int_map::{hash_u32, IntMap};
use hashbrown::HashMap;
use proptest::prelude::*;
use std::collections::BTreeSet;

// Keys drawn from a small pool so inserts collide with removes; a few
// arbitrary keys keep the pool honest.
#[derive(Clone, Debug)]
enum Op {
    Insert(u32, u64),
    Remove(u32),
    Get(u32),
    Mutate(u32, u64),
    Reserve(usize),
    Clear,
    Iterate,
}

fn arb_key() -> impl Strategy<Value = u32> {
    prop_oneof![
        8 => 0u32..48,
        1 => any::<u32>(),
    ]
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        6 => (arb_key(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        3 => arb_key().prop_map(Op::Remove),
        2 => arb_key().prop_map(Op::Get),
        1 => (arb_key(), any::<u64>()).prop_map(|(k, d)| Op::Mutate(k, d)),
        1 => (0usize..96).prop_map(Op::Reserve),
        1 => Just(Op::Clear),
        1 => Just(Op::Iterate),
    ];
    proptest::collection::vec(op, 1..120)
}

/// Occupied count, key distinctness and probe reachability from the home bucket.
fn check_layout(map: &IntMap<u64>) -> Result<(), TestCaseError> {
    let slots = map.bucket_keys();
    let n = slots.len();
    prop_assert!(n.is_power_of_two());
    let occupied: Vec<u32> = slots.iter().flatten().copied().collect();
    prop_assert_eq!(occupied.len(), map.len());
    let distinct: BTreeSet<u32> = occupied.iter().copied().collect();
    prop_assert_eq!(distinct.len(), occupied.len());
    prop_assert!(map.len() * 10 <= n * 7, "load factor above 0.7");

    for (j, slot) in slots.iter().enumerate() {
        if let Some(k) = slot {
            let mut i = hash_u32(*k) as usize & (n - 1);
            while i != j {
                prop_assert!(slots[i].is_some(), "free bucket {} splits chain of key {}", i, k);
                i = (i + 1) & (n - 1);
            }
        }
    }
    Ok(())
}

// Property: state-machine equivalence against hashbrown::HashMap.
// Invariants exercised across random operation sequences:
// - Duplicate inserts fail with `KeyExists` and keep the old value.
// - `get`/`contains_key`/`remove` agree with the model; misses are `KeyNotFound`.
// - The bucket layout stays a valid linear-probing table after every op.
// - Iteration, forward and reverse, yields exactly the model's entries.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(buckets in 0usize..10, ops in arb_ops()) {
        let mut sut: IntMap<u64> = IntMap::with_capacity(buckets);
        let mut model: HashMap<u32, u64> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let r = sut.insert(k, v);
                    if model.contains_key(&k) {
                        prop_assert_eq!(r, Err(StashError::KeyExists));
                    } else {
                        prop_assert_eq!(r, Ok(()));
                        model.insert(k, v);
                    }
                    prop_assert_eq!(sut.get(k), Ok(&model[&k]));
                }
                Op::Remove(k) => {
                    let expected = model.remove(&k).ok_or(StashError::KeyNotFound);
                    prop_assert_eq!(sut.remove(k), expected);
                    prop_assert!(!sut.contains_key(k));
                }
                Op::Get(k) => {
                    prop_assert_eq!(sut.get(k).ok(), model.get(&k));
                    prop_assert_eq!(sut.contains_key(k), model.contains_key(&k));
                }
                Op::Mutate(k, d) => {
                    if let Some(v) = sut.get_mut(k) {
                        *v = v.wrapping_add(d);
                        let mv = model.get_mut(&k).expect("model has key");
                        *mv = mv.wrapping_add(d);
                    } else {
                        prop_assert!(!model.contains_key(&k));
                    }
                }
                Op::Reserve(n) => {
                    let before = sut.bucket_count();
                    sut.reserve(n).unwrap();
                    prop_assert!(sut.bucket_count() >= before);
                    prop_assert!(n * 10 <= sut.bucket_count() * 7);
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
                Op::Iterate => {
                    let fwd: BTreeSet<(u32, u64)> = sut.iter().map(|(k, v)| (k, *v)).collect();
                    let rev: BTreeSet<(u32, u64)> = sut.iter().rev().map(|(k, v)| (k, *v)).collect();
                    let expected: BTreeSet<(u32, u64)> = model.iter().map(|(k, v)| (*k, *v)).collect();
                    prop_assert_eq!(&fwd, &expected);
                    prop_assert_eq!(&rev, &expected);

                    let mut c = sut.begin();
                    let mut walked = Vec::new();
                    while let (Some(k), Some(v)) = (c.key(), c.current()) {
                        walked.push((k, *v));
                        c.move_next();
                    }
                    prop_assert_eq!(walked.len(), model.len());
                    prop_assert_eq!(walked.into_iter().collect::<BTreeSet<_>>(), expected);
                }
            }

            check_layout(&sut)?;
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
        }
    }
}

// Property: with growth capped by a byte budget, every insert either
// succeeds or fails with `OutOfMemory` without disturbing existing entries.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_bounded_growth(limit_buckets in 1usize..64, keys in proptest::collection::vec(any::<u32>(), 1..80)) {
        let bucket_bytes = core::mem::size_of::<Option<u64>>() + 8;
        let alloc = Bounded::new(limit_buckets * bucket_bytes);
        let mut sut: IntMap<u64, _> = IntMap::with_capacity_in(1, alloc);
        let mut model: HashMap<u32, u64> = HashMap::new();

        for k in keys {
            let v = u64::from(k) * 3;
            match sut.insert(k, v) {
                Ok(()) => {
                    prop_assert!(model.insert(k, v).is_none());
                }
                Err(StashError::KeyExists) => prop_assert!(model.contains_key(&k)),
                Err(StashError::OutOfMemory) => prop_assert!(!model.contains_key(&k)),
                Err(e) => prop_assert!(false, "unexpected error {:?}", e),
            }
            prop_assert_eq!(sut.len(), model.len());
            for (mk, mv) in &model {
                prop_assert_eq!(sut.get(*mk), Ok(mv));
            }
        }
    }
}
