#![cfg(test)]

// Property tests for SlotRegistry kept inside the crate so they can audit
// the retired-id stack and validity flags directly.

use crate::alloc::Bounded;
use crate::error::StashError;
use crate::slot_registry::{SlotRegistry, NULL_ID};
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Clone, Debug)]
enum Op {
    Push(i32),
    // Index into the ids issued so far; may name a retired id.
    Pop(usize),
    PopRaw(u32),
    Get(usize),
    Set(usize, i32),
    Iterate,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        5 => any::<i32>().prop_map(Op::Push),
        3 => any::<usize>().prop_map(Op::Pop),
        1 => (0u32..80).prop_map(Op::PopRaw),
        2 => any::<usize>().prop_map(Op::Get),
        1 => (any::<usize>(), any::<i32>()).prop_map(|(i, v)| Op::Set(i, v)),
        1 => Just(Op::Iterate),
    ];
    proptest::collection::vec(op, 1..150)
}

// Reference: slot n-1 holds id n, plus the LIFO stack of retired ids.
#[derive(Default)]
struct Model {
    slots: Vec<Option<i32>>,
    retired: Vec<u32>,
}

impl Model {
    fn push(&mut self, v: i32) -> u32 {
        match self.retired.pop() {
            Some(id) => {
                self.slots[id as usize - 1] = Some(v);
                id
            }
            None => {
                self.slots.push(Some(v));
                self.slots.len() as u32
            }
        }
    }

    fn pop(&mut self, id: u32) -> Option<i32> {
        if id == NULL_ID {
            return None;
        }
        let v = self.slots.get_mut(id as usize - 1)?.take()?;
        self.retired.push(id);
        Some(v)
    }

    fn get(&self, id: u32) -> Option<&i32> {
        if id == NULL_ID {
            return None;
        }
        self.slots.get(id as usize - 1)?.as_ref()
    }

    fn live(&self) -> Vec<(u32, i32)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|v| (i as u32 + 1, v)))
            .collect()
    }
}

/// Retired ids are distinct, nonzero, below `next_id` and flagged dead.
fn check_bookkeeping(r: &SlotRegistry<i32>) -> Result<(), TestCaseError> {
    let flags = r.flags();
    let free = r.free_ids();
    prop_assert_eq!(flags.len() as u32, r.alloc_count());
    prop_assert_eq!(r.next_id(), r.alloc_count() + 1);
    let distinct: BTreeSet<u32> = free.iter().copied().collect();
    prop_assert_eq!(distinct.len(), free.len());
    for &id in free {
        prop_assert!(id != NULL_ID);
        prop_assert!(id < r.next_id());
        prop_assert!(!flags[id as usize - 1], "retired id {} still flagged live", id);
    }
    prop_assert_eq!(flags.iter().filter(|&&f| f).count(), r.len());
    prop_assert_eq!(r.len() + free.len(), flags.len());
    Ok(())
}

// Property: state-machine equivalence against a Vec<Option<_>> model with
// an explicit retired-id stack.
// Invariants exercised across random operation sequences:
// - Ids are reissued LIFO, and fresh ids are consecutive from 1.
// - A live id addresses the same value until it is popped.
// - Popping a dead, null or unknown id is a no-op returning `None`.
// - Forward, reverse and cursor walks all yield live ids in ascending order.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(cap in 0usize..5, ops in arb_ops()) {
        let mut sut: SlotRegistry<i32> = SlotRegistry::with_capacity(cap);
        let mut model = Model::default();
        let mut issued: Vec<u32> = Vec::new();

        for op in ops {
            match op {
                Op::Push(v) => {
                    let id = sut.push(v).unwrap();
                    prop_assert_eq!(id, model.push(v));
                    issued.push(id);
                }
                Op::Pop(i) => {
                    if issued.is_empty() {
                        continue;
                    }
                    let id = issued[i % issued.len()];
                    prop_assert_eq!(sut.pop(id), model.pop(id));
                    prop_assert!(!sut.exists(id));
                }
                Op::PopRaw(id) => {
                    prop_assert_eq!(sut.pop(id), model.pop(id));
                }
                Op::Get(i) => {
                    if issued.is_empty() {
                        continue;
                    }
                    let id = issued[i % issued.len()];
                    prop_assert_eq!(sut.get(id), model.get(id));
                    prop_assert_eq!(sut.exists(id), model.get(id).is_some());
                }
                Op::Set(i, v) => {
                    if issued.is_empty() {
                        continue;
                    }
                    let id = issued[i % issued.len()];
                    match sut.get_mut(id) {
                        Some(slot) => {
                            *slot = v;
                            model.slots[id as usize - 1] = Some(v);
                        }
                        None => prop_assert!(model.get(id).is_none()),
                    }
                }
                Op::Iterate => {
                    let expected = model.live();
                    let fwd: Vec<(u32, i32)> = sut.iter().map(|(id, v)| (id, *v)).collect();
                    prop_assert_eq!(&fwd, &expected);
                    let mut rev: Vec<(u32, i32)> = sut.iter().rev().map(|(id, v)| (id, *v)).collect();
                    rev.reverse();
                    prop_assert_eq!(&rev, &expected);

                    let mut c = sut.end();
                    let mut walked = Vec::new();
                    while let (Some(id), Some(v)) = (c.key(), c.current()) {
                        walked.push((id, *v));
                        c.move_prev();
                    }
                    walked.reverse();
                    prop_assert_eq!(&walked, &expected);
                }
            }

            check_bookkeeping(&sut)?;
            prop_assert_eq!(sut.free_ids(), model.retired.as_slice());
            prop_assert_eq!(sut.len(), model.live().len());
            prop_assert!(!sut.exists(NULL_ID));
        }
    }
}

// Property: under a byte budget a failed push changes nothing observable,
// and retiring an id never fails once it was issued.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_bounded_push_is_atomic(budget in 0usize..512, ops in arb_ops()) {
        let mut sut: SlotRegistry<i32, _> = SlotRegistry::new_in(Bounded::new(budget));
        let mut model = Model::default();
        let mut issued: Vec<u32> = Vec::new();

        for op in ops {
            match op {
                Op::Push(v) => match sut.push(v) {
                    Ok(id) => {
                        prop_assert_eq!(id, model.push(v));
                        issued.push(id);
                    }
                    Err(e) => {
                        prop_assert_eq!(e, StashError::OutOfMemory);
                        prop_assert!(model.retired.is_empty(), "reuse never allocates");
                        prop_assert_eq!(sut.alloc_count() as usize, model.slots.len());
                    }
                },
                Op::Pop(i) if !issued.is_empty() => {
                    let id = issued[i % issued.len()];
                    prop_assert_eq!(sut.pop(id), model.pop(id));
                }
                _ => {}
            }
            prop_assert_eq!(sut.len(), model.live().len());
            for (id, v) in model.live() {
                prop_assert_eq!(sut.get(id), Some(&v));
            }
        }
    }
}
