#![cfg(test)]

// Property tests for DynArray kept inside the crate so they can check
// capacity bookkeeping alongside the contents.

use crate::alloc::Bounded;
use crate::dyn_array::DynArray;
use crate::error::StashError;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    PushBack(i16),
    PushFront(i16),
    PushAt(usize, i16),
    Insert(usize, Vec<i16>),
    PopBack,
    PopFront,
    PopAt(usize),
    Resize(usize, i16),
    Reserve(usize),
    ShrinkToFit,
    Fill(i16),
    Clear,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<i16>().prop_map(Op::PushBack),
        2 => any::<i16>().prop_map(Op::PushFront),
        2 => (0usize..40, any::<i16>()).prop_map(|(i, v)| Op::PushAt(i, v)),
        2 => (0usize..40, proptest::collection::vec(any::<i16>(), 0..6))
            .prop_map(|(i, vs)| Op::Insert(i, vs)),
        2 => Just(Op::PopBack),
        2 => Just(Op::PopFront),
        2 => (0usize..40).prop_map(Op::PopAt),
        1 => (0usize..48, any::<i16>()).prop_map(|(n, v)| Op::Resize(n, v)),
        1 => (0usize..64).prop_map(Op::Reserve),
        1 => Just(Op::ShrinkToFit),
        1 => any::<i16>().prop_map(Op::Fill),
        1 => Just(Op::Clear),
    ]
}

fn apply(sut: &mut DynArray<i16>, model: &mut Vec<i16>, op: Op) -> Result<(), TestCaseError> {
    match op {
        Op::PushBack(v) => {
            sut.push_back(v).unwrap();
            model.push(v);
        }
        Op::PushFront(v) => {
            sut.push_front(v).unwrap();
            model.insert(0, v);
        }
        Op::PushAt(i, v) => {
            let r = sut.push_at(i, v);
            if i < model.len() {
                prop_assert_eq!(r, Ok(()));
                model.insert(i, v);
            } else {
                prop_assert_eq!(r, Err(StashError::OutOfBounds));
            }
        }
        Op::Insert(i, vs) => {
            let r = sut.insert(i, &vs);
            if i <= model.len() {
                prop_assert_eq!(r, Ok(()));
                model.splice(i..i, vs);
            } else {
                prop_assert_eq!(r, Err(StashError::OutOfBounds));
            }
        }
        Op::PopBack => {
            let expected = model.pop().ok_or(StashError::Empty);
            prop_assert_eq!(sut.pop_back(), expected);
        }
        Op::PopFront => {
            let expected = if model.is_empty() {
                Err(StashError::Empty)
            } else {
                Ok(model.remove(0))
            };
            prop_assert_eq!(sut.pop_front(), expected);
        }
        Op::PopAt(i) => {
            let expected = if i < model.len() {
                Ok(model.remove(i))
            } else {
                Err(StashError::OutOfBounds)
            };
            prop_assert_eq!(sut.pop_at(i), expected);
        }
        Op::Resize(n, v) => {
            sut.resize(n, v).unwrap();
            model.resize(n, v);
        }
        Op::Reserve(n) => {
            let before = sut.capacity();
            sut.reserve(n).unwrap();
            prop_assert!(sut.capacity() >= n.max(before));
        }
        Op::ShrinkToFit => {
            let tight = sut.len() == sut.capacity() || sut.is_empty();
            let before = sut.capacity();
            let r = sut.shrink_to_fit();
            if tight {
                prop_assert_eq!(r, Err(StashError::Empty));
                prop_assert_eq!(sut.capacity(), before);
            } else {
                prop_assert_eq!(r, Ok(()));
                prop_assert_eq!(sut.capacity(), sut.len());
                // Twice is the same as once.
                prop_assert_eq!(sut.shrink_to_fit(), Err(StashError::Empty));
            }
        }
        Op::Fill(v) => {
            sut.fill(v);
            *model = vec![v; sut.capacity()];
        }
        Op::Clear => {
            sut.clear();
            model.clear();
        }
    }
    Ok(())
}

// Property: state-machine equivalence against Vec.
// Invariants exercised after every op:
// - `len <= capacity`, and storage is allocated iff `capacity > 0`.
// - Contents, front/back and indexed access match the model.
// - Forward and reverse cursor walks visit exactly the live elements.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(cap in 0usize..6, ops in proptest::collection::vec(arb_op(), 1..80)) {
        let mut sut: DynArray<i16> = DynArray::with_capacity(cap);
        let mut model: Vec<i16> = Vec::new();
        for op in ops {
            apply(&mut sut, &mut model, op)?;

            prop_assert!(sut.len() <= sut.capacity());
            prop_assert_eq!(sut.is_valid(), sut.capacity() > 0);
            prop_assert_eq!(sut.as_slice(), model.as_slice());
            prop_assert_eq!(sut.front(), model.first());
            prop_assert_eq!(sut.back(), model.last());
            prop_assert_eq!(sut.get(model.len()), None);

            let mut c = sut.begin();
            let mut fwd = Vec::new();
            while let Some(v) = c.current() {
                fwd.push(*v);
                c.move_next();
            }
            prop_assert_eq!(&fwd, &model);
            let mut c = sut.end();
            let mut back = Vec::new();
            while let Some(v) = c.current() {
                back.push(*v);
                c.move_prev();
            }
            back.reverse();
            prop_assert_eq!(&back, &model);
        }
    }
}

// Property: `copy` compares equal to its source; `compare` is reflexive,
// symmetric and transitive over copies, and sensitive to any single change.
proptest! {
    #[test]
    fn prop_copy_compare(values in proptest::collection::vec(any::<u32>(), 0..40), flip in any::<prop::sample::Index>()) {
        let mut a: DynArray<u32> = DynArray::new();
        a.insert(0, &values).unwrap();
        let b = a.copy().unwrap();
        let c = b.copy().unwrap();
        prop_assert_eq!(b.len(), a.len());
        prop_assert_eq!(b.capacity(), a.len());
        prop_assert!(a.compare(&a));
        prop_assert!(a.compare(&b) && b.compare(&a));
        prop_assert!(b.compare(&c) && a.compare(&c));

        if !values.is_empty() {
            let mut d = a.copy().unwrap();
            let i = flip.index(values.len());
            d[i] = d[i].wrapping_add(1);
            prop_assert!(!a.compare(&d));
        }
    }
}

// Property: under a tight byte budget every failed operation leaves the
// array exactly as it was.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_failures_are_atomic(budget in 0usize..64, ops in proptest::collection::vec(arb_op(), 1..60)) {
        let alloc = Bounded::new(budget);
        let mut sut: DynArray<i16, _> = DynArray::new_in(alloc.clone());
        for op in ops {
            let before: Vec<i16> = sut.as_slice().to_vec();
            let cap = sut.capacity();
            let outcome = match op {
                Op::PushBack(v) => sut.push_back(v),
                Op::PushFront(v) => sut.push_front(v),
                Op::Insert(i, vs) => sut.insert(i.min(sut.len()), &vs),
                Op::Resize(n, v) => sut.resize(n, v),
                Op::Reserve(n) => sut.reserve(n),
                _ => sut.pop_back().map(|_| ()),
            };
            if outcome == Err(StashError::OutOfMemory) {
                prop_assert_eq!(sut.as_slice(), before.as_slice());
                prop_assert_eq!(sut.capacity(), cap);
            }
            prop_assert!(alloc.in_use() <= budget);
            prop_assert_eq!(alloc.in_use(), sut.capacity() * core::mem::size_of::<i16>());
        }
    }
}
