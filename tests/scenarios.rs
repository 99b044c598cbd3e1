use stash::{status, Bounded, DynArray, IntMap, SlotRegistry, StashError, NULL_ID, SUCCESS};
use std::collections::BTreeSet;

#[test]
fn dyn_array_grows_and_pops_front() {
    let mut a: DynArray<i32> = DynArray::with_capacity(2);
    a.push_back(10).unwrap();
    a.push_back(20).unwrap();
    a.push_back(30).unwrap();
    assert_eq!(a.len(), 3);
    assert_eq!(a.capacity(), 4);
    assert_eq!(a.as_slice(), &[10, 20, 30]);

    assert_eq!(a.pop_front(), Ok(10));
    assert_eq!(a.as_slice(), &[20, 30]);
}

#[test]
fn zero_capacity_array_becomes_valid_after_reserve() {
    let mut a: DynArray<i32> = DynArray::with_capacity(0);
    assert!(!a.is_valid());
    assert_eq!(a.pop_back(), Err(StashError::Empty));
    assert_eq!(a.begin(), a.end());

    a.reserve(4).unwrap();
    assert!(a.is_valid());
    assert_eq!(a.capacity(), 4);
    assert_eq!(a.len(), 0);
}

#[test]
fn int_map_rejects_duplicates_and_removes() {
    let mut m: IntMap<u64> = IntMap::with_capacity(8);
    m.insert(42, 100).unwrap();
    assert_eq!(m.insert(42, 200), Err(StashError::KeyExists));
    assert_eq!(m.get(42), Ok(&100));

    assert_eq!(m.remove(42), Ok(100));
    assert!(!m.contains_key(42));
}

#[test]
fn int_map_small_table_holds_all_keys() {
    let mut m: IntMap<u8> = IntMap::with_capacity(4);
    for k in 1..5u32 {
        assert_eq!(m.insert(k, k as u8), Ok(()));
    }
    assert_eq!(m.count(), 4);
    let values: BTreeSet<u8> = m.iter().map(|(_, v)| *v).collect();
    assert_eq!(values, BTreeSet::from([1, 2, 3, 4]));
}

#[test]
fn registry_reuses_ids_lifo() {
    let mut r: SlotRegistry<u32> = SlotRegistry::with_capacity(0);
    let a = r.push(10).unwrap();
    let b = r.push(20).unwrap();
    assert_eq!(r.pop(a), Some(10));
    let c = r.push(30).unwrap();

    assert_eq!((a, b, c), (1, 2, 1));
    assert_eq!(r.get(1), Some(&30));
    assert_eq!(r.get(2), Some(&20));
    assert!(!r.exists(NULL_ID));
}

#[test]
fn resize_with_and_without_fill_value() {
    let mut a: DynArray<u8> = DynArray::with_capacity(4);
    a.resize(3, 0xFF).unwrap();
    a.resize_default(5).unwrap();
    assert_eq!(a.as_slice(), &[0xFF, 0xFF, 0xFF, 0x00, 0x00]);
    assert_eq!(a.len(), 5);
}

#[test]
fn single_element_cursor_has_no_neighbours() {
    let mut a: DynArray<char> = DynArray::new();
    a.push_back('z').unwrap();
    let c = a.begin();
    assert_eq!(c, a.end());
    assert_eq!(c.current(), Some(&'z'));
    assert_eq!(c.peek_next(), None);
    assert_eq!(c.peek_prev(), None);

    let mut m: IntMap<char> = IntMap::new();
    m.insert(9, 'n').unwrap();
    assert_eq!(m.begin(), m.end());
    assert_eq!(m.begin().key(), Some(9));
}

#[test]
fn empty_containers_report_empty() {
    let mut a: DynArray<u16> = DynArray::new();
    assert_eq!(a.pop_front(), Err(StashError::Empty));
    assert_eq!(a.pop_at(0), Err(StashError::OutOfBounds));
    assert_eq!(a.begin().current(), None);

    let m: IntMap<u16> = IntMap::new();
    assert_eq!(m.begin(), m.end());
    assert!(m.begin().is_after_end());

    let r: SlotRegistry<u16> = SlotRegistry::new();
    assert_eq!(r.begin(), r.end());
    assert_eq!(r.iter().next(), None);
}

#[test]
fn insert_at_len_appends_but_push_at_len_fails() {
    let mut a: DynArray<u8> = DynArray::new();
    a.insert(0, &[1, 2]).unwrap();
    assert_eq!(a.push_at(2, 3), Err(StashError::OutOfBounds));
    a.insert(2, &[3]).unwrap();
    assert_eq!(a.as_slice(), &[1, 2, 3]);
    assert_eq!(a.insert(4, &[9]), Err(StashError::OutOfBounds));
}

#[test]
fn missing_key_is_not_found() {
    let mut m: IntMap<i64> = IntMap::new();
    assert_eq!(m.remove(3), Err(StashError::KeyNotFound));
    assert_eq!(m.get(3), Err(StashError::KeyNotFound));
}

#[test]
fn exhausted_allocator_surfaces_out_of_memory() {
    let alloc = Bounded::new(0);
    let mut a: DynArray<u32, _> = DynArray::new_in(alloc.clone());
    assert_eq!(a.push_back(1), Err(StashError::OutOfMemory));
    assert!(a.is_empty());

    let mut m: IntMap<u32, _> = IntMap::new_in(alloc.clone());
    assert!(!m.is_valid());
    assert_eq!(m.insert(1, 1), Err(StashError::OutOfMemory));

    let mut r: SlotRegistry<u32, _> = SlotRegistry::new_in(alloc.clone());
    assert_eq!(r.push(1), Err(StashError::OutOfMemory));
    assert_eq!(r.next_id(), 1);

    alloc.set_limit(usize::MAX);
    assert_eq!(a.push_back(1), Ok(()));
    assert_eq!(r.push(1), Ok(1));
}

#[test]
fn status_codes_follow_legacy_values() {
    let ok: stash::Result<()> = Ok(());
    assert_eq!(status(&ok), SUCCESS);
    let mut m: IntMap<u8> = IntMap::new();
    assert_eq!(status(&m.remove(1)), -3);
    m.insert(1, 1).unwrap();
    assert_eq!(status(&m.insert(1, 1)), 2);
    let mut a: DynArray<u8> = DynArray::new();
    assert_eq!(status(&a.pop_back()), 1);
    assert_eq!(status(&a.pop_at(3)), -2);
}
