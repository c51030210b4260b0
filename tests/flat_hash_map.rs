// FlatHashMap integration test suite.
//
// Each test documents what behavior is being verified through the public
// API only. The core invariants exercised:
// - Lookup: the latest value inserted for a key is returned.
// - Size: len equals the number of keys for which contains_key holds.
// - Slot reuse: freed slots are consumed before the table grows.
// - Staleness: a cursor outlived by a mutation refuses to continue.
// - Compaction: the table shrinks to the smallest prime holding the request.
use flat_hashmap::{
    Collection, CursorState, DynMap, FlatHashMap, FlatSnapshot, InsertMode, MapError,
};

// Test: the canonical insert/remove/reinsert scenario.
// Assumes: a capacity-0 map starts with the minimum prime table.
// Verifies: counts, lookups, reuse of the freed slot, add vs set semantics.
#[test]
fn insert_remove_reinsert_scenario() {
    let mut m: FlatHashMap<i32, String> = FlatHashMap::with_capacity(0).unwrap();
    m.insert(1, "a".into()).unwrap();
    m.insert(2, "b".into()).unwrap();
    m.insert(3, "c".into()).unwrap();
    assert_eq!(m.len(), 3);
    assert_eq!(m.get(&2).map(String::as_str), Ok("b"));
    assert!(!m.contains_key(&4));

    let slot_of_two = m.find(&2).unwrap();
    assert!(m.remove(&2));
    assert_eq!(m.len(), 2);
    assert!(!m.contains_key(&2));

    m.insert(2, "z".into()).unwrap();
    assert_eq!(m.get(&2).map(String::as_str), Ok("z"));
    assert_eq!(m.find(&2), Some(slot_of_two));
    assert_eq!(m.to_snapshot().free_list, -1, "free-list head consumed");

    assert_eq!(
        m.insert_with_mode(1, "x".into(), InsertMode::Add),
        Err(MapError::DuplicateKey)
    );
    m.insert_with_mode(1, "x".into(), InsertMode::Overwrite)
        .unwrap();
    assert_eq!(m.get(&1).map(String::as_str), Ok("x"));
}

// Test: len tracks contains_key across removals of present and absent keys.
#[test]
fn len_matches_membership() {
    let mut m: FlatHashMap<u64, u64> = FlatHashMap::new();
    for i in 0..64 {
        m.insert(i * 7, i).unwrap();
    }
    let members = (0..64 * 7).filter(|k| m.contains_key(k)).count();
    assert_eq!(members, m.len());

    let before = m.len();
    assert!(m.remove(&14));
    assert_eq!(m.len(), before - 1);
    assert!(!m.remove(&15));
    assert_eq!(m.len(), before - 1);
}

// Test: growth through several resizes keeps every pair retrievable.
#[test]
fn many_resizes_keep_pairs() {
    let mut m: FlatHashMap<String, usize> = FlatHashMap::new();
    let mut caps = Vec::new();
    for i in 0..5_000 {
        m.add(format!("key-{i}"), i).unwrap();
        if caps.last() != Some(&m.capacity()) {
            caps.push(m.capacity());
        }
    }
    assert!(caps.len() > 5, "expected several resizes, saw {caps:?}");
    for i in 0..5_000 {
        assert_eq!(m.get(format!("key-{i}").as_str()), Ok(&i));
    }
    assert_eq!(m.len(), 5_000);
}

// Test: clear then re-insert is indistinguishable from a fresh map.
#[test]
fn clear_is_an_idempotent_reset() {
    let inserts = [(3, 'c'), (1, 'a'), (2, 'b')];
    let mut m: FlatHashMap<i32, char> = FlatHashMap::from_pairs([(9, 'z'), (8, 'y')]).unwrap();
    m.clear();
    m.clear();
    let mut fresh: FlatHashMap<i32, char> = FlatHashMap::new();
    for (k, v) in inserts {
        m.add(k, v).unwrap();
        fresh.add(k, v).unwrap();
    }
    assert_eq!(m, fresh);
    assert_eq!(
        m.iter().collect::<Vec<_>>(),
        fresh.iter().collect::<Vec<_>>()
    );
}

// Test: cursor staleness after each kind of mutation.
// Verifies: ConcurrentModification from advance; an untouched cursor completes.
#[test]
fn cursor_detects_modification() {
    let mut m: FlatHashMap<&str, i32> = FlatHashMap::from_pairs([("a", 1), ("b", 2)]).unwrap();

    let mut c = m.cursor();
    let mut seen = Vec::new();
    while c.advance(&m).unwrap() {
        seen.push(*c.value(&m).unwrap());
    }
    assert_eq!(seen, vec![1, 2]);
    assert_eq!(c.state(), CursorState::Exhausted);

    let mut c = m.cursor();
    m.insert("c", 3).unwrap();
    assert_eq!(c.advance(&m), Err(MapError::ConcurrentModification));

    let mut c = m.cursor();
    m.remove("a");
    assert_eq!(c.advance(&m), Err(MapError::ConcurrentModification));

    let mut c = m.cursor();
    m.clear();
    assert_eq!(c.advance(&m), Err(MapError::ConcurrentModification));
}

// Test: compaction after heavy removal.
// Verifies: 10 survivors keep their values; table length is 11.
#[test]
fn compact_after_mass_removal() {
    let mut m: FlatHashMap<u32, u32> = FlatHashMap::with_capacity(100).unwrap();
    for i in 0..100 {
        m.insert(i, i + 1000).unwrap();
    }
    for i in 0..100 {
        if i % 10 != 0 {
            m.remove(&i);
        }
    }
    m.compact(10).unwrap();
    assert_eq!(m.capacity(), 11);
    assert_eq!(m.len(), 10);
    for i in (0..100).step_by(10) {
        assert_eq!(m.get(&i), Ok(&(i + 1000)));
    }
}

// Test: views and the collection capability on the same map.
#[test]
fn views_and_collection_capability() {
    let mut m: FlatHashMap<String, i32> = FlatHashMap::new();
    Collection::add(&mut m, ("x".to_string(), 1)).unwrap();
    Collection::add(&mut m, ("y".to_string(), 2)).unwrap();
    assert!(Collection::contains(&m, &("y".to_string(), 2)));

    let keys = m.key_view();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys.to_vec(), vec!["x".to_string(), "y".to_string()]);
    let mut values = m.value_view();
    assert!(values.contains(&2));
    assert!(matches!(
        values.clear(),
        Err(MapError::UnsupportedOperation { .. })
    ));
}

// Test: the loosely-typed adapter forwards to the same storage.
#[test]
fn dyn_adapter_shares_storage() {
    let mut m: FlatHashMap<u16, String> = FlatHashMap::new();
    {
        let host: &mut dyn DynMap = &mut m;
        host.dyn_add(Box::new(7u16), Box::new("seven".to_string()))
            .unwrap();
        assert_eq!(
            host.dyn_add(Box::new(7u32), Box::new("x".to_string())),
            Err(MapError::InvalidKey)
        );
    }
    assert_eq!(m.get(&7).map(String::as_str), Ok("seven"));
}

// Test: a snapshot moved through plain arrays restores the same map.
#[test]
fn snapshot_through_plain_arrays() {
    let mut m: FlatHashMap<i64, i64> = FlatHashMap::new();
    for i in 0..40 {
        m.insert(i, -i).unwrap();
    }
    for i in (0..40).step_by(3) {
        m.remove(&i);
    }
    let FlatSnapshot {
        buckets,
        hashes,
        next,
        keys,
        values,
        count,
        free_list,
        free_count,
    } = m.to_snapshot();
    let rebuilt = FlatSnapshot {
        buckets,
        hashes,
        next,
        keys,
        values,
        count,
        free_list,
        free_count,
    };
    let restored: FlatHashMap<i64, i64> = FlatHashMap::from_snapshot(rebuilt).unwrap();
    assert_eq!(restored, m);
    assert_eq!(
        restored.keys().collect::<Vec<_>>(),
        m.keys().collect::<Vec<_>>()
    );
}
