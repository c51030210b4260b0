#![cfg(test)]

// Property tests for FlatHashMap kept inside the crate so they can check
// the raw arrays alongside the public behavior.

use crate::error::MapError;
use crate::flat_hash_map::{FlatHashMap, END, FREE};
use hashbrown::HashMap;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking moves towards earlier keys and
// shorter op lists.
#[derive(Clone, Debug)]
enum OpI {
    Add(usize, i32),
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Clear,
    Compact(usize),
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Add(i, v)),
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Clear),
            1 => (0usize..40).prop_map(OpI::Compact),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn check_structure<S: BuildHasher>(sut: &FlatHashMap<Key, i32, S>) -> Result<(), TestCaseError> {
    let len = sut.buckets.len();
    prop_assert_eq!(sut.hashes.len(), len);
    prop_assert_eq!(sut.next.len(), len);
    prop_assert_eq!(sut.keys.len(), len);
    prop_assert_eq!(sut.values.len(), len);
    prop_assert!(sut.free_count <= sut.count);
    prop_assert!(sut.count <= len);

    let mut reached = vec![false; sut.count];
    for (b, &head) in sut.buckets.iter().enumerate() {
        let mut i = head;
        while i != END {
            let idx = i as usize;
            prop_assert!(!reached[idx], "slot reached twice");
            reached[idx] = true;
            prop_assert!(sut.hashes[idx] >= 0);
            prop_assert_eq!(sut.hashes[idx] as usize % len, b);
            i = sut.next[idx];
        }
    }
    let mut free = 0;
    let mut i = sut.free_list;
    while i != END {
        let idx = i as usize;
        prop_assert!(!reached[idx], "free slot also reachable");
        reached[idx] = true;
        prop_assert_eq!(sut.hashes[idx], FREE);
        prop_assert_eq!(&sut.keys[idx], &Key::default());
        free += 1;
        i = sut.next[idx];
    }
    prop_assert_eq!(free, sut.free_count);
    prop_assert!(reached.iter().all(|&r| r), "slot neither live nor free");
    Ok(())
}

fn run_state_machine<S: BuildHasher>(
    mut sut: FlatHashMap<Key, i32, S>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        let version_before = sut.version();
        match op {
            OpI::Add(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                match sut.add(k.clone(), v) {
                    Ok(()) => {
                        prop_assert!(!already, "add must fail on duplicate");
                        model.insert(k, v);
                        prop_assert_ne!(sut.version(), version_before);
                    }
                    Err(MapError::DuplicateKey) => {
                        prop_assert!(already, "duplicate error only when key exists");
                        prop_assert_eq!(sut.version(), version_before);
                    }
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
            }
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                sut.insert(k.clone(), v).expect("overwrite insert succeeds");
                model.insert(k, v);
                prop_assert_ne!(sut.version(), version_before);
            }
            OpI::Remove(i) => {
                let k = key_from(&pool, i);
                let cap = sut.capacity();
                let removed = sut.remove(&k);
                prop_assert_eq!(removed, model.remove(&k).is_some());
                prop_assert_eq!(sut.capacity(), cap, "removal never resizes");
                if !removed {
                    prop_assert_eq!(sut.version(), version_before);
                }
            }
            OpI::Get(i) => {
                let k = key_from(&pool, i);
                match model.get(&k) {
                    Some(v) => prop_assert_eq!(sut.get(&k), Ok(v)),
                    None => prop_assert_eq!(sut.get(&k), Err(MapError::KeyNotFound)),
                }
                prop_assert_eq!(sut.try_get(&k), model.get(&k));
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.saturating_add(d);
                    let mv = model.get_mut(&k).expect("model has key");
                    *mv = mv.saturating_add(d);
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
            }
            OpI::Compact(req) => {
                let before: Vec<Key> = sut.keys().cloned().collect();
                sut.compact(req).expect("compact succeeds");
                let after: Vec<Key> = sut.keys().cloned().collect();
                prop_assert_eq!(before, after, "compact keeps slot order");
                prop_assert!(sut.capacity() >= req.max(model.len()));
                prop_assert_eq!(sut.free_count, 0);
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|(k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().count(), sut.len());
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        for (k, v) in &model {
            prop_assert_eq!(sut.try_get(k), Some(v));
        }
        check_structure(&sut)?;
    }
    Ok(())
}

// Property: state-machine equivalence against hashbrown::HashMap.
// Invariants exercised across random operation sequences:
// - Add rejects duplicates; insert overwrites; both agree with the model.
// - `get`/`try_get`/`contains_key` parity with the model.
// - Bucket chains and the free list partition the allocated slots.
// - Compact preserves slot order and empties the free list.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(FlatHashMap::new(), pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same invariants under worst-case collisions (single chain).
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(FlatHashMap::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}

// Property: N inserts, K removals, K fresh inserts never grow the table,
// and removed slots are reused most-recently-freed first.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_free_list_reuse(n in 1usize..200, k_frac in 0.0f64..=1.0) {
        let k = ((n as f64) * k_frac) as usize;
        let mut m: FlatHashMap<usize, usize> = FlatHashMap::new();
        for i in 0..n {
            m.insert(i, i).unwrap();
        }
        let cap = m.capacity();
        let mut freed = Vec::new();
        for i in 0..k {
            freed.push(m.find(&i).unwrap());
            prop_assert!(m.remove(&i));
        }
        for j in 0..k {
            m.insert(n + j, j).unwrap();
            prop_assert_eq!(m.find(&(n + j)), freed.pop());
        }
        prop_assert_eq!(m.capacity(), cap);
        prop_assert_eq!(m.len(), n);
    }
}

// Property: a snapshot round trip preserves the mapping and slot order.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_snapshot_round_trip((pool, ops) in arb_scenario()) {
        let mut sut: FlatHashMap<Key, i32> = FlatHashMap::new();
        for op in ops {
            match op {
                OpI::Add(i, v) | OpI::Insert(i, v) => { sut.insert(key_from(&pool, i), v).unwrap(); }
                OpI::Remove(i) => { sut.remove(&key_from(&pool, i)); }
                _ => {}
            }
        }
        let restored: FlatHashMap<Key, i32> = FlatHashMap::from_snapshot(sut.to_snapshot()).unwrap();
        let a: Vec<_> = sut.iter().collect();
        let b: Vec<_> = restored.iter().collect();
        prop_assert_eq!(a, b);
        prop_assert_eq!(restored.to_snapshot(), sut.to_snapshot());
    }
}
