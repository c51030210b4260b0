//! Flattened snapshot of a `FlatHashMap`.
//!
//! The snapshot is the map's storage laid out as plain arrays plus three
//! scalars. Anything that can persist a `Vec<i32>`, a `Vec<K>` and a
//! `Vec<V>` can persist the map. Restoring validates the arrays before
//! accepting them, so a corrupted or hand-edited snapshot is rejected
//! instead of producing a map that loops or loses entries.

use crate::error::{MapError, Result};
use crate::flat_hash_map::{hash_key, next_map_id, FlatHashMap, END, FREE};
use crate::primes::MAX_PRIME_ARRAY_LENGTH;
use crate::reentrancy::ReentrancyGuard;
use core::hash::{BuildHasher, Hash};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlatSnapshot<K, V> {
    pub buckets: Vec<i32>,
    pub hashes: Vec<i32>,
    pub next: Vec<i32>,
    pub keys: Vec<K>,
    pub values: Vec<V>,
    pub count: i32,
    pub free_list: i32,
    pub free_count: i32,
}

/// Borrowed form used to serialize a map without cloning its arrays.
#[cfg(feature = "serde")]
#[derive(Serialize)]
struct SnapshotRef<'a, K, V> {
    buckets: &'a [i32],
    hashes: &'a [i32],
    next: &'a [i32],
    keys: &'a [K],
    values: &'a [V],
    count: i32,
    free_list: i32,
    free_count: i32,
}

impl<K, V, S> FlatHashMap<K, V, S> {
    /// Copy of the current storage arrays.
    pub fn to_snapshot(&self) -> FlatSnapshot<K, V>
    where
        K: Clone,
        V: Clone,
    {
        FlatSnapshot {
            buckets: self.buckets.clone(),
            hashes: self.hashes.clone(),
            next: self.next.clone(),
            keys: self.keys.clone(),
            values: self.values.clone(),
            count: self.count as i32,
            free_list: self.free_list,
            free_count: self.free_count as i32,
        }
    }

    /// Move the storage arrays out of the map.
    pub fn into_snapshot(self) -> FlatSnapshot<K, V> {
        FlatSnapshot {
            buckets: self.buckets,
            hashes: self.hashes,
            next: self.next,
            keys: self.keys,
            values: self.values,
            count: self.count as i32,
            free_list: self.free_list,
            free_count: self.free_count as i32,
        }
    }
}

impl<K, V, S> FlatHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Rebuild a map from a snapshot taken with the same hasher type.
    pub fn from_snapshot(snapshot: FlatSnapshot<K, V>) -> Result<Self>
    where
        S: Default,
    {
        Self::from_snapshot_with_hasher(snapshot, S::default())
    }

    /// Rebuild a map from a snapshot; `hasher` must produce the hashes the
    /// snapshot was written with.
    pub fn from_snapshot_with_hasher(snapshot: FlatSnapshot<K, V>, hasher: S) -> Result<Self> {
        if let Err(reason) = validate(&snapshot, &hasher) {
            log::warn!("rejected flat hash map snapshot: {reason}");
            return Err(MapError::InvalidSnapshot(reason));
        }
        log::debug!(
            "restored flat hash map snapshot: {} slots, {} live",
            snapshot.buckets.len(),
            snapshot.count - snapshot.free_count
        );
        Ok(Self {
            hasher,
            buckets: snapshot.buckets,
            hashes: snapshot.hashes,
            next: snapshot.next,
            keys: snapshot.keys,
            values: snapshot.values,
            count: snapshot.count as usize,
            free_list: snapshot.free_list,
            free_count: snapshot.free_count as usize,
            version: 0,
            id: next_map_id(),
            guard: ReentrancyGuard::new(),
        })
    }
}

/// Slot index in `0..count`, or a description of why `link` is not one.
fn slot_index(link: i32, count: usize, what: &str) -> std::result::Result<usize, String> {
    if link < 0 || link as usize >= count {
        return Err(format!("{what} link {link} outside 0..{count}"));
    }
    Ok(link as usize)
}

fn validate<K, V, S>(s: &FlatSnapshot<K, V>, hasher: &S) -> std::result::Result<(), String>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    let len = s.buckets.len();
    let lens = [s.hashes.len(), s.next.len(), s.keys.len(), s.values.len()];
    if lens.iter().any(|&l| l != len) {
        return Err(format!(
            "array lengths differ: buckets {len}, hashes {}, next {}, keys {}, values {}",
            lens[0], lens[1], lens[2], lens[3]
        ));
    }
    if len > MAX_PRIME_ARRAY_LENGTH {
        return Err(format!("table length {len} exceeds maximum"));
    }
    if s.count < 0 || s.count as usize > len {
        return Err(format!("count {} outside 0..={len}", s.count));
    }
    if s.free_count < 0 || s.free_count > s.count {
        return Err(format!(
            "free count {} outside 0..={}",
            s.free_count, s.count
        ));
    }
    let count = s.count as usize;
    let mut seen = vec![false; count];

    let mut live = 0usize;
    let mut chain = Vec::new();
    for (bucket, &head) in s.buckets.iter().enumerate() {
        chain.clear();
        let mut link = head;
        while link != END {
            let i = slot_index(link, count, "bucket chain")?;
            if seen[i] {
                return Err(format!("slot {i} reached twice"));
            }
            seen[i] = true;
            let h = s.hashes[i];
            if h < 0 {
                return Err(format!("free slot {i} linked from bucket {bucket}"));
            }
            if h as usize % len != bucket {
                return Err(format!("slot {i} with hash {h} chained in bucket {bucket}"));
            }
            if hash_key(hasher, &s.keys[i]) != h {
                return Err(format!("slot {i} stored hash does not match its key"));
            }
            // Equal keys have equal hashes and so share a chain.
            if chain
                .iter()
                .any(|&j: &usize| s.hashes[j] == h && s.keys[j] == s.keys[i])
            {
                return Err(format!("slot {i} duplicates an earlier key"));
            }
            chain.push(i);
            live += 1;
            link = s.next[i];
        }
    }

    let mut free = 0usize;
    let mut link = s.free_list;
    while link != END {
        let i = slot_index(link, count, "free list")?;
        if seen[i] {
            return Err(format!("slot {i} reached twice"));
        }
        seen[i] = true;
        if s.hashes[i] != FREE {
            return Err(format!("free list slot {i} is not marked free"));
        }
        free += 1;
        link = s.next[i];
    }
    if free != s.free_count as usize {
        return Err(format!(
            "free list holds {free} slots, free count says {}",
            s.free_count
        ));
    }
    if live + free != count {
        return Err(format!(
            "{} of {count} slots unreachable",
            count - live - free
        ));
    }
    Ok(())
}

#[cfg(feature = "serde")]
impl<K, V, S> Serialize for FlatHashMap<K, V, S>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<Se: serde::Serializer>(&self, serializer: Se) -> core::result::Result<Se::Ok, Se::Error> {
        SnapshotRef {
            buckets: &self.buckets,
            hashes: &self.hashes,
            next: &self.next,
            keys: &self.keys,
            values: &self.values,
            count: self.count as i32,
            free_list: self.free_list,
            free_count: self.free_count as i32,
        }
        .serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, S> Deserialize<'de> for FlatHashMap<K, V, S>
where
    K: Deserialize<'de> + Eq + Hash,
    V: Deserialize<'de>,
    S: BuildHasher + Default,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let snapshot = FlatSnapshot::<K, V>::deserialize(deserializer)?;
        Self::from_snapshot(snapshot).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatHashMap<String, i64> {
        let mut m = FlatHashMap::new();
        for i in 0..12 {
            m.insert(format!("k{i}"), i).unwrap();
        }
        for i in [2, 5, 7] {
            m.remove(&format!("k{i}"));
        }
        m
    }

    /// Invariant: restoring a verbatim snapshot yields identical slots,
    /// enumeration order and free list.
    #[test]
    fn verbatim_round_trip() {
        let m = sample();
        let snap = m.to_snapshot();
        assert_eq!(snap.count - snap.free_count, 9);
        let restored: FlatHashMap<String, i64> = FlatHashMap::from_snapshot(snap.clone()).unwrap();
        assert_eq!(restored, m);
        assert_eq!(restored.to_snapshot(), snap);
        let a: Vec<_> = m.iter().collect();
        let b: Vec<_> = restored.iter().collect();
        assert_eq!(a, b);
        assert_eq!(restored.version(), 0);
    }

    /// Invariant: a restored map keeps working, reusing its restored free list.
    #[test]
    fn restored_map_is_live() {
        let m = sample();
        let freed_head = m.to_snapshot().free_list;
        let mut restored: FlatHashMap<String, i64> =
            FlatHashMap::from_snapshot(m.into_snapshot()).unwrap();
        restored.insert("new".to_string(), 100).unwrap();
        assert_eq!(restored.find("new"), Some(freed_head as usize));
        assert_eq!(restored.get("k11"), Ok(&11));
        assert!(restored.remove("k0"));
    }

    #[test]
    fn empty_maps_round_trip() {
        let m: FlatHashMap<i32, i32> = FlatHashMap::new();
        let r: FlatHashMap<i32, i32> = FlatHashMap::from_snapshot(m.to_snapshot()).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.capacity(), 0);
    }

    fn rejected(snap: FlatSnapshot<String, i64>) -> String {
        match FlatHashMap::<String, i64>::from_snapshot(snap) {
            Err(MapError::InvalidSnapshot(reason)) => reason,
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("corrupt snapshot accepted"),
        }
    }

    /// Invariant: snapshots violating the storage invariants are rejected.
    #[test]
    fn corrupt_snapshots_are_rejected() {
        let good = sample().to_snapshot();

        let mut s = good.clone();
        s.keys.pop();
        assert!(rejected(s).contains("array lengths differ"));

        let mut s = good.clone();
        s.count = s.buckets.len() as i32 + 1;
        assert!(rejected(s).contains("count"));

        let mut s = good.clone();
        s.free_count += 1;
        assert!(rejected(s).contains("free list holds"));

        // Cycle in a chain.
        let mut s = good.clone();
        let head = s.buckets.iter().copied().find(|&h| h != END).unwrap();
        s.next[head as usize] = head;
        assert!(rejected(s).contains("reached twice"));

        // A live slot dropped from its chain.
        let mut s = good.clone();
        let b = s.buckets.iter().position(|&h| h != END).unwrap();
        let head = s.buckets[b] as usize;
        s.buckets[b] = s.next[head];
        assert!(rejected(s).contains("unreachable"));

        // Key edited without updating its hash.
        let mut s = good.clone();
        let head = s.buckets.iter().copied().find(|&h| h != END).unwrap();
        s.keys[head as usize] = "tampered".to_string();
        assert!(rejected(s).contains("stored hash"));

        let mut s = good;
        s.free_list = s.count + 3;
        assert!(rejected(s).contains("free list link"));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut m: FlatHashMap<String, i64> = FlatHashMap::new();
        m.insert("a".to_string(), 1).unwrap();
        m.insert("b".to_string(), 2).unwrap();
        let mut s = m.to_snapshot();
        let a = m.find("a").unwrap();
        let b = m.find("b").unwrap();
        // Turn slot b into a second "a", relinked into a's chain.
        let len = s.buckets.len();
        let hb = s.hashes[b] as usize % len;
        s.buckets[hb] = s.next[b];
        s.keys[b] = "a".to_string();
        s.hashes[b] = s.hashes[a];
        let ha = s.hashes[a] as usize % len;
        s.next[b] = s.buckets[ha];
        s.buckets[ha] = b as i32;
        assert!(rejected(s).contains("duplicates"));
    }
}
