//! FlatHashMap: chained hash table stored in parallel arrays.
//!
//! Layout
//! - `buckets[b]`: index of the first slot in bucket `b`'s chain, or `-1`.
//! - `hashes[i]`: 31-bit hash of the key in slot `i`, or `-1` when the slot
//!   is free.
//! - `next[i]`: next slot in the same chain, or `-1`. Free slots reuse it to
//!   link the free list.
//! - `keys[i]`, `values[i]`: the pair; reset to `Default` on removal.
//!
//! All five arrays always have the same prime length. `count` is the
//! high-water mark of slots handed out from the tail; `len()` is
//! `count - free_count`.

use crate::cursor::Cursor;
use crate::error::{MapError, Result};
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::primes;
use crate::reentrancy::ReentrancyGuard;
use crate::views::{copy_out, KeyView, ValueView};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use core::sync::atomic::{AtomicU64, Ordering};
use rustc_hash::FxBuildHasher;

/// Marks a free slot in `hashes`.
pub(crate) const FREE: i32 = -1;
/// Terminates a bucket chain or the free list.
pub(crate) const END: i32 = -1;

const HASH_MASK: u64 = 0x7FFF_FFFF;

/// Non-negative 31-bit hash; never collides with [`FREE`].
#[inline]
pub(crate) fn hash_key<S, Q>(hasher: &S, q: &Q) -> i32
where
    S: BuildHasher,
    Q: ?Sized + Hash,
{
    (hasher.hash_one(q) & HASH_MASK) as i32
}

static NEXT_MAP_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity for a map instance; lets a cursor reject a map
/// other than the one that created it.
pub(crate) fn next_map_id() -> u64 {
    NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed)
}

/// Vector of `size` elements, failing with `CapacityOverflow` instead of
/// aborting when the allocation cannot be made.
pub(crate) fn filled<T>(size: usize, f: impl FnMut() -> T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(size)
        .map_err(|_| MapError::CapacityOverflow { requested: size })?;
    v.resize_with(size, f);
    Ok(v)
}

/// How an insert treats a key that is already present.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InsertMode {
    /// Fail with [`MapError::DuplicateKey`].
    Add,
    /// Replace the stored value in place.
    Overwrite,
}

pub struct FlatHashMap<K, V, S = FxBuildHasher> {
    pub(crate) hasher: S,
    pub(crate) buckets: Vec<i32>,
    pub(crate) hashes: Vec<i32>,
    pub(crate) next: Vec<i32>,
    pub(crate) keys: Vec<K>,
    pub(crate) values: Vec<V>,
    pub(crate) count: usize,
    pub(crate) free_list: i32,
    pub(crate) free_count: usize,
    // Runtime-only; invalidates outstanding cursors.
    pub(crate) version: u64,
    pub(crate) id: u64,
    pub(crate) guard: ReentrancyGuard,
}

impl<K, V> FlatHashMap<K, V> {
    /// Empty map; no arrays are allocated until the first insert.
    pub fn new() -> Self {
        Self::with_hasher(FxBuildHasher)
    }

    pub fn with_capacity(capacity: usize) -> Result<Self>
    where
        K: Eq + Hash + Default,
        V: Default,
    {
        Self::with_capacity_and_hasher(capacity, FxBuildHasher)
    }
}

impl<K, V, S: Default> Default for FlatHashMap<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> FlatHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            buckets: Vec::new(),
            hashes: Vec::new(),
            next: Vec::new(),
            keys: Vec::new(),
            values: Vec::new(),
            count: 0,
            free_list: END,
            free_count: 0,
            version: 0,
            id: next_map_id(),
            guard: ReentrancyGuard::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.count - self.free_count
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current table length (number of buckets and of slots).
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Mutation counter. Changes on every structural change and on
    /// insert-overwrites; in-place writes through `get_mut`, `iter_mut` or
    /// `values_mut` leave it as is.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Live pair stored in slot `index`, if that slot is occupied.
    pub fn slot(&self, index: usize) -> Option<(&K, &V)> {
        if index < self.count && self.hashes[index] != FREE {
            Some((&self.keys[index], &self.values[index]))
        } else {
            None
        }
    }

    #[inline]
    fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Fails unless the caller was created by this map at version `seen`.
    #[inline]
    pub(crate) fn check_cursor(&self, map_id: u64, seen: u64) -> Result<()> {
        if map_id != self.id {
            Err(MapError::WrongMap)
        } else if seen != self.version {
            Err(MapError::ConcurrentModification)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn bucket_of(&self, hash: i32) -> usize {
        hash as usize % self.buckets.len()
    }

    /// Detached, version-checked enumeration state.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.id, self.version)
    }

    pub fn key_view(&self) -> KeyView<'_, K, V, S> {
        KeyView::new(self)
    }

    pub fn value_view(&self) -> ValueView<'_, K, V, S> {
        ValueView::new(self)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        let n = self.count;
        Iter::new(&self.hashes[..n], &self.keys[..n], &self.values[..n], self.len())
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let n = self.count;
        let len = self.count - self.free_count;
        IterMut::new(
            &self.hashes[..n],
            &self.keys[..n],
            &mut self.values[..n],
            len,
        )
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// Copy every live pair into `dest[start..]` in slot order.
    pub fn copy_to(&self, dest: &mut [(K, V)], start: usize) -> Result<usize>
    where
        K: Clone,
        V: Clone,
    {
        copy_out(
            dest,
            start,
            self.len(),
            self.iter().map(|(k, v)| (k.clone(), v.clone())),
        )
    }
}

impl<K, V, S> FlatHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Chain walk without the reentrancy guard; callers hold it.
    fn find_with_hash<Q>(&self, hash: i32, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let mut i = self.buckets[self.bucket_of(hash)];
        while i != END {
            let idx = i as usize;
            if self.hashes[idx] == hash && self.keys[idx].borrow() == q {
                return Some(idx);
            }
            i = self.next[idx];
        }
        None
    }

    /// Slot index holding `q`.
    pub fn find<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter("find");
        if self.buckets.is_empty() {
            return None;
        }
        self.find_with_hash(hash_key(&self.hasher, q), q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    pub fn try_get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).map(|i| &self.values[i])
    }

    /// Value for `q`; a miss is an error rather than `None`.
    pub fn get<Q>(&self, q: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.try_get(q).ok_or(MapError::KeyNotFound)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let i = self.find(q)?;
        Some(&mut self.values[i])
    }

    pub fn get_or_default<Q>(&self, q: &Q) -> V
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone + Default,
    {
        self.try_get(q).cloned().unwrap_or_default()
    }

    /// Linear scan over live slots using `V`'s own equality.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let _g = self.guard.enter("contains_value");
        (0..self.count).any(|i| self.hashes[i] != FREE && self.values[i] == *value)
    }

    /// True when `key` is present and maps to a value equal to `value`.
    pub fn contains_pair<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        match self.find(key) {
            Some(i) => {
                let _g = self.guard.enter("contains_pair");
                self.values[i] == *value
            }
            None => false,
        }
    }

    /// Chain position of `q` as `(bucket, previous slot, slot)`.
    fn locate<Q>(&self, q: &Q) -> Option<(usize, i32, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter("remove");
        if self.buckets.is_empty() {
            return None;
        }
        let hash = hash_key(&self.hasher, q);
        let bucket = self.bucket_of(hash);
        let mut last = END;
        let mut i = self.buckets[bucket];
        while i != END {
            let idx = i as usize;
            if self.hashes[idx] == hash && self.keys[idx].borrow() == q {
                return Some((bucket, last, idx));
            }
            last = i;
            i = self.next[idx];
        }
        None
    }
}

impl<K, V, S> FlatHashMap<K, V, S>
where
    K: Eq + Hash + Default,
    V: Default,
    S: BuildHasher,
{
    /// Map whose table holds at least `capacity` slots before resizing.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Result<Self> {
        let mut map = Self::with_hasher(hasher);
        map.allocate(primes::get_prime(capacity)?)?;
        Ok(map)
    }

    /// Build from existing pairs in iteration order; a repeated key fails
    /// with [`MapError::DuplicateKey`].
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        S: Default,
    {
        let mut map = Self::with_capacity_and_hasher(0, S::default())?;
        for (k, v) in pairs {
            map.add(k, v)?;
        }
        Ok(map)
    }

    fn allocate(&mut self, size: usize) -> Result<()> {
        let buckets = filled(size, || END)?;
        let hashes = filled(size, || 0)?;
        let next = filled(size, || 0)?;
        let keys = filled(size, K::default)?;
        let values = filled(size, V::default)?;
        self.buckets = buckets;
        self.hashes = hashes;
        self.next = next;
        self.keys = keys;
        self.values = values;
        self.free_list = END;
        Ok(())
    }

    /// Insert `key -> value`; `mode` decides what happens to an existing key.
    pub fn insert_with_mode(&mut self, key: K, value: V, mode: InsertMode) -> Result<()> {
        let (hash, found) = {
            let _g = self.guard.enter("insert");
            let hash = hash_key(&self.hasher, &key);
            (hash, self.find_with_hash(hash, &key))
        };

        if let Some(i) = found {
            if mode == InsertMode::Add {
                return Err(MapError::DuplicateKey);
            }
            self.values[i] = value;
            self.bump_version();
            return Ok(());
        }

        let index = if self.free_count > 0 {
            let index = self.free_list as usize;
            self.free_list = self.next[index];
            self.free_count -= 1;
            index
        } else {
            if self.count == self.hashes.len() {
                self.resize()?;
            }
            self.count += 1;
            self.count - 1
        };

        // Table length may have changed above.
        let bucket = self.bucket_of(hash);
        self.hashes[index] = hash;
        self.next[index] = self.buckets[bucket];
        self.keys[index] = key;
        self.values[index] = value;
        self.buckets[bucket] = index as i32;
        self.bump_version();
        Ok(())
    }

    /// Insert a new pair; fails if `key` is already present.
    pub fn add(&mut self, key: K, value: V) -> Result<()> {
        self.insert_with_mode(key, value, InsertMode::Add)
    }

    /// Insert or overwrite. Fails only when the table cannot grow.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        self.insert_with_mode(key, value, InsertMode::Overwrite)
    }

    /// Grow into a larger prime table, rebuilding chains from stored hashes.
    ///
    /// Only called when the tail is exhausted and the free list is empty.
    fn resize(&mut self) -> Result<()> {
        let old_size = self.hashes.len();
        let new_size = primes::expand_prime(self.count)?;
        let count = self.count;

        let mut buckets = filled(new_size, || END)?;
        let mut hashes = filled(new_size, || 0)?;
        let mut next = filled(new_size, || 0)?;
        hashes[..count].copy_from_slice(&self.hashes[..count]);
        next[..count].copy_from_slice(&self.next[..count]);
        for i in 0..count {
            if hashes[i] != FREE {
                let b = hashes[i] as usize % new_size;
                next[i] = buckets[b];
                buckets[b] = i as i32;
            }
        }
        let grow = new_size - self.keys.len();
        self.keys
            .try_reserve_exact(grow)
            .map_err(|_| MapError::CapacityOverflow { requested: new_size })?;
        self.values
            .try_reserve_exact(grow)
            .map_err(|_| MapError::CapacityOverflow { requested: new_size })?;

        // Nothing below can fail.
        self.keys.resize_with(new_size, K::default);
        self.values.resize_with(new_size, V::default);
        self.buckets = buckets;
        self.hashes = hashes;
        self.next = next;
        self.bump_version();
        log::debug!("resized flat hash map table from {old_size} to {new_size} slots");
        Ok(())
    }

    /// Splice slot `idx` out of its chain and push it on the free list.
    fn unlink(&mut self, bucket: usize, last: i32, idx: usize) -> (K, V) {
        if last == END {
            self.buckets[bucket] = self.next[idx];
        } else {
            self.next[last as usize] = self.next[idx];
        }
        self.hashes[idx] = FREE;
        self.next[idx] = self.free_list;
        self.free_list = idx as i32;
        self.free_count += 1;
        self.bump_version();
        let key = mem::take(&mut self.keys[idx]);
        let value = mem::take(&mut self.values[idx]);
        (key, value)
    }

    /// Remove `q` and return the pair it held.
    pub fn take<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let (bucket, last, idx) = self.locate(q)?;
        Some(self.unlink(bucket, last, idx))
    }

    /// Remove `q`; `false` if it was not present.
    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.take(q).is_some()
    }

    /// Remove `key` only if it currently maps to a value equal to `value`.
    pub fn remove_pair<Q>(&mut self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        let Some((bucket, last, idx)) = self.locate(key) else {
            return false;
        };
        {
            let _g = self.guard.enter("remove_pair");
            if self.values[idx] != *value {
                return false;
            }
        }
        self.unlink(bucket, last, idx);
        true
    }

    /// Drop every entry, keeping the table length.
    pub fn clear(&mut self) {
        if self.count == 0 {
            return;
        }
        let n = self.count;
        self.buckets.fill(END);
        self.hashes[..n].fill(0);
        self.next[..n].fill(0);
        self.keys[..n].iter_mut().for_each(|k| *k = K::default());
        self.values[..n].iter_mut().for_each(|v| *v = V::default());
        self.free_list = END;
        self.count = 0;
        self.free_count = 0;
        self.bump_version();
        log::trace!("cleared {n} slots");
    }

    /// Rebuild into the smallest prime table holding
    /// `max(requested, len())` slots.
    ///
    /// Live pairs keep their relative order and are renumbered `0..len()`;
    /// the free list is emptied. This is the only operation that shrinks
    /// the table.
    pub fn compact(&mut self, requested: usize) -> Result<()> {
        let live = self.len();
        let old_size = self.capacity();
        let new_size = primes::get_prime(requested.max(live))?;

        let mut buckets = filled(new_size, || END)?;
        let mut hashes = filled(new_size, || 0)?;
        let mut next = filled(new_size, || 0)?;
        let mut keys = Vec::new();
        keys.try_reserve_exact(new_size)
            .map_err(|_| MapError::CapacityOverflow { requested: new_size })?;
        let mut values = Vec::new();
        values
            .try_reserve_exact(new_size)
            .map_err(|_| MapError::CapacityOverflow { requested: new_size })?;

        // Nothing below can fail.
        for i in 0..self.count {
            let hash = self.hashes[i];
            if hash == FREE {
                continue;
            }
            let slot = keys.len();
            let b = hash as usize % new_size;
            hashes[slot] = hash;
            next[slot] = buckets[b];
            buckets[b] = slot as i32;
            keys.push(mem::take(&mut self.keys[i]));
            values.push(mem::take(&mut self.values[i]));
        }
        keys.resize_with(new_size, K::default);
        values.resize_with(new_size, V::default);

        self.buckets = buckets;
        self.hashes = hashes;
        self.next = next;
        self.keys = keys;
        self.values = values;
        self.count = live;
        self.free_list = END;
        self.free_count = 0;
        self.bump_version();
        log::debug!("compacted flat hash map from {old_size} to {new_size} slots ({live} live)");
        Ok(())
    }

    /// Shrink the table to fit the live entries.
    pub fn trim_excess(&mut self) -> Result<()> {
        self.compact(self.len())
    }
}

impl<K, V, S> Clone for FlatHashMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            buckets: self.buckets.clone(),
            hashes: self.hashes.clone(),
            next: self.next.clone(),
            keys: self.keys.clone(),
            values: self.values.clone(),
            count: self.count,
            free_list: self.free_list,
            free_count: self.free_count,
            version: 0,
            id: next_map_id(),
            guard: ReentrancyGuard::new(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for FlatHashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Two maps are equal when they hold the same logical mapping, regardless
/// of slot layout or table length.
impl<K, V, S> PartialEq for FlatHashMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.try_get(k).is_some_and(|ov| ov == v))
    }
}

impl<K, V, S> Eq for FlatHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<'a, K, V, S> IntoIterator for &'a FlatHashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut FlatHashMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S> IntoIterator for FlatHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(self) -> Self::IntoIter {
        let len = self.len();
        let n = self.count;
        let mut hashes = self.hashes;
        let mut keys = self.keys;
        let mut values = self.values;
        hashes.truncate(n);
        keys.truncate(n);
        values.truncate(n);
        IntoIter::new(hashes, keys, values, len)
    }
}
