//! Read-only key and value projections over a `FlatHashMap`.
//!
//! Views own no storage; every call reads the map's arrays directly.

use crate::collection::Collection;
use crate::error::{MapError, Result};
use crate::flat_hash_map::FlatHashMap;
use crate::iter::{Keys, Values};
use core::hash::{BuildHasher, Hash};

/// Write `len` items from `items` into `dest[start..]`.
///
/// Fails without touching `dest` if fewer than `len` slots are available.
pub(crate) fn copy_out<T>(
    dest: &mut [T],
    start: usize,
    len: usize,
    items: impl Iterator<Item = T>,
) -> Result<usize> {
    let available = dest.len().saturating_sub(start);
    if available < len {
        return Err(MapError::InsufficientSpace {
            needed: len,
            available,
        });
    }
    let mut n = 0;
    for (slot, item) in dest[start..].iter_mut().zip(items) {
        *slot = item;
        n += 1;
    }
    Ok(n)
}

fn unsupported<T>(operation: &'static str) -> Result<T> {
    Err(MapError::UnsupportedOperation { operation })
}

pub struct KeyView<'a, K, V, S> {
    map: &'a FlatHashMap<K, V, S>,
}

impl<'a, K, V, S> KeyView<'a, K, V, S> {
    pub(crate) fn new(map: &'a FlatHashMap<K, V, S>) -> Self {
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> Keys<'a, K, V> {
        self.map.keys()
    }

    /// Copy keys into `dest[start..]` in slot order.
    pub fn copy_to(&self, dest: &mut [K], start: usize) -> Result<usize>
    where
        K: Clone,
    {
        copy_out(dest, start, self.len(), self.iter().cloned())
    }

    pub fn to_vec(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<K, V, S> KeyView<'_, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Hash lookup on the underlying map.
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }
}

impl<'a, K, V, S> IntoIterator for &KeyView<'a, K, V, S> {
    type Item = &'a K;
    type IntoIter = Keys<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> Collection<K> for KeyView<'_, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn len(&self) -> usize {
        self.map.len()
    }
    fn is_read_only(&self) -> bool {
        true
    }
    fn contains(&self, item: &K) -> bool {
        self.map.contains_key(item)
    }
    fn add(&mut self, _item: K) -> Result<()> {
        unsupported("add to key view")
    }
    fn remove(&mut self, _item: &K) -> Result<bool> {
        unsupported("remove from key view")
    }
    fn clear(&mut self) -> Result<()> {
        unsupported("clear key view")
    }
}

pub struct ValueView<'a, K, V, S> {
    map: &'a FlatHashMap<K, V, S>,
}

impl<'a, K, V, S> ValueView<'a, K, V, S> {
    pub(crate) fn new(map: &'a FlatHashMap<K, V, S>) -> Self {
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> Values<'a, K, V> {
        self.map.values()
    }

    /// Copy values into `dest[start..]` in slot order.
    pub fn copy_to(&self, dest: &mut [V], start: usize) -> Result<usize>
    where
        V: Clone,
    {
        copy_out(dest, start, self.len(), self.iter().cloned())
    }

    pub fn to_vec(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<K, V, S> ValueView<'_, K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    /// Linear scan with `V`'s equality.
    pub fn contains(&self, value: &V) -> bool {
        self.map.contains_value(value)
    }
}

impl<'a, K, V, S> IntoIterator for &ValueView<'a, K, V, S> {
    type Item = &'a V;
    type IntoIter = Values<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> Collection<V> for ValueView<'_, K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn len(&self) -> usize {
        self.map.len()
    }
    fn is_read_only(&self) -> bool {
        true
    }
    fn contains(&self, item: &V) -> bool {
        self.map.contains_value(item)
    }
    fn add(&mut self, _item: V) -> Result<()> {
        unsupported("add to value view")
    }
    fn remove(&mut self, _item: &V) -> Result<bool> {
        unsupported("remove from value view")
    }
    fn clear(&mut self) -> Result<()> {
        unsupported("clear value view")
    }
}
