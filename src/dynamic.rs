//! Loosely-typed access for hosts that only know keys and values as `dyn Any`.
//!
//! Every method downcasts and forwards to the typed `FlatHashMap` API; there
//! is no second implementation of the table logic here.

use crate::error::{MapError, Result};
use crate::flat_hash_map::FlatHashMap;
use core::any::Any;
use core::hash::{BuildHasher, Hash};

/// Object-safe map interface over `dyn Any` keys and values.
///
/// Writes with a key or value of the wrong type fail with
/// [`MapError::InvalidKey`] / [`MapError::InvalidValue`]. Reads and removals
/// with a key of the wrong type report the key as absent.
pub trait DynMap {
    fn dyn_len(&self) -> usize;

    fn dyn_contains_key(&self, key: &dyn Any) -> bool;

    fn dyn_get(&self, key: &dyn Any) -> Option<&dyn Any>;

    /// Insert or overwrite.
    fn dyn_insert(&mut self, key: Box<dyn Any>, value: Box<dyn Any>) -> Result<()>;

    /// Insert; fails with `DuplicateKey` if present.
    fn dyn_add(&mut self, key: Box<dyn Any>, value: Box<dyn Any>) -> Result<()>;

    fn dyn_remove(&mut self, key: &dyn Any) -> bool;

    /// Live pairs in slot order.
    fn dyn_entries(&self) -> Vec<(&dyn Any, &dyn Any)>;
}

fn downcast_pair<K: 'static, V: 'static>(
    key: Box<dyn Any>,
    value: Box<dyn Any>,
) -> Result<(K, V)> {
    let key = key.downcast::<K>().map_err(|_| MapError::InvalidKey)?;
    let value = value.downcast::<V>().map_err(|_| MapError::InvalidValue)?;
    Ok((*key, *value))
}

impl<K, V, S> DynMap for FlatHashMap<K, V, S>
where
    K: Eq + Hash + Default + 'static,
    V: Default + 'static,
    S: BuildHasher,
{
    fn dyn_len(&self) -> usize {
        self.len()
    }

    fn dyn_contains_key(&self, key: &dyn Any) -> bool {
        key.downcast_ref::<K>()
            .is_some_and(|k| self.contains_key(k))
    }

    fn dyn_get(&self, key: &dyn Any) -> Option<&dyn Any> {
        let k = key.downcast_ref::<K>()?;
        self.try_get(k).map(|v| v as &dyn Any)
    }

    fn dyn_insert(&mut self, key: Box<dyn Any>, value: Box<dyn Any>) -> Result<()> {
        let (k, v) = downcast_pair::<K, V>(key, value)?;
        self.insert(k, v)
    }

    fn dyn_add(&mut self, key: Box<dyn Any>, value: Box<dyn Any>) -> Result<()> {
        let (k, v) = downcast_pair::<K, V>(key, value)?;
        self.add(k, v)
    }

    fn dyn_remove(&mut self, key: &dyn Any) -> bool {
        match key.downcast_ref::<K>() {
            Some(k) => self.remove(k),
            None => false,
        }
    }

    fn dyn_entries(&self) -> Vec<(&dyn Any, &dyn Any)> {
        self.iter()
            .map(|(k, v)| (k as &dyn Any, v as &dyn Any))
            .collect()
    }
}
