//! Read/write collection capability.
//!
//! Hosts that manipulate collections generically (inspectors, binders) speak
//! this trait. The map implements it over `(K, V)` pairs; the key and value
//! views implement it too but reject every mutation.

use crate::error::Result;
use crate::flat_hash_map::FlatHashMap;
use core::hash::{BuildHasher, Hash};

pub trait Collection<T> {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` when `add`/`remove`/`clear` always fail.
    fn is_read_only(&self) -> bool;

    fn contains(&self, item: &T) -> bool;

    fn add(&mut self, item: T) -> Result<()>;

    /// `Ok(false)` when the item was not present.
    fn remove(&mut self, item: &T) -> Result<bool>;

    fn clear(&mut self) -> Result<()>;
}

/// Pair-level view of the map: membership and removal require both the
/// key and an equal value.
impl<K, V, S> Collection<(K, V)> for FlatHashMap<K, V, S>
where
    K: Eq + Hash + Default,
    V: PartialEq + Default,
    S: BuildHasher,
{
    fn len(&self) -> usize {
        FlatHashMap::len(self)
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn contains(&self, item: &(K, V)) -> bool {
        self.contains_pair(&item.0, &item.1)
    }

    fn add(&mut self, item: (K, V)) -> Result<()> {
        FlatHashMap::add(self, item.0, item.1)
    }

    fn remove(&mut self, item: &(K, V)) -> Result<bool> {
        Ok(self.remove_pair(&item.0, &item.1))
    }

    fn clear(&mut self) -> Result<()> {
        FlatHashMap::clear(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Collection;
    use crate::error::MapError;
    use crate::FlatHashMap;

    fn through_trait<C: Collection<(i32, i32)>>(c: &mut C) -> Result<(), MapError> {
        assert!(!c.is_read_only());
        c.add((1, 10))?;
        c.add((2, 20))?;
        assert_eq!(c.add((1, 99)), Err(MapError::DuplicateKey));
        assert!(c.contains(&(1, 10)));
        assert!(!c.contains(&(1, 99)));
        assert_eq!(c.remove(&(2, 21)), Ok(false));
        assert_eq!(c.remove(&(2, 20)), Ok(true));
        assert_eq!(c.len(), 1);
        c.clear()?;
        assert!(c.is_empty());
        Ok(())
    }

    #[test]
    fn map_is_a_pair_collection() {
        let mut m: FlatHashMap<i32, i32> = FlatHashMap::new();
        through_trait(&mut m).unwrap();
        assert!(m.is_empty());
    }
}
