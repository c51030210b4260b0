//! Cursor: detached enumeration state for a `FlatHashMap`.
//!
//! A cursor does not borrow the map. Each call takes the map explicitly,
//! which lets a host interleave enumeration with other work and detect,
//! rather than prevent, modification in between: the cursor remembers the
//! map's identity and version at creation and refuses to continue with a
//! different map or once the version changes.

use crate::error::{MapError, Result};
use crate::flat_hash_map::{FlatHashMap, FREE};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CursorState {
    /// Created or reset; no entry read yet.
    Initial,
    /// On a live slot; `current` is readable.
    Positioned,
    /// Walked past the last slot.
    Exhausted,
}

#[derive(Clone, Debug)]
pub struct Cursor {
    map_id: u64,
    version: u64,
    // Next slot to examine; pinned at `count + 1` once exhausted.
    index: usize,
    state: CursorState,
}

impl Cursor {
    pub(crate) fn new(map_id: u64, version: u64) -> Self {
        Self {
            map_id,
            version,
            index: 0,
            state: CursorState::Initial,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Move to the next live slot. Returns `false` once exhausted.
    pub fn advance<K, V, S>(&mut self, map: &FlatHashMap<K, V, S>) -> Result<bool> {
        map.check_cursor(self.map_id, self.version)?;
        while self.index < map.count {
            let i = self.index;
            self.index += 1;
            if map.hashes[i] != FREE {
                self.state = CursorState::Positioned;
                return Ok(true);
            }
        }
        self.index = map.count + 1;
        self.state = CursorState::Exhausted;
        Ok(false)
    }

    /// Return to [`CursorState::Initial`]; still fails on a modified or
    /// foreign map.
    pub fn reset<K, V, S>(&mut self, map: &FlatHashMap<K, V, S>) -> Result<()> {
        map.check_cursor(self.map_id, self.version)?;
        self.index = 0;
        self.state = CursorState::Initial;
        Ok(())
    }

    /// Pair at the current position.
    pub fn current<'m, K, V, S>(&self, map: &'m FlatHashMap<K, V, S>) -> Result<(&'m K, &'m V)> {
        if self.state != CursorState::Positioned {
            return Err(MapError::InvalidState);
        }
        // The slot may have been freed or renumbered since the last advance.
        map.check_cursor(self.map_id, self.version)?;
        map.slot(self.index - 1).ok_or(MapError::InvalidState)
    }

    pub fn key<'m, K, V, S>(&self, map: &'m FlatHashMap<K, V, S>) -> Result<&'m K> {
        self.current(map).map(|(k, _)| k)
    }

    pub fn value<'m, K, V, S>(&self, map: &'m FlatHashMap<K, V, S>) -> Result<&'m V> {
        self.current(map).map(|(_, v)| v)
    }
}
