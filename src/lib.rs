//! flat-hashmap: a single-threaded hash map whose whole state lives in flat
//! parallel arrays, so it can be snapshotted and restored as plain data.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a chained hash table with no per-entry heap nodes. Every link is
//!   an `i32` index into sibling arrays, which makes the storage itself the
//!   serialization format.
//! - Layers:
//!   - `primes`: table sizing. Lengths are primes taken from a ladder that
//!     roughly doubles on growth.
//!   - `FlatHashMap<K, V, S>`: the storage engine. Bucket heads plus
//!     parallel `hashes`/`next`/`keys`/`values` arrays, an intrusive free
//!     list and a version counter. Owns every mutation.
//!   - `KeyView` / `ValueView`: read-only projections over the engine.
//!   - `Cursor`: detached enumeration state checked against the owning
//!     map and its version;
//!     `Iter`/`IterMut`/`Keys`/`Values` are the borrowing equivalents.
//!   - `FlatSnapshot`: the arrays plus `count`/`free_list`/`free_count`,
//!     with validated restore.
//!   - `Collection` and `DynMap`: capability traits for hosts; thin
//!     adapters over the typed engine.
//!
//! Constraints
//! - Single-threaded; the map is `!Sync`.
//! - Free slots are marked by `hash == -1` and threaded through `next`;
//!   removal is O(1) and slots are recycled before the tail grows.
//! - Removed keys and values are reset to `Default` so nothing stale is
//!   kept alive by a free slot.
//! - Duplicate keys are rejected in add mode and overwritten in set mode.
//!
//! Hasher and rehashing invariants
//! - Each slot stores a 31-bit hash and resizing always uses the stored
//!   hash; `K: Hash` is never invoked after insertion. Resize and compact
//!   therefore run no user code and cannot fail halfway.
//! - The default hasher is `rustc_hash::FxBuildHasher`. It is unseeded, so
//!   stored hashes stay valid when a snapshot is restored in another
//!   process. A seeded hasher works for in-process use only.
//!
//! Reentrancy policy
//! - Entry points that call user `Hash`/`Eq`/`PartialEq` code hold a
//!   debug-only guard; re-entering the same map from that code panics in
//!   debug builds and is unchecked in release builds.
//!
//! Notes and non-goals
//! - No concurrency and no ordering guarantee beyond slot order.
//! - The version counter is runtime state; a restored or cloned map starts
//!   at 0.

mod collection;
mod cursor;
mod dynamic;
mod error;
pub mod flat_hash_map;
mod flat_hash_map_proptest;
pub mod iter;
pub mod primes;
mod reentrancy;
mod snapshot;
mod views;

// Public surface
pub use collection::Collection;
pub use cursor::{Cursor, CursorState};
pub use dynamic::DynMap;
pub use error::{MapError, Result};
pub use flat_hash_map::{FlatHashMap, InsertMode};
pub use snapshot::FlatSnapshot;
pub use views::{KeyView, ValueView};
