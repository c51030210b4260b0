//! Error type shared by every layer of the map.

use thiserror::Error;

/// Errors reported by `FlatHashMap`, its views, cursors and adapters.
///
/// All conditions are local and synchronous: they are raised by the call
/// that violates the contract, before any array is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// A key of the wrong type was handed to the loosely-typed adapter.
    #[error("invalid key")]
    InvalidKey,

    /// A value of the wrong type was handed to the loosely-typed adapter.
    #[error("invalid value")]
    InvalidValue,

    /// Direct read of a key that is not present.
    #[error("key not found")]
    KeyNotFound,

    /// Add-mode insert of a key that is already present.
    #[error("an entry with the same key already exists")]
    DuplicateKey,

    /// Mutation attempted through a read-only view.
    #[error("operation not supported: {operation}")]
    UnsupportedOperation {
        /// Name of the rejected operation
        operation: &'static str,
    },

    /// Cursor read before the first advance or after exhaustion.
    #[error("cursor is not positioned on an entry")]
    InvalidState,

    /// A cursor was used with a map other than the one that created it.
    #[error("cursor belongs to a different map")]
    WrongMap,

    /// The map changed after the cursor was created.
    #[error("map was modified; enumeration cannot continue")]
    ConcurrentModification,

    /// Requested table size exceeds the largest supported prime table.
    #[error("capacity overflow: requested {requested}")]
    CapacityOverflow {
        /// The requested number of slots
        requested: usize,
    },

    /// Copy-out destination too small for the live entries.
    #[error("destination too small: need {needed}, have {available}")]
    InsufficientSpace {
        /// Slots required from the start offset
        needed: usize,
        /// Slots available from the start offset
        available: usize,
    },

    /// A flattened snapshot does not describe a consistent table.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

pub type Result<T> = std::result::Result<T, MapError>;

#[cfg(test)]
mod tests {
    use super::MapError;

    #[test]
    fn messages_carry_context() {
        let e = MapError::CapacityOverflow { requested: 42 };
        assert_eq!(e.to_string(), "capacity overflow: requested 42");
        let e = MapError::InsufficientSpace {
            needed: 3,
            available: 1,
        };
        assert_eq!(e.to_string(), "destination too small: need 3, have 1");
        let e = MapError::UnsupportedOperation { operation: "add" };
        assert_eq!(e.to_string(), "operation not supported: add");
        assert_eq!(
            MapError::WrongMap.to_string(),
            "cursor belongs to a different map"
        );
    }
}
