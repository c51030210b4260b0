//! Debug-only reentrancy guard.
//!
//! The engine calls user `Hash`/`Eq` code while walking bucket chains. A key
//! whose `eq` reaches back into the same map would observe half-updated
//! arrays, so debug builds record the active operation and panic on nested
//! entry. Release builds compile the guard away.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-map tracker; engine entry points call `self.guard.enter("op")`.
#[derive(Debug)]
pub struct ReentrancyGuard {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    // Cell already makes this !Sync in debug builds; keep release identical.
    _not_sync: PhantomData<Cell<()>>,
}

impl ReentrancyGuard {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _not_sync: PhantomData,
        }
    }

    /// Mark `op` as running until the returned scope is dropped.
    ///
    /// Panics in debug builds if another operation is already running.
    #[inline]
    pub fn enter(&self, op: &'static str) -> Scope<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(outer) = self.active() {
                panic!("reentrant call to `{op}` while `{outer}` is running on the same map");
            }
            self.active.set(Some(op));
            Scope { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            Scope { _owner: PhantomData }
        }
    }

    /// Name of the running operation, if any. Always `None` in release builds.
    pub fn active(&self) -> Option<&'static str> {
        #[cfg(debug_assertions)]
        {
            self.active.get()
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    }
}

impl Default for ReentrancyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ReentrancyGuard {
    // A cloned map starts idle regardless of the source's state.
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// RAII scope returned by [`ReentrancyGuard::enter`].
pub struct Scope<'a> {
    #[cfg(debug_assertions)]
    owner: &'a ReentrancyGuard,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a ReentrancyGuard>,
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.active.get().is_some());
            self.owner.active.set(None);
        }
    }
}
