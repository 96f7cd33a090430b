//! Single-assignment, blocking-read cells.
//!
//! The entire engine protocol is coordinated through these cells; there is no
//! other shared mutable state. A cell starts empty, is written exactly once,
//! and any read blocks the calling thread until that write happens:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     WRITE-ONCE CELL                          │
//! │                                                              │
//! │   Writer                                 Readers             │
//! │     │                                      │                 │
//! │     │                                      ├── read() ─ ⏸    │
//! │     │─── write(v) ────────────────────────►├── read() ─► v   │
//! │     │                                      ├── read() ─► v   │
//! │     │─── write(w) ──► defect (panic)       │                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads are shared: every handle clone may read, and each read hands out a
//! clone of the value. The protocol relies on this — a child's checkin message
//! is read both by the relay task that feeds its future and by the driver that
//! redistributes fuel.
//!
//! # Single-writer discipline
//!
//! Writes are not shared. Every cell in the protocol has exactly one
//! designated writer that writes exactly once; a second write is a fatal
//! defect, not a recoverable error. [`Cell::write`] enforces this with a
//! panic. [`Cell::try_write`] is the non-panicking form for code outside the
//! protocol that wants to race benignly.
//!
//! # Leaks
//!
//! A cell nobody ever writes blocks its readers forever. This is the
//! documented leak mode of an abandoned stalled engine tree: dropping a
//! [`StalledEngine`](crate::StalledEngine) without resuming it leaves its
//! threads blocked on cells with no remaining writer. Resuming (or accepting
//! the leak) is the caller's obligation.

use core::fmt;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Error returned by [`Cell::try_write`] when the cell already holds a value.
///
/// Carries the rejected value back to the caller.
pub struct DoubleWrite<T>(
    /// The value the cell refused.
    pub T,
);

impl<T> fmt::Debug for DoubleWrite<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DoubleWrite(..)")
    }
}

impl<T> fmt::Display for DoubleWrite<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "write-once cell written twice")
    }
}

impl<T> std::error::Error for DoubleWrite<T> {}

/// Shared state behind every handle clone of one cell.
struct Inner<T> {
    slot: Mutex<Option<T>>,
    ready: Condvar,
}

/// A single-assignment container with blocking, shared reads.
///
/// Handles are cheaply cloneable; all clones refer to the same slot. See the
/// [module docs](self) for the write-once discipline.
pub struct Cell<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Cell<T> {
    /// Creates a new, empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(None),
                ready: Condvar::new(),
            }),
        }
    }

    /// Writes the cell's one value.
    ///
    /// Wakes every blocked reader.
    ///
    /// # Panics
    ///
    /// Panics if the cell was already written. The engine protocol designates
    /// exactly one writer per cell, so this indicates a defect, never a
    /// runtime condition to handle.
    pub fn write(&self, value: T) {
        assert!(
            self.try_write(value).is_ok(),
            "write-once cell written twice (protocol defect: every cell has one writer)"
        );
    }

    /// Attempts to write the cell's value, failing if one is already present.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleWrite`] carrying the rejected value if the cell was
    /// already written.
    pub fn try_write(&self, value: T) -> Result<(), DoubleWrite<T>> {
        let mut slot = self.inner.slot.lock();
        if slot.is_some() {
            return Err(DoubleWrite(value));
        }
        *slot = Some(value);
        self.inner.ready.notify_all();
        Ok(())
    }

    /// Returns true if the cell has been written.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.inner.slot.lock().is_some()
    }
}

impl<T: Clone> Cell<T> {
    /// Reads the cell's value, blocking the calling thread until it is
    /// written.
    ///
    /// Reads are shared and repeatable: every call returns a clone of the one
    /// written value. If no writer remains, this blocks forever — see the
    /// [module docs](self) on leaks.
    #[must_use]
    pub fn read(&self) -> T {
        let mut slot = self.inner.slot.lock();
        loop {
            if let Some(value) = slot.as_ref() {
                return value.clone();
            }
            self.inner.ready.wait(&mut slot);
        }
    }

    /// Returns a clone of the value if the cell has been written, without
    /// blocking.
    #[must_use]
    pub fn try_read(&self) -> Option<T> {
        self.inner.slot.lock().clone()
    }
}

// Handles clone unconditionally; only reads need `T: Clone`.
impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Cell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell").field("set", &self.is_set()).finish()
    }
}
