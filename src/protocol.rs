//! The checkin/restart protocol between an engine and its scheduling parent.
//!
//! Every engine sends exactly one upcall per quantum to whoever is currently
//! its parent: either it finished, or it ran out of fuel. A stalled engine is
//! woken by exactly one downcall carrying new fuel and the cell its next
//! upcall must go to:
//!
//! ```text
//!   engine                                   parent (driver or outer engine)
//!     │                                        │
//!     │── Finished { children } ──────────────►│          (quantum ends, done)
//!     │                                        │
//!     │── FuelExhausted { restart, children } ►│          (quantum ends, stalled)
//!     │                                        │
//!     ⏸ ◄── RestartMessage { fuel, next } ─────│          (downcall, new quantum)
//!     │                                        │
//!     │── ... next upcall goes to `next` ... ─►│
//! ```
//!
//! Both message shapes carry the children the engine spawned since its last
//! report. Ownership of those checkin handles transfers permanently to
//! whoever receives the message; the outstanding set of a stalled tree is
//! rebuilt from them at resume time.
//!
//! Checkin cells are read by two parties — the relay feeding the child's
//! future and the driver redistributing fuel — which is why cells have shared
//! reads. Each cell still has exactly one writer.

use crate::cell::Cell;
use crate::fuel::Fuel;

/// The cell an engine writes its one upcall per quantum into.
pub type CheckinCell = Cell<CheckinMessage>;

/// An engine's end-of-quantum report to its current scheduling parent.
#[derive(Clone, Debug)]
pub enum CheckinMessage {
    /// The engine ran to completion. Its result is already in its raw result
    /// cell; `children` are the checkin handles it had not yet reported.
    Finished {
        /// Checkin handles of children spawned since the last report.
        children: Vec<CheckinCell>,
    },
    /// The engine ran out of fuel and is blocked reading `restart`.
    FuelExhausted {
        /// The cell a [`RestartMessage`] must be written to, to wake the
        /// engine.
        restart: Cell<RestartMessage>,
        /// Checkin handles of children spawned since the last report.
        children: Vec<CheckinCell>,
    },
}

impl CheckinMessage {
    /// Returns true for a [`CheckinMessage::Finished`] report.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}

/// The downcall that wakes a stalled engine with a fresh quantum.
#[derive(Clone, Debug)]
pub struct RestartMessage {
    /// The new quantum's fuel budget.
    pub fuel: Fuel,
    /// Where the engine's next upcall must go.
    pub next_checkin: CheckinCell,
}
