//! The fuel budget type.
//!
//! Fuel is the unit of work an engine may perform before it must suspend: one
//! unit per checkpoint. A driver hands an engine a fuel budget when it starts
//! or resumes it; the engine spends the budget at [`tick`](crate::EngineCx::tick)
//! checkpoints and suspends when the tank is empty.
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | `consume` | spend one unit, reporting whether any was left |
//! | `debit`   | transfer up to `n` units out (used by spawn grants) |
//! | `min`     | tighter budget wins (via `Ord`) |
//!
//! Fuel is deliberately plain: a non-negative counter with no deadline or
//! priority attached. Fairness across a stalled tree is the driver's job, not
//! the budget's.

use crate::tracing_compat::trace;
use core::fmt;

/// A fuel budget: the number of checkpoint units remaining in a quantum.
///
/// `Fuel` is a `Copy` newtype over `u64`. Exhaustion is a control state, not
/// an error: a computation that runs out of fuel suspends and waits for more.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fuel(u64);

impl Fuel {
    /// An empty tank. An engine started with zero fuel suspends at its first
    /// checkpoint.
    pub const ZERO: Self = Self(0);

    /// Creates a budget of `units` checkpoint units.
    #[must_use]
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// Returns the number of units remaining.
    #[must_use]
    pub const fn units(self) -> u64 {
        self.0
    }

    /// Returns true if no fuel remains.
    #[must_use]
    pub const fn is_exhausted(self) -> bool {
        self.0 == 0
    }

    /// Spends one unit of fuel.
    ///
    /// Returns `true` if a unit was available and consumed, `false` if the
    /// tank was already empty (in which case the budget is unchanged).
    pub fn consume(&mut self) -> bool {
        if self.0 > 0 {
            self.0 -= 1;
            trace!(fuel_remaining = self.0, "fuel unit consumed");
            true
        } else {
            trace!("fuel consume failed: tank empty");
            false
        }
    }

    /// Transfers up to `requested` units out of this budget.
    ///
    /// Returns the amount actually granted: `min(requested, available)`.
    /// Over-requesting is not an error; the grant is silently clamped. This is
    /// the spawn-grant rule.
    #[must_use = "the granted amount is the child's budget"]
    pub fn debit(&mut self, requested: Self) -> Self {
        let granted = requested.min(*self);
        self.0 -= granted.0;
        trace!(
            requested = requested.0,
            granted = granted.0,
            remaining = self.0,
            "fuel debited"
        );
        granted
    }

    /// Returns the budget reduced by `amount`, saturating at empty.
    #[must_use]
    pub const fn saturating_sub(self, amount: Self) -> Self {
        Self(self.0.saturating_sub(amount.0))
    }
}

impl From<u64> for Fuel {
    fn from(units: u64) -> Self {
        Self(units)
    }
}

impl From<Fuel> for u64 {
    fn from(fuel: Fuel) -> Self {
        fuel.0
    }
}

impl fmt::Debug for Fuel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fuel({})", self.0)
    }
}

impl fmt::Display for Fuel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
