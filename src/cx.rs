//! The engine context: explicit per-engine scheduling state.
//!
//! `EngineCx` is the token a running computation uses to interact with the
//! scheduling layer:
//!
//! - Spending fuel at checkpoints ([`tick`](EngineCx::tick))
//! - Suspending unconditionally ([`yield_now`](EngineCx::yield_now))
//! - Spawning child engines ([`spawn`](EngineCx::spawn))
//! - Awaiting a child's future ([`wait`](EngineCx::wait))
//!
//! Every operation that touches the protocol flows through an explicit
//! `&mut EngineCx`; there is no ambient or thread-local scheduling state. The
//! driver constructs one context per engine per quantum: a suspend consumes
//! the context's identity, and the wake path rebuilds its fields wholesale
//! from the [`RestartMessage`](crate::protocol::RestartMessage). A context
//! never survives a suspend boundary with its old values.
//!
//! # Cooperative contract
//!
//! Fuel is only observed at checkpoints. A computation that loops without
//! calling [`tick`](EngineCx::tick) cannot be preempted; placing checkpoints
//! is the computation author's responsibility.

use crate::cell::Cell;
use crate::fuel::Fuel;
use crate::future::{relay, EngineFuture, FutureState};
use crate::protocol::{CheckinCell, CheckinMessage};
use crate::task::fork;
use crate::tracing_compat::{debug, trace};
use std::mem;

/// The mutable scheduling state of one running engine.
///
/// Created by the driver (or by [`spawn`](EngineCx::spawn) for children) and
/// threaded by reference through the computation. See the [module
/// docs](self).
#[derive(Debug)]
pub struct EngineCx {
    /// Fuel this quantum started with.
    start_fuel: Fuel,
    /// Fuel still unspent in this quantum. Invariant: `cur_fuel <= start_fuel`.
    cur_fuel: Fuel,
    /// Where this engine's one upcall for the current quantum goes.
    parent: CheckinCell,
    /// Children spawned since the last report. Ownership transfers to whoever
    /// receives the next checkin message.
    pending_children: Vec<CheckinCell>,
}

impl EngineCx {
    /// Builds the context for a fresh engine with its first quantum's fuel.
    pub(crate) fn new(fuel: Fuel, parent: CheckinCell) -> Self {
        Self {
            start_fuel: fuel,
            cur_fuel: fuel,
            parent,
            pending_children: Vec::new(),
        }
    }

    /// Fuel still unspent in the current quantum.
    #[must_use]
    pub fn fuel_remaining(&self) -> Fuel {
        self.cur_fuel
    }

    /// Fuel the current quantum started with.
    #[must_use]
    pub fn quantum_fuel(&self) -> Fuel {
        self.start_fuel
    }

    /// A checkpoint: spends one unit of fuel, or suspends if none is left.
    ///
    /// Never fails. When the tank is empty the checkpoint delegates to
    /// [`yield_now`](Self::yield_now) and returns once the driver injects
    /// more fuel; the unit that triggered the suspension is not re-charged
    /// against the new quantum.
    ///
    /// Children registered since the last report stay pending across
    /// successful ticks; they are only handed over at a suspend or at
    /// completion.
    pub fn tick(&mut self) {
        if !self.cur_fuel.consume() {
            self.yield_now();
        }
    }

    /// Suspends this engine unconditionally, discarding any remaining fuel.
    ///
    /// Writes the engine's one upcall for the quantum — `FuelExhausted`, with
    /// a fresh restart cell and the pending children — to the current parent,
    /// then blocks until a [`RestartMessage`](crate::protocol::RestartMessage)
    /// arrives. On wake, the context is rebuilt: new fuel, new parent cell,
    /// empty pending set.
    pub fn yield_now(&mut self) {
        let restart = Cell::new();
        let children = mem::take(&mut self.pending_children);
        debug!(
            discarded_fuel = self.cur_fuel.units(),
            children = children.len(),
            "engine suspending"
        );
        self.parent.write(CheckinMessage::FuelExhausted {
            restart: restart.clone(),
            children,
        });

        // The engine's single blocking point: wait for the downcall.
        let wake = restart.read();
        debug!(fuel = wake.fuel.units(), "engine restarted");
        self.start_fuel = wake.fuel;
        self.cur_fuel = wake.fuel;
        self.parent = wake.next_checkin;
        self.pending_children = Vec::new();
    }

    /// Forks a child engine and returns its eventual result as a future.
    ///
    /// The child's budget is `min(fuel, fuel_remaining())`, debited from this
    /// engine's quantum; over-requesting silently clamps and is not an error.
    /// A second forked task, the relay, translates the child's checkin chain
    /// into the future (see the [future module docs](crate::future)).
    ///
    /// Spawning never suspends the caller, even when the grant is zero — a
    /// zero-fuel child simply stalls at its first checkpoint and waits for
    /// the next fuel injection.
    pub fn spawn<T, F>(&mut self, fuel: Fuel, computation: F) -> EngineFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut EngineCx) -> T + Send + 'static,
    {
        let granted = self.cur_fuel.debit(fuel);
        let checkin = CheckinCell::new();
        let value = Cell::new();
        debug!(granted = granted.units(), "spawning child engine");

        let child_parent = checkin.clone();
        let child_value = value.clone();
        fork("stoker-engine", move || {
            run_engine(granted, child_parent, child_value, computation);
        });

        self.pending_children.push(checkin.clone());

        let future = EngineFuture::unresolved();
        let relay_handle = future.clone();
        fork("stoker-relay", move || relay(checkin, value, relay_handle));
        future
    }

    /// Awaits a future, chasing stall indirections.
    ///
    /// If the target is ready, returns its value. If the target has stalled,
    /// the *reader* pays the suspension cost: this engine yields — discarding
    /// its own remaining fuel and reporting itself upward through its own
    /// parent — and chases the next hop once restarted. The driver therefore
    /// always has a blocked thread to refuel instead of an opaque wait.
    ///
    /// Costs one suspend/resume round-trip per stall of the awaited chain.
    pub fn wait<T: Clone>(&mut self, future: &EngineFuture<T>) -> T {
        let mut current = future.clone();
        loop {
            match current.state().read() {
                FutureState::Ready(value) => return value.read(),
                FutureState::Stalled(next) => {
                    trace!("await target stalled; reader suspending");
                    self.yield_now();
                    current = next;
                }
            }
        }
    }
}

/// Runs a computation to completion inside a fresh engine context.
///
/// This is the body of every forked engine thread, root and child alike: run,
/// publish the value, then send the `Finished` upcall to whatever cell is the
/// engine's parent *by then* (suspends during the run may have replaced it).
pub(crate) fn run_engine<T, F>(fuel: Fuel, parent: CheckinCell, value: Cell<T>, computation: F)
where
    F: FnOnce(&mut EngineCx) -> T,
{
    let mut cx = EngineCx::new(fuel, parent);
    let result = computation(&mut cx);

    // Value first, then the report: a parent that sees `Finished` may read
    // the result cell without blocking.
    value.write(result);
    let children = mem::take(&mut cx.pending_children);
    debug!(children = children.len(), "engine finished");
    cx.parent.write(CheckinMessage::Finished { children });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_spends_fuel_without_suspending() {
        let parent = CheckinCell::new();
        let mut cx = EngineCx::new(Fuel::new(3), parent.clone());

        cx.tick();
        cx.tick();

        assert_eq!(cx.fuel_remaining(), Fuel::new(1));
        assert_eq!(cx.quantum_fuel(), Fuel::new(3));
        // No upcall yet: fuel was available at every checkpoint.
        assert!(!parent.is_set());
    }

    #[test]
    fn tick_preserves_pending_children() {
        let parent = CheckinCell::new();
        let mut cx = EngineCx::new(Fuel::new(5), parent);
        cx.pending_children.push(CheckinCell::new());

        cx.tick();

        assert_eq!(cx.pending_children.len(), 1);
    }

    #[test]
    fn exhausted_tick_suspends_and_wakes_with_new_quantum() {
        let parent = CheckinCell::new();
        let driver_side = parent.clone();

        let done = Cell::new();
        let done_writer = done.clone();
        fork("cx-test-engine", move || {
            let mut cx = EngineCx::new(Fuel::new(1), parent);
            cx.tick(); // consumes the only unit
            cx.tick(); // suspends
            done_writer.write(cx.fuel_remaining());
        });

        let restart = match driver_side.read() {
            CheckinMessage::FuelExhausted { restart, children } => {
                assert!(children.is_empty());
                restart
            }
            CheckinMessage::Finished { .. } => panic!("engine had no fuel to finish on"),
        };

        restart.write(crate::protocol::RestartMessage {
            fuel: Fuel::new(4),
            next_checkin: CheckinCell::new(),
        });

        // The suspending tick charges nothing against the new quantum.
        assert_eq!(done.read(), Fuel::new(4));
    }

    #[test]
    fn yield_hands_over_pending_children() {
        let parent = CheckinCell::new();
        let driver_side = parent.clone();

        fork("cx-test-engine", move || {
            let mut cx = EngineCx::new(Fuel::new(2), parent);
            cx.pending_children.push(CheckinCell::new());
            cx.pending_children.push(CheckinCell::new());
            cx.yield_now();
            // Parked forever: nobody restarts this engine. Detached threads
            // leak by design when abandoned.
        });

        match driver_side.read() {
            CheckinMessage::FuelExhausted { children, .. } => assert_eq!(children.len(), 2),
            CheckinMessage::Finished { .. } => panic!("yield_now always reports exhaustion"),
        }
    }

    #[test]
    fn spawn_clamps_grant_to_available_fuel() {
        let parent = CheckinCell::new();
        let mut cx = EngineCx::new(Fuel::new(3), parent);

        let future = cx.spawn(Fuel::new(10), |child| {
            child.quantum_fuel().units()
        });

        // The whole remaining budget went to the child.
        assert_eq!(cx.fuel_remaining(), Fuel::ZERO);
        assert_eq!(cx.pending_children.len(), 1);

        // The child needed no checkpoints, so it finishes on any grant.
        assert_eq!(cx.wait(&future), 3);
    }

    #[test]
    fn run_engine_publishes_value_then_finished() {
        let parent = CheckinCell::new();
        let value = Cell::new();

        run_engine(Fuel::new(1), parent.clone(), value.clone(), |_cx| 17);

        assert!(parent.read().is_finished());
        assert_eq!(value.read(), 17);
    }
}
