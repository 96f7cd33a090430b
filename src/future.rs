//! Engine futures: the result of a spawned child, one indirection per stall.
//!
//! A spawned child's eventual value is exposed as an [`EngineFuture`]: a
//! write-once cell holding a [`FutureState`]. If the child finishes its first
//! quantum, the state is `Ready` and points at the child's raw result cell.
//! If the child stalls, the state is `Stalled` and points at the *next*
//! future, which describes the child's next quantum — and so on, one hop per
//! stall:
//!
//! ```text
//!   future ──► Stalled ──► Stalled ──► Ready ──► value
//!              (stall 1)   (stall 2)   (quantum 3 finished)
//! ```
//!
//! Chasing the chain is the awaiting reader's job (see
//! [`EngineCx::wait`](crate::EngineCx::wait)); building it is the relay's.
//!
//! # The relay
//!
//! Each spawn forks a relay task alongside the child. The relay owns the
//! translation between the checkin protocol and the future representation: it
//! reads the child's checkin cell (a shared read — the driver reads the same
//! message when redistributing fuel) and writes the corresponding
//! [`FutureState`]. On a stall it then reads the child's restart cell, again
//! shared with the child itself, to learn which cell the child's next upcall
//! goes to, and carries on there. The relay therefore follows the child
//! through any number of stalls, and a future always resolves once the child
//! is given enough fuel to finish.

use crate::cell::Cell;
use crate::protocol::{CheckinCell, CheckinMessage};
use crate::tracing_compat::trace;

/// One hop of a future chain.
#[derive(Debug)]
pub enum FutureState<T> {
    /// The child finished; its value is (or will momentarily be) in the cell.
    Ready(Cell<T>),
    /// The child stalled; the chain continues at the next future.
    Stalled(EngineFuture<T>),
}

/// The eventual result of a spawned child computation.
///
/// Returned by [`EngineCx::spawn`](crate::EngineCx::spawn) and consumed by
/// [`EngineCx::wait`](crate::EngineCx::wait). Cheaply cloneable; clones share
/// the same chain.
#[derive(Debug)]
pub struct EngineFuture<T> {
    state: Cell<FutureState<T>>,
}

impl<T> EngineFuture<T> {
    /// Creates an unresolved future. Its state cell is written by the relay.
    pub(crate) fn unresolved() -> Self {
        Self { state: Cell::new() }
    }

    /// The cell holding this hop's state.
    pub(crate) fn state(&self) -> &Cell<FutureState<T>> {
        &self.state
    }

    /// Returns true once this hop has been determined (ready *or* stalled).
    ///
    /// This is a non-blocking peek; a `true` result does not mean the final
    /// value is available, only that the first hop of the chain is known.
    #[must_use]
    pub fn is_determined(&self) -> bool {
        self.state.is_set()
    }
}

// Handles clone unconditionally, like the cells they wrap.
impl<T> Clone for EngineFuture<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> Clone for FutureState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Ready(value) => Self::Ready(value.clone()),
            Self::Stalled(next) => Self::Stalled(next.clone()),
        }
    }
}

/// Translates a child's checkin chain into its future chain.
///
/// Runs on its own forked task, one per spawn. `checkin` is the child's first
/// checkin cell and `value` its raw result cell; `future` is the handle the
/// spawner received.
pub(crate) fn relay<T>(mut checkin: CheckinCell, value: Cell<T>, future: EngineFuture<T>) {
    let mut slot = future.state;
    loop {
        match checkin.read() {
            CheckinMessage::Finished { .. } => {
                trace!("relay: child finished, resolving future");
                slot.write(FutureState::Ready(value));
                return;
            }
            CheckinMessage::FuelExhausted { restart, .. } => {
                // One more hop. Publish the stall first so an awaiting reader
                // can suspend itself instead of blocking the whole tree.
                let next = EngineFuture::unresolved();
                slot.write(FutureState::Stalled(next.clone()));
                trace!("relay: child stalled, chaining next hop");

                // Shared read alongside the child: the same downcall that
                // wakes the child tells the relay where the next upcall goes.
                let wake = restart.read();
                checkin = wake.next_checkin;
                slot = next.state;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::fuel::Fuel;
    use crate::protocol::RestartMessage;
    use crate::task::fork;

    fn spawn_relay<T: Send + 'static>(
        checkin: CheckinCell,
        value: Cell<T>,
    ) -> EngineFuture<T> {
        let future = EngineFuture::unresolved();
        let handle = future.clone();
        fork("relay-test", move || relay(checkin, value, handle));
        future
    }

    #[test]
    fn finished_child_resolves_in_one_hop() {
        let checkin = CheckinCell::new();
        let value = Cell::new();
        let future = spawn_relay(checkin.clone(), value.clone());

        value.write(11);
        checkin.write(CheckinMessage::Finished { children: vec![] });

        match future.state().read() {
            FutureState::Ready(cell) => assert_eq!(cell.read(), 11),
            FutureState::Stalled(_) => panic!("finished child must resolve ready"),
        }
    }

    #[test]
    fn stalled_child_chains_one_hop_per_stall() {
        let checkin = CheckinCell::new();
        let value = Cell::new();
        let future = spawn_relay(checkin.clone(), value.clone());

        // Quantum 1: stall.
        let restart = Cell::new();
        checkin.write(CheckinMessage::FuelExhausted {
            restart: restart.clone(),
            children: vec![],
        });
        let next = match future.state().read() {
            FutureState::Stalled(next) => next,
            FutureState::Ready(_) => panic!("stalled child must not resolve ready"),
        };
        assert!(!next.is_determined());

        // Downcall: the relay follows the child to its next checkin cell.
        let second_checkin = CheckinCell::new();
        restart.write(RestartMessage {
            fuel: Fuel::new(1),
            next_checkin: second_checkin.clone(),
        });

        // Quantum 2: finish.
        value.write(5);
        second_checkin.write(CheckinMessage::Finished { children: vec![] });

        match next.state().read() {
            FutureState::Ready(cell) => assert_eq!(cell.read(), 5),
            FutureState::Stalled(_) => panic!("second quantum finished"),
        }
    }

    #[test]
    fn clones_share_the_chain() {
        let checkin = CheckinCell::new();
        let value = Cell::new();
        let future = spawn_relay(checkin.clone(), value.clone());
        let alias = future.clone();

        value.write(3);
        checkin.write(CheckinMessage::Finished { children: vec![] });

        assert!(matches!(future.state().read(), FutureState::Ready(_)));
        assert!(matches!(alias.state().read(), FutureState::Ready(_)));
    }
}
