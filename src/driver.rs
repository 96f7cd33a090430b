//! The driver: running, checkpointing, and refueling an engine tree.
//!
//! [`start`] runs a computation tree under an initial fuel budget and blocks
//! until the tree's root either finishes or stalls. A stalled tree is handed
//! back as a [`StalledEngine`]: a quiescent checkpoint the caller may hold,
//! inspect, and later refuel with [`resume`] (a continue operation in
//! scheduler terms; `continue` is a Rust keyword, hence the name).
//!
//! # Resume and fairness
//!
//! `resume` first *drains* the checkpoint's outstanding children: a blocking
//! read of each child's checkin cell, recursing into the children each
//! message carries, so the grandchildren of an already-finished child surface
//! transitively. Draining yields the restart cells of every thread that is
//! currently blocked on fuel.
//!
//! The injected fuel is then split evenly over those threads plus the main
//! engine: integer division, remainder to the earliest recipients in drain
//! order (children first, main engine last), and a floor of one unit each —
//! so no blocked thread is ever starved, even when the injection cannot cover
//! the floor. This flat even split is the only fairness policy; there is no
//! priority and no staggering.
//!
//! Every restarted thread gets its own fresh checkin cell, preserving the
//! one-writer-per-cell invariant. The driver blocks on the main engine's
//! cell — the one whose result the caller awaits. Liveness holds because a
//! main engine blocked on a child's future reports itself upward through the
//! await chase protocol rather than blocking silently.
//!
//! # Abandonment
//!
//! Dropping a [`StalledEngine`] without resuming it leaks its blocked
//! threads: they wait on cells nobody will ever write. That is the documented
//! cost of abandoning a checkpoint, not an error the driver reports.

use crate::cell::Cell;
use crate::cx::{run_engine, EngineCx};
use crate::fuel::Fuel;
use crate::protocol::{CheckinCell, CheckinMessage, RestartMessage};
use crate::task::fork;
use crate::tracing_compat::{debug, info};
use std::collections::VecDeque;

/// The outcome of running an engine tree for one driver call.
#[derive(Debug)]
#[must_use]
pub enum EngineResult<T> {
    /// The root computation finished; its value is available.
    Ready(ReadyEngine<T>),
    /// The root ran out of fuel; the tree is checkpointed and quiescent.
    Stalled(StalledEngine<T>),
}

impl<T> EngineResult<T> {
    /// Returns true if the root computation finished.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Returns true if the tree stalled.
    #[must_use]
    pub const fn is_stalled(&self) -> bool {
        matches!(self, Self::Stalled(_))
    }

    /// Converts into the ready half, if the computation finished.
    pub fn ready(self) -> Option<ReadyEngine<T>> {
        match self {
            Self::Ready(ready) => Some(ready),
            Self::Stalled(_) => None,
        }
    }

    /// Converts into the stalled half, if the tree stalled.
    pub fn stalled(self) -> Option<StalledEngine<T>> {
        match self {
            Self::Ready(_) => None,
            Self::Stalled(stalled) => Some(stalled),
        }
    }
}

/// A finished engine tree: the root's result, plus any children that had not
/// yet reported in when the root completed.
#[derive(Debug)]
pub struct ReadyEngine<T> {
    result: Cell<T>,
    children: Vec<CheckinCell>,
}

impl<T> ReadyEngine<T> {
    /// The number of children that had not reported `Finished` when the root
    /// completed. They keep running (or stay stalled) on their own; the
    /// driver no longer refuels them.
    #[must_use]
    pub fn outstanding_children(&self) -> usize {
        self.children.len()
    }
}

impl<T: Clone> ReadyEngine<T> {
    /// The root computation's value.
    ///
    /// The root publishes its value before its `Finished` upcall, so this
    /// read does not block.
    #[must_use]
    pub fn value(&self) -> T {
        self.result.read()
    }
}

/// A checkpoint of a stalled engine tree.
///
/// Holds the main engine's restart cell, the (unwritten) result cell, and the
/// checkin handles of every child not yet observed `Finished`. Refuel it with
/// [`resume`], or drop it and accept the leak of its blocked threads.
#[derive(Debug)]
pub struct StalledEngine<T> {
    restart: Cell<RestartMessage>,
    result: Cell<T>,
    outstanding: Vec<CheckinCell>,
}

impl<T> StalledEngine<T> {
    /// The number of children not yet observed `Finished`.
    ///
    /// An upper bound on the active threads the next [`resume`] will refuel:
    /// some of these children may have finished since the checkpoint was
    /// taken, which the resume-time drain discovers.
    #[must_use]
    pub fn outstanding_children(&self) -> usize {
        self.outstanding.len()
    }
}

/// Runs `computation` as the root of a new engine tree under `fuel`.
///
/// Blocks the calling thread until the root finishes (`Ready`) or exhausts
/// its budget (`Stalled`). The tree itself runs on forked threads; `start`
/// returning `Stalled` means every thread in the tree is either blocked on
/// fuel, blocked on a future, or still finishing a spawned quantum.
pub fn start<T, F>(fuel: Fuel, computation: F) -> EngineResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut EngineCx) -> T + Send + 'static,
{
    info!(fuel = fuel.units(), "starting engine tree");
    let checkin = CheckinCell::new();
    let result = Cell::new();

    let parent = checkin.clone();
    let result_cell = result.clone();
    fork("stoker-engine", move || {
        run_engine(fuel, parent, result_cell, computation);
    });

    collect(&checkin, result, Vec::new())
}

/// Injects `fuel` into a stalled tree and runs it for another round.
///
/// The budget is split evenly
/// across all currently-blocked threads plus the main engine, floor one unit
/// each (see the [module docs](self)); when `fuel` is smaller than the number
/// of recipients the floor takes precedence and the round hands out slightly
/// more than was injected.
pub fn resume<T>(fuel: Fuel, stalled: StalledEngine<T>) -> EngineResult<T> {
    let StalledEngine {
        restart,
        result,
        outstanding,
    } = stalled;

    // Drain: surface every currently-blocked thread, transitively. Each read
    // blocks until that child's current quantum ends, which needs no driver
    // help: quanta are finitely fueled.
    let mut active = Vec::new();
    let mut queue: VecDeque<CheckinCell> = outstanding.into();
    while let Some(child) = queue.pop_front() {
        match child.read() {
            CheckinMessage::Finished { children } => queue.extend(children),
            CheckinMessage::FuelExhausted { restart, children } => {
                active.push(restart);
                queue.extend(children);
            }
        }
    }

    let recipients = active.len() + 1;
    let shares = fair_shares(fuel, recipients);
    info!(
        fuel = fuel.units(),
        active_children = active.len(),
        "resuming engine tree"
    );

    // Children first, the main engine last; every restarted thread gets its
    // own fresh checkin cell, which keeps each cell single-writer.
    let mut shares = shares.into_iter();
    let mut next_children = Vec::with_capacity(active.len());
    for child_restart in active {
        let share = shares.next().expect("one share per recipient");
        let next_checkin = CheckinCell::new();
        next_children.push(next_checkin.clone());
        child_restart.write(RestartMessage {
            fuel: share,
            next_checkin,
        });
    }

    let main_share = shares.next().expect("one share per recipient");
    let main_checkin = CheckinCell::new();
    restart.write(RestartMessage {
        fuel: main_share,
        next_checkin: main_checkin.clone(),
    });

    collect(&main_checkin, result, next_children)
}

/// Blocks on the main engine's checkin cell and translates its upcall.
///
/// `carried` are children already known to the driver (restarted this round)
/// that belong in the next outstanding set alongside whatever the upcall
/// brings.
fn collect<T>(
    checkin: &CheckinCell,
    result: Cell<T>,
    mut carried: Vec<CheckinCell>,
) -> EngineResult<T> {
    match checkin.read() {
        CheckinMessage::Finished { children } => {
            carried.extend(children);
            debug!(outstanding = carried.len(), "engine tree ready");
            EngineResult::Ready(ReadyEngine {
                result,
                children: carried,
            })
        }
        CheckinMessage::FuelExhausted { restart, children } => {
            carried.extend(children);
            debug!(outstanding = carried.len(), "engine tree stalled");
            EngineResult::Stalled(StalledEngine {
                restart,
                result,
                outstanding: carried,
            })
        }
    }
}

/// Splits `total` into `recipients` near-equal shares.
///
/// Integer division with the remainder going to the earliest recipients, and
/// a floor of one unit per share. `recipients` is always at least one (the
/// main engine).
fn fair_shares(total: Fuel, recipients: usize) -> Vec<Fuel> {
    let n = recipients as u64;
    let base = total.units() / n;
    let remainder = total.units() % n;
    let shares: Vec<Fuel> = (0..n)
        .map(|i| Fuel::new((base + u64::from(i < remainder)).max(1)))
        .collect();
    debug!(
        total = total.units(),
        recipients, base, remainder, "fuel split computed"
    );
    shares
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // fair_shares
    // =========================================================================

    fn units(shares: &[Fuel]) -> Vec<u64> {
        shares.iter().map(|f| f.units()).collect()
    }

    #[test]
    fn fair_shares_divides_evenly() {
        assert_eq!(units(&fair_shares(Fuel::new(9), 3)), vec![3, 3, 3]);
    }

    #[test]
    fn fair_shares_gives_remainder_to_first() {
        assert_eq!(units(&fair_shares(Fuel::new(10), 3)), vec![4, 3, 3]);
        assert_eq!(units(&fair_shares(Fuel::new(11), 3)), vec![4, 4, 3]);
    }

    #[test]
    fn fair_shares_floors_at_one() {
        // Two units over three recipients: the floor mints a third unit.
        assert_eq!(units(&fair_shares(Fuel::new(2), 3)), vec![1, 1, 1]);
        assert_eq!(units(&fair_shares(Fuel::ZERO, 2)), vec![1, 1]);
    }

    #[test]
    fn fair_shares_single_recipient_takes_all() {
        assert_eq!(units(&fair_shares(Fuel::new(7), 1)), vec![7]);
    }

    // =========================================================================
    // start / resume basics (scenario-level coverage lives in tests/)
    // =========================================================================

    #[test]
    fn sufficient_fuel_runs_to_ready() {
        let result = start(Fuel::new(5), |cx| {
            for _ in 0..5 {
                cx.tick();
            }
            "done"
        });

        let ready = result.ready().expect("5 ticks fit a 5-unit budget");
        assert_eq!(ready.value(), "done");
        assert_eq!(ready.outstanding_children(), 0);
    }

    #[test]
    fn insufficient_fuel_stalls() {
        let result = start(Fuel::new(3), |cx| {
            for _ in 0..5 {
                cx.tick();
            }
        });

        let stalled = result.stalled().expect("5 ticks overrun a 3-unit budget");
        assert_eq!(stalled.outstanding_children(), 0);
    }

    #[test]
    fn zero_fuel_stalls_at_first_checkpoint() {
        let result = start(Fuel::ZERO, |cx| {
            cx.tick();
            1
        });
        assert!(result.is_stalled());
    }

    #[test]
    fn resume_finishes_a_stalled_root() {
        let stalled = start(Fuel::new(3), |cx| {
            for _ in 0..5 {
                cx.tick();
            }
            21
        })
        .stalled()
        .expect("3 < 5");

        let ready = resume(Fuel::new(2), stalled)
            .ready()
            .expect("2 more units finish the remaining 2 ticks");
        assert_eq!(ready.value(), 21);
    }
}
