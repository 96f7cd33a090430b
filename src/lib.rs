//! Stoker: fuel-limited cooperative scheduling for parallel computations.
//!
//! # Overview
//!
//! Stoker runs a tree of parallel computations under a strict, externally
//! imposed budget of work units — *fuel* — per scheduling quantum. When the
//! budget runs out, the whole tree suspends into an inspectable checkpoint;
//! the driver can later inject more fuel and the tree resumes exactly where
//! it stalled, transitively across arbitrarily nested spawned children.
//!
//! Fuel is consumed only at explicit checkpoints placed by the computation
//! author; there is no instruction-level preemption. All coordination flows
//! through single-assignment blocking cells — there is no shared mutable
//! state and no hidden global scheduler.
//!
//! # Core Guarantees
//!
//! - **Quantum-budget transparency**: the final value of a computation is
//!   independent of how its fuel is partitioned over time
//! - **One upcall per quantum**: every engine reports to its current parent
//!   exactly once per quantum, as `Finished` or `FuelExhausted`
//! - **Single-writer cells**: every coordination cell has exactly one writer
//!   that writes exactly once; a double write is a defect, not a condition
//! - **No starvation on resume**: injected fuel splits evenly over all
//!   blocked threads with a floor of one unit each
//! - **Chase, don't block**: awaiting a stalled future suspends the *reader*
//!   through its own parent, so the driver always has somewhere to put fuel
//!
//! # Module Structure
//!
//! - [`fuel`]: the `Fuel` budget type
//! - [`cell`]: single-assignment, blocking-read cells
//! - [`protocol`]: checkin (upcall) and restart (downcall) messages
//! - [`cx`]: the engine context — `tick`, `yield_now`, `spawn`, `wait`
//! - [`future`]: engine futures with one stall indirection per quantum
//! - [`driver`]: `start` and `resume`, draining and fair fuel splitting
//! - [`tracing_compat`]: optional structured logging shim
//!
//! # Example
//!
//! ```
//! use stoker::{start, resume, Fuel};
//!
//! // A computation that needs five checkpoints' worth of fuel.
//! let run = |cx: &mut stoker::EngineCx| {
//!     for _ in 0..5 {
//!         cx.tick();
//!     }
//!     "done"
//! };
//!
//! // Three units are not enough: the tree checkpoints instead of finishing.
//! let stalled = start(Fuel::new(3), run).stalled().expect("3 < 5");
//!
//! // Two more units finish it, with the same value a one-shot run returns.
//! let ready = resume(Fuel::new(2), stalled).ready().expect("3 + 2 = 5");
//! assert_eq!(ready.value(), "done");
//! ```
//!
//! # Abandonment
//!
//! There is no cancellation and no timeout. A stalled tree stays quiescent
//! until it is resumed; dropping its checkpoint leaks the blocked threads
//! behind it. That trade is deliberate and is the caller's to manage.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

pub mod cell;
pub mod cx;
pub mod driver;
pub mod fuel;
pub mod future;
pub mod protocol;
mod task;
pub mod tracing_compat;

// Re-exports for convenient access to the library surface
pub use cell::{Cell, DoubleWrite};
pub use cx::EngineCx;
pub use driver::{resume, start, EngineResult, ReadyEngine, StalledEngine};
pub use fuel::Fuel;
pub use future::{EngineFuture, FutureState};
pub use protocol::{CheckinCell, CheckinMessage, RestartMessage};
