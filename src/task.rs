//! Fire-and-forget task launch.
//!
//! Engines and their relays run on detached OS threads. Nothing joins them:
//! completion and suspension are reported through [`Cell`](crate::cell::Cell)
//! writes, and an abandoned stalled tree deliberately leaks its blocked
//! threads (see the cell module docs on leaks).

use std::thread;

/// Launches `task` on a detached, named thread.
///
/// Failing to spawn a thread would silently lose an engine, so it is treated
/// as fatal.
pub(crate) fn fork(name: &str, task: impl FnOnce() + Send + 'static) {
    thread::Builder::new()
        .name(name.to_owned())
        .spawn(task)
        .expect("failed to fork engine thread");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    #[test]
    fn forked_task_runs_detached() {
        let done = Cell::new();
        let writer = done.clone();
        fork("stoker-test", move || writer.write(true));
        assert!(done.read());
    }
}
