//! The cross-thread dispatch queue and wakeup fabric.
//!
//! Any thread may enqueue work closures or post wakeups; the playloop thread
//! drains them in [`Dispatch::process`], which is the loop's only blocking
//! point. A wakeup posted at any time before the next `process` call
//! guarantees that call returns without sleeping its full budget.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::context::PlayerContext;

/// Work executed on the playloop thread with exclusive context access.
pub type Work = Box<dyn FnOnce(&mut PlayerContext) + Send + 'static>;

enum Msg {
    Run(Work),
    Wake,
}

pub(crate) struct Dispatch {
    tx: Sender<Msg>,
    rx: Receiver<Msg>,
}

impl Dispatch {
    pub(crate) fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub(crate) fn handle(&self) -> WakeupHandle {
        WakeupHandle {
            tx: self.tx.clone(),
        }
    }

    /// Wake the playloop. Idempotent; pending wakeups coalesce into a single
    /// early return from the next `process`.
    pub(crate) fn interrupt(&self) {
        let _ = self.tx.send(Msg::Wake);
    }

    /// Drain pending work, then block up to `timeout` seconds (infinity means
    /// until woken) or until an interrupt arrives.
    pub(crate) fn process(&self, pc: &mut PlayerContext, timeout: f64) {
        let mut interrupted = false;
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                Msg::Run(work) => work(pc),
                Msg::Wake => interrupted = true,
            }
        }
        if interrupted || timeout <= 0.0 {
            return;
        }

        let first = if timeout.is_finite() {
            match self.rx.recv_timeout(secs_to_duration(timeout)) {
                Ok(msg) => msg,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return,
            }
        } else {
            // Never disconnects: we hold a sender ourselves.
            match self.rx.recv() {
                Ok(msg) => msg,
                Err(_) => return,
            }
        };

        // Whatever arrived ends the sleep; run it and drain stragglers so
        // the loop starts its next iteration with an empty queue.
        if let Msg::Run(work) = first {
            work(pc);
        }
        while let Ok(msg) = self.rx.try_recv() {
            if let Msg::Run(work) = msg {
                work(pc);
            }
        }
    }
}

// Sleeps are capped at an hour; a spurious wakeup just re-arms the budget.
const MAX_SLEEP: f64 = 3600.0;

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_SLEEP))
        .unwrap_or(Duration::from_secs(MAX_SLEEP as u64))
}

/// A clonable handle other threads use to reach the playloop. Collaborators
/// hold this instead of any reference to the context itself.
#[derive(Clone)]
pub struct WakeupHandle {
    tx: Sender<Msg>,
}

impl WakeupHandle {
    /// Cause the playloop to run another iteration. Safe from any thread.
    pub fn wakeup(&self) {
        let _ = self.tx.send(Msg::Wake);
    }

    /// Enqueue work to run on the playloop thread with exclusive access to
    /// the player context. Implies a wakeup.
    pub fn run<F>(&self, f: F)
    where
        F: FnOnce(&mut PlayerContext) + Send + 'static,
    {
        let _ = self.tx.send(Msg::Run(Box::new(f)));
    }
}
