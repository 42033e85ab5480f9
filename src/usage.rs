// src/usage.rs

//! Session usage telemetry.
//!
//! One event when a kernel session starts and one when it is cleaned up,
//! carrying uptime and the terminal-state breakdown. Emitted as structured
//! tracing events; nothing leaves the process.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::dataflow::task::StatusCounts;

pub(crate) struct UsageTracker {
    started: Instant,
}

impl UsageTracker {
    pub(crate) fn new(rundir: &Path) -> Self {
        info!(rundir = %rundir.display(), "session started");
        Self {
            started: Instant::now(),
        }
    }

    /// The final event, sent exactly once from kernel cleanup.
    pub(crate) fn send_final(&self, counts: &StatusCounts) {
        info!(
            uptime_secs = self.started.elapsed().as_secs(),
            tasks = counts.total(),
            done = counts.done,
            failed = counts.failed,
            dep_failed = counts.dep_failed,
            "session finished"
        );
    }
}
