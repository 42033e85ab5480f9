// src/rundir.rs

//! Per-session run directories.
//!
//! Each kernel gets `base/runNNN` with a monotonically increasing NNN,
//! scanned from what already exists under `base`. Collaborators put their
//! logs there; the scheduler core writes no state of its own.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::errors::Result;

/// Allocate the next `runNNN` directory under `base`, creating `base` first
/// if needed.
pub fn make_rundir(base: impl AsRef<Path>) -> Result<PathBuf> {
    let base = base.as_ref();
    fs::create_dir_all(base)
        .with_context(|| format!("creating run-directory base '{}'", base.display()))?;

    let next = next_run_number(base)?;
    let rundir = base.join(format!("run{next:03}"));
    fs::create_dir(&rundir)
        .with_context(|| format!("creating run directory '{}'", rundir.display()))?;

    debug!(rundir = %rundir.display(), "run directory created");
    Ok(rundir)
}

fn next_run_number(base: &Path) -> Result<u32> {
    let mut highest = None;

    for entry in fs::read_dir(base)
        .with_context(|| format!("listing run-directory base '{}'", base.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        let Some(number) = name
            .to_str()
            .and_then(|s| s.strip_prefix("run"))
            .and_then(|s| s.parse::<u32>().ok())
        else {
            continue;
        };
        highest = Some(highest.map_or(number, |h: u32| h.max(number)));
    }

    Ok(highest.map_or(0, |h| h + 1))
}
