// src/lib.rs

//! `dagflow`: a dependency-aware dataflow task kernel.
//!
//! Submissions may name handles from earlier submissions as arguments; the
//! kernel tracks the resulting dependency graph, launches each task exactly
//! once onto a pluggable executor when all of its inputs have resolved,
//! propagates failures along dependency edges, and returns a handle that
//! settles with the task's eventual outcome.
//!
//! ```text
//! User             |       Kernel       |    Executor
//! ---------------------------------------------------------
//!       task ------+-> submit           |
//!     handle <-----+--|                 |
//!                  |  dependencies met  |
//!                  |        task -------+--> submit
//!                  |      handle <------+----|
//! ```
//!
//! ```no_run
//! use dagflow::{Call, DataFlowKernel, ThreadPoolExecutor};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # fn main() -> dagflow::Result<()> {
//! let kernel = DataFlowKernel::builder()
//!     .executor("local", Arc::new(ThreadPoolExecutor::new("local", 4)?))
//!     .build()?;
//!
//! let double = kernel.app(|call| {
//!     let n = call.args[0].as_i64().unwrap_or(0);
//!     Ok(json!(n * 2))
//! });
//!
//! let a = double.invoke(Call::new().arg(json!(21)));
//! let b = double.invoke(Call::new().arg(&a));
//! assert_eq!(b.result().unwrap(), json!(84));
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod dataflow;
pub mod errors;
pub mod exec;
pub mod handle;
pub mod logging;
pub mod rundir;
pub mod types;

mod usage;

use std::path::Path;

pub use crate::app::App;
pub use crate::dataflow::{DataFlowKernel, DataFlowKernelBuilder, StatusCounts, TaskStatus};
pub use crate::errors::{KernelError, Result, TaskError};
pub use crate::exec::{ExecutionProvider, Executor, ThreadPoolExecutor};
pub use crate::handle::{AppHandle, DataHandle, DepRef, ExecHandle, Outcome};
pub use crate::types::{task_fn, Arg, Call, ResolvedCall, SiteSpec, TaskFn, TaskId, Value};

/// Build a kernel straight from a TOML config file: load, validate, and
/// construct managed executors from its `[executor.<site>]` sections.
pub fn kernel_from_config_path(path: impl AsRef<Path>) -> Result<DataFlowKernel> {
    let config = config::load_and_validate(path)?;
    DataFlowKernel::builder().config(config).build()
}
