// src/exec/backend.rs

//! Pluggable executor contract.
//!
//! An executor accepts a task function plus its resolved arguments and
//! returns an [`ExecHandle`] immediately; it settles that handle from its
//! own context once the function has run. Everything else the kernel needs
//! from an executor is lifecycle: scale-in support (queried at teardown via
//! the execution provider's resource list) and shutdown.

use crate::handle::ExecHandle;
use crate::types::{ResolvedCall, TaskFn};

/// Enumerates the resources backing a scaling-enabled executor; the kernel
/// scales in by the resource count at teardown.
pub trait ExecutionProvider: Send + Sync {
    fn resources(&self) -> Vec<String>;
}

/// An opaque submit-a-callable service.
pub trait Executor: Send + Sync {
    /// Start the task and return a handle that will settle with its outcome.
    /// Must not block on the task itself.
    fn submit(&self, func: TaskFn, call: ResolvedCall) -> ExecHandle;

    /// Whether this executor participates in scale-in at kernel teardown.
    fn scaling_enabled(&self) -> bool {
        false
    }

    /// The provider backing a scaling-enabled executor, if any.
    fn execution_provider(&self) -> Option<&dyn ExecutionProvider> {
        None
    }

    /// Release `n` resources. Only meaningful when scaling is enabled.
    fn scale_in(&self, _n: usize) {}

    /// Stop accepting work and release the executor's resources. Submitting
    /// after shutdown settles the returned handle with an execution error.
    fn shutdown(&self);
}
