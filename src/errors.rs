// src/errors.rs

//! Crate-wide error types and aliases.
//!
//! Two distinct families live here:
//!
//! - [`KernelError`] covers construction-time and configuration problems
//!   (bad TOML, IO, invariant violations). These surface through `Result`
//!   returns in the usual way.
//! - [`TaskError`] is the outcome of a task that did not produce a value.
//!   Task errors surface exclusively through handle settlement and are
//!   shared as `Arc<TaskError>`, since a single upstream failure is observed
//!   by every downstream handle that depended on it.

use std::sync::Arc;

use thiserror::Error;

use crate::types::TaskId;

/// Why a task settled with an error instead of a value.
#[derive(Debug, Error)]
pub enum TaskError {
    /// One or more upstream dependencies settled with an error, so this
    /// task's function was never invoked.
    #[error("task {tid}: {} upstream dependency error(s)", errors.len())]
    Dependency {
        tid: TaskId,
        errors: Vec<Arc<TaskError>>,
    },

    /// The executor ran the task's function and it failed (or panicked, or
    /// exceeded its advisory walltime).
    #[error("task execution failed: {source}")]
    Execution {
        #[source]
        source: anyhow::Error,
    },

    /// The task requested sites with no match in the executor registry.
    #[error("task {tid}: no executor matches requested sites {requested:?}")]
    Routing {
        tid: TaskId,
        requested: Vec<String>,
    },
}

impl TaskError {
    /// Wrap an arbitrary execution failure.
    pub fn execution(source: impl Into<anyhow::Error>) -> Self {
        TaskError::Execution {
            source: source.into(),
        }
    }

    /// The upstream errors bundled into a dependency failure, if any.
    pub fn upstream(&self) -> &[Arc<TaskError>] {
        match self {
            TaskError::Dependency { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Errors from kernel construction and configuration handling.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Structurally impossible with a monotonic task counter; kept as a
    /// defensive invariant check on task-table insertion.
    #[error("duplicate task id {0}")]
    DuplicateTask(TaskId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, KernelError>;
