// src/handle/data.rs

//! Derived handles for declared output files.
//!
//! A data handle settles when its parent task handle settles: with the
//! output's path (as a JSON string) on success, or with the parent's error.
//! Data handles are valid dependencies, so a downstream task can wait on a
//! produced file rather than on the producing task's return value.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::handle::app::AppHandle;
use crate::handle::cell::Outcome;
use crate::types::{TaskId, Value};

struct DataInner {
    parent: AppHandle,
    path: PathBuf,
}

#[derive(Clone)]
pub struct DataHandle {
    inner: Arc<DataInner>,
}

impl DataHandle {
    pub(crate) fn new(parent: AppHandle, path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DataInner {
                parent,
                path: path.into(),
            }),
        }
    }

    /// The declared output path.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Id of the producing task.
    pub fn tid(&self) -> TaskId {
        self.inner.parent.tid()
    }

    /// The task handle this output derives from.
    pub fn parent(&self) -> &AppHandle {
        &self.inner.parent
    }

    pub fn done(&self) -> bool {
        self.inner.parent.done()
    }

    pub fn peek(&self) -> Option<Outcome> {
        self.inner.parent.peek().map(|o| self.map_outcome(o))
    }

    /// Block until the producing task settles; returns this output's path or
    /// re-raises the producer's error.
    pub fn result(&self) -> Outcome {
        self.map_outcome(self.inner.parent.result())
    }

    /// Register a completion callback on the producing task; receives this
    /// handle's mapped outcome.
    pub fn add_done_callback<F>(&self, callback: F)
    where
        F: FnOnce(&Outcome) + Send + 'static,
    {
        let this = self.clone();
        self.inner
            .parent
            .add_done_callback(move |outcome| callback(&this.map_outcome(outcome.clone())));
    }

    pub(crate) fn map_outcome(&self, outcome: Outcome) -> Outcome {
        outcome.map(|_| Value::String(self.inner.path.to_string_lossy().into_owned()))
    }
}

impl std::fmt::Debug for DataHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataHandle")
            .field("tid", &self.tid())
            .field("path", &self.inner.path)
            .field("done", &self.done())
            .finish()
    }
}
