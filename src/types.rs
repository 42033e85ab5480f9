// src/types.rs

//! Core value and submission types shared across the crate.
//!
//! Arguments travel through the kernel as a typed envelope: positional args
//! and keyword args hold either a literal [`Value`] or a handle to a prior
//! submission, and `inputs` is an explicit dependency list. The dependency
//! analyzer only ever inspects the top level of this envelope; handles hidden
//! inside a literal JSON container are deliberately not discovered.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::handle::{AppHandle, DataHandle, DepRef};

/// Task result/argument payload. JSON values keep the envelope homogeneous
/// without forcing user functions into a single concrete record type.
pub type Value = serde_json::Value;

/// Monotonically increasing per-kernel task identifier.
pub type TaskId = u64;

/// A user task: consumes its resolved arguments, produces a value or fails.
pub type TaskFn = Arc<dyn Fn(ResolvedCall) -> anyhow::Result<Value> + Send + Sync>;

/// Convenience for building a [`TaskFn`] from a closure.
pub fn task_fn<F>(f: F) -> TaskFn
where
    F: Fn(ResolvedCall) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Which executor sites a task may run on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SiteSpec {
    /// Any registered executor; one is picked uniformly at random.
    #[default]
    Any,
    /// A non-empty list of site names; one is picked uniformly at random
    /// from the intersection with the registry.
    Named(Vec<String>),
}

/// A positional or keyword argument: a literal, or a handle whose settled
/// value is substituted before launch.
#[derive(Debug, Clone)]
pub enum Arg {
    Lit(Value),
    Handle(DepRef),
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Lit(value)
    }
}

impl From<DepRef> for Arg {
    fn from(dep: DepRef) -> Self {
        Arg::Handle(dep)
    }
}

impl From<AppHandle> for Arg {
    fn from(handle: AppHandle) -> Self {
        Arg::Handle(DepRef::App(handle))
    }
}

impl From<&AppHandle> for Arg {
    fn from(handle: &AppHandle) -> Self {
        Arg::Handle(DepRef::App(handle.clone()))
    }
}

impl From<DataHandle> for Arg {
    fn from(handle: DataHandle) -> Self {
        Arg::Handle(DepRef::Data(handle))
    }
}

impl From<&DataHandle> for Arg {
    fn from(handle: &DataHandle) -> Self {
        Arg::Handle(DepRef::Data(handle.clone()))
    }
}

/// A submission envelope: the function's arguments as provided by the user,
/// handles not yet substituted, plus the kernel-consumed keywords.
#[derive(Debug, Clone, Default)]
pub struct Call {
    pub args: Vec<Arg>,
    pub kwargs: BTreeMap<String, Arg>,
    /// Explicitly declared dependencies, resolved and passed to the function
    /// as `inputs`.
    pub inputs: Vec<DepRef>,
    /// Output file specifiers; the app surface mints one data handle each.
    pub outputs: Vec<PathBuf>,
    /// Captured onto the app handle for user inspection.
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
    /// Advisory; enforced only by executors that honor it.
    pub walltime: Option<Duration>,
    pub sites: SiteSpec,
}

impl Call {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, arg: impl Into<Arg>) -> Self {
        self.kwargs.insert(key.into(), arg.into());
        self
    }

    pub fn input(mut self, dep: impl Into<DepRef>) -> Self {
        self.inputs.push(dep.into());
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(path.into());
        self
    }

    pub fn stdout(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    pub fn stderr(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr = Some(path.into());
        self
    }

    pub fn walltime(mut self, limit: Duration) -> Self {
        self.walltime = Some(limit);
        self
    }

    /// Restrict the task to a single named site.
    pub fn site(mut self, name: impl Into<String>) -> Self {
        self.sites = SiteSpec::Named(vec![name.into()]);
        self
    }

    /// Restrict the task to a list of named sites.
    pub fn sites<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sites = SiteSpec::Named(names.into_iter().map(Into::into).collect());
        self
    }
}

/// A [`Call`] with every handle substituted by its settled value. This is
/// what executors hand to the task function.
#[derive(Debug, Clone, Default)]
pub struct ResolvedCall {
    pub args: Vec<Value>,
    pub kwargs: BTreeMap<String, Value>,
    pub inputs: Vec<Value>,
    pub walltime: Option<Duration>,
}
