// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [globals]
/// lazyFail = true
/// fail_retries = 2
/// rundir = "runinfo"
///
/// [executor.local]
/// kind = "thread-pool"
/// max_workers = 4
/// ```
///
/// Explicit kernel-builder options always override what the file says.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Global behaviour from `[globals]`.
    #[serde(default)]
    pub globals: GlobalsSection,

    /// Executor-factory sections from `[executor.<site>]`, keyed by site
    /// name. Consumed opaquely by the executor factory.
    #[serde(default)]
    pub executor: BTreeMap<String, ExecutorConfig>,
}

/// `[globals]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalsSection {
    /// Failure policy: record failures on handles and keep scheduling
    /// (default), or surface the first failure in the completion path.
    #[serde(default = "default_lazy_fail", rename = "lazyFail")]
    pub lazy_fail: bool,

    /// Re-launch attempts granted to each task on executor-reported failure.
    #[serde(default = "default_fail_retries")]
    pub fail_retries: u32,

    /// Base directory for per-run directories; `runinfo` if unset.
    #[serde(default)]
    pub rundir: Option<PathBuf>,
}

fn default_lazy_fail() -> bool {
    true
}

fn default_fail_retries() -> u32 {
    2
}

impl Default for GlobalsSection {
    fn default() -> Self {
        Self {
            lazy_fail: default_lazy_fail(),
            fail_retries: default_fail_retries(),
            rundir: None,
        }
    }
}

/// Which executor implementation a `[executor.<site>]` section describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorKind {
    ThreadPool,
}

/// `[executor.<site>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    pub kind: ExecutorKind,

    /// Worker threads for a thread-pool executor.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_max_workers() -> usize {
    4
}
