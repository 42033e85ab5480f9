// src/exec/factory.rs

//! Executor construction from `[executor.<site>]` config sections.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::model::{ConfigFile, ExecutorKind};
use crate::errors::Result;
use crate::exec::backend::Executor;
use crate::exec::thread_pool::ThreadPoolExecutor;

/// Build one executor per `[executor.<site>]` section, keyed by site name.
pub fn executors_from_config(cfg: &ConfigFile) -> Result<BTreeMap<String, Arc<dyn Executor>>> {
    let mut executors: BTreeMap<String, Arc<dyn Executor>> = BTreeMap::new();

    for (site, section) in cfg.executor.iter() {
        let executor: Arc<dyn Executor> = match section.kind {
            ExecutorKind::ThreadPool => {
                Arc::new(ThreadPoolExecutor::new(site.clone(), section.max_workers)?)
            }
        };
        debug!(site = %site, kind = ?section.kind, "executor constructed");
        executors.insert(site.clone(), executor);
    }

    Ok(executors)
}
