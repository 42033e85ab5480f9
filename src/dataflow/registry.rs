// src/dataflow/registry.rs

//! Executor registry and site selection.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::{IndexedRandom, IteratorRandom};
use tracing::{debug, warn};

use crate::errors::TaskError;
use crate::exec::Executor;
use crate::types::{SiteSpec, TaskId};

/// Maps site names to executors. Built once at kernel construction and
/// immutable afterwards, so selection needs no locking.
pub struct ExecutorRegistry {
    executors: BTreeMap<String, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    pub fn from_map(executors: BTreeMap<String, Arc<dyn Executor>>) -> Self {
        Self { executors }
    }

    pub fn get(&self, site: &str) -> Option<Arc<dyn Executor>> {
        self.executors.get(site).cloned()
    }

    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.executors.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Executor>)> {
        self.executors.iter().map(|(name, ex)| (name.as_str(), ex))
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    /// Pick an executor for a task: uniformly at random from the whole
    /// registry for [`SiteSpec::Any`], or from the intersection of the
    /// requested sites with the registry otherwise. An empty intersection is
    /// a permanent routing failure for the task.
    pub fn select(
        &self,
        task_id: TaskId,
        sites: &SiteSpec,
    ) -> std::result::Result<(String, Arc<dyn Executor>), TaskError> {
        match sites {
            SiteSpec::Any => self
                .executors
                .iter()
                .choose(&mut rand::rng())
                .map(|(name, executor)| (name.clone(), executor.clone()))
                .ok_or_else(|| {
                    warn!(task = task_id, "site selection with an empty registry");
                    TaskError::Routing {
                        tid: task_id,
                        requested: Vec::new(),
                    }
                }),
            SiteSpec::Named(requested) => {
                let candidates: Vec<&String> = requested
                    .iter()
                    .filter(|site| self.executors.contains_key(*site))
                    .collect();

                match candidates.choose(&mut rand::rng()) {
                    Some(site) => {
                        let name = (*site).clone();
                        debug!(task = task_id, site = %name, "site selected");
                        let executor = self.executors[&name].clone();
                        Ok((name, executor))
                    }
                    None => {
                        warn!(
                            task = task_id,
                            ?requested,
                            "requested sites have no match in the registry"
                        );
                        Err(TaskError::Routing {
                            tid: task_id,
                            requested: requested.clone(),
                        })
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("sites", &self.executors.keys().collect::<Vec<_>>())
            .finish()
    }
}
