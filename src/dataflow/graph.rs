// src/dataflow/graph.rs

//! Dependency edges between task ids.
//!
//! Edge direction: producer -> dependent. The graph is acyclic by
//! construction: a handle must already exist to be named as an input, and
//! task ids are monotonic, so every edge points from a lower id to a higher
//! one. No cycle check is needed.
//!
//! The completion sweep uses [`TaskGraph::dependents_of`] as a reverse
//! index: only tasks that depend on a completing task can become runnable at
//! that completion, so the sweep touches those instead of the whole table.

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

use crate::types::TaskId;

#[derive(Debug, Default)]
pub struct TaskGraph {
    graph: DiGraphMap<TaskId, ()>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, task_id: TaskId) {
        self.graph.add_node(task_id);
    }

    /// Record that `dependent` consumes a handle produced by `producer`.
    pub fn add_dependency(&mut self, producer: TaskId, dependent: TaskId) {
        self.graph.add_edge(producer, dependent, ());
    }

    /// Tasks whose handles this task consumes.
    pub fn dependencies_of(&self, task_id: TaskId) -> Vec<TaskId> {
        if !self.graph.contains_node(task_id) {
            return Vec::new();
        }
        self.graph
            .neighbors_directed(task_id, Direction::Incoming)
            .collect()
    }

    /// Tasks that consume this task's handle.
    pub fn dependents_of(&self, task_id: TaskId) -> Vec<TaskId> {
        if !self.graph.contains_node(task_id) {
            return Vec::new();
        }
        self.graph
            .neighbors_directed(task_id, Direction::Outgoing)
            .collect()
    }

    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }
}
