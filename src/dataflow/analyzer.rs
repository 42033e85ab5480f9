// src/dataflow/analyzer.rs

//! Dependency extraction from a submission envelope.

use tracing::trace;

use crate::handle::DepRef;
use crate::types::{Arg, Call, TaskId};

/// Walk a submission's positional args, keyword values, and `inputs` list
/// (in that order) and collect every handle found. The returned count covers
/// only handles that have not yet settled; a dependency that is already
/// settled at submit time costs nothing to wait for.
///
/// The walk is shallow on purpose: a handle buried inside a literal JSON
/// container is not a dependency, and will surface as a type mismatch when
/// the function runs. Callers who need deeper wiring declare it explicitly
/// via `inputs`.
pub(crate) fn count_all_deps(task_id: TaskId, call: &Call) -> (usize, Vec<DepRef>) {
    let mut depends = Vec::new();
    let mut count = 0;

    let mut note = |dep: &DepRef| {
        let settled = dep.done();
        trace!(task = task_id, dep = dep.tid(), settled, "dependency found");
        if !settled {
            count += 1;
        }
        depends.push(dep.clone());
    };

    for arg in &call.args {
        if let Arg::Handle(dep) = arg {
            note(dep);
        }
    }

    for arg in call.kwargs.values() {
        if let Arg::Handle(dep) = arg {
            note(dep);
        }
    }

    for dep in &call.inputs {
        note(dep);
    }

    (count, depends)
}
