// src/dataflow/resolver.rs

//! "Sanitize and wrap": substitute settled handles with their values.

use std::sync::Arc;

use tracing::warn;

use crate::errors::TaskError;
use crate::handle::{DepRef, Outcome};
use crate::types::{Arg, Call, ResolvedCall, TaskId, Value};

/// Build the resolved argument set for a task whose dependencies have all
/// settled. Handles in args, keyword values, and `inputs` are replaced by
/// their settled values; errors from failed dependencies are collected.
///
/// Dependencies are read through `resolve_dep`, which the kernel backs with
/// the lock-protected task table so resolution agrees with the scheduling
/// decision that triggered it.
///
/// This never fails: it always returns the resolved structure plus the list
/// of upstream errors. The caller launches only when that list is empty.
pub(crate) fn sanitize_and_wrap<F>(
    task_id: TaskId,
    call: &Call,
    resolve_dep: F,
) -> (ResolvedCall, Vec<Arc<TaskError>>)
where
    F: Fn(&DepRef) -> Option<Outcome>,
{
    let mut failures = Vec::new();

    let mut substitute = |dep: &DepRef| -> Value {
        match resolve_dep(dep) {
            Some(Ok(value)) => value,
            Some(Err(error)) => {
                failures.push(error);
                Value::Null
            }
            None => {
                // Callers promote a task only once every dependency has
                // settled; an unsettled handle here is a scheduler defect.
                warn!(
                    task = task_id,
                    dep = dep.tid(),
                    "unsettled dependency during resolution"
                );
                Value::Null
            }
        }
    };

    let args = call
        .args
        .iter()
        .map(|arg| match arg {
            Arg::Lit(value) => value.clone(),
            Arg::Handle(dep) => substitute(dep),
        })
        .collect();

    let kwargs = call
        .kwargs
        .iter()
        .map(|(key, arg)| {
            let value = match arg {
                Arg::Lit(value) => value.clone(),
                Arg::Handle(dep) => substitute(dep),
            };
            (key.clone(), value)
        })
        .collect();

    let inputs = call.inputs.iter().map(&mut substitute).collect();

    let resolved = ResolvedCall {
        args,
        kwargs,
        inputs,
        walltime: call.walltime,
    };
    (resolved, failures)
}
