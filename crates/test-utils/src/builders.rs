#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::anyhow;
use dagflow::{task_fn, DataFlowKernel, Executor, TaskFn, Value};
use serde_json::json;

use crate::fake_executor::FakeExecutor;

/// Task returning a fixed value, ignoring its arguments.
pub fn const_task(value: Value) -> TaskFn {
    task_fn(move |_call| Ok(value.clone()))
}

/// Task returning its first positional argument unchanged (or the first
/// `inputs` element when no positional argument is given).
pub fn identity_task() -> TaskFn {
    task_fn(|call| {
        call.args
            .first()
            .or_else(|| call.inputs.first())
            .cloned()
            .ok_or_else(|| anyhow!("identity task called without arguments"))
    })
}

/// Task returning its first positional integer argument plus one.
pub fn add_one_task() -> TaskFn {
    task_fn(|call| {
        let n = call
            .args
            .first()
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow!("expected an integer argument"))?;
        Ok(json!(n + 1))
    })
}

/// Task summing every integer in its positional args and `inputs`.
pub fn sum_task() -> TaskFn {
    task_fn(|call| {
        let sum: i64 = call
            .args
            .iter()
            .chain(call.inputs.iter())
            .filter_map(Value::as_i64)
            .sum();
        Ok(json!(sum))
    })
}

/// Task that always fails with the given message.
pub fn failing_task(message: &str) -> TaskFn {
    let message = message.to_string();
    task_fn(move |_call| Err(anyhow!("{message}")))
}

/// Kernel over a single unmanaged executor registered under `site`.
pub fn kernel_with(site: &str, executor: Arc<dyn Executor>) -> DataFlowKernel {
    let mut executors: BTreeMap<String, Arc<dyn Executor>> = BTreeMap::new();
    executors.insert(site.to_string(), executor);
    DataFlowKernel::builder()
        .executors(executors)
        .rundir(std::env::temp_dir().join("dagflow-tests"))
        .build()
        .expect("kernel construction failed")
}

/// Kernel over a single fresh [`FakeExecutor`] at site `"local"`, returning
/// the executor too so tests can inspect what ran.
pub fn fake_kernel() -> (DataFlowKernel, Arc<FakeExecutor>) {
    let executor = Arc::new(FakeExecutor::new());
    let kernel = kernel_with("local", executor.clone());
    (kernel, executor)
}
