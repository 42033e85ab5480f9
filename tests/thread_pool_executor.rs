// tests/thread_pool_executor.rs
//
// The real local executor: parallel completion, error capture, advisory
// walltime, shutdown behaviour.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use dagflow::{task_fn, Call, DataFlowKernel, Executor, TaskError, ThreadPoolExecutor};
use dagflow_test_utils::builders::{add_one_task, sum_task};
use dagflow_test_utils::{init_tracing, result_within};

fn pool_kernel(max_workers: usize) -> DataFlowKernel {
    let executor = ThreadPoolExecutor::new("local", max_workers).expect("executor");
    DataFlowKernel::builder()
        .executor("local", Arc::new(executor))
        .fail_retries(0)
        .rundir(std::env::temp_dir().join("dagflow-tests"))
        .build()
        .expect("kernel construction failed")
}

#[test]
fn round_trip_through_worker_threads() {
    init_tracing();

    let kernel = pool_kernel(2);
    let handle = kernel.submit(add_one_task(), Call::new().arg(json!(41)));

    assert_eq!(
        result_within(&handle, Duration::from_secs(5)).unwrap(),
        json!(42)
    );
}

#[test]
fn many_independent_tasks_settle() {
    init_tracing();

    let kernel = pool_kernel(8);
    let handles: Vec<_> = (0..100)
        .map(|i| kernel.submit(add_one_task(), Call::new().arg(json!(i))))
        .collect();

    for (i, handle) in handles.iter().enumerate() {
        assert_eq!(
            result_within(handle, Duration::from_secs(10)).unwrap(),
            json!(i as i64 + 1)
        );
    }
}

#[test]
fn chains_resolve_across_worker_threads() {
    init_tracing();

    let kernel = pool_kernel(4);

    let a = kernel.submit(task_fn(|_call| Ok(json!(1))), Call::new());
    let b = kernel.submit(add_one_task(), Call::new().arg(&a));
    let c = kernel.submit(add_one_task(), Call::new().arg(&b));
    let d = kernel.submit(sum_task(), Call::new().input(&b).input(&c));

    assert_eq!(result_within(&d, Duration::from_secs(5)).unwrap(), json!(5));
}

#[test]
fn task_errors_are_captured() {
    init_tracing();

    let kernel = pool_kernel(2);
    let handle = kernel.submit(
        task_fn(|_call| Err(anyhow::anyhow!("worker-side failure"))),
        Call::new(),
    );

    let error = result_within(&handle, Duration::from_secs(5)).unwrap_err();
    assert!(matches!(*error, TaskError::Execution { .. }));
    assert!(error.to_string().contains("worker-side failure"));
}

#[test]
fn task_panics_become_execution_errors() {
    init_tracing();

    let kernel = pool_kernel(2);
    let handle = kernel.submit(
        task_fn(|_call| panic!("task blew up")),
        Call::new(),
    );

    let error = result_within(&handle, Duration::from_secs(5)).unwrap_err();
    assert!(matches!(*error, TaskError::Execution { .. }));
}

#[test]
fn walltime_overrun_fails_the_task() {
    init_tracing();

    let kernel = pool_kernel(2);
    let handle = kernel.submit(
        task_fn(|_call| {
            std::thread::sleep(Duration::from_secs(5));
            Ok(json!("too late"))
        }),
        Call::new().walltime(Duration::from_millis(50)),
    );

    let error = result_within(&handle, Duration::from_secs(5)).unwrap_err();
    assert!(error.to_string().contains("walltime"));
}

#[test]
fn submit_after_shutdown_settles_with_an_error() {
    init_tracing();

    let executor = ThreadPoolExecutor::new("local", 2).expect("executor");
    executor.shutdown();

    let handle = executor.submit(add_one_task(), dagflow::ResolvedCall::default());
    let error = handle.wait().unwrap_err();
    assert!(error.to_string().contains("shut down"));
}
