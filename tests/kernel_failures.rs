// tests/kernel_failures.rs
//
// Failure propagation: dependency errors, routing errors, lazy vs eager
// failure policy.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use dagflow::{Call, DataFlowKernel, TaskError, TaskStatus};
use dagflow_test_utils::builders::{const_task, failing_task, identity_task};
use dagflow_test_utils::fake_executor::FakeExecutor;
use dagflow_test_utils::{init_tracing, result_within};

fn kernel_no_retries() -> (DataFlowKernel, Arc<FakeExecutor>) {
    let executor = Arc::new(FakeExecutor::new());
    let kernel = DataFlowKernel::builder()
        .executor("local", executor.clone())
        .fail_retries(0)
        .rundir(std::env::temp_dir().join("dagflow-tests"))
        .build()
        .expect("kernel construction failed");
    (kernel, executor)
}

#[test]
fn downstream_of_failure_settles_with_dependency_error() {
    init_tracing();

    let (kernel, executor) = kernel_no_retries();

    let a = kernel.submit(failing_task("boom"), Call::new());
    let b = kernel.submit(identity_task(), Call::new().arg(&a));

    let error = result_within(&b, Duration::from_secs(1)).unwrap_err();
    match &*error {
        TaskError::Dependency { tid, errors } => {
            assert_eq!(*tid, b.tid());
            assert_eq!(errors.len(), 1);
            assert!(errors[0].to_string().contains("boom"));
        }
        other => panic!("expected a dependency error, got {other}"),
    }

    // Only the failing task ever reached the executor.
    assert_eq!(executor.submit_count(), 1);
    assert_eq!(kernel.task_status(a.tid()), Some(TaskStatus::Failed));
    assert_eq!(kernel.task_status(b.tid()), Some(TaskStatus::DepFailed));
}

#[test]
fn dependency_failure_propagates_transitively() {
    init_tracing();

    let (kernel, executor) = kernel_no_retries();

    let a = kernel.submit(failing_task("root failure"), Call::new());
    let b = kernel.submit(identity_task(), Call::new().arg(&a));
    let c = kernel.submit(identity_task(), Call::new().arg(&b));

    let error = result_within(&c, Duration::from_secs(1)).unwrap_err();
    let upstream = error.upstream();
    assert_eq!(upstream.len(), 1);
    assert!(matches!(*upstream[0], TaskError::Dependency { .. }));

    assert_eq!(executor.submit_count(), 1);
}

#[test]
fn submit_with_already_failed_dependency_fails_without_launching() {
    init_tracing();

    let (kernel, executor) = kernel_no_retries();

    let a = kernel.submit(failing_task("early"), Call::new());
    assert!(a.done());

    // The dependency is settled (with an error) at submit time, so the task
    // is dependency-failed synchronously and its function never runs.
    let b = kernel.submit(identity_task(), Call::new().arg(&a));
    assert!(b.done());
    assert!(matches!(
        *b.result().unwrap_err(),
        TaskError::Dependency { .. }
    ));
    assert_eq!(executor.submit_count(), 1);
}

#[test]
fn gathering_multiple_failures_reports_them_all() {
    init_tracing();

    let (kernel, _executor) = kernel_no_retries();

    let a = kernel.submit(failing_task("first"), Call::new());
    let b = kernel.submit(failing_task("second"), Call::new());
    let c = kernel.submit(identity_task(), Call::new().input(&a).input(&b));

    let error = result_within(&c, Duration::from_secs(1)).unwrap_err();
    let messages: Vec<String> = error.upstream().iter().map(|e| e.to_string()).collect();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().any(|m| m.contains("first")));
    assert!(messages.iter().any(|m| m.contains("second")));
}

#[test]
fn unmatched_sites_settle_with_routing_error() {
    init_tracing();

    let (kernel, executor) = kernel_no_retries();

    let handle = kernel.submit(const_task(json!(1)), Call::new().site("gpu"));

    let error = result_within(&handle, Duration::from_secs(1)).unwrap_err();
    match &*error {
        TaskError::Routing { tid, requested } => {
            assert_eq!(*tid, handle.tid());
            assert_eq!(requested, &vec!["gpu".to_string()]);
        }
        other => panic!("expected a routing error, got {other}"),
    }
    assert_eq!(executor.submit_count(), 0);
}

#[test]
fn intersecting_sites_run_normally() {
    init_tracing();

    let (kernel, _executor) = kernel_no_retries();

    let handle = kernel.submit(
        const_task(json!(11)),
        Call::new().sites(["gpu", "local"]),
    );
    assert_eq!(
        result_within(&handle, Duration::from_secs(1)).unwrap(),
        json!(11)
    );
}

#[test]
fn independent_tasks_keep_running_after_a_failure() {
    init_tracing();

    let (kernel, _executor) = kernel_no_retries();

    let _failed = kernel.submit(failing_task("one bad apple"), Call::new());
    let ok = kernel.submit(const_task(json!(42)), Call::new());

    assert_eq!(
        result_within(&ok, Duration::from_secs(1)).unwrap(),
        json!(42)
    );
}

#[test]
fn eager_fail_still_settles_pending_dependents() {
    init_tracing();

    let executor = Arc::new(dagflow_test_utils::fake_executor::ManualExecutor::new());
    let kernel = DataFlowKernel::builder()
        .executor(
            "local",
            executor.clone() as Arc<dyn dagflow::Executor>,
        )
        .lazy_fail(false)
        .fail_retries(0)
        .rundir(std::env::temp_dir().join("dagflow-tests"))
        .build()
        .expect("kernel construction failed");

    let a = kernel.submit(const_task(json!(1)), Call::new());
    let b = kernel.submit(identity_task(), Call::new().arg(&a));
    assert_eq!(kernel.task_status(b.tid()), Some(TaskStatus::Pending));

    // The failure re-raises in the completion path, but only after the
    // sweep has settled the dependents; a caller catching it still sees a
    // consistent kernel.
    let raised = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        executor.fail_next("fatal")
    }));
    assert!(raised.is_err());

    assert_eq!(kernel.task_status(a.tid()), Some(TaskStatus::Failed));
    assert_eq!(kernel.task_status(b.tid()), Some(TaskStatus::DepFailed));
    assert!(matches!(
        *result_within(&b, Duration::from_secs(1)).unwrap_err(),
        TaskError::Dependency { .. }
    ));
}

#[test]
#[should_panic(expected = "lazy-fail disabled")]
fn eager_fail_surfaces_in_the_completion_path() {
    init_tracing();

    let executor = Arc::new(FakeExecutor::new());
    let kernel = DataFlowKernel::builder()
        .executor("local", executor)
        .lazy_fail(false)
        .fail_retries(0)
        .rundir(std::env::temp_dir().join("dagflow-tests"))
        .build()
        .expect("kernel construction failed");

    // The executor completes synchronously, so the failure is re-raised
    // inside this submit call.
    kernel.submit(failing_task("fatal"), Call::new());
}
