// tests/config_rundir.rs
//
// Config parsing/validation and run-directory allocation.

use std::time::Duration;

use serde_json::json;

use dagflow::config::{load_and_validate, load_from_path, ConfigFile};
use dagflow::rundir::make_rundir;
use dagflow::{kernel_from_config_path, Call, KernelError};
use dagflow_test_utils::builders::add_one_task;
use dagflow_test_utils::{init_tracing, result_within};

#[test]
fn config_defaults_apply() {
    init_tracing();

    let cfg: ConfigFile = toml::from_str(
        r#"
        [executor.local]
        kind = "thread-pool"
        "#,
    )
    .expect("parse failed");

    assert!(cfg.globals.lazy_fail);
    assert_eq!(cfg.globals.fail_retries, 2);
    assert_eq!(cfg.executor["local"].max_workers, 4);
}

#[test]
fn config_globals_parse() {
    init_tracing();

    let cfg: ConfigFile = toml::from_str(
        r#"
        [globals]
        lazyFail = false
        fail_retries = 5
        rundir = "sessions"

        [executor.cpu]
        kind = "thread-pool"
        max_workers = 2

        [executor.io]
        kind = "thread-pool"
        max_workers = 8
        "#,
    )
    .expect("parse failed");

    assert!(!cfg.globals.lazy_fail);
    assert_eq!(cfg.globals.fail_retries, 5);
    assert_eq!(cfg.globals.rundir.as_deref().unwrap().to_str(), Some("sessions"));
    assert_eq!(cfg.executor.len(), 2);
}

#[test]
fn validation_rejects_configs_without_executors() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("empty.toml");
    std::fs::write(&path, "[globals]\nfail_retries = 1\n").expect("write");

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, KernelError::Config(_)));
}

#[test]
fn validation_rejects_zero_workers() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("zero.toml");
    std::fs::write(
        &path,
        "[executor.local]\nkind = \"thread-pool\"\nmax_workers = 0\n",
    )
    .expect("write");

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, KernelError::Config(_)));
}

#[test]
fn missing_config_file_is_an_io_error() {
    init_tracing();

    let err = load_from_path("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, KernelError::Io(_)));
}

#[test]
fn kernel_built_from_config_file_runs_tasks() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dagflow.toml");
    let rundir_base = dir.path().join("runinfo");
    std::fs::write(
        &path,
        format!(
            r#"
            [globals]
            rundir = "{}"

            [executor.local]
            kind = "thread-pool"
            max_workers = 2
            "#,
            rundir_base.display()
        ),
    )
    .expect("write");

    let kernel = kernel_from_config_path(&path).expect("kernel from config");
    assert!(kernel.rundir().starts_with(&rundir_base));

    let handle = kernel.submit(add_one_task(), Call::new().arg(json!(41)));
    assert_eq!(
        result_within(&handle, Duration::from_secs(5)).unwrap(),
        json!(42)
    );
    kernel.cleanup();
}

#[test]
fn rundirs_number_monotonically() {
    init_tracing();

    let base = tempfile::tempdir().expect("tempdir");

    let first = make_rundir(base.path()).expect("first rundir");
    let second = make_rundir(base.path()).expect("second rundir");

    assert_eq!(first.file_name().unwrap(), "run000");
    assert_eq!(second.file_name().unwrap(), "run001");
}

#[test]
fn rundir_numbering_resumes_after_existing_runs() {
    init_tracing();

    let base = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(base.path().join("run007")).expect("seed dir");
    std::fs::write(base.path().join("notes.txt"), "ignored").expect("seed file");

    let next = make_rundir(base.path()).expect("rundir");
    assert_eq!(next.file_name().unwrap(), "run008");
}
