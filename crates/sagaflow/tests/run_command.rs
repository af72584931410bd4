use std::fs;

use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

macro_rules! sagaflow {
    () => {
        assert_cmd::cargo::cargo_bin_cmd!("sagaflow")
    };
}

fn write_event(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write event");
    path
}

#[test]
fn approved_order_completes_and_is_persisted() {
    let dir = TempDir::new().expect("create temp dir");
    let event = write_event(
        &dir,
        "event.json",
        r#"{"type": "OrderPlaced", "payload": {"order_id": "A-1", "amount_cents": 1200, "approved": true}}"#,
    );

    sagaflow!()
        .args(["run", "--id", "order-1", "--event"])
        .arg(&event)
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(contains("Run order-1 of saga 'order' completed (SUCCESS)"))
        .stdout(contains("✓ ship_order"))
        .stdout(contains("\"shipped\": true"));

    assert!(
        dir.path()
            .join(".sagaflow/states/order/order-1.json")
            .exists()
    );
}

#[test]
fn unapproved_order_read_from_stdin_suspends() {
    let dir = TempDir::new().expect("create temp dir");

    sagaflow!()
        .args(["run", "--id", "order-2"])
        .write_stdin(r#"{"type": "OrderPlaced", "payload": {"order_id": "A-2", "amount_cents": 300}}"#)
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(contains("suspended (SUSPENDED)"))
        .stdout(contains("⏸ await_approval"));
}

#[test]
fn declined_order_is_accepted_as_compensated() {
    let dir = TempDir::new().expect("create temp dir");

    sagaflow!()
        .args(["run", "--id", "order-3"])
        .write_stdin(
            r#"{"type": "OrderPlaced", "payload": {"order_id": "A-3", "amount_cents": 250000}}"#,
        )
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(contains("accepted (COMPENSATED)"))
        .stdout(contains("↩ undo reserve_inventory"))
        .stdout(contains("payment of 250000 cents declined"));
}

#[test]
fn declined_order_fails_with_fail_fast_config() {
    let dir = TempDir::new().expect("create temp dir");
    fs::write(
        dir.path().join("sagaflow.toml"),
        "[saga]\nfail_fast_on_error = true\n",
    )
    .expect("write config");

    sagaflow!()
        .args(["run", "--id", "order-4"])
        .write_stdin(
            r#"{"type": "OrderPlaced", "payload": {"order_id": "A-4", "amount_cents": 250000}}"#,
        )
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(contains("error: run 'order-4' of saga 'order' ended COMPENSATED"))
        .stderr(contains(
            "caused by: business error: payment of 250000 cents declined",
        ));
}

#[test]
fn store_dir_comes_from_config() {
    let dir = TempDir::new().expect("create temp dir");
    fs::write(dir.path().join("custom.toml"), "[store]\ndir = \"runs\"\n").expect("write config");

    sagaflow!()
        .args(["--config", "custom.toml", "run", "--id", "order-5"])
        .write_stdin(r#"{"type": "OrderPlaced", "payload": {"order_id": "A-5"}}"#)
        .current_dir(dir.path())
        .assert()
        .success();

    assert!(dir.path().join("runs/order/order-5.json").exists());
    assert!(!dir.path().join(".sagaflow").exists());
}

#[test]
fn unexpected_event_type_is_rejected() {
    let dir = TempDir::new().expect("create temp dir");

    sagaflow!()
        .arg("run")
        .write_stdin(r#"{"type": "OrderCancelled", "payload": {}}"#)
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(contains("is started by 'OrderPlaced' events, got 'OrderCancelled'"));
}

#[test]
fn malformed_event_reports_cause_chain() {
    let dir = TempDir::new().expect("create temp dir");

    sagaflow!()
        .arg("run")
        .write_stdin("{ not json")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(contains("error: failed to parse trigger message"))
        .stderr(contains("caused by:"));
}

#[test]
fn invalid_config_is_reported_before_running() {
    let dir = TempDir::new().expect("create temp dir");
    fs::write(dir.path().join("sagaflow.toml"), "[store]\nfolder = 1\n").expect("write config");

    sagaflow!()
        .arg("run")
        .write_stdin(r#"{"type": "OrderPlaced", "payload": {"order_id": "A-6"}}"#)
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(contains("error: failed to load configuration"))
        .stderr(contains("caused by: failed to parse config file").and(contains("sagaflow.toml")));
}

#[test]
fn rerunning_an_existing_id_is_rejected() {
    let dir = TempDir::new().expect("create temp dir");
    let event = r#"{"type": "OrderPlaced", "payload": {"order_id": "A-7", "amount_cents": 300}}"#;

    sagaflow!()
        .args(["run", "--id", "order-7"])
        .write_stdin(event)
        .current_dir(dir.path())
        .assert()
        .success();

    sagaflow!()
        .args(["run", "--id", "order-7"])
        .write_stdin(event)
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(contains("already has a run with id 'order-7'"));
}
