//! Integration tests for suspending, persisting and resuming runs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use sagaflow_saga::{
    Action, CompensateAction, MemoryStateStore, Saga, SagaError, Start, StateDefinition,
    StateDefinitions, StateStore, StepAction, Status,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Approval {
    approved: bool,
    shipped: bool,
}

struct Calls {
    reserve: AtomicU32,
    approve: AtomicU32,
    ship: AtomicU32,
}

fn approval_saga(calls: &Arc<Calls>) -> anyhow::Result<StateDefinitions<Approval>> {
    let reserve = Arc::clone(calls);
    let approve = Arc::clone(calls);
    let ship = Arc::clone(calls);
    Ok(StateDefinitions::builder("approval", "OrderPlaced")
        .start(|_| Ok(Start::new("reserve", Approval::default())))
        .step(StateDefinition::new(
            "reserve",
            move |approval: Approval, action: &mut StepAction<Approval>| {
                reserve.reserve.fetch_add(1, Ordering::SeqCst);
                action.next("await_approval", approval);
            },
        ))
        .step(StateDefinition::new(
            "await_approval",
            move |approval: Approval, action: &mut StepAction<Approval>| {
                approve.approve.fetch_add(1, Ordering::SeqCst);
                if approval.approved {
                    action.next("ship", approval);
                } else {
                    action.stop(approval);
                }
            },
        ))
        .step(StateDefinition::new(
            "ship",
            move |mut approval: Approval, action: &mut StepAction<Approval>| {
                ship.ship.fetch_add(1, Ordering::SeqCst);
                approval.shipped = true;
                action.end(approval);
            },
        ))
        .build()?)
}

fn new_calls() -> Arc<Calls> {
    Arc::new(Calls {
        reserve: AtomicU32::new(0),
        approve: AtomicU32::new(0),
        ship: AtomicU32::new(0),
    })
}

#[test]
fn stop_persists_suspended_state() -> anyhow::Result<()> {
    let calls = new_calls();
    let store = Arc::new(MemoryStateStore::new());
    let saga = Saga::new(Arc::new(approval_saga(&calls)?)).with_store(store.clone());

    let state = saga.start("order-1", json!({"order": 1}))?;

    assert_eq!(state.status(), Status::Suspended);
    assert_eq!(state.action(), Action::Stop);
    let record = store.get("approval", "order-1")?;
    assert_eq!(record.status(), Status::Suspended);
    assert_eq!(record.steps(), state.steps());
    assert_eq!(record.cursor(), state.cursor());
    assert_eq!(record.payload(), &serde_json::to_value(state.payload())?);
    Ok(())
}

#[test]
fn persisted_record_restores_identical_trace() -> anyhow::Result<()> {
    let calls = new_calls();
    let store = Arc::new(MemoryStateStore::new());
    let saga = Saga::new(Arc::new(approval_saga(&calls)?)).with_store(store.clone());
    let suspended = saga.start("order-1", json!({}))?;

    let text = serde_json::to_string(&store.get("approval", "order-1")?)?;
    let restored = serde_json::from_str::<sagaflow_saga::StateRecord>(&text)?
        .map_payload(serde_json::from_value::<Approval>)?;

    assert_eq!(restored, suspended);
    Ok(())
}

#[test]
fn resume_continues_without_rerunning_completed_steps() -> anyhow::Result<()> {
    let calls = new_calls();
    let store = Arc::new(MemoryStateStore::new());
    let saga = Saga::new(Arc::new(approval_saga(&calls)?)).with_store(store.clone());
    saga.start("order-1", json!({}))?;

    let state = saga.resume_with("order-1", Some(json!({"approved": true, "shipped": false})))?;

    assert_eq!(state.status(), Status::Success);
    assert!(state.payload().shipped);
    assert_eq!(calls.reserve.load(Ordering::SeqCst), 1);
    assert_eq!(calls.approve.load(Ordering::SeqCst), 2);
    assert_eq!(calls.ship.load(Ordering::SeqCst), 1);
    assert_eq!(state.steps().len(), 3);
    assert_eq!(store.get("approval", "order-1")?.status(), Status::Success);
    Ok(())
}

#[test]
fn resume_without_new_data_suspends_again() -> anyhow::Result<()> {
    let calls = new_calls();
    let store = Arc::new(MemoryStateStore::new());
    let saga = Saga::new(Arc::new(approval_saga(&calls)?)).with_store(store);
    let first = saga.start("order-1", json!({}))?;

    let second = saga.resume("order-1")?;

    assert_eq!(second.status(), Status::Suspended);
    assert_eq!(second.steps(), first.steps());
    assert_eq!(second.cursor(), first.cursor());
    Ok(())
}

#[test]
fn resume_of_unknown_id_is_not_found() -> anyhow::Result<()> {
    let calls = new_calls();
    let saga = Saga::new(Arc::new(approval_saga(&calls)?))
        .with_store(Arc::new(MemoryStateStore::new()));

    let result = saga.resume("missing");

    assert!(matches!(result, Err(SagaError::NotFound { ref id, .. }) if id == "missing"));
    Ok(())
}

#[test]
fn resume_of_finished_run_is_rejected() -> anyhow::Result<()> {
    let calls = new_calls();
    let saga = Saga::new(Arc::new(approval_saga(&calls)?))
        .with_store(Arc::new(MemoryStateStore::new()));
    saga.start("order-1", json!({}))?;
    saga.resume_with("order-1", Some(json!({"approved": true, "shipped": false})))?;

    let result = saga.resume("order-1");

    assert!(matches!(
        result,
        Err(SagaError::AlreadyFinished {
            status: Status::Success,
            ..
        })
    ));
    Ok(())
}

#[test]
fn resume_without_store_is_rejected() -> anyhow::Result<()> {
    let calls = new_calls();
    let saga = Saga::new(Arc::new(approval_saga(&calls)?));

    let result = saga.resume("order-1");

    assert!(matches!(result, Err(SagaError::PersistenceDisabled(_))));
    Ok(())
}

#[test]
fn in_memory_resume_works_without_store() -> anyhow::Result<()> {
    let calls = new_calls();
    let saga = Saga::new(Arc::new(approval_saga(&calls)?));
    let suspended = saga.start("order-1", json!({}))?;
    let approved = suspended.map_payload(|mut approval| {
        approval.approved = true;
        Ok::<_, std::convert::Infallible>(approval)
    })?;

    let state = saga.resume_state(approved)?;

    assert_eq!(state.status(), Status::Success);
    assert_eq!(calls.reserve.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn resume_against_changed_registry_reports_step_not_found() -> anyhow::Result<()> {
    let calls = new_calls();
    let store = Arc::new(MemoryStateStore::new());
    Saga::new(Arc::new(approval_saga(&calls)?))
        .with_store(store.clone())
        .start("order-1", json!({}))?;

    let trimmed = StateDefinitions::builder("approval", "OrderPlaced")
        .start(|_| Ok(Start::new("reserve", Approval::default())))
        .step(StateDefinition::new(
            "reserve",
            |approval: Approval, action: &mut StepAction<Approval>| action.end(approval),
        ))
        .build()?;
    let result = Saga::new(Arc::new(trimmed)).with_store(store).resume("order-1");

    assert!(matches!(
        result,
        Err(SagaError::StepNotFound { ref step, .. }) if step == "await_approval"
    ));
    Ok(())
}

#[test]
fn suspension_during_compensation_resumes_unwinding() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStateStore::new());
    let definitions = StateDefinitions::builder("refund", "RefundRequested")
        .start(|_| Ok(Start::new("debit", Approval::default())))
        .step(
            StateDefinition::new(
                "debit",
                |approval: Approval, action: &mut StepAction<Approval>| {
                    action.next("credit", approval);
                },
            )
            .compensate_with(
                |approval: Approval, action: &mut CompensateAction<Approval>| {
                    if approval.approved {
                        action.back(approval);
                    } else {
                        action.stop(approval);
                    }
                },
            ),
        )
        .step(StateDefinition::new(
            "credit",
            |approval: Approval, action: &mut StepAction<Approval>| {
                action.compensate("account closed", approval);
            },
        ))
        .build()?;
    let saga = Saga::new(Arc::new(definitions)).with_store(store);

    let suspended = saga.start("refund-1", json!({}))?;
    assert_eq!(suspended.status(), Status::Suspended);
    assert!(suspended.is_compensating());
    assert_eq!(suspended.cursor(), 0);

    let state = saga.resume_with("refund-1", Some(json!({"approved": true, "shipped": false})))?;

    assert_eq!(state.status(), Status::Compensated);
    assert_eq!(state.steps().len(), 3);
    assert_eq!(state.cursor(), -1);
    Ok(())
}

#[test]
fn start_with_existing_id_keeps_stored_run() -> anyhow::Result<()> {
    let calls = new_calls();
    let store = Arc::new(MemoryStateStore::new());
    let saga = Saga::new(Arc::new(approval_saga(&calls)?)).with_store(store.clone());
    let suspended = saga.start("order-1", json!({}))?;

    let result = saga.start("order-1", json!({"order": 2}));

    assert!(matches!(
        result,
        Err(SagaError::AlreadyExists { ref id, .. }) if id == "order-1"
    ));
    assert_eq!(calls.reserve.load(Ordering::SeqCst), 1);
    let record = store.get("approval", "order-1")?;
    assert_eq!(record.status(), Status::Suspended);
    assert_eq!(record.steps(), suspended.steps());
    Ok(())
}

#[test]
fn resume_keeps_suspended_step_until_it_runs_again() -> anyhow::Result<()> {
    let calls = new_calls();
    let saga = Saga::new(Arc::new(approval_saga(&calls)?));
    let suspended = saga.start("order-1", json!({}))?;
    let before = suspended.steps().to_vec();

    let again = saga.resume_state(suspended)?;

    assert_eq!(again.steps(), before.as_slice());
    assert_eq!(again.steps()[1].status, Status::Suspended);
    assert_eq!(calls.approve.load(Ordering::SeqCst), 2);
    Ok(())
}
