use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use mts_command::{CommandKind, FunctionRead, FunctionVoid, FunctionWrite};
use mts_core::ExecutionResult;

use crate::connect::{connect, disconnect};
use crate::error::{ConnectError, InterfaceError};
use crate::provided::ProvidedInterface;
use crate::required::{RequiredInterface, Requirement};

fn counter_interface(total: Arc<AtomicUsize>) -> Arc<ProvidedInterface> {
    let provided = ProvidedInterface::new("server", "Main");
    let sink = total.clone();
    provided
        .add_command_write("Add", move |value: &usize| {
            sink.fetch_add(*value, Ordering::SeqCst);
            ExecutionResult::Succeeded
        })
        .expect("add Add");
    provided
        .add_command_read("Get", move |out: &mut usize| {
            *out = total.load(Ordering::SeqCst);
            ExecutionResult::Succeeded
        })
        .expect("add Get");
    provided
}

#[test]
fn functions_bind_to_same_named_commands() {
    let total = Arc::new(AtomicUsize::new(0));
    let provided = counter_interface(total.clone());

    let required = RequiredInterface::new("client", "Uses", Requirement::Mandatory);
    let add = FunctionWrite::<usize>::new();
    let get = FunctionRead::<usize>::new();
    required.add_function("Add", &add).unwrap();
    required.add_function("Get", &get).unwrap();

    connect(&required, &provided).expect("connect");
    assert!(required.is_connected());
    assert_eq!(required.connected_to().as_deref(), Some("server.Main"));
    assert_eq!(provided.clients(), vec!["client.Uses".to_owned()]);

    assert_eq!(add.execute(&3), ExecutionResult::Succeeded);
    let mut out = 0;
    assert_eq!(get.execute(&mut out), ExecutionResult::Succeeded);
    assert_eq!(out, 3);
    assert_eq!(total.load(Ordering::SeqCst), 3);
}

#[test]
fn missing_mandatory_command_fails() {
    let provided = counter_interface(Arc::new(AtomicUsize::new(0)));
    let required = RequiredInterface::new("client", "Uses", Requirement::Mandatory);
    let add = FunctionWrite::<usize>::new();
    let reset = FunctionVoid::new();
    required.add_function("Add", &add).unwrap();
    required.add_function("Reset", &reset).unwrap();

    let err = connect(&required, &provided).unwrap_err();
    assert_eq!(
        err,
        ConnectError::MissingCommand {
            function: "Reset".into(),
            provided: "server.Main".into(),
        }
    );
    assert!(!required.is_connected());
    assert!(!add.is_valid());
    assert!(provided.clients().is_empty());
}

#[test]
fn optional_function_may_stay_unbound() {
    let provided = counter_interface(Arc::new(AtomicUsize::new(0)));
    let required = RequiredInterface::new("client", "Uses", Requirement::Mandatory);
    let add = FunctionWrite::<usize>::new();
    let reset = FunctionVoid::new();
    required.add_function("Add", &add).unwrap();
    required.add_optional_function("Reset", &reset).unwrap();

    connect(&required, &provided).expect("connect");
    assert!(add.is_valid());
    assert!(!reset.is_valid());
    assert_eq!(reset.execute(), ExecutionResult::FunctionNotBound);
}

#[test]
fn prototype_mismatch_fails_the_whole_connection() {
    let provided = counter_interface(Arc::new(AtomicUsize::new(0)));
    let required = RequiredInterface::new("client", "Uses", Requirement::Mandatory);
    let add = FunctionWrite::<f64>::new();
    let get = FunctionRead::<usize>::new();
    required.add_function("Add", &add).unwrap();
    required.add_function("Get", &get).unwrap();

    match connect(&required, &provided) {
        Err(ConnectError::PrototypeMismatch { name, .. }) => assert_eq!(name, "Add"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!add.is_valid());
    assert!(!get.is_valid());
}

#[test]
fn kind_mismatch_is_reported() {
    let provided = counter_interface(Arc::new(AtomicUsize::new(0)));
    let required = RequiredInterface::new("client", "Uses", Requirement::Mandatory);
    let add = FunctionVoid::new();
    required.add_function("Add", &add).unwrap();

    match connect(&required, &provided) {
        Err(ConnectError::KindMismatch {
            expected, found, ..
        }) => {
            assert_eq!(expected, CommandKind::Void);
            assert_eq!(found, CommandKind::Write);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn connect_twice_and_disconnect() {
    let provided = counter_interface(Arc::new(AtomicUsize::new(0)));
    let required = RequiredInterface::new("client", "Uses", Requirement::Mandatory);
    let add = FunctionWrite::<usize>::new();
    required.add_function("Add", &add).unwrap();

    connect(&required, &provided).unwrap();
    assert_eq!(
        connect(&required, &provided),
        Err(ConnectError::AlreadyConnected("client.Uses".into()))
    );

    disconnect(&required).unwrap();
    assert!(!required.is_connected());
    assert!(!add.is_valid());
    assert_eq!(add.execute(&1), ExecutionResult::FunctionNotBound);
    assert!(provided.clients().is_empty());
    assert_eq!(
        disconnect(&required),
        Err(ConnectError::NotConnected("client.Uses".into()))
    );

    connect(&required, &provided).expect("reconnect");
    assert!(add.is_valid());
}

#[test]
fn disabled_command_never_runs() {
    let total = Arc::new(AtomicUsize::new(0));
    let provided = counter_interface(total.clone());
    let required = RequiredInterface::new("client", "Uses", Requirement::Mandatory);
    let add = FunctionWrite::<usize>::new();
    required.add_function("Add", &add).unwrap();
    connect(&required, &provided).unwrap();

    provided.disable_command("Add").unwrap();
    assert_eq!(add.execute(&5), ExecutionResult::Disabled);
    assert_eq!(total.load(Ordering::SeqCst), 0);

    provided.enable_command("Add").unwrap();
    assert_eq!(add.execute(&5), ExecutionResult::Succeeded);
    assert_eq!(total.load(Ordering::SeqCst), 5);

    assert_eq!(
        provided.disable_command("Nope"),
        Err(InterfaceError::UnknownCommand {
            interface: "server.Main".into(),
            name: "Nope".into(),
        })
    );
}

#[test]
fn duplicate_names_are_rejected() {
    let provided = counter_interface(Arc::new(AtomicUsize::new(0)));
    assert!(matches!(
        provided.add_command_void("Add", || ExecutionResult::Succeeded),
        Err(InterfaceError::DuplicateCommand { .. })
    ));

    let required = RequiredInterface::new("client", "Uses", Requirement::Mandatory);
    let add = FunctionWrite::<usize>::new();
    required.add_function("Add", &add).unwrap();
    assert!(matches!(
        required.add_function("Add", &add),
        Err(InterfaceError::DuplicateFunction { .. })
    ));
}

#[test]
fn event_handlers_observe_triggers_until_disconnect() {
    let provided = ProvidedInterface::new("server", "Main");
    let changed = provided.add_event_write::<i32>("Changed").unwrap();
    let tick = provided.add_event_void("Tick").unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let probe = seen.clone();
    let ticks = Arc::new(AtomicUsize::new(0));
    let tick_probe = ticks.clone();

    let required = RequiredInterface::new("client", "Listens", Requirement::Optional);
    required
        .add_event_handler_write::<i32, _>(
            "Changed",
            move |value: &i32| {
                probe.lock().push(*value);
                ExecutionResult::Succeeded
            },
            false,
        )
        .unwrap();
    required
        .add_event_handler_void(
            "Tick",
            move || {
                tick_probe.fetch_add(1, Ordering::SeqCst);
                ExecutionResult::Succeeded
            },
            false,
        )
        .unwrap();

    connect(&required, &provided).unwrap();
    assert_eq!(changed.observer_count(), 1);
    assert_eq!(changed.trigger(&5), ExecutionResult::Succeeded);
    assert_eq!(tick.trigger(), ExecutionResult::Succeeded);
    assert_eq!(*seen.lock(), vec![5]);
    assert_eq!(ticks.load(Ordering::SeqCst), 1);

    disconnect(&required).unwrap();
    assert_eq!(changed.observer_count(), 0);
    assert_eq!(tick.observer_count(), 0);
    assert_eq!(changed.trigger(&6), ExecutionResult::Succeeded);
    assert_eq!(*seen.lock(), vec![5]);
}

#[test]
fn event_payload_mismatch_fails() {
    let provided = ProvidedInterface::new("server", "Main");
    provided.add_event_write::<i32>("Changed").unwrap();

    let required = RequiredInterface::new("client", "Listens", Requirement::Optional);
    required
        .add_event_handler_write::<f64, _>("Changed", |_: &f64| ExecutionResult::Succeeded, false)
        .unwrap();

    assert!(matches!(
        connect(&required, &provided),
        Err(ConnectError::PrototypeMismatch { .. })
    ));
}
