use std::time::Duration;

use mts_command::{FunctionVoid, Instance};
use mts_core::{ComponentState, ExecutionResult, TraceRecord};

use super::{recording_hook, Idle};
use crate::config::{ManagerConfig, TaskConfig};
use crate::error::{ConnectError, ManagerError};
use crate::manager::{ComponentManager, ConnectionRecord};
use crate::task::Task;

fn quick_manager() -> ComponentManager {
    ComponentManager::new(
        ManagerConfig::builder()
            .process_name("bench")
            .wait_timeout(Duration::from_millis(500))
            .build(),
    )
}

fn server() -> Task {
    let mut task = Task::new(
        TaskConfig::periodic("server", Duration::from_millis(2)),
        Instance::new(Idle),
    );
    task.add_provided_interface("Main")
        .unwrap()
        .add_command_void("Ping", || ExecutionResult::Succeeded)
        .unwrap();
    task
}

fn client(ping: &FunctionVoid) -> Task {
    let mut task = Task::new(
        TaskConfig::periodic("client", Duration::from_millis(2)),
        Instance::new(Idle),
    );
    task.add_required_interface("Uses")
        .unwrap()
        .add_function("Ping", ping)
        .unwrap();
    task
}

#[test]
fn duplicate_components_are_rejected() {
    let mut manager = quick_manager();
    manager.add_component(server()).unwrap();
    assert!(matches!(
        manager.add_component(server()),
        Err(ManagerError::DuplicateComponent(name)) if name == "server"
    ));
    assert_eq!(manager.component_names(), vec!["server".to_owned()]);
}

#[test]
fn connect_validates_endpoints() {
    let ping = FunctionVoid::new();
    let mut manager = quick_manager();
    manager.add_component(server()).unwrap();
    manager.add_component(client(&ping)).unwrap();

    assert!(matches!(
        manager.connect("elsewhere", "client", "Uses", "bench", "server", "Main"),
        Err(ManagerError::Connect(ConnectError::UnknownProcess(p))) if p == "elsewhere"
    ));
    assert!(matches!(
        manager.connect_local("ghost", "Uses", "server", "Main"),
        Err(ManagerError::Connect(ConnectError::UnknownComponent(c))) if c == "ghost"
    ));
    assert!(matches!(
        manager.connect_local("client", "Uses", "server", "Other"),
        Err(ManagerError::Connect(ConnectError::UnknownInterface { .. }))
    ));
    assert!(manager.connections().is_empty());
    assert!(!ping.is_valid());
}

#[test]
fn start_all_times_out_on_unconnected_component() {
    let ping = FunctionVoid::new();
    let mut manager = quick_manager();
    manager.add_component(server()).unwrap();
    manager.add_component(client(&ping)).unwrap();

    manager.create_all().unwrap();
    assert!(matches!(
        manager.start_all(),
        Err(ManagerError::Timeout {
            component,
            state: ComponentState::Ready,
        }) if component == "client"
    ));
    assert!(manager.cleanup());
}

#[test]
fn drives_every_component_through_its_lifecycle() {
    let (hook, records) = recording_hook();
    let ping = FunctionVoid::new();
    let mut manager = quick_manager().with_trace_hook(hook);
    manager.add_component(server()).unwrap();
    manager.add_component(client(&ping)).unwrap();

    manager
        .connect_local("client", "Uses", "server", "Main")
        .unwrap();
    assert_eq!(
        manager.connections(),
        &[ConnectionRecord {
            client: "client".into(),
            required: "Uses".into(),
            server: "server".into(),
            provided: "Main".into(),
        }]
    );
    assert_eq!(manager.connections()[0].to_string(), "client.Uses -> server.Main");

    manager.create_all().unwrap();
    manager.start_all().unwrap();
    assert!(manager.wait_for_state_all(ComponentState::Active, Duration::from_secs(1)));
    assert_eq!(ping.execute_blocking(), ExecutionResult::Succeeded);

    assert!(manager.cleanup());
    assert!(manager
        .states()
        .iter()
        .all(|(_, state)| *state == ComponentState::Finished));

    let records = records.lock();
    assert!(records.iter().any(|record| matches!(
        record,
        TraceRecord::Connected { client, .. } if client == "client"
    )));
    let finished = records
        .iter()
        .filter(|record| {
            matches!(
                record,
                TraceRecord::StateChange {
                    to: ComponentState::Finished,
                    ..
                }
            )
        })
        .count();
    assert_eq!(finished, 2);
}

#[test]
fn disconnect_detaches_functions() {
    let ping = FunctionVoid::new();
    let mut manager = quick_manager();
    manager.add_component(server()).unwrap();
    manager.add_component(client(&ping)).unwrap();
    manager
        .connect_local("client", "Uses", "server", "Main")
        .unwrap();
    assert!(ping.is_valid());

    manager.disconnect("client", "Uses").unwrap();
    assert!(!ping.is_valid());
    assert!(manager.connections().is_empty());
    assert!(matches!(
        manager.disconnect("client", "Uses"),
        Err(ManagerError::Connect(ConnectError::NotConnected(_)))
    ));
}

#[test]
fn wait_for_state_all_without_deadline() {
    let mut manager = quick_manager();
    manager.add_component(server()).unwrap();
    assert!(manager.wait_for_state_all(ComponentState::Constructed, Duration::MAX));

    manager.kill_all();
    assert!(manager.wait_for_state_all(ComponentState::Finished, Duration::MAX));
    assert!(!manager.wait_for_state_all(ComponentState::Active, Duration::MAX));
}
