//! Tests for the task and manager configuration builders.

use std::time::Duration;

use mts_core::{DEFAULT_ARGUMENT_QUEUE_SIZE, DEFAULT_HISTORY_LENGTH, DEFAULT_MAILBOX_SIZE};
use mts_task::{ComponentManager, ManagerConfig, Scheduling, TaskConfig};

#[test]
fn task_config_builder() {
    let config = TaskConfig::builder("servo")
        .periodic(Duration::from_millis(1))
        .history_length(1000)
        .mailbox_size(16)
        .argument_queue_size(8)
        .build();

    assert_eq!(config.name, "servo");
    assert_eq!(config.scheduling, Scheduling::Periodic(Duration::from_millis(1)));
    assert_eq!(config.scheduling.period(), Some(Duration::from_millis(1)));
    assert_eq!(config.history_length, 1000);
    assert_eq!(config.mailbox_size, 16);
    assert_eq!(config.argument_queue_size, 8);
}

#[test]
fn task_config_default() {
    let config = TaskConfig::default();

    assert_eq!(config.scheduling, Scheduling::Continuous);
    assert_eq!(config.scheduling.period(), None);
    assert_eq!(config.history_length, DEFAULT_HISTORY_LENGTH);
    assert_eq!(config.mailbox_size, DEFAULT_MAILBOX_SIZE);
    assert_eq!(config.argument_queue_size, DEFAULT_ARGUMENT_QUEUE_SIZE);
}

#[test]
fn task_config_shorthands() {
    assert_eq!(TaskConfig::from_signal("io").scheduling, Scheduling::FromSignal);
    assert_eq!(TaskConfig::continuous("loop").scheduling, Scheduling::Continuous);
    assert_eq!(
        TaskConfig::periodic("ctl", Duration::from_millis(5)).name,
        "ctl"
    );
}

#[test]
fn manager_config_builder() {
    let config = ManagerConfig::builder()
        .process_name("robot")
        .wait_timeout(Duration::from_millis(250))
        .build();

    assert_eq!(config.process_name, "robot");
    assert_eq!(config.wait_timeout, Duration::from_millis(250));
}

#[test]
fn manager_with_custom_config() {
    let manager = ComponentManager::new(ManagerConfig::builder().process_name("arm").build());

    assert_eq!(manager.process_name(), "arm");
    assert_eq!(manager.config().wait_timeout, Duration::from_secs(5));
    assert!(manager.component_names().is_empty());
}
