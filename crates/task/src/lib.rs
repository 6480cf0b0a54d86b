//! # mts-task
//!
//! Tasks, their interfaces and the component manager.
//!
//! ## Module Overview
//! - [`provided`]  – commands and events a task exposes.
//! - [`required`]  – functions and event handlers a task needs.
//! - [`connect`]   – binding a required interface to a provided one.
//! - [`task`]      – the task thread, its lifecycle and scheduling.
//! - [`manager`]   – process-wide registry driving every task.
//! - [`config`]    – task and manager configuration builders.

#![forbid(unsafe_code)]

pub mod config;
pub mod connect;
pub mod error;
mod lifecycle;
pub mod mailboxes;
pub mod manager;
pub mod provided;
pub mod required;
pub mod task;

pub use config::{ManagerConfig, ManagerConfigBuilder, Scheduling, TaskConfig, TaskConfigBuilder};
pub use connect::{connect, disconnect};
pub use error::{ConnectError, InterfaceError, ManagerError, TaskError};
pub use mailboxes::TaskMailboxes;
pub use manager::{ComponentManager, ConnectionRecord};
pub use provided::{ProvidedInterface, QueueingPolicy};
pub use required::{RequiredInterface, Requirement};
pub use task::{Task, TaskBehavior, TaskContext};

pub use mts_core::ComponentState;

#[cfg(test)]
mod tests;
