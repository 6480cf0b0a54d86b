//! # mts-core
//!
//! Core vocabulary for the multi-task kernel. Every other crate in the
//! workspace builds on these types:
//!
//! - [`ExecutionResult`] – the closed outcome set returned by every command,
//!   function and connection operation.
//! - [`Prototype`] – type descriptors captured when a command is bound and
//!   compared when interfaces are connected.
//! - [`ComponentState`] – the forward-only task lifecycle.
//! - [`TraceRecord`] / [`TraceHook`] – structured kernel trace records.

#![forbid(unsafe_code)]

pub mod prototype;
pub mod result;
pub mod state;
pub mod trace;

pub use prototype::{Payload, Prototype};
pub use result::{Blocking, ExecutionResult, IntoExecutionResult};
pub use state::ComponentState;
pub use trace::{emit, TraceHook, TraceRecord};

#[cfg(test)]
mod tests;

/// Kernel version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default capacity of a mailbox created for a connection.
pub const DEFAULT_MAILBOX_SIZE: usize = 64;

/// Default number of in-flight arguments a single queued command may hold.
pub const DEFAULT_ARGUMENT_QUEUE_SIZE: usize = 64;

/// Default number of rows kept by a task's state table.
pub const DEFAULT_HISTORY_LENGTH: usize = 256;

/// Smallest history length a state table accepts. The reader row must
/// always trail the writer row by at least one slot.
pub const MIN_HISTORY_LENGTH: usize = 3;
