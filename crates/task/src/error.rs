use thiserror::Error;

use mts_command::{BindError, CommandKind};
use mts_core::ComponentState;
use mts_state::StateTableError;

/// Errors raised while declaring interface contents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceError {
    #[error("interface '{interface}' already has a command named '{name}'")]
    DuplicateCommand { interface: String, name: String },
    #[error("interface '{interface}' already has an event named '{name}'")]
    DuplicateEvent { interface: String, name: String },
    #[error("interface '{interface}' already has a function named '{name}'")]
    DuplicateFunction { interface: String, name: String },
    #[error("interface '{interface}' already has a handler for event '{name}'")]
    DuplicateHandler { interface: String, name: String },
    #[error("component '{component}' already has an interface named '{name}'")]
    DuplicateInterface { component: String, name: String },
    #[error("interface '{interface}' has no command named '{name}'")]
    UnknownCommand { interface: String, name: String },
}

/// Errors raised while connecting or disconnecting interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("required interface '{0}' is already connected")]
    AlreadyConnected(String),
    #[error("required interface '{0}' is not connected")]
    NotConnected(String),
    #[error("function '{function}' has no matching command in '{provided}'")]
    MissingCommand { function: String, provided: String },
    #[error("function '{function}' expects a {expected} command, '{provided}' offers {found}")]
    KindMismatch {
        function: String,
        provided: String,
        expected: CommandKind,
        found: CommandKind,
    },
    #[error("'{name}' prototype mismatch: expected {expected}, found {found}")]
    PrototypeMismatch {
        name: String,
        expected: String,
        found: String,
    },
    #[error("process '{0}' is not managed here")]
    UnknownProcess(String),
    #[error("no component named '{0}'")]
    UnknownComponent(String),
    #[error("component '{component}' has no interface named '{interface}'")]
    UnknownInterface { component: String, interface: String },
    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Errors raised by task setup and lifecycle requests.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task '{task}' cannot do that while {state}")]
    InvalidState { task: String, state: ComponentState },
    #[error("startup failed: {0}")]
    Startup(String),
    #[error("failed to spawn thread for task '{task}': {source}")]
    Spawn {
        task: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error(transparent)]
    State(#[from] StateTableError),
}

impl TaskError {
    /// Convenience constructor for failures reported by user startup code.
    pub fn startup(reason: impl Into<String>) -> Self {
        Self::Startup(reason.into())
    }
}

/// Errors raised by the component manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("component '{0}' is already registered")]
    DuplicateComponent(String),
    #[error("component '{component}' did not reach {state} in time")]
    Timeout {
        component: String,
        state: ComponentState,
    },
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error("component '{component}': {source}")]
    Task {
        component: String,
        #[source]
        source: TaskError,
    },
}
