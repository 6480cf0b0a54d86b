//! Execution result vocabulary.
//!
//! Failures never cross a component boundary as panics or `Err` values: every
//! command, function and queued invocation reports one of the variants below.

use core::fmt;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of executing a command or function.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionResult {
    /// The callable ran and reported success.
    Succeeded,
    /// The invocation was placed in a mailbox and will run on the owning task.
    Queued,
    /// The command is disabled; the callable was not invoked.
    Disabled,
    /// The function handle is not bound to a command.
    FunctionNotBound,
    /// No mailbox is available (never allocated, or closed by a kill).
    NoMailbox,
    /// The mailbox ring buffer is full.
    MailboxFull,
    /// The queued command has as many in-flight arguments as it can hold.
    ArgumentQueueFull,
    /// The argument type does not match the command prototype.
    InvalidInputType,
    /// The callable ran and reported failure.
    MethodOrFunctionFailed,
    /// The transport used for a remote call failed.
    NetworkError,
    /// A remote call named a command id the server does not know.
    InvalidCommandId,
    /// Arguments or results could not be encoded.
    SerializationError,
    /// Arguments or results could not be decoded.
    DeserializationError,
}

impl ExecutionResult {
    /// Every variant, in declaration order.
    pub const ALL: [ExecutionResult; 13] = [
        Self::Succeeded,
        Self::Queued,
        Self::Disabled,
        Self::FunctionNotBound,
        Self::NoMailbox,
        Self::MailboxFull,
        Self::ArgumentQueueFull,
        Self::InvalidInputType,
        Self::MethodOrFunctionFailed,
        Self::NetworkError,
        Self::InvalidCommandId,
        Self::SerializationError,
        Self::DeserializationError,
    ];

    /// Returns `true` for [`Succeeded`](Self::Succeeded) and
    /// [`Queued`](Self::Queued) only.
    ///
    /// A queued call runs eventually unless its owning task is killed first.
    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Succeeded | Self::Queued)
    }

    /// Short upper-case name, stable across releases.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Queued => "QUEUED",
            Self::Disabled => "COMMAND_DISABLED",
            Self::FunctionNotBound => "FUNCTION_NOT_BOUND",
            Self::NoMailbox => "NO_MAILBOX",
            Self::MailboxFull => "INTERFACE_COMMAND_MAILBOX_FULL",
            Self::ArgumentQueueFull => "COMMAND_ARGUMENT_QUEUE_FULL",
            Self::InvalidInputType => "INVALID_INPUT_TYPE",
            Self::MethodOrFunctionFailed => "METHOD_OR_FUNCTION_FAILED",
            Self::NetworkError => "NETWORK_ERROR",
            Self::InvalidCommandId => "INVALID_COMMAND_ID",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::DeserializationError => "DESERIALIZATION_ERROR",
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversion used by method-bound commands so that user methods can return
/// `()`, `bool` or an [`ExecutionResult`] directly.
pub trait IntoExecutionResult {
    fn into_execution_result(self) -> ExecutionResult;
}

impl IntoExecutionResult for ExecutionResult {
    #[inline]
    fn into_execution_result(self) -> ExecutionResult {
        self
    }
}

impl IntoExecutionResult for () {
    #[inline]
    fn into_execution_result(self) -> ExecutionResult {
        ExecutionResult::Succeeded
    }
}

impl IntoExecutionResult for bool {
    #[inline]
    fn into_execution_result(self) -> ExecutionResult {
        if self {
            ExecutionResult::Succeeded
        } else {
            ExecutionResult::MethodOrFunctionFailed
        }
    }
}

impl<E> IntoExecutionResult for Result<(), E> {
    #[inline]
    fn into_execution_result(self) -> ExecutionResult {
        match self {
            Ok(()) => ExecutionResult::Succeeded,
            Err(_) => ExecutionResult::MethodOrFunctionFailed,
        }
    }
}

/// Caller-selected mode for commands that may be queued.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blocking {
    /// Return as soon as the invocation is queued.
    #[default]
    No,
    /// Wait until the owning task has executed the invocation.
    Yes,
}

impl Blocking {
    #[inline]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Yes)
    }
}
