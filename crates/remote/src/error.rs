use thiserror::Error;

use mts_core::ExecutionResult;
use mts_task::{ConnectError, InterfaceError};

use crate::message::ClientId;

/// Failures of the serialized boundary.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport is disconnected")]
    Disconnected,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("failed to encode: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("unknown client {0}")]
    UnknownClient(ClientId),
    #[error("no command named '{0}'")]
    UnknownCommand(String),
    #[error("command '{0}' is already exposed")]
    DuplicateCommand(String),
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error(transparent)]
    Connect(#[from] ConnectError),
}

impl RemoteError {
    /// The outcome a caller sees when a call fails with this error.
    pub fn result(&self) -> ExecutionResult {
        match self {
            Self::Encode(_) => ExecutionResult::SerializationError,
            Self::Decode(_) => ExecutionResult::DeserializationError,
            Self::UnknownCommand(_) => ExecutionResult::InvalidCommandId,
            Self::Disconnected
            | Self::Transport(_)
            | Self::UnknownClient(_)
            | Self::DuplicateCommand(_)
            | Self::Interface(_)
            | Self::Connect(_) => ExecutionResult::NetworkError,
        }
    }
}
