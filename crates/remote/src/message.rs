//! Request and response frames, encoded as JSON.
//!
//! Arguments and results travel as nested JSON text so a payload that does
//! not decode can be told apart from a malformed frame.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use mts_command::CommandKind;
use mts_core::{Blocking, ExecutionResult};

use crate::error::RemoteError;

/// Identifies one connected client on a command server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies one exposed command on a command server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommandId(pub u32);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub client: ClientId,
    pub command: CommandId,
    pub kind: CommandKind,
    pub blocking: Blocking,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub result: ExecutionResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl Response {
    pub fn status(result: ExecutionResult) -> Self {
        Self {
            result,
            payload: None,
        }
    }

    pub fn with_payload(result: ExecutionResult, payload: String) -> Self {
        Self {
            result,
            payload: Some(payload),
        }
    }
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, RemoteError> {
    serde_json::to_string(value).map_err(RemoteError::Encode)
}

pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, RemoteError> {
    serde_json::from_str(text).map_err(RemoteError::Decode)
}

pub fn encode_frame<T: Serialize>(frame: &T) -> Result<Vec<u8>, RemoteError> {
    serde_json::to_vec(frame).map_err(RemoteError::Encode)
}

pub fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RemoteError> {
    serde_json::from_slice(bytes).map_err(RemoteError::Decode)
}
