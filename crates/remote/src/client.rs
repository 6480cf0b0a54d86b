//! Client side of the serialized boundary.

use std::sync::Arc;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use mts_command::CommandKind;
use mts_core::{Blocking, ExecutionResult};

use crate::error::RemoteError;
use crate::message::{self, ClientId, CommandId, Request, Response};
use crate::transport::Transport;

/// Sends serialized command invocations over a [`Transport`].
///
/// Every call returns an [`ExecutionResult`]; encoding, transport and
/// decoding failures map to `SerializationError`, `NetworkError` and
/// `DeserializationError`.
#[derive(Clone)]
pub struct CommandClient {
    transport: Arc<dyn Transport>,
}

impl CommandClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    fn send(&self, request: &Request) -> Result<Response, RemoteError> {
        let frame = message::encode_frame(request)?;
        let reply = self.transport.round_trip(&frame)?;
        message::decode_frame(&reply)
    }

    fn call(
        &self,
        client: ClientId,
        command: CommandId,
        kind: CommandKind,
        blocking: Blocking,
        argument: Option<String>,
    ) -> Response {
        let request = Request {
            client,
            command,
            kind,
            blocking,
            argument,
        };
        self.send(&request).unwrap_or_else(|err| {
            warn!("{} command {} for client {}: {}", kind, command, client, err);
            Response::status(err.result())
        })
    }

    fn call_with<A: Serialize>(
        &self,
        client: ClientId,
        command: CommandId,
        kind: CommandKind,
        blocking: Blocking,
        argument: &A,
    ) -> Response {
        match message::encode(argument) {
            Ok(text) => self.call(client, command, kind, blocking, Some(text)),
            Err(err) => {
                warn!("{} command {}: {}", kind, command, err);
                Response::status(err.result())
            }
        }
    }

    fn fill<R: DeserializeOwned>(response: Response, result: &mut R) -> ExecutionResult {
        if !response.result.is_ok() {
            return response.result;
        }
        let Some(payload) = response.payload else {
            return ExecutionResult::DeserializationError;
        };
        match message::decode(&payload) {
            Ok(value) => {
                *result = value;
                response.result
            }
            Err(err) => err.result(),
        }
    }

    pub fn send_execute_command_void_serialized(
        &self,
        client: ClientId,
        command: CommandId,
        blocking: Blocking,
    ) -> ExecutionResult {
        self.call(client, command, CommandKind::Void, blocking, None).result
    }

    pub fn send_execute_command_write_serialized<A: Serialize>(
        &self,
        client: ClientId,
        command: CommandId,
        argument: &A,
        blocking: Blocking,
    ) -> ExecutionResult {
        self.call_with(client, command, CommandKind::Write, blocking, argument).result
    }

    pub fn send_execute_command_read_serialized<R: DeserializeOwned>(
        &self,
        client: ClientId,
        command: CommandId,
        result: &mut R,
    ) -> ExecutionResult {
        let response = self.call(client, command, CommandKind::Read, Blocking::Yes, None);
        Self::fill(response, result)
    }

    pub fn send_execute_command_qualified_read_serialized<A: Serialize, R: DeserializeOwned>(
        &self,
        client: ClientId,
        command: CommandId,
        argument: &A,
        result: &mut R,
    ) -> ExecutionResult {
        let response = self.call_with(
            client,
            command,
            CommandKind::QualifiedRead,
            Blocking::Yes,
            argument,
        );
        Self::fill(response, result)
    }

    pub fn send_execute_command_void_return_serialized<R: DeserializeOwned>(
        &self,
        client: ClientId,
        command: CommandId,
        result: &mut R,
    ) -> ExecutionResult {
        let response = self.call(client, command, CommandKind::VoidReturn, Blocking::Yes, None);
        Self::fill(response, result)
    }

    pub fn send_execute_command_write_return_serialized<A: Serialize, R: DeserializeOwned>(
        &self,
        client: ClientId,
        command: CommandId,
        argument: &A,
        result: &mut R,
    ) -> ExecutionResult {
        let response = self.call_with(
            client,
            command,
            CommandKind::WriteReturn,
            Blocking::Yes,
            argument,
        );
        Self::fill(response, result)
    }
}
