//! Server side of the serialized boundary.
//!
//! A [`CommandServer`] exposes selected commands of one provided interface
//! under numeric ids. Every client that connects gets its own required
//! interface bound to the provided one, so remote calls go through the same
//! functions, mailboxes and thread discipline as local ones.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use mts_command::{
    CommandKind, FunctionQualifiedRead, FunctionRead, FunctionVoid, FunctionVoidReturn,
    FunctionWrite, FunctionWriteReturn,
};
use mts_core::{Blocking, ExecutionResult, Payload};
use mts_task::{
    connect, disconnect, InterfaceError, ProvidedInterface, RequiredInterface, Requirement,
};

use crate::error::RemoteError;
use crate::message::{self, ClientId, CommandId, Request, Response};

type Executor = dyn Fn(Option<&str>, Blocking) -> Response + Send + Sync;
type Factory = dyn Fn(&RequiredInterface) -> Result<Arc<Executor>, InterfaceError> + Send + Sync;

struct Exposed {
    name: String,
    kind: CommandKind,
    factory: Box<Factory>,
}

struct Session {
    required: Arc<RequiredInterface>,
    executors: Vec<Arc<Executor>>,
}

fn factory<F>(f: F) -> Box<Factory>
where
    F: Fn(&RequiredInterface) -> Result<Arc<Executor>, InterfaceError> + Send + Sync + 'static,
{
    Box::new(f)
}

fn executor<F>(f: F) -> Arc<Executor>
where
    F: Fn(Option<&str>, Blocking) -> Response + Send + Sync + 'static,
{
    Arc::new(f)
}

fn decode_argument<A: DeserializeOwned>(argument: Option<&str>) -> Result<A, Response> {
    let text = argument.ok_or_else(|| Response::status(ExecutionResult::DeserializationError))?;
    message::decode(text).map_err(|err| {
        debug!("argument rejected: {}", err);
        Response::status(err.result())
    })
}

fn reply<R: Serialize>(result: ExecutionResult, value: &R) -> Response {
    if !result.is_ok() {
        return Response::status(result);
    }
    match message::encode(value) {
        Ok(payload) => Response::with_payload(result, payload),
        Err(err) => {
            warn!("result rejected: {}", err);
            Response::status(err.result())
        }
    }
}

/// Executes serialized requests against one provided interface.
pub struct CommandServer {
    provided: Arc<ProvidedInterface>,
    exposed: RwLock<Vec<Exposed>>,
    sessions: RwLock<HashMap<ClientId, Session>>,
    next_client: AtomicU32,
}

impl CommandServer {
    pub fn new(provided: Arc<ProvidedInterface>) -> Arc<Self> {
        Arc::new(Self {
            provided,
            exposed: RwLock::new(Vec::new()),
            sessions: RwLock::new(HashMap::new()),
            next_client: AtomicU32::new(1),
        })
    }

    pub fn provided(&self) -> &Arc<ProvidedInterface> {
        &self.provided
    }

    fn expose(
        &self,
        name: &str,
        kind: CommandKind,
        factory: Box<Factory>,
    ) -> Result<CommandId, RemoteError> {
        if self.provided.command(name).is_none() {
            return Err(RemoteError::UnknownCommand(name.to_owned()));
        }
        let mut exposed = self.exposed.write();
        if exposed.iter().any(|e| e.name == name) {
            return Err(RemoteError::DuplicateCommand(name.to_owned()));
        }
        if !self.sessions.read().is_empty() {
            warn!(
                "{}: '{}' exposed after clients connected, they will not see it",
                self.provided.full_name(),
                name
            );
        }
        let id = CommandId(exposed.len() as u32);
        exposed.push(Exposed {
            name: name.to_owned(),
            kind,
            factory,
        });
        debug!(
            "{}: exposed {} '{}' as {}",
            self.provided.full_name(),
            kind,
            name,
            id
        );
        Ok(id)
    }

    pub fn expose_void(&self, name: &str) -> Result<CommandId, RemoteError> {
        let command = name.to_owned();
        let factory = factory(move |required| {
            let function = FunctionVoid::new();
            required.add_function(&command, &function)?;
            Ok(executor(move |_, blocking| {
                Response::status(function.execute_with(blocking))
            }))
        });
        self.expose(name, CommandKind::Void, factory)
    }

    pub fn expose_write<A>(&self, name: &str) -> Result<CommandId, RemoteError>
    where
        A: Payload + DeserializeOwned,
    {
        let command = name.to_owned();
        let factory = factory(move |required| {
            let function = FunctionWrite::<A>::new();
            required.add_function(&command, &function)?;
            Ok(executor(move |argument, blocking| {
                match decode_argument::<A>(argument) {
                    Ok(value) => Response::status(function.execute_with(&value, blocking)),
                    Err(response) => response,
                }
            }))
        });
        self.expose(name, CommandKind::Write, factory)
    }

    pub fn expose_read<R>(&self, name: &str) -> Result<CommandId, RemoteError>
    where
        R: Payload + Default + Serialize,
    {
        let command = name.to_owned();
        let factory = factory(move |required| {
            let function = FunctionRead::<R>::new();
            required.add_function(&command, &function)?;
            Ok(executor(move |_, _| {
                let mut value = R::default();
                let result = function.execute(&mut value);
                reply(result, &value)
            }))
        });
        self.expose(name, CommandKind::Read, factory)
    }

    pub fn expose_qualified_read<A, R>(&self, name: &str) -> Result<CommandId, RemoteError>
    where
        A: Payload + DeserializeOwned,
        R: Payload + Default + Serialize,
    {
        let command = name.to_owned();
        let factory = factory(move |required| {
            let function = FunctionQualifiedRead::<A, R>::new();
            required.add_function(&command, &function)?;
            Ok(executor(move |argument, _| {
                let key = match decode_argument::<A>(argument) {
                    Ok(key) => key,
                    Err(response) => return response,
                };
                let mut value = R::default();
                let result = function.execute(&key, &mut value);
                reply(result, &value)
            }))
        });
        self.expose(name, CommandKind::QualifiedRead, factory)
    }

    pub fn expose_void_return<R>(&self, name: &str) -> Result<CommandId, RemoteError>
    where
        R: Payload + Default + Serialize,
    {
        let command = name.to_owned();
        let factory = factory(move |required| {
            let function = FunctionVoidReturn::<R>::new();
            required.add_function(&command, &function)?;
            Ok(executor(move |_, _| {
                let mut value = R::default();
                let result = function.execute(&mut value);
                reply(result, &value)
            }))
        });
        self.expose(name, CommandKind::VoidReturn, factory)
    }

    pub fn expose_write_return<A, R>(&self, name: &str) -> Result<CommandId, RemoteError>
    where
        A: Payload + DeserializeOwned,
        R: Payload + Default + Serialize,
    {
        let command = name.to_owned();
        let factory = factory(move |required| {
            let function = FunctionWriteReturn::<A, R>::new();
            required.add_function(&command, &function)?;
            Ok(executor(move |argument, _| {
                let input = match decode_argument::<A>(argument) {
                    Ok(input) => input,
                    Err(response) => return response,
                };
                let mut value = R::default();
                let result = function.execute(&input, &mut value);
                reply(result, &value)
            }))
        });
        self.expose(name, CommandKind::WriteReturn, factory)
    }

    /// Id of the exposed command `name`.
    pub fn command_id(&self, name: &str) -> Option<CommandId> {
        self.exposed
            .read()
            .iter()
            .position(|e| e.name == name)
            .map(|index| CommandId(index as u32))
    }

    /// Exposed commands with their ids, in id order.
    pub fn commands(&self) -> Vec<(CommandId, String, CommandKind)> {
        self.exposed
            .read()
            .iter()
            .enumerate()
            .map(|(index, e)| (CommandId(index as u32), e.name.clone(), e.kind))
            .collect()
    }

    /// Registers a client and connects its functions to the provided
    /// interface.
    pub fn connect_client(&self, name: &str) -> Result<ClientId, RemoteError> {
        let id = ClientId(self.next_client.fetch_add(1, Ordering::Relaxed));
        let required = RequiredInterface::new(
            format!("remote:{}", name),
            format!("{}{}", self.provided.name(), id),
            Requirement::Mandatory,
        );
        let executors = self
            .exposed
            .read()
            .iter()
            .map(|e| (e.factory)(&required))
            .collect::<Result<Vec<_>, _>>()?;
        connect(&required, &self.provided)?;

        info!(
            "{}: client {} '{}' connected",
            self.provided.full_name(),
            id,
            name
        );
        self.sessions
            .write()
            .insert(id, Session { required, executors });
        Ok(id)
    }

    pub fn disconnect_client(&self, client: ClientId) -> Result<(), RemoteError> {
        let session = self
            .sessions
            .write()
            .remove(&client)
            .ok_or(RemoteError::UnknownClient(client))?;
        disconnect(&session.required)?;
        info!("{}: client {} disconnected", self.provided.full_name(), client);
        Ok(())
    }

    pub fn client_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Executes one decoded request.
    pub fn execute(&self, request: &Request) -> Response {
        let executor = {
            let sessions = self.sessions.read();
            let Some(session) = sessions.get(&request.client) else {
                warn!("request from unknown client {}", request.client);
                return Response::status(ExecutionResult::NetworkError);
            };
            match session.executors.get(request.command.0 as usize) {
                Some(executor) => Arc::clone(executor),
                None => return Response::status(ExecutionResult::InvalidCommandId),
            }
        };
        let expected = self
            .exposed
            .read()
            .get(request.command.0 as usize)
            .map(|e| e.kind);
        if expected != Some(request.kind) {
            debug!(
                "command {} is {:?}, request asked for {}",
                request.command, expected, request.kind
            );
            return Response::status(ExecutionResult::InvalidInputType);
        }
        executor(request.argument.as_deref(), request.blocking)
    }

    /// Decodes a request frame, executes it and encodes the response.
    pub fn handle(&self, frame: &[u8]) -> Vec<u8> {
        let response = match message::decode_frame::<Request>(frame) {
            Ok(request) => self.execute(&request),
            Err(err) => {
                warn!("malformed request: {}", err);
                Response::status(err.result())
            }
        };
        message::encode_frame(&response).unwrap_or_default()
    }
}
