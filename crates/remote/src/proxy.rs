//! Command proxies forwarding to a remote [`CommandServer`](crate::CommandServer).
//!
//! Each proxy implements the matching command trait, so a function handle
//! binds to it exactly as it would to a local command.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use mts_command::{
    Command, CommandInfo, QualifiedReadCommand, ReadCommand, VoidCommand, VoidReturnCommand,
    WriteCommand, WriteReturnCommand,
};
use mts_core::{Blocking, ExecutionResult, Payload};

use crate::client::CommandClient;
use crate::message::{ClientId, CommandId};

struct ProxyHeader {
    info: CommandInfo,
    enabled: AtomicBool,
    client: CommandClient,
    client_id: ClientId,
    command: CommandId,
}

impl ProxyHeader {
    fn new(
        info: CommandInfo,
        client: CommandClient,
        client_id: ClientId,
        command: CommandId,
    ) -> Self {
        Self {
            info,
            enabled: AtomicBool::new(true),
            client,
            client_id,
            command,
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

macro_rules! remote_proxy {
    (
        $(#[$doc:meta])*
        $name:ident $(< $($g:ident : $bound:path),+ >)?, $info:ident
    ) => {
        $(#[$doc])*
        pub struct $name $(< $($g),+ >)? {
            header: ProxyHeader,
            $(_marker: std::marker::PhantomData<fn() -> ($($g,)+)>,)?
        }

        impl $(< $($g: Payload + $bound),+ >)? $name $(< $($g),+ >)? {
            pub fn new(
                name: &str,
                client: CommandClient,
                client_id: ClientId,
                command: CommandId,
            ) -> Arc<Self> {
                Arc::new(Self {
                    header: ProxyHeader::new(
                        CommandInfo::$info $(::< $($g),+ >)? (name),
                        client,
                        client_id,
                        command,
                    ),
                    $(_marker: std::marker::PhantomData::<fn() -> ($($g,)+)>,)?
                })
            }

            pub fn client_id(&self) -> ClientId {
                self.header.client_id
            }

            pub fn command_id(&self) -> CommandId {
                self.header.command
            }
        }

        impl $(< $($g: Payload + $bound),+ >)? Command for $name $(< $($g),+ >)? {
            fn info(&self) -> &CommandInfo {
                &self.header.info
            }

            fn is_enabled(&self) -> bool {
                self.header.is_enabled()
            }

            fn enable(&self) {
                self.header.enabled.store(true, Ordering::Release);
            }

            fn disable(&self) {
                self.header.enabled.store(false, Ordering::Release);
            }
        }
    };
}

remote_proxy! {
    /// Remote void command.
    RemoteVoid, void
}

remote_proxy! {
    /// Remote write command.
    RemoteWrite<A: Serialize>, write
}

remote_proxy! {
    /// Remote read command.
    RemoteRead<R: DeserializeOwned>, read
}

remote_proxy! {
    /// Remote qualified read command.
    RemoteQualifiedRead<A: Serialize, R: DeserializeOwned>, qualified_read
}

remote_proxy! {
    /// Remote void-return command.
    RemoteVoidReturn<R: DeserializeOwned>, void_return
}

remote_proxy! {
    /// Remote write-return command.
    RemoteWriteReturn<A: Serialize, R: DeserializeOwned>, write_return
}

impl VoidCommand for RemoteVoid {
    fn execute(&self, blocking: Blocking) -> ExecutionResult {
        let h = &self.header;
        if !h.is_enabled() {
            return ExecutionResult::Disabled;
        }
        h.client
            .send_execute_command_void_serialized(h.client_id, h.command, blocking)
    }
}

impl<A: Payload + Serialize> WriteCommand<A> for RemoteWrite<A> {
    fn execute(&self, argument: &A, blocking: Blocking) -> ExecutionResult {
        let h = &self.header;
        if !h.is_enabled() {
            return ExecutionResult::Disabled;
        }
        h.client
            .send_execute_command_write_serialized(h.client_id, h.command, argument, blocking)
    }
}

impl<R: Payload + DeserializeOwned> ReadCommand<R> for RemoteRead<R> {
    fn execute(&self, result: &mut R) -> ExecutionResult {
        let h = &self.header;
        if !h.is_enabled() {
            return ExecutionResult::Disabled;
        }
        h.client
            .send_execute_command_read_serialized(h.client_id, h.command, result)
    }
}

impl<A, R> QualifiedReadCommand<A, R> for RemoteQualifiedRead<A, R>
where
    A: Payload + Serialize,
    R: Payload + DeserializeOwned,
{
    fn execute(&self, argument: &A, result: &mut R) -> ExecutionResult {
        let h = &self.header;
        if !h.is_enabled() {
            return ExecutionResult::Disabled;
        }
        h.client.send_execute_command_qualified_read_serialized(
            h.client_id,
            h.command,
            argument,
            result,
        )
    }
}

impl<R: Payload + DeserializeOwned> VoidReturnCommand<R> for RemoteVoidReturn<R> {
    fn execute(&self, result: &mut R) -> ExecutionResult {
        let h = &self.header;
        if !h.is_enabled() {
            return ExecutionResult::Disabled;
        }
        h.client
            .send_execute_command_void_return_serialized(h.client_id, h.command, result)
    }
}

impl<A, R> WriteReturnCommand<A, R> for RemoteWriteReturn<A, R>
where
    A: Payload + Serialize,
    R: Payload + DeserializeOwned,
{
    fn execute(&self, argument: &A, result: &mut R) -> ExecutionResult {
        let h = &self.header;
        if !h.is_enabled() {
            return ExecutionResult::Disabled;
        }
        h.client.send_execute_command_write_return_serialized(
            h.client_id,
            h.command,
            argument,
            result,
        )
    }
}
