use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use mts_core::ExecutionResult;
use mts_task::ProvidedInterface;

use crate::{ClientId, CommandClient, CommandServer, LoopbackTransport};

mod boundary;
mod proxy;

/// A non-queued interface with one command of every kind, and the state
/// those commands touch.
struct Fixture {
    provided: Arc<ProvidedInterface>,
    server: Arc<CommandServer>,
    transport: Arc<LoopbackTransport>,
    client: CommandClient,
    id: ClientId,
    resets: Arc<AtomicU32>,
    total: Arc<Mutex<i64>>,
}

impl Fixture {
    fn new() -> Self {
        let provided = ProvidedInterface::new("Server", "Main");
        let resets = Arc::new(AtomicU32::new(0));
        let total = Arc::new(Mutex::new(0_i64));

        let r = resets.clone();
        provided
            .add_command_void("Reset", move || {
                r.fetch_add(1, Ordering::SeqCst);
                ExecutionResult::Succeeded
            })
            .unwrap();
        let t = total.clone();
        provided
            .add_command_write("Add", move |value: &i64| {
                *t.lock() += value;
                ExecutionResult::Succeeded
            })
            .unwrap();
        let t = total.clone();
        provided
            .add_command_read("Total", move |out: &mut i64| {
                *out = *t.lock();
                ExecutionResult::Succeeded
            })
            .unwrap();
        provided
            .add_command_qualified_read("Scale", |factor: &i64, out: &mut i64| {
                *out = factor * 10;
                ExecutionResult::Succeeded
            })
            .unwrap();
        let r = resets.clone();
        provided
            .add_command_void_return("Resets", move |out: &mut u32| {
                *out = r.load(Ordering::SeqCst);
                ExecutionResult::Succeeded
            })
            .unwrap();
        provided
            .add_command_write_return("Shout", |text: &String, out: &mut String| {
                *out = text.to_uppercase();
                ExecutionResult::Succeeded
            })
            .unwrap();

        let server = CommandServer::new(provided.clone());
        server.expose_void("Reset").unwrap();
        server.expose_write::<i64>("Add").unwrap();
        server.expose_read::<i64>("Total").unwrap();
        server.expose_qualified_read::<i64, i64>("Scale").unwrap();
        server.expose_void_return::<u32>("Resets").unwrap();
        server.expose_write_return::<String, String>("Shout").unwrap();

        let id = server.connect_client("tester").unwrap();
        let transport = LoopbackTransport::new(server.clone());
        let client = CommandClient::new(transport.clone());
        Self {
            provided,
            server,
            transport,
            client,
            id,
            resets,
            total,
        }
    }

    fn command(&self, name: &str) -> crate::CommandId {
        self.server.command_id(name).unwrap()
    }
}
