//! Binding a required interface to a provided interface.
//!
//! Connecting checks every function and event handler against the
//! provided side before anything is bound, so a failed connection leaves
//! both interfaces untouched.

use std::sync::Arc;

use log::{debug, info, warn};

use mts_command::{CommandInfo, FunctionBinding, Mailbox};
use mts_core::Prototype;

use crate::error::ConnectError;
use crate::provided::ProvidedInterface;
use crate::required::{Connection, HandlerSlot, Observer, RequiredInterface};

fn render(argument: Option<Prototype>, result: Option<Prototype>) -> String {
    format!(
        "({}) -> {}",
        argument.map(|p| p.short_name()).unwrap_or_default(),
        result
            .map(|p| p.short_name())
            .unwrap_or_else(|| "()".to_owned())
    )
}

fn check_function(
    name: &str,
    binding: &dyn FunctionBinding,
    info: &CommandInfo,
    provided: &ProvidedInterface,
) -> Result<(), ConnectError> {
    if binding.kind() != info.kind() {
        return Err(ConnectError::KindMismatch {
            function: name.to_owned(),
            provided: provided.full_name(),
            expected: binding.kind(),
            found: info.kind(),
        });
    }
    if binding.argument_prototype() != info.argument_prototype()
        || binding.result_prototype() != info.result_prototype()
    {
        return Err(ConnectError::PrototypeMismatch {
            name: name.to_owned(),
            expected: render(binding.argument_prototype(), binding.result_prototype()),
            found: render(info.argument_prototype(), info.result_prototype()),
        });
    }
    Ok(())
}

fn check_handler(name: &str, slot: &HandlerSlot, info: &CommandInfo) -> Result<(), ConnectError> {
    if slot.kind != info.kind() || slot.argument != info.argument_prototype() {
        return Err(ConnectError::PrototypeMismatch {
            name: name.to_owned(),
            expected: render(slot.argument, None),
            found: render(info.argument_prototype(), None),
        });
    }
    Ok(())
}

fn rollback(
    bound: &[Arc<dyn FunctionBinding>],
    observers: Vec<Observer>,
    provided: &ProvidedInterface,
    client: &str,
    mailbox: Option<&Arc<Mailbox>>,
) {
    for binding in bound {
        binding.detach();
    }
    for observer in observers {
        observer.remove();
    }
    provided.detach_client(client, mailbox);
}

/// Connects `required` to `provided`.
///
/// 1. Every function must find a same-named command unless it was
///    registered as optional.
/// 2. Kinds and prototypes must match exactly.
/// 3. Commands of a queued interface are cloned against a mailbox
///    allocated for this connection; other commands are shared.
/// 4. Functions are bound and event handlers attached as observers.
pub fn connect(
    required: &RequiredInterface,
    provided: &Arc<ProvidedInterface>,
) -> Result<(), ConnectError> {
    let client = required.full_name();
    let mut connection = required.connection.lock();
    if connection.is_some() {
        return Err(ConnectError::AlreadyConnected(client));
    }

    let mut functions = Vec::new();
    for (name, binding, mandatory) in required.function_slots() {
        match provided.command(&name) {
            Some(entry) => {
                check_function(&name, binding.as_ref(), entry.info(), provided)?;
                functions.push((binding, entry));
            }
            None if mandatory => {
                return Err(ConnectError::MissingCommand {
                    function: name,
                    provided: provided.full_name(),
                });
            }
            None => debug!(
                "{}: optional function '{}' not provided by {}",
                client,
                name,
                provided.full_name()
            ),
        }
    }

    let mut handlers = Vec::new();
    for (name, slot) in required.handler_slots() {
        match provided.event(&name) {
            Some(event) => {
                check_handler(&name, &slot, event.info())?;
                handlers.push((slot, event));
            }
            None => warn!(
                "{}: no event '{}' in {}, handler left idle",
                client,
                name,
                provided.full_name()
            ),
        }
    }

    let mailbox = provided.attach_client(&client);
    let argument_queue_size = provided.argument_queue_size();
    let mut bound: Vec<Arc<dyn FunctionBinding>> = Vec::with_capacity(functions.len());
    for (binding, entry) in &functions {
        let command = entry.instantiate(mailbox.as_ref(), argument_queue_size);
        if let Err(err) = binding.bind_any(&command) {
            rollback(&bound, Vec::new(), provided, &client, mailbox.as_ref());
            return Err(err.into());
        }
        bound.push(Arc::clone(binding));
    }

    let event_mailbox = if handlers.iter().any(|(slot, _)| slot.queued) {
        required.event_mailbox()
    } else {
        None
    };
    let mut observers = Vec::with_capacity(handlers.len());
    for (slot, event) in handlers {
        let target = if slot.queued {
            event_mailbox.as_ref()
        } else {
            None
        };
        match (slot.attach)(&event, target, required.argument_queue_size()) {
            Ok(id) => observers.push(Observer {
                event,
                detach: Arc::clone(&slot.detach),
                id,
            }),
            Err(err) => {
                rollback(&bound, observers, provided, &client, mailbox.as_ref());
                return Err(err.into());
            }
        }
    }

    info!(
        "connected {} to {} ({} functions, {} handlers)",
        client,
        provided.full_name(),
        bound.len(),
        observers.len()
    );
    *connection = Some(Connection {
        provided: Arc::clone(provided),
        mailbox,
        observers,
    });
    Ok(())
}

/// Detaches every function and handler of `required`.
///
/// Pending invocations already in the connection's mailbox still run.
/// Commands kept from the old binding get `NoMailbox` afterwards.
pub fn disconnect(required: &RequiredInterface) -> Result<(), ConnectError> {
    let client = required.full_name();
    let connection = required
        .connection
        .lock()
        .take()
        .ok_or_else(|| ConnectError::NotConnected(client.clone()))?;

    for (_, binding, _) in required.function_slots() {
        binding.detach();
    }
    for observer in connection.observers {
        observer.remove();
    }
    connection
        .provided
        .detach_client(&client, connection.mailbox.as_ref());
    info!("disconnected {} from {}", client, connection.provided.full_name());
    Ok(())
}
