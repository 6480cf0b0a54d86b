//! Provided interfaces: the commands and events a component exposes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::debug;
use parking_lot::{Mutex, RwLock};

use mts_command::{
    AnyCommand, AnyEvent, Command, CommandEntry, CommandQualifiedRead, CommandRead, CommandVoid,
    CommandVoidReturn, CommandWrite, CommandWriteReturn, EventVoid, EventWrite, Mailbox,
};
use mts_core::{ExecutionResult, Payload, DEFAULT_ARGUMENT_QUEUE_SIZE};
use mts_state::{Accessor, StateHandle, StateIndex};

use crate::error::InterfaceError;
use crate::mailboxes::TaskMailboxes;

/// Where the commands of a provided interface execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueingPolicy {
    /// On the owning task's thread, through a per-client mailbox.
    #[default]
    Queued,
    /// On the caller's thread.
    NotQueued,
}

/// Named set of commands and events exposed by one component.
///
/// Commands registered on a queued interface run on the owning task's
/// thread: every connected client gets its own mailbox and its own queued
/// copy of each command. State-table reads are the exception and always
/// execute on the caller's thread.
pub struct ProvidedInterface {
    component: String,
    name: String,
    policy: QueueingPolicy,
    mailboxes: Option<Arc<TaskMailboxes>>,
    argument_queue_size: usize,
    commands: RwLock<BTreeMap<String, CommandEntry>>,
    events: RwLock<BTreeMap<String, AnyEvent>>,
    clients: Mutex<Vec<String>>,
}

impl ProvidedInterface {
    /// A provided interface with no owning thread. Its commands always
    /// execute on the caller's thread.
    pub fn new(component: impl Into<String>, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(
            component.into(),
            name.into(),
            QueueingPolicy::NotQueued,
            None,
            DEFAULT_ARGUMENT_QUEUE_SIZE,
        ))
    }

    pub(crate) fn for_task(
        component: &str,
        name: &str,
        policy: QueueingPolicy,
        mailboxes: Arc<TaskMailboxes>,
        argument_queue_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self::build(
            component.to_owned(),
            name.to_owned(),
            policy,
            Some(mailboxes),
            argument_queue_size,
        ))
    }

    fn build(
        component: String,
        name: String,
        policy: QueueingPolicy,
        mailboxes: Option<Arc<TaskMailboxes>>,
        argument_queue_size: usize,
    ) -> Self {
        Self {
            component,
            name,
            policy,
            mailboxes,
            argument_queue_size,
            commands: RwLock::new(BTreeMap::new()),
            events: RwLock::new(BTreeMap::new()),
            clients: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// `component.interface`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.component, self.name)
    }

    pub fn policy(&self) -> QueueingPolicy {
        self.policy
    }

    pub fn argument_queue_size(&self) -> usize {
        self.argument_queue_size
    }

    fn is_queued(&self) -> bool {
        self.policy == QueueingPolicy::Queued && self.mailboxes.is_some()
    }

    fn insert(&self, entry: CommandEntry) -> Result<(), InterfaceError> {
        let mut commands = self.commands.write();
        if commands.contains_key(entry.name()) {
            return Err(InterfaceError::DuplicateCommand {
                interface: self.full_name(),
                name: entry.name().to_owned(),
            });
        }
        debug!("{}: add {}", self.full_name(), entry.info().describe());
        commands.insert(entry.name().to_owned(), entry);
        Ok(())
    }

    pub fn add_command_void<F>(&self, name: &str, callable: F) -> Result<(), InterfaceError>
    where
        F: Fn() -> ExecutionResult + Send + Sync + 'static,
    {
        self.insert(CommandEntry::void(CommandVoid::new(name, callable)))
    }

    pub fn add_command_write<A, F>(&self, name: &str, callable: F) -> Result<(), InterfaceError>
    where
        A: Payload,
        F: Fn(&A) -> ExecutionResult + Send + Sync + 'static,
    {
        self.insert(CommandEntry::write(CommandWrite::new(name, callable)))
    }

    /// Read command running user code. On a queued interface it executes on
    /// the owning thread and the caller waits for the result.
    pub fn add_command_read<R, F>(&self, name: &str, callable: F) -> Result<(), InterfaceError>
    where
        R: Payload,
        F: Fn(&mut R) -> ExecutionResult + Send + Sync + 'static,
    {
        self.insert(CommandEntry::read(CommandRead::new(name, callable)))
    }

    pub fn add_command_qualified_read<A, R, F>(
        &self,
        name: &str,
        callable: F,
    ) -> Result<(), InterfaceError>
    where
        A: Payload,
        R: Payload,
        F: Fn(&A, &mut R) -> ExecutionResult + Send + Sync + 'static,
    {
        self.insert(CommandEntry::qualified_read(CommandQualifiedRead::new(
            name, callable,
        )))
    }

    pub fn add_command_void_return<R, F>(
        &self,
        name: &str,
        callable: F,
    ) -> Result<(), InterfaceError>
    where
        R: Payload,
        F: Fn(&mut R) -> ExecutionResult + Send + Sync + 'static,
    {
        self.insert(CommandEntry::void_return(CommandVoidReturn::new(
            name, callable,
        )))
    }

    pub fn add_command_write_return<A, R, F>(
        &self,
        name: &str,
        callable: F,
    ) -> Result<(), InterfaceError>
    where
        A: Payload,
        R: Payload,
        F: Fn(&A, &mut R) -> ExecutionResult + Send + Sync + 'static,
    {
        self.insert(CommandEntry::write_return(CommandWriteReturn::new(
            name, callable,
        )))
    }

    /// Read command returning the latest committed value of a state
    /// element. Executes on the caller's thread.
    pub fn add_command_read_state<T: Payload>(
        &self,
        accessor: &Accessor<T>,
        name: &str,
    ) -> Result<(), InterfaceError> {
        let accessor = accessor.clone();
        let command = CommandRead::new(name, move |out: &mut T| match accessor.latest() {
            Ok(value) => {
                *out = value;
                ExecutionResult::Succeeded
            }
            Err(_) => ExecutionResult::MethodOrFunctionFailed,
        });
        self.insert(CommandEntry::immediate(AnyCommand::read(command)))
    }

    /// Qualified read returning the value committed at a given row.
    /// Executes on the caller's thread.
    pub fn add_command_read_state_history<T: Payload>(
        &self,
        accessor: &Accessor<T>,
        name: &str,
    ) -> Result<(), InterfaceError> {
        let accessor = accessor.clone();
        let command = CommandQualifiedRead::new(name, move |when: &StateIndex, out: &mut T| {
            match accessor.get(when) {
                Ok(value) => {
                    *out = value;
                    ExecutionResult::Succeeded
                }
                Err(_) => ExecutionResult::MethodOrFunctionFailed,
            }
        });
        self.insert(CommandEntry::immediate(AnyCommand::qualified_read(command)))
    }

    /// Write command replacing the working value of a state element. The
    /// new value is committed at the owner's next advance.
    pub fn add_command_write_state<T: Payload>(
        &self,
        handle: &StateHandle<T>,
        name: &str,
    ) -> Result<(), InterfaceError> {
        let handle = handle.clone();
        self.insert(CommandEntry::write(CommandWrite::new(name, move |value: &T| {
            handle.set(value.clone());
            ExecutionResult::Succeeded
        })))
    }

    fn insert_event(&self, event: AnyEvent) -> Result<(), InterfaceError> {
        let mut events = self.events.write();
        if events.contains_key(event.name()) {
            return Err(InterfaceError::DuplicateEvent {
                interface: self.full_name(),
                name: event.name().to_owned(),
            });
        }
        events.insert(event.name().to_owned(), event);
        Ok(())
    }

    /// Declares a void event. The owner triggers the returned generator.
    pub fn add_event_void(&self, name: &str) -> Result<Arc<EventVoid>, InterfaceError> {
        let event = EventVoid::new(name);
        self.insert_event(AnyEvent::void(Arc::clone(&event)))?;
        Ok(event)
    }

    pub fn add_event_write<A: Payload>(
        &self,
        name: &str,
    ) -> Result<Arc<EventWrite<A>>, InterfaceError> {
        let event = EventWrite::<A>::new(name);
        self.insert_event(AnyEvent::write(Arc::clone(&event)))?;
        Ok(event)
    }

    pub fn command(&self, name: &str) -> Option<CommandEntry> {
        self.commands.read().get(name).cloned()
    }

    pub fn event(&self, name: &str) -> Option<AnyEvent> {
        self.events.read().get(name).cloned()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.commands.read().keys().cloned().collect()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events.read().keys().cloned().collect()
    }

    fn with_command(&self, name: &str, enabled: bool) -> Result<(), InterfaceError> {
        let commands = self.commands.read();
        let entry = commands
            .get(name)
            .ok_or_else(|| InterfaceError::UnknownCommand {
                interface: self.full_name(),
                name: name.to_owned(),
            })?;
        let command = entry.immediate_command().command();
        if enabled {
            command.enable();
        } else {
            command.disable();
        }
        Ok(())
    }

    /// Re-enables a command for every client.
    pub fn enable_command(&self, name: &str) -> Result<(), InterfaceError> {
        self.with_command(name, true)
    }

    /// Disables a command for every client. Calls return
    /// [`ExecutionResult::Disabled`] without reaching any mailbox.
    pub fn disable_command(&self, name: &str) -> Result<(), InterfaceError> {
        self.with_command(name, false)
    }

    /// Required interfaces currently connected.
    pub fn clients(&self) -> Vec<String> {
        self.clients.lock().clone()
    }

    /// Registers a client and allocates its mailbox when commands are
    /// queued.
    pub(crate) fn attach_client(&self, client: &str) -> Option<Arc<Mailbox>> {
        self.clients.lock().push(client.to_owned());
        if self.is_queued() {
            self.mailboxes.as_ref().map(|m| m.allocate(client))
        } else {
            None
        }
    }

    pub(crate) fn detach_client(&self, client: &str, mailbox: Option<&Arc<Mailbox>>) {
        let mut clients = self.clients.lock();
        if let Some(pos) = clients.iter().position(|c| c == client) {
            clients.remove(pos);
        }
        if let (Some(mailboxes), Some(mailbox)) = (&self.mailboxes, mailbox) {
            mailboxes.retire(mailbox);
        }
    }

    /// One line per command and event.
    pub fn describe(&self) -> String {
        let mut lines = vec![format!("provided interface {}", self.full_name())];
        for entry in self.commands.read().values() {
            let mode = if self.is_queued() && entry.is_queueable() {
                "queued"
            } else {
                "immediate"
            };
            lines.push(format!("  {} [{}]", entry.info().describe(), mode));
        }
        for event in self.events.read().values() {
            lines.push(format!("  event {}", event.info().describe()));
        }
        lines.join("\n")
    }
}

impl fmt::Debug for ProvidedInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvidedInterface")
            .field("name", &self.full_name())
            .field("policy", &self.policy)
            .field("commands", &self.command_names())
            .field("events", &self.event_names())
            .finish()
    }
}
