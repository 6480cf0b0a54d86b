//! Required interfaces: the functions and event handlers a component needs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::warn;
use parking_lot::{Mutex, RwLock};

use mts_command::{
    AnyEvent, BindError, CommandEntry, CommandKind, CommandVoid, CommandWrite, FunctionBinding,
    Mailbox, ObserverId,
};
use mts_core::{ExecutionResult, Payload, Prototype, DEFAULT_ARGUMENT_QUEUE_SIZE};

use crate::mailboxes::TaskMailboxes;
use crate::provided::ProvidedInterface;

/// Whether a component can start without a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requirement {
    #[default]
    Mandatory,
    Optional,
}

pub(crate) struct FunctionSlot {
    pub(crate) binding: Arc<dyn FunctionBinding>,
    pub(crate) mandatory: bool,
}

type AttachFn =
    dyn Fn(&AnyEvent, Option<&Arc<Mailbox>>, usize) -> Result<ObserverId, BindError> + Send + Sync;
type DetachFn = dyn Fn(&AnyEvent, ObserverId) + Send + Sync;

#[derive(Clone)]
pub(crate) struct HandlerSlot {
    pub(crate) kind: CommandKind,
    pub(crate) argument: Option<Prototype>,
    pub(crate) queued: bool,
    pub(crate) attach: Arc<AttachFn>,
    pub(crate) detach: Arc<DetachFn>,
}

pub(crate) struct Observer {
    pub(crate) event: AnyEvent,
    pub(crate) detach: Arc<DetachFn>,
    pub(crate) id: ObserverId,
}

impl Observer {
    pub(crate) fn remove(self) {
        (self.detach)(&self.event, self.id);
    }
}

pub(crate) struct Connection {
    pub(crate) provided: Arc<ProvidedInterface>,
    pub(crate) mailbox: Option<Arc<Mailbox>>,
    pub(crate) observers: Vec<Observer>,
}

/// Named set of functions and event handlers one component expects a
/// provided interface to satisfy.
pub struct RequiredInterface {
    component: String,
    name: String,
    requirement: Requirement,
    mailboxes: Option<Arc<TaskMailboxes>>,
    argument_queue_size: usize,
    event_mailbox: Mutex<Option<Arc<Mailbox>>>,
    functions: RwLock<BTreeMap<String, FunctionSlot>>,
    handlers: RwLock<BTreeMap<String, HandlerSlot>>,
    pub(crate) connection: Mutex<Option<Connection>>,
}

impl RequiredInterface {
    /// A required interface with no owning thread. Queued event handlers
    /// degrade to immediate ones.
    pub fn new(
        component: impl Into<String>,
        name: impl Into<String>,
        requirement: Requirement,
    ) -> Arc<Self> {
        Arc::new(Self::build(
            component.into(),
            name.into(),
            requirement,
            None,
            DEFAULT_ARGUMENT_QUEUE_SIZE,
        ))
    }

    pub(crate) fn for_task(
        component: &str,
        name: &str,
        requirement: Requirement,
        mailboxes: Arc<TaskMailboxes>,
        argument_queue_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self::build(
            component.to_owned(),
            name.to_owned(),
            requirement,
            Some(mailboxes),
            argument_queue_size,
        ))
    }

    fn build(
        component: String,
        name: String,
        requirement: Requirement,
        mailboxes: Option<Arc<TaskMailboxes>>,
        argument_queue_size: usize,
    ) -> Self {
        Self {
            component,
            name,
            requirement,
            mailboxes,
            argument_queue_size,
            event_mailbox: Mutex::new(None),
            functions: RwLock::new(BTreeMap::new()),
            handlers: RwLock::new(BTreeMap::new()),
            connection: Mutex::new(None),
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

    pub fn requirement(&self) -> Requirement {
        self.requirement
    }

    pub fn is_mandatory(&self) -> bool {
        self.requirement == Requirement::Mandatory
    }

    fn insert_function<F>(
        &self,
        name: &str,
        function: &F,
        mandatory: bool,
    ) -> Result<(), crate::InterfaceError>
    where
        F: FunctionBinding + Clone + 'static,
    {
        let mut functions = self.functions.write();
        if functions.contains_key(name) {
            return Err(crate::InterfaceError::DuplicateFunction {
                interface: self.full_name(),
                name: name.to_owned(),
            });
        }
        functions.insert(
            name.to_owned(),
            FunctionSlot {
                binding: Arc::new(function.clone()),
                mandatory,
            },
        );
        Ok(())
    }

    /// Registers `function` under `name`. Connecting fails when the
    /// provided interface lacks a matching command.
    ///
    /// The interface keeps a clone of the handle; clones share their
    /// binding, so the caller's copy is bound by the connection.
    pub fn add_function<F>(&self, name: &str, function: &F) -> Result<(), crate::InterfaceError>
    where
        F: FunctionBinding + Clone + 'static,
    {
        self.insert_function(name, function, true)
    }

    /// Like [`add_function`](Self::add_function), but a missing command
    /// leaves the function unbound instead of failing the connection.
    pub fn add_optional_function<F>(
        &self,
        name: &str,
        function: &F,
    ) -> Result<(), crate::InterfaceError>
    where
        F: FunctionBinding + Clone + 'static,
    {
        self.insert_function(name, function, false)
    }

    fn insert_handler(&self, name: &str, slot: HandlerSlot) -> Result<(), crate::InterfaceError> {
        let mut handlers = self.handlers.write();
        if handlers.contains_key(name) {
            return Err(crate::InterfaceError::DuplicateHandler {
                interface: self.full_name(),
                name: name.to_owned(),
            });
        }
        handlers.insert(name.to_owned(), slot);
        Ok(())
    }

    /// Handles the void event `name`. Queued handlers run on the owning
    /// task's thread.
    pub fn add_event_handler_void<F>(
        &self,
        name: &str,
        callable: F,
        queued: bool,
    ) -> Result<(), crate::InterfaceError>
    where
        F: Fn() -> ExecutionResult + Send + Sync + 'static,
    {
        let entry = CommandEntry::void(CommandVoid::new(name, callable));
        let attach = move |event: &AnyEvent,
                           mailbox: Option<&Arc<Mailbox>>,
                           size: usize|
              -> Result<ObserverId, BindError> {
            let generator = event.as_void().ok_or(BindError::KindMismatch {
                expected: CommandKind::Void,
                found: event.kind(),
            })?;
            let handler = entry.instantiate(mailbox, size).as_void().ok_or(
                BindError::KindMismatch {
                    expected: CommandKind::Void,
                    found: event.kind(),
                },
            )?;
            Ok(generator.add_observer(handler))
        };
        let detach = |event: &AnyEvent, id: ObserverId| {
            if let Some(generator) = event.as_void() {
                generator.remove_observer(id);
            }
        };
        self.insert_handler(
            name,
            HandlerSlot {
                kind: CommandKind::Void,
                argument: None,
                queued,
                attach: Arc::new(attach),
                detach: Arc::new(detach),
            },
        )
    }

    /// Handles the event `name` carrying an `A` payload.
    pub fn add_event_handler_write<A, F>(
        &self,
        name: &str,
        callable: F,
        queued: bool,
    ) -> Result<(), crate::InterfaceError>
    where
        A: Payload,
        F: Fn(&A) -> ExecutionResult + Send + Sync + 'static,
    {
        let entry = CommandEntry::write(CommandWrite::new(name, callable));
        let attach = move |event: &AnyEvent,
                           mailbox: Option<&Arc<Mailbox>>,
                           size: usize|
              -> Result<ObserverId, BindError> {
            let mismatch = || BindError::PrototypeMismatch {
                expected: Prototype::of::<A>().short_name(),
                found: event
                    .argument_prototype()
                    .map(|p| p.short_name())
                    .unwrap_or_default(),
            };
            let generator = event.as_write::<A>().ok_or_else(mismatch)?;
            let handler = entry
                .instantiate(mailbox, size)
                .as_write::<A>()
                .ok_or_else(mismatch)?;
            Ok(generator.add_observer(handler))
        };
        let detach = |event: &AnyEvent, id: ObserverId| {
            if let Some(generator) = event.as_write::<A>() {
                generator.remove_observer(id);
            }
        };
        self.insert_handler(
            name,
            HandlerSlot {
                kind: CommandKind::Write,
                argument: Some(Prototype::of::<A>()),
                queued,
                attach: Arc::new(attach),
                detach: Arc::new(detach),
            },
        )
    }

    pub fn function_names(&self) -> Vec<String> {
        self.functions.read().keys().cloned().collect()
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Full name of the provided interface this one is connected to.
    pub fn connected_to(&self) -> Option<String> {
        self.connection
            .lock()
            .as_ref()
            .map(|c| c.provided.full_name())
    }

    pub(crate) fn argument_queue_size(&self) -> usize {
        self.argument_queue_size
    }

    pub(crate) fn function_slots(&self) -> Vec<(String, Arc<dyn FunctionBinding>, bool)> {
        self.functions
            .read()
            .iter()
            .map(|(name, slot)| (name.clone(), Arc::clone(&slot.binding), slot.mandatory))
            .collect()
    }

    pub(crate) fn handler_slots(&self) -> Vec<(String, HandlerSlot)> {
        self.handlers
            .read()
            .iter()
            .map(|(name, slot)| (name.clone(), slot.clone()))
            .collect()
    }

    /// Mailbox receiving queued event handlers, allocated on first use.
    pub(crate) fn event_mailbox(&self) -> Option<Arc<Mailbox>> {
        let mailboxes = match &self.mailboxes {
            Some(mailboxes) => mailboxes,
            None => {
                warn!(
                    "{}: no owning task, queued event handlers run immediately",
                    self.full_name()
                );
                return None;
            }
        };
        let mut slot = self.event_mailbox.lock();
        let mailbox =
            slot.get_or_insert_with(|| mailboxes.allocate(&format!("{}.events", self.name)));
        Some(Arc::clone(mailbox))
    }
}

impl fmt::Debug for RequiredInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequiredInterface")
            .field("name", &self.full_name())
            .field("requirement", &self.requirement)
            .field("functions", &self.function_names())
            .field("connected_to", &self.connected_to())
            .finish()
    }
}
