//! Type-erased commands as stored by interfaces.
//!
//! Interfaces keep commands of many argument types in one table. An
//! [`AnyCommand`] remembers both the object-safe [`Command`] view and the
//! typed trait object, so a function handle can recover the exact typed
//! command once its own prototypes have been checked.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use mts_core::Payload;

use crate::command::{
    Command, QualifiedReadCommand, ReadCommand, VoidCommand, VoidReturnCommand, WriteCommand,
    WriteReturnCommand,
};
use crate::kind::{CommandInfo, CommandKind};
use crate::mailbox::Mailbox;
use crate::queued::{
    QueuedQualifiedRead, QueuedRead, QueuedVoid, QueuedVoidReturn, QueuedWrite,
    QueuedWriteReturn,
};

/// A command of any variant and argument type.
#[derive(Clone)]
pub struct AnyCommand {
    base: Arc<dyn Command>,
    typed: Arc<dyn Any + Send + Sync>,
}

impl AnyCommand {
    pub fn void<C: VoidCommand + 'static>(command: Arc<C>) -> Self {
        let typed: Arc<dyn VoidCommand> = command.clone();
        Self {
            base: command,
            typed: Arc::new(typed),
        }
    }

    pub fn write<A: Payload, C: WriteCommand<A> + 'static>(command: Arc<C>) -> Self {
        let typed: Arc<dyn WriteCommand<A>> = command.clone();
        Self {
            base: command,
            typed: Arc::new(typed),
        }
    }

    pub fn read<R: Payload, C: ReadCommand<R> + 'static>(command: Arc<C>) -> Self {
        let typed: Arc<dyn ReadCommand<R>> = command.clone();
        Self {
            base: command,
            typed: Arc::new(typed),
        }
    }

    pub fn qualified_read<A: Payload, R: Payload, C: QualifiedReadCommand<A, R> + 'static>(
        command: Arc<C>,
    ) -> Self {
        let typed: Arc<dyn QualifiedReadCommand<A, R>> = command.clone();
        Self {
            base: command,
            typed: Arc::new(typed),
        }
    }

    pub fn void_return<R: Payload, C: VoidReturnCommand<R> + 'static>(command: Arc<C>) -> Self {
        let typed: Arc<dyn VoidReturnCommand<R>> = command.clone();
        Self {
            base: command,
            typed: Arc::new(typed),
        }
    }

    pub fn write_return<A: Payload, R: Payload, C: WriteReturnCommand<A, R> + 'static>(
        command: Arc<C>,
    ) -> Self {
        let typed: Arc<dyn WriteReturnCommand<A, R>> = command.clone();
        Self {
            base: command,
            typed: Arc::new(typed),
        }
    }

    pub fn command(&self) -> &Arc<dyn Command> {
        &self.base
    }

    pub fn info(&self) -> &CommandInfo {
        self.base.info()
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn kind(&self) -> CommandKind {
        self.base.kind()
    }

    fn downcast<T: Clone + 'static>(&self) -> Option<T> {
        self.typed.downcast_ref::<T>().cloned()
    }

    pub fn as_void(&self) -> Option<Arc<dyn VoidCommand>> {
        self.downcast()
    }

    pub fn as_write<A: Payload>(&self) -> Option<Arc<dyn WriteCommand<A>>> {
        self.downcast()
    }

    pub fn as_read<R: Payload>(&self) -> Option<Arc<dyn ReadCommand<R>>> {
        self.downcast()
    }

    pub fn as_qualified_read<A: Payload, R: Payload>(
        &self,
    ) -> Option<Arc<dyn QualifiedReadCommand<A, R>>> {
        self.downcast()
    }

    pub fn as_void_return<R: Payload>(&self) -> Option<Arc<dyn VoidReturnCommand<R>>> {
        self.downcast()
    }

    pub fn as_write_return<A: Payload, R: Payload>(
        &self,
    ) -> Option<Arc<dyn WriteReturnCommand<A, R>>> {
        self.downcast()
    }
}

impl fmt::Debug for AnyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyCommand")
            .field("command", &self.base.describe())
            .finish()
    }
}

type QueueFactory = dyn Fn(Arc<Mailbox>, usize) -> AnyCommand + Send + Sync;

/// A command registered on a provided interface.
///
/// Queueable entries hand every client its own queued decorator, bound to
/// the mailbox allocated for that client, with its own in-flight quota.
#[derive(Clone)]
pub struct CommandEntry {
    immediate: AnyCommand,
    queue: Option<Arc<QueueFactory>>,
}

impl CommandEntry {
    /// An entry that always executes on the caller's thread.
    pub fn immediate(command: AnyCommand) -> Self {
        Self {
            immediate: command,
            queue: None,
        }
    }

    pub fn void<C: VoidCommand + 'static>(command: Arc<C>) -> Self {
        let inner: Arc<dyn VoidCommand> = command.clone();
        Self {
            immediate: AnyCommand::void(command),
            queue: Some(Arc::new(move |mailbox: Arc<Mailbox>, size: usize| {
                AnyCommand::void(QueuedVoid::new(Arc::clone(&inner), mailbox, size))
            })),
        }
    }

    pub fn write<A: Payload, C: WriteCommand<A> + 'static>(command: Arc<C>) -> Self {
        let inner: Arc<dyn WriteCommand<A>> = command.clone();
        Self {
            immediate: AnyCommand::write(command),
            queue: Some(Arc::new(move |mailbox: Arc<Mailbox>, size: usize| {
                AnyCommand::write(QueuedWrite::new(Arc::clone(&inner), mailbox, size))
            })),
        }
    }

    pub fn read<R: Payload, C: ReadCommand<R> + 'static>(command: Arc<C>) -> Self {
        let inner: Arc<dyn ReadCommand<R>> = command.clone();
        Self {
            immediate: AnyCommand::read(command),
            queue: Some(Arc::new(move |mailbox: Arc<Mailbox>, size: usize| {
                AnyCommand::read(QueuedRead::new(Arc::clone(&inner), mailbox, size))
            })),
        }
    }

    pub fn qualified_read<A: Payload, R: Payload, C: QualifiedReadCommand<A, R> + 'static>(
        command: Arc<C>,
    ) -> Self {
        let inner: Arc<dyn QualifiedReadCommand<A, R>> = command.clone();
        Self {
            immediate: AnyCommand::qualified_read(command),
            queue: Some(Arc::new(move |mailbox: Arc<Mailbox>, size: usize| {
                AnyCommand::qualified_read(QueuedQualifiedRead::new(
                    Arc::clone(&inner),
                    mailbox,
                    size,
                ))
            })),
        }
    }

    pub fn void_return<R: Payload, C: VoidReturnCommand<R> + 'static>(command: Arc<C>) -> Self {
        let inner: Arc<dyn VoidReturnCommand<R>> = command.clone();
        Self {
            immediate: AnyCommand::void_return(command),
            queue: Some(Arc::new(move |mailbox: Arc<Mailbox>, size: usize| {
                AnyCommand::void_return(QueuedVoidReturn::new(Arc::clone(&inner), mailbox, size))
            })),
        }
    }

    pub fn write_return<A: Payload, R: Payload, C: WriteReturnCommand<A, R> + 'static>(
        command: Arc<C>,
    ) -> Self {
        let inner: Arc<dyn WriteReturnCommand<A, R>> = command.clone();
        Self {
            immediate: AnyCommand::write_return(command),
            queue: Some(Arc::new(move |mailbox: Arc<Mailbox>, size: usize| {
                AnyCommand::write_return(QueuedWriteReturn::new(
                    Arc::clone(&inner),
                    mailbox,
                    size,
                ))
            })),
        }
    }

    pub fn info(&self) -> &CommandInfo {
        self.immediate.info()
    }

    pub fn name(&self) -> &str {
        self.immediate.name()
    }

    pub fn kind(&self) -> CommandKind {
        self.immediate.kind()
    }

    pub fn is_queueable(&self) -> bool {
        self.queue.is_some()
    }

    /// The wrapped command, executing on the caller's thread.
    pub fn immediate_command(&self) -> &AnyCommand {
        &self.immediate
    }

    /// Command to hand to one client.
    ///
    /// Queueable entries are wrapped in a fresh queued decorator when a
    /// mailbox is supplied; everything else is shared as is.
    pub fn instantiate(
        &self,
        mailbox: Option<&Arc<Mailbox>>,
        argument_queue_size: usize,
    ) -> AnyCommand {
        match (&self.queue, mailbox) {
            (Some(factory), Some(mailbox)) => factory(Arc::clone(mailbox), argument_queue_size),
            _ => self.immediate.clone(),
        }
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("command", &self.immediate.command().describe())
            .field("queueable", &self.is_queueable())
            .finish()
    }
}
