//! Command traits and immediate implementations.
//!
//! A command pairs a [`CommandInfo`] with a callable. Immediate commands run
//! the callable on the caller's thread; the decorators in
//! [`queued`](crate::queued) defer it to the owning task's mailbox.
//!
//! The base [`Command`] trait is object safe and carries everything a
//! connection needs to check compatibility. The typed traits add the
//! variant-specific `execute` signature.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mts_core::{Blocking, ExecutionResult, Payload, Prototype};

use crate::kind::{CommandInfo, CommandKind};

/// Behaviour shared by every command variant.
pub trait Command: Send + Sync {
    fn info(&self) -> &CommandInfo;

    fn is_enabled(&self) -> bool;

    fn enable(&self);

    fn disable(&self);

    /// `true` for commands that defer execution to a mailbox.
    fn is_queued(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        self.info().name()
    }

    fn kind(&self) -> CommandKind {
        self.info().kind()
    }

    fn argument_prototype(&self) -> Option<Prototype> {
        self.info().argument_prototype()
    }

    fn result_prototype(&self) -> Option<Prototype> {
        self.info().result_prototype()
    }

    fn describe(&self) -> String {
        let mut text = self.info().describe();
        if self.is_queued() {
            text.push_str(" [queued]");
        }
        if !self.is_enabled() {
            text.push_str(" [disabled]");
        }
        text
    }
}

pub trait VoidCommand: Command {
    fn execute(&self, blocking: Blocking) -> ExecutionResult;
}

pub trait WriteCommand<A>: Command {
    fn execute(&self, argument: &A, blocking: Blocking) -> ExecutionResult;
}

pub trait ReadCommand<R>: Command {
    fn execute(&self, result: &mut R) -> ExecutionResult;
}

pub trait QualifiedReadCommand<A, R>: Command {
    fn execute(&self, argument: &A, result: &mut R) -> ExecutionResult;
}

/// Request/response command without argument. Always waits for completion.
pub trait VoidReturnCommand<R>: Command {
    fn execute(&self, result: &mut R) -> ExecutionResult;
}

/// Request/response command with argument. Always waits for completion.
pub trait WriteReturnCommand<A, R>: Command {
    fn execute(&self, argument: &A, result: &mut R) -> ExecutionResult;
}

/// Info plus the enable flag every command carries.
#[derive(Debug)]
pub(crate) struct CommandHeader {
    pub(crate) info: CommandInfo,
    enabled: AtomicBool,
}

impl CommandHeader {
    pub(crate) fn new(info: CommandInfo) -> Self {
        Self {
            info,
            enabled: AtomicBool::new(true),
        }
    }

    #[inline]
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

/// Implements [`Command`] for a type holding a `header` field.
macro_rules! impl_command {
    ($ty:ident $(< $($g:ident),+ >)?) => {
        impl $(< $($g: Payload),+ >)? Command for $ty $(< $($g),+ >)? {
            fn info(&self) -> &CommandInfo {
                &self.header.info
            }

            fn is_enabled(&self) -> bool {
                self.header.is_enabled()
            }

            fn enable(&self) {
                self.header.set_enabled(true);
            }

            fn disable(&self) {
                self.header.set_enabled(false);
            }
        }
    };
}

type VoidFn = dyn Fn() -> ExecutionResult + Send + Sync;
type WriteFn<A> = dyn Fn(&A) -> ExecutionResult + Send + Sync;
type ReadFn<R> = dyn Fn(&mut R) -> ExecutionResult + Send + Sync;
type QualifiedFn<A, R> = dyn Fn(&A, &mut R) -> ExecutionResult + Send + Sync;

/// Immediate void command.
pub struct CommandVoid {
    header: CommandHeader,
    callable: Box<VoidFn>,
}

impl CommandVoid {
    pub fn new<F>(name: &str, callable: F) -> Arc<Self>
    where
        F: Fn() -> ExecutionResult + Send + Sync + 'static,
    {
        Arc::new(Self {
            header: CommandHeader::new(CommandInfo::void(name)),
            callable: Box::new(callable),
        })
    }
}

impl_command!(CommandVoid);

impl VoidCommand for CommandVoid {
    fn execute(&self, _blocking: Blocking) -> ExecutionResult {
        if !self.header.is_enabled() {
            return ExecutionResult::Disabled;
        }
        (self.callable)()
    }
}

/// Immediate write command.
pub struct CommandWrite<A> {
    header: CommandHeader,
    callable: Box<WriteFn<A>>,
}

impl<A: Payload> CommandWrite<A> {
    pub fn new<F>(name: &str, callable: F) -> Arc<Self>
    where
        F: Fn(&A) -> ExecutionResult + Send + Sync + 'static,
    {
        Arc::new(Self {
            header: CommandHeader::new(CommandInfo::write::<A>(name)),
            callable: Box::new(callable),
        })
    }
}

impl_command!(CommandWrite<A>);

impl<A: Payload> WriteCommand<A> for CommandWrite<A> {
    fn execute(&self, argument: &A, _blocking: Blocking) -> ExecutionResult {
        if !self.header.is_enabled() {
            return ExecutionResult::Disabled;
        }
        (self.callable)(argument)
    }
}

/// Immediate read command.
///
/// Read commands bound to state-table accessors never need a mailbox: they
/// only look at rows the writer has already published.
pub struct CommandRead<R> {
    header: CommandHeader,
    callable: Box<ReadFn<R>>,
}

impl<R: Payload> CommandRead<R> {
    pub fn new<F>(name: &str, callable: F) -> Arc<Self>
    where
        F: Fn(&mut R) -> ExecutionResult + Send + Sync + 'static,
    {
        Arc::new(Self {
            header: CommandHeader::new(CommandInfo::read::<R>(name)),
            callable: Box::new(callable),
        })
    }
}

impl_command!(CommandRead<R>);

impl<R: Payload> ReadCommand<R> for CommandRead<R> {
    fn execute(&self, result: &mut R) -> ExecutionResult {
        if !self.header.is_enabled() {
            return ExecutionResult::Disabled;
        }
        (self.callable)(result)
    }
}

/// Immediate qualified-read command.
pub struct CommandQualifiedRead<A, R> {
    header: CommandHeader,
    callable: Box<QualifiedFn<A, R>>,
}

impl<A: Payload, R: Payload> CommandQualifiedRead<A, R> {
    pub fn new<F>(name: &str, callable: F) -> Arc<Self>
    where
        F: Fn(&A, &mut R) -> ExecutionResult + Send + Sync + 'static,
    {
        Arc::new(Self {
            header: CommandHeader::new(CommandInfo::qualified_read::<A, R>(name)),
            callable: Box::new(callable),
        })
    }
}

impl_command!(CommandQualifiedRead<A, R>);

impl<A: Payload, R: Payload> QualifiedReadCommand<A, R> for CommandQualifiedRead<A, R> {
    fn execute(&self, argument: &A, result: &mut R) -> ExecutionResult {
        if !self.header.is_enabled() {
            return ExecutionResult::Disabled;
        }
        (self.callable)(argument, result)
    }
}

/// Immediate void-return command.
pub struct CommandVoidReturn<R> {
    header: CommandHeader,
    callable: Box<ReadFn<R>>,
}

impl<R: Payload> CommandVoidReturn<R> {
    pub fn new<F>(name: &str, callable: F) -> Arc<Self>
    where
        F: Fn(&mut R) -> ExecutionResult + Send + Sync + 'static,
    {
        Arc::new(Self {
            header: CommandHeader::new(CommandInfo::void_return::<R>(name)),
            callable: Box::new(callable),
        })
    }
}

impl_command!(CommandVoidReturn<R>);

impl<R: Payload> VoidReturnCommand<R> for CommandVoidReturn<R> {
    fn execute(&self, result: &mut R) -> ExecutionResult {
        if !self.header.is_enabled() {
            return ExecutionResult::Disabled;
        }
        (self.callable)(result)
    }
}

/// Immediate write-return command.
pub struct CommandWriteReturn<A, R> {
    header: CommandHeader,
    callable: Box<QualifiedFn<A, R>>,
}

impl<A: Payload, R: Payload> CommandWriteReturn<A, R> {
    pub fn new<F>(name: &str, callable: F) -> Arc<Self>
    where
        F: Fn(&A, &mut R) -> ExecutionResult + Send + Sync + 'static,
    {
        Arc::new(Self {
            header: CommandHeader::new(CommandInfo::write_return::<A, R>(name)),
            callable: Box::new(callable),
        })
    }
}

impl_command!(CommandWriteReturn<A, R>);

impl<A: Payload, R: Payload> WriteReturnCommand<A, R> for CommandWriteReturn<A, R> {
    fn execute(&self, argument: &A, result: &mut R) -> ExecutionResult {
        if !self.header.is_enabled() {
            return ExecutionResult::Disabled;
        }
        (self.callable)(argument, result)
    }
}
