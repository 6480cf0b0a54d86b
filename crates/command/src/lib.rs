//! # mts-command
//!
//! Commands are named, typed operations exposed by provided interfaces;
//! functions are the client-side handles through which required interfaces
//! invoke them.
//!
//! ## Module Overview
//! - [`kind`]       – command variants and their bind-time descriptors.
//! - [`command`]    – the command traits and the immediate implementations.
//! - [`callable`]   – binding commands to methods of a shared instance.
//! - [`mailbox`]    – bounded multi-producer/single-consumer invocation queue.
//! - [`completion`] – one-shot completion signal used by blocking calls.
//! - [`queued`]     – decorators turning "execute" into "enqueue".
//! - [`entry`]      – type-erased commands as stored by interfaces.
//! - [`function`]   – client handles bound to commands.
//! - [`event`]      – multicast event generators.

#![forbid(unsafe_code)]

pub mod callable;
pub mod command;
pub mod completion;
pub mod entry;
pub mod error;
pub mod event;
pub mod function;
pub mod kind;
pub mod mailbox;
pub mod queued;

pub use callable::Instance;
pub use command::{
    Command, CommandQualifiedRead, CommandRead, CommandVoid, CommandVoidReturn, CommandWrite,
    CommandWriteReturn, QualifiedReadCommand, ReadCommand, VoidCommand, VoidReturnCommand,
    WriteCommand, WriteReturnCommand,
};
pub use completion::Completion;
pub use entry::{AnyCommand, CommandEntry};
pub use error::BindError;
pub use event::{AnyEvent, EventVoid, EventWrite, ObserverId};
pub use function::{
    FunctionBinding, FunctionQualifiedRead, FunctionRead, FunctionVoid, FunctionVoidReturn,
    FunctionWrite, FunctionWriteReturn,
};
pub use kind::{CommandInfo, CommandKind};
pub use mailbox::{Mailbox, MailboxEntry, MailboxStats, MailboxWriteError, WakeSignal};
pub use queued::{
    QueuedQualifiedRead, QueuedRead, QueuedVoid, QueuedVoidReturn, QueuedWrite,
    QueuedWriteReturn,
};

pub use mts_core::{Blocking, ExecutionResult, Payload, Prototype};

#[cfg(test)]
mod tests;
