//! Function handles: the client side of a command.
//!
//! A function starts unbound. Connecting its required interface binds it to
//! a command of the peer's provided interface; disconnecting detaches it.
//! Clones share one binding, so a component can keep a copy of the handle
//! it registered with its required interface.
//!
//! Executing an unbound function returns
//! [`ExecutionResult::FunctionNotBound`] and invokes nothing.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use mts_core::{Blocking, ExecutionResult, Payload, Prototype};

use crate::command::{
    QualifiedReadCommand, ReadCommand, VoidCommand, VoidReturnCommand, WriteCommand,
    WriteReturnCommand,
};
use crate::entry::AnyCommand;
use crate::error::BindError;
use crate::kind::CommandKind;

/// Type-erased view of a function handle, used by required interfaces.
pub trait FunctionBinding: Send + Sync {
    fn kind(&self) -> CommandKind;

    fn argument_prototype(&self) -> Option<Prototype>;

    fn result_prototype(&self) -> Option<Prototype>;

    /// Binds to `command` after checking variant and prototypes.
    fn bind_any(&self, command: &AnyCommand) -> Result<(), BindError>;

    fn detach(&self);

    fn is_valid(&self) -> bool;

    /// Description of the bound command, if any.
    fn bound_description(&self) -> Option<String>;
}

fn check_kind(expected: CommandKind, command: &AnyCommand) -> Result<(), BindError> {
    if command.kind() == expected {
        Ok(())
    } else {
        Err(BindError::KindMismatch {
            expected,
            found: command.kind(),
        })
    }
}

fn prototype_mismatch(
    argument: Option<Prototype>,
    result: Option<Prototype>,
    command: &AnyCommand,
) -> BindError {
    let render = |a: Option<Prototype>, r: Option<Prototype>| {
        format!(
            "({}) -> {}",
            a.map(|p| p.short_name()).unwrap_or_default(),
            r.map(|p| p.short_name()).unwrap_or_else(|| "()".to_owned())
        )
    };
    BindError::PrototypeMismatch {
        expected: render(argument, result),
        found: render(
            command.info().argument_prototype(),
            command.info().result_prototype(),
        ),
    }
}

macro_rules! function_handle {
    (
        $(#[$meta:meta])*
        $name:ident [$($g:ident),*] => $command:ty,
        kind: $kind:expr,
        cast: $cast:ident,
        argument: $argument:expr,
        result: $result:expr $(,)?
    ) => {
        $(#[$meta])*
        pub struct $name<$($g),*> {
            binding: Arc<RwLock<Option<Arc<$command>>>>,
        }

        impl<$($g: Payload),*> $name<$($g),*> {
            pub fn new() -> Self {
                Self {
                    binding: Arc::new(RwLock::new(None)),
                }
            }

            pub fn bind(&self, command: Arc<$command>) {
                *self.binding.write() = Some(command);
            }

            pub fn detach(&self) {
                self.binding.write().take();
            }

            pub fn is_valid(&self) -> bool {
                self.binding.read().is_some()
            }

            /// The bound command, if any.
            pub fn command(&self) -> Option<Arc<$command>> {
                self.binding.read().clone()
            }
        }

        impl<$($g: Payload),*> Clone for $name<$($g),*> {
            fn clone(&self) -> Self {
                Self {
                    binding: Arc::clone(&self.binding),
                }
            }
        }

        impl<$($g: Payload),*> Default for $name<$($g),*> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<$($g: Payload),*> fmt::Debug for $name<$($g),*> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("bound", &self.is_valid())
                    .finish()
            }
        }

        impl<$($g: Payload),*> FunctionBinding for $name<$($g),*> {
            fn kind(&self) -> CommandKind {
                $kind
            }

            fn argument_prototype(&self) -> Option<Prototype> {
                $argument
            }

            fn result_prototype(&self) -> Option<Prototype> {
                $result
            }

            fn bind_any(&self, command: &AnyCommand) -> Result<(), BindError> {
                check_kind($kind, command)?;
                let typed = command.$cast::<$($g),*>().ok_or_else(|| {
                    prototype_mismatch($argument, $result, command)
                })?;
                self.bind(typed);
                Ok(())
            }

            fn detach(&self) {
                $name::detach(self);
            }

            fn is_valid(&self) -> bool {
                $name::is_valid(self)
            }

            fn bound_description(&self) -> Option<String> {
                self.command().map(|c| c.describe())
            }
        }
    };
}

function_handle! {
    /// Handle invoking a void command.
    FunctionVoid [] => dyn VoidCommand,
    kind: CommandKind::Void,
    cast: as_void,
    argument: None,
    result: None,
}

function_handle! {
    /// Handle invoking a write command.
    FunctionWrite [A] => dyn WriteCommand<A>,
    kind: CommandKind::Write,
    cast: as_write,
    argument: Some(Prototype::of::<A>()),
    result: None,
}

function_handle! {
    /// Handle invoking a read command.
    FunctionRead [R] => dyn ReadCommand<R>,
    kind: CommandKind::Read,
    cast: as_read,
    argument: None,
    result: Some(Prototype::of::<R>()),
}

function_handle! {
    FunctionQualifiedRead [A, R] => dyn QualifiedReadCommand<A, R>,
    kind: CommandKind::QualifiedRead,
    cast: as_qualified_read,
    argument: Some(Prototype::of::<A>()),
    result: Some(Prototype::of::<R>()),
}

function_handle! {
    FunctionVoidReturn [R] => dyn VoidReturnCommand<R>,
    kind: CommandKind::VoidReturn,
    cast: as_void_return,
    argument: None,
    result: Some(Prototype::of::<R>()),
}

function_handle! {
    FunctionWriteReturn [A, R] => dyn WriteReturnCommand<A, R>,
    kind: CommandKind::WriteReturn,
    cast: as_write_return,
    argument: Some(Prototype::of::<A>()),
    result: Some(Prototype::of::<R>()),
}

impl FunctionVoid {
    /// Queues the call and returns without waiting.
    pub fn execute(&self) -> ExecutionResult {
        self.execute_with(Blocking::No)
    }

    /// Returns once the provider has executed the call.
    pub fn execute_blocking(&self) -> ExecutionResult {
        self.execute_with(Blocking::Yes)
    }

    pub fn execute_with(&self, blocking: Blocking) -> ExecutionResult {
        match self.command() {
            Some(command) => command.execute(blocking),
            None => ExecutionResult::FunctionNotBound,
        }
    }
}

impl<A: Payload> FunctionWrite<A> {
    pub fn execute(&self, argument: &A) -> ExecutionResult {
        self.execute_with(argument, Blocking::No)
    }

    pub fn execute_blocking(&self, argument: &A) -> ExecutionResult {
        self.execute_with(argument, Blocking::Yes)
    }

    pub fn execute_with(&self, argument: &A, blocking: Blocking) -> ExecutionResult {
        match self.command() {
            Some(command) => command.execute(argument, blocking),
            None => ExecutionResult::FunctionNotBound,
        }
    }
}

impl<R: Payload> FunctionRead<R> {
    pub fn execute(&self, result: &mut R) -> ExecutionResult {
        match self.command() {
            Some(command) => command.execute(result),
            None => ExecutionResult::FunctionNotBound,
        }
    }
}

impl<A: Payload, R: Payload> FunctionQualifiedRead<A, R> {
    pub fn execute(&self, argument: &A, result: &mut R) -> ExecutionResult {
        match self.command() {
            Some(command) => command.execute(argument, result),
            None => ExecutionResult::FunctionNotBound,
        }
    }
}

impl<R: Payload> FunctionVoidReturn<R> {
    pub fn execute(&self, result: &mut R) -> ExecutionResult {
        match self.command() {
            Some(command) => command.execute(result),
            None => ExecutionResult::FunctionNotBound,
        }
    }
}

impl<A: Payload, R: Payload> FunctionWriteReturn<A, R> {
    pub fn execute(&self, argument: &A, result: &mut R) -> ExecutionResult {
        match self.command() {
            Some(command) => command.execute(argument, result),
            None => ExecutionResult::FunctionNotBound,
        }
    }
}
