//! Command variants and bind-time descriptors.

use core::fmt;
use std::sync::Arc;

use mts_core::{Payload, Prototype};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Argument shape of a command.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// No data exchanged.
    Void,
    /// Produces a value without caller input.
    Read,
    /// Consumes one input.
    Write,
    /// Produces a value parameterized by one input.
    QualifiedRead,
    /// Request/response without input.
    VoidReturn,
    /// Request/response with one input.
    WriteReturn,
}

impl CommandKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Read => "read",
            Self::Write => "write",
            Self::QualifiedRead => "qualified-read",
            Self::VoidReturn => "void-return",
            Self::WriteReturn => "write-return",
        }
    }

    /// `true` when the variant takes a caller-supplied argument.
    pub const fn has_argument(self) -> bool {
        matches!(self, Self::Write | Self::QualifiedRead | Self::WriteReturn)
    }

    /// `true` when the variant hands a value back to the caller.
    pub const fn has_result(self) -> bool {
        matches!(
            self,
            Self::Read | Self::QualifiedRead | Self::VoidReturn | Self::WriteReturn
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name, variant and type descriptors of a command.
///
/// Captured once when the command is bound and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    name: Arc<str>,
    kind: CommandKind,
    argument: Option<Prototype>,
    result: Option<Prototype>,
}

impl CommandInfo {
    fn new(
        name: &str,
        kind: CommandKind,
        argument: Option<Prototype>,
        result: Option<Prototype>,
    ) -> Self {
        Self {
            name: Arc::from(name),
            kind,
            argument,
            result,
        }
    }

    pub fn void(name: &str) -> Self {
        Self::new(name, CommandKind::Void, None, None)
    }

    pub fn read<R: Payload>(name: &str) -> Self {
        Self::new(name, CommandKind::Read, None, Some(Prototype::of::<R>()))
    }

    pub fn write<A: Payload>(name: &str) -> Self {
        Self::new(name, CommandKind::Write, Some(Prototype::of::<A>()), None)
    }

    pub fn qualified_read<A: Payload, R: Payload>(name: &str) -> Self {
        Self::new(
            name,
            CommandKind::QualifiedRead,
            Some(Prototype::of::<A>()),
            Some(Prototype::of::<R>()),
        )
    }

    pub fn void_return<R: Payload>(name: &str) -> Self {
        Self::new(name, CommandKind::VoidReturn, None, Some(Prototype::of::<R>()))
    }

    pub fn write_return<A: Payload, R: Payload>(name: &str) -> Self {
        Self::new(
            name,
            CommandKind::WriteReturn,
            Some(Prototype::of::<A>()),
            Some(Prototype::of::<R>()),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn argument_prototype(&self) -> Option<Prototype> {
        self.argument
    }

    pub fn result_prototype(&self) -> Option<Prototype> {
        self.result
    }

    /// Human-readable signature, e.g. `write SetGain(f64) -> ()`.
    pub fn describe(&self) -> String {
        let argument = self
            .argument
            .map(|p| p.short_name())
            .unwrap_or_default();
        let result = self
            .result
            .map(|p| p.short_name())
            .unwrap_or_else(|| "()".to_owned());
        format!("{} {}({}) -> {}", self.kind, self.name, argument, result)
    }
}
