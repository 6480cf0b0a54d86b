use thiserror::Error;

use crate::kind::CommandKind;

/// Reasons a function or event handler cannot be bound to a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("expected a {expected} command, found {found}")]
    KindMismatch {
        expected: CommandKind,
        found: CommandKind,
    },
    #[error("prototype mismatch: expected {expected}, found {found}")]
    PrototypeMismatch { expected: String, found: String },
}
