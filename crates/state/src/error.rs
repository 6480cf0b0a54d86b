use thiserror::Error;

/// Errors reported by state table registration and reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateTableError {
    #[error("state element '{0}' already exists")]
    DuplicateElement(String),
    #[error("no state element named '{0}'")]
    UnknownElement(String),
    #[error("state element '{name}' holds {found}, not {expected}")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },
    #[error("row {index} was overwritten (expected tick {expected}, found {found})")]
    StaleIndex { index: usize, expected: u64, found: u64 },
    #[error("history offset {offset} exceeds the {available} readable rows")]
    OffsetOutOfRange { offset: usize, available: usize },
}
