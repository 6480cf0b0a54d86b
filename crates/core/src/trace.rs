//! Structured kernel trace records.
//!
//! The kernel reports notable events (state changes, mailbox overflow,
//! period overruns, connections) through an optional hook. Hooks are plain
//! closures so applications can forward records to a logger, a binary trace
//! stream or a test probe.

use std::sync::Arc;
use std::time::Duration;

use crate::state::ComponentState;

/// A single kernel trace record.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceRecord {
    StateChange {
        component: String,
        from: ComponentState,
        to: ComponentState,
    },
    MailboxFull {
        mailbox: String,
        command: String,
    },
    /// Pending entries completed with a failure because the mailbox closed.
    MailboxReleased {
        mailbox: String,
        pending: usize,
    },
    PeriodOverrun {
        component: String,
        elapsed: Duration,
        period: Duration,
    },
    Connected {
        client: String,
        required: String,
        server: String,
        provided: String,
    },
    Disconnected {
        client: String,
        required: String,
        server: String,
        provided: String,
    },
}

/// Callback receiving kernel trace records.
pub type TraceHook = Arc<dyn Fn(&TraceRecord) + Send + Sync>;

/// Forwards `record` to `hook` when one is installed.
#[inline]
pub fn emit(hook: Option<&TraceHook>, record: impl FnOnce() -> TraceRecord) {
    if let Some(hook) = hook {
        hook(&record());
    }
}
