//! One-shot completion signal for blocking invocations.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use mts_core::ExecutionResult;

/// Completed exactly once by the task that executes a queued invocation.
///
/// The caller parks on [`wait`](Self::wait) until the owning task runs the
/// invocation or the mailbox is closed and the entry released.
#[derive(Debug, Default)]
pub struct Completion {
    state: Mutex<Option<ExecutionResult>>,
    signal: Condvar,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `result` and wakes the waiter. Later calls are ignored.
    pub fn complete(&self, result: ExecutionResult) -> bool {
        let mut state = self.state.lock();
        if state.is_some() {
            return false;
        }
        *state = Some(result);
        self.signal.notify_all();
        true
    }

    pub fn is_complete(&self) -> bool {
        self.state.lock().is_some()
    }

    pub fn wait(&self) -> ExecutionResult {
        let mut state = self.state.lock();
        loop {
            if let Some(result) = *state {
                return result;
            }
            self.signal.wait(&mut state);
        }
    }

    /// Waits at most `timeout`; returns `None` if still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ExecutionResult> {
        let mut state = self.state.lock();
        if state.is_none() {
            let _ = self.signal.wait_while_for(&mut state, |s| s.is_none(), timeout);
        }
        *state
    }
}
