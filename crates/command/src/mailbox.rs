//! Bounded mailbox of deferred invocations.
//!
//! Many client threads write, only the owning task drains. Entries run in
//! FIFO order. A full mailbox rejects the write instead of growing, and a
//! closed mailbox rejects everything and releases whatever was pending.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use log::{debug, warn};
use parking_lot::{Condvar, Mutex, RwLock};

use mts_core::{emit, ExecutionResult, TraceHook, TraceRecord};

use crate::completion::Completion;

type Invocation = Box<dyn FnOnce() -> ExecutionResult + Send>;

/// A deferred command invocation.
pub struct MailboxEntry {
    command: Arc<str>,
    invoke: Invocation,
    completion: Option<Arc<Completion>>,
    permit: Option<Box<dyn Send>>,
}

impl MailboxEntry {
    pub fn new<F>(command: Arc<str>, invoke: F) -> Self
    where
        F: FnOnce() -> ExecutionResult + Send + 'static,
    {
        Self {
            command,
            invoke: Box::new(invoke),
            completion: None,
            permit: None,
        }
    }

    /// Completion to signal once the entry has run or been released.
    pub fn with_completion(mut self, completion: Arc<Completion>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Attaches a value dropped together with the entry, whether it ran,
    /// was rejected or was released.
    pub fn with_permit<P: Send + 'static>(mut self, permit: P) -> Self {
        self.permit = Some(Box::new(permit));
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn run(self) -> ExecutionResult {
        let Self {
            invoke,
            completion,
            permit,
            ..
        } = self;
        let guard = CompletionGuard(completion);
        let result = invoke();
        drop(permit);
        if let Some(completion) = &guard.0 {
            completion.complete(result);
        }
        result
    }

    fn release(self, result: ExecutionResult) {
        let Self {
            completion, permit, ..
        } = self;
        drop(permit);
        if let Some(completion) = completion {
            completion.complete(result);
        }
    }
}

/// Fails the waiter of an entry whose invocation unwound.
struct CompletionGuard(Option<Arc<Completion>>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(completion) = &self.0 {
            if completion.complete(ExecutionResult::MethodOrFunctionFailed) {
                warn!("queued invocation panicked, releasing its caller");
            }
        }
    }
}

impl fmt::Debug for MailboxEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxEntry")
            .field("command", &self.command)
            .field("blocking", &self.completion.is_some())
            .finish()
    }
}

/// Rejected write. The entry is handed back to the caller.
#[derive(Debug)]
pub enum MailboxWriteError {
    Full(MailboxEntry),
    Closed(MailboxEntry),
}

impl MailboxWriteError {
    pub fn result(&self) -> ExecutionResult {
        match self {
            Self::Full(_) => ExecutionResult::MailboxFull,
            Self::Closed(_) => ExecutionResult::NoMailbox,
        }
    }

    pub fn into_entry(self) -> MailboxEntry {
        match self {
            Self::Full(entry) | Self::Closed(entry) => entry,
        }
    }
}

/// Level-triggered wake-up shared between mailboxes and a waiting task.
#[derive(Debug, Default)]
pub struct WakeSignal {
    pending: Mutex<bool>,
    signal: Condvar,
}

impl WakeSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notify(&self) {
        let mut pending = self.pending.lock();
        *pending = true;
        self.signal.notify_all();
    }

    /// Blocks until notified, then clears the signal.
    pub fn wait(&self) {
        let mut pending = self.pending.lock();
        while !*pending {
            self.signal.wait(&mut pending);
        }
        *pending = false;
    }

    /// Blocks at most `timeout`. Returns `true` if the signal was raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut pending = self.pending.lock();
        if !*pending {
            let _ = self.signal.wait_while_for(&mut pending, |p| !*p, timeout);
        }
        std::mem::replace(&mut *pending, false)
    }
}

/// Counters kept per mailbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStats {
    pub written: u64,
    pub executed: u64,
    pub rejected: u64,
    pub released: u64,
}

struct Queue {
    entries: VecDeque<MailboxEntry>,
    sealed: bool,
    closed: bool,
}

/// Bounded FIFO of [`MailboxEntry`] values owned by one task.
pub struct Mailbox {
    name: String,
    capacity: usize,
    queue: Mutex<Queue>,
    owner: RwLock<Option<ThreadId>>,
    wake: RwLock<Option<Arc<WakeSignal>>>,
    trace: RwLock<Option<TraceHook>>,
    written: AtomicU64,
    executed: AtomicU64,
    rejected: AtomicU64,
    released: AtomicU64,
}

impl Mailbox {
    /// Creates a mailbox holding at most `capacity` entries (at least one).
    pub fn allocate(name: impl Into<String>, capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        Arc::new(Self {
            name: name.into(),
            capacity,
            queue: Mutex::new(Queue {
                entries: VecDeque::with_capacity(capacity),
                sealed: false,
                closed: false,
            }),
            owner: RwLock::new(None),
            wake: RwLock::new(None),
            trace: RwLock::new(None),
            written: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            released: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.queue.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.lock().entries.len() >= self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.queue.lock().closed
    }

    /// Rejects further writes with [`ExecutionResult::NoMailbox`] while
    /// entries already queued stay pending until drained or closed.
    pub fn seal(&self) {
        self.queue.lock().sealed = true;
    }

    /// `true` once sealed or closed.
    pub fn is_sealed(&self) -> bool {
        let queue = self.queue.lock();
        queue.sealed || queue.closed
    }

    /// Records the thread that drains this mailbox.
    pub fn set_owner_thread(&self, id: ThreadId) {
        *self.owner.write() = Some(id);
    }

    pub fn owner_thread(&self) -> Option<ThreadId> {
        *self.owner.read()
    }

    /// `true` when called from the draining thread.
    pub fn is_owner_thread(&self) -> bool {
        self.owner_thread() == Some(thread::current().id())
    }

    /// Signal raised after every accepted write.
    pub fn set_wake_signal(&self, wake: Arc<WakeSignal>) {
        *self.wake.write() = Some(wake);
    }

    pub fn set_trace_hook(&self, hook: Option<TraceHook>) {
        *self.trace.write() = hook;
    }

    /// Appends `entry`. Never blocks.
    pub fn write(&self, entry: MailboxEntry) -> Result<(), MailboxWriteError> {
        {
            let mut queue = self.queue.lock();
            if queue.closed || queue.sealed {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(MailboxWriteError::Closed(entry));
            }
            if queue.entries.len() >= self.capacity {
                drop(queue);
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!("mailbox '{}' full, rejecting '{}'", self.name, entry.command);
                emit(self.trace.read().as_ref(), || TraceRecord::MailboxFull {
                    mailbox: self.name.clone(),
                    command: entry.command.to_string(),
                });
                return Err(MailboxWriteError::Full(entry));
            }
            queue.entries.push_back(entry);
        }
        self.written.fetch_add(1, Ordering::Relaxed);
        if let Some(wake) = self.wake.read().as_ref() {
            wake.notify();
        }
        Ok(())
    }

    /// Runs the oldest entry. Returns `false` when the mailbox was empty.
    pub fn execute_next(&self) -> bool {
        debug_assert!(
            self.owner_thread().map_or(true, |id| id == thread::current().id()),
            "mailbox '{}' drained from a foreign thread",
            self.name
        );
        let entry = self.queue.lock().entries.pop_front();
        match entry {
            Some(entry) => {
                entry.run();
                self.executed.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Runs entries until the mailbox is empty. Returns how many ran.
    pub fn process(&self) -> usize {
        let mut count = 0;
        while self.execute_next() {
            count += 1;
        }
        count
    }

    /// Closes the mailbox and completes pending entries with
    /// [`ExecutionResult::NoMailbox`]. Returns how many were released.
    pub fn close(&self) -> usize {
        let pending: Vec<MailboxEntry> = {
            let mut queue = self.queue.lock();
            queue.closed = true;
            queue.entries.drain(..).collect()
        };
        let count = pending.len();
        for entry in pending {
            entry.release(ExecutionResult::NoMailbox);
        }
        if count > 0 {
            self.released.fetch_add(count as u64, Ordering::Relaxed);
            debug!("mailbox '{}' closed, released {} entries", self.name, count);
            emit(self.trace.read().as_ref(), || TraceRecord::MailboxReleased {
                mailbox: self.name.clone(),
                pending: count,
            });
        }
        count
    }

    pub fn stats(&self) -> MailboxStats {
        MailboxStats {
            written: self.written.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
