//! Queued command decorators.
//!
//! A queued command wraps an immediate command and a mailbox. Executing it
//! captures a copy of the argument, appends an invocation to the mailbox and
//! either returns [`ExecutionResult::Queued`] or parks the caller until the
//! owning task has run it.
//!
//! Rules applied before anything reaches the mailbox:
//! - a disabled command returns [`ExecutionResult::Disabled`];
//! - a closed mailbox returns [`ExecutionResult::NoMailbox`];
//! - a command already holding its quota of in-flight arguments returns
//!   [`ExecutionResult::ArgumentQueueFull`];
//! - a blocking call made from the mailbox's own thread runs the wrapped
//!   command directly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;

use mts_core::{Blocking, ExecutionResult, Payload};

use crate::command::{
    Command, CommandHeader, QualifiedReadCommand, ReadCommand, VoidCommand, VoidReturnCommand,
    WriteCommand, WriteReturnCommand,
};
use crate::completion::Completion;
use crate::kind::CommandInfo;
use crate::mailbox::{Mailbox, MailboxEntry};

/// Releases one in-flight argument slot when dropped.
struct ArgumentPermit(Arc<AtomicUsize>);

impl Drop for ArgumentPermit {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Mailbox plus in-flight accounting of one queued command.
struct QueueSlot {
    mailbox: Arc<Mailbox>,
    in_flight: Arc<AtomicUsize>,
    capacity: usize,
}

impl QueueSlot {
    fn new(mailbox: Arc<Mailbox>, capacity: usize) -> Self {
        Self {
            mailbox,
            in_flight: Arc::new(AtomicUsize::new(0)),
            capacity: capacity.max(1),
        }
    }

    fn reserve(&self) -> Option<ArgumentPermit> {
        let capacity = self.capacity;
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            })
            .ok()
            .map(|_| ArgumentPermit(Arc::clone(&self.in_flight)))
    }

    fn runs_inline(&self, blocking: Blocking) -> bool {
        blocking.is_blocking() && self.mailbox.is_owner_thread()
    }

    fn submit<F>(&self, info: &CommandInfo, invoke: F, blocking: Blocking) -> ExecutionResult
    where
        F: FnOnce() -> ExecutionResult + Send + 'static,
    {
        if self.mailbox.is_closed() {
            return ExecutionResult::NoMailbox;
        }
        let Some(permit) = self.reserve() else {
            trace!(
                "command '{}' has {} arguments in flight",
                info.name(),
                self.capacity
            );
            return ExecutionResult::ArgumentQueueFull;
        };

        let mut entry = MailboxEntry::new(info.shared_name(), invoke).with_permit(permit);
        let completion = blocking.is_blocking().then(|| Arc::new(Completion::new()));
        if let Some(completion) = &completion {
            entry = entry.with_completion(Arc::clone(completion));
        }
        if let Err(err) = self.mailbox.write(entry) {
            return err.result();
        }
        match completion {
            Some(completion) => completion.wait(),
            None => ExecutionResult::Queued,
        }
    }

    /// Queues `run` against a copy of `result` and copies the value back
    /// once it has executed.
    fn submit_with_result<R, F>(
        &self,
        info: &CommandInfo,
        result: &mut R,
        run: F,
    ) -> ExecutionResult
    where
        R: Payload,
        F: FnOnce(&mut R) -> ExecutionResult + Send + 'static,
    {
        let cell: Arc<Mutex<Option<R>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&cell);
        let mut value = result.clone();
        let outcome = self.submit(
            info,
            move || {
                let outcome = run(&mut value);
                *sink.lock() = Some(value);
                outcome
            },
            Blocking::Yes,
        );
        if let Some(value) = cell.lock().take() {
            *result = value;
        }
        outcome
    }
}

macro_rules! impl_queued_command {
    ($ty:ident $(< $($g:ident),+ >)?) => {
        impl $(< $($g: Payload),+ >)? Command for $ty $(< $($g),+ >)? {
            fn info(&self) -> &CommandInfo {
                &self.header.info
            }

            fn is_enabled(&self) -> bool {
                self.header.is_enabled() && self.inner.is_enabled()
            }

            fn enable(&self) {
                self.header.set_enabled(true);
            }

            fn disable(&self) {
                self.header.set_enabled(false);
            }

            fn is_queued(&self) -> bool {
                true
            }
        }

        impl $(< $($g: Payload),+ >)? $ty $(< $($g),+ >)? {
            pub fn mailbox(&self) -> &Arc<Mailbox> {
                &self.slot.mailbox
            }

            /// Invocations queued but not yet executed or released.
            pub fn in_flight(&self) -> usize {
                self.slot.in_flight.load(Ordering::Acquire)
            }

            pub fn argument_queue_size(&self) -> usize {
                self.slot.capacity
            }
        }
    };
}

/// Queued void command.
pub struct QueuedVoid {
    header: CommandHeader,
    inner: Arc<dyn VoidCommand>,
    slot: QueueSlot,
}

impl QueuedVoid {
    pub fn new(
        inner: Arc<dyn VoidCommand>,
        mailbox: Arc<Mailbox>,
        argument_queue_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            header: CommandHeader::new(inner.info().clone()),
            inner,
            slot: QueueSlot::new(mailbox, argument_queue_size),
        })
    }
}

impl_queued_command!(QueuedVoid);

impl VoidCommand for QueuedVoid {
    fn execute(&self, blocking: Blocking) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        if self.slot.runs_inline(blocking) {
            return self.inner.execute(blocking);
        }
        let inner = Arc::clone(&self.inner);
        self.slot
            .submit(&self.header.info, move || inner.execute(Blocking::No), blocking)
    }
}

/// Queued write command. The argument is copied at enqueue time.
pub struct QueuedWrite<A> {
    header: CommandHeader,
    inner: Arc<dyn WriteCommand<A>>,
    slot: QueueSlot,
}

impl<A: Payload> QueuedWrite<A> {
    pub fn new(
        inner: Arc<dyn WriteCommand<A>>,
        mailbox: Arc<Mailbox>,
        argument_queue_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            header: CommandHeader::new(inner.info().clone()),
            inner,
            slot: QueueSlot::new(mailbox, argument_queue_size),
        })
    }
}

impl_queued_command!(QueuedWrite<A>);

impl<A: Payload> WriteCommand<A> for QueuedWrite<A> {
    fn execute(&self, argument: &A, blocking: Blocking) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        if self.slot.runs_inline(blocking) {
            return self.inner.execute(argument, blocking);
        }
        let inner = Arc::clone(&self.inner);
        let argument = argument.clone();
        self.slot.submit(
            &self.header.info,
            move || inner.execute(&argument, Blocking::No),
            blocking,
        )
    }
}

/// Read command executed on the owning task's thread. Always blocking.
pub struct QueuedRead<R> {
    header: CommandHeader,
    inner: Arc<dyn ReadCommand<R>>,
    slot: QueueSlot,
}

impl<R: Payload> QueuedRead<R> {
    pub fn new(
        inner: Arc<dyn ReadCommand<R>>,
        mailbox: Arc<Mailbox>,
        argument_queue_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            header: CommandHeader::new(inner.info().clone()),
            inner,
            slot: QueueSlot::new(mailbox, argument_queue_size),
        })
    }
}

impl_queued_command!(QueuedRead<R>);

impl<R: Payload> ReadCommand<R> for QueuedRead<R> {
    fn execute(&self, result: &mut R) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        if self.slot.runs_inline(Blocking::Yes) {
            return self.inner.execute(result);
        }
        let inner = Arc::clone(&self.inner);
        self.slot
            .submit_with_result(&self.header.info, result, move |value| inner.execute(value))
    }
}

/// Queued qualified-read command. Always blocking.
pub struct QueuedQualifiedRead<A, R> {
    header: CommandHeader,
    inner: Arc<dyn QualifiedReadCommand<A, R>>,
    slot: QueueSlot,
}

impl<A: Payload, R: Payload> QueuedQualifiedRead<A, R> {
    pub fn new(
        inner: Arc<dyn QualifiedReadCommand<A, R>>,
        mailbox: Arc<Mailbox>,
        argument_queue_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            header: CommandHeader::new(inner.info().clone()),
            inner,
            slot: QueueSlot::new(mailbox, argument_queue_size),
        })
    }
}

impl_queued_command!(QueuedQualifiedRead<A, R>);

impl<A: Payload, R: Payload> QualifiedReadCommand<A, R> for QueuedQualifiedRead<A, R> {
    fn execute(&self, argument: &A, result: &mut R) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        if self.slot.runs_inline(Blocking::Yes) {
            return self.inner.execute(argument, result);
        }
        let inner = Arc::clone(&self.inner);
        let argument = argument.clone();
        self.slot.submit_with_result(&self.header.info, result, move |value| {
            inner.execute(&argument, value)
        })
    }
}

/// Queued void-return command. Always blocking.
pub struct QueuedVoidReturn<R> {
    header: CommandHeader,
    inner: Arc<dyn VoidReturnCommand<R>>,
    slot: QueueSlot,
}

impl<R: Payload> QueuedVoidReturn<R> {
    pub fn new(
        inner: Arc<dyn VoidReturnCommand<R>>,
        mailbox: Arc<Mailbox>,
        argument_queue_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            header: CommandHeader::new(inner.info().clone()),
            inner,
            slot: QueueSlot::new(mailbox, argument_queue_size),
        })
    }
}

impl_queued_command!(QueuedVoidReturn<R>);

impl<R: Payload> VoidReturnCommand<R> for QueuedVoidReturn<R> {
    fn execute(&self, result: &mut R) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        if self.slot.runs_inline(Blocking::Yes) {
            return self.inner.execute(result);
        }
        let inner = Arc::clone(&self.inner);
        self.slot
            .submit_with_result(&self.header.info, result, move |value| inner.execute(value))
    }
}

/// Queued write-return command. Always blocking.
pub struct QueuedWriteReturn<A, R> {
    header: CommandHeader,
    inner: Arc<dyn WriteReturnCommand<A, R>>,
    slot: QueueSlot,
}

impl<A: Payload, R: Payload> QueuedWriteReturn<A, R> {
    pub fn new(
        inner: Arc<dyn WriteReturnCommand<A, R>>,
        mailbox: Arc<Mailbox>,
        argument_queue_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            header: CommandHeader::new(inner.info().clone()),
            inner,
            slot: QueueSlot::new(mailbox, argument_queue_size),
        })
    }
}

impl_queued_command!(QueuedWriteReturn<A, R>);

impl<A: Payload, R: Payload> WriteReturnCommand<A, R> for QueuedWriteReturn<A, R> {
    fn execute(&self, argument: &A, result: &mut R) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        if self.slot.runs_inline(Blocking::Yes) {
            return self.inner.execute(argument, result);
        }
        let inner = Arc::clone(&self.inner);
        let argument = argument.clone();
        self.slot.submit_with_result(&self.header.info, result, move |value| {
            inner.execute(&argument, value)
        })
    }
}
