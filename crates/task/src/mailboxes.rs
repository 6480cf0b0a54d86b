//! Mailboxes owned by one task.

use std::sync::Arc;
use std::thread::ThreadId;

use log::debug;
use parking_lot::{Mutex, RwLock};

use mts_command::{Mailbox, WakeSignal};
use mts_core::TraceHook;

struct Registry {
    active: Vec<Arc<Mailbox>>,
    retired: Vec<Arc<Mailbox>>,
    closed: bool,
}

/// Every mailbox a task drains, in registration order.
///
/// Mailboxes are allocated lazily, one per connection to a queued provided
/// interface plus one per required interface with queued event handlers.
pub struct TaskMailboxes {
    task: String,
    capacity: usize,
    registry: Mutex<Registry>,
    owner: RwLock<Option<ThreadId>>,
    trace: RwLock<Option<TraceHook>>,
    wake: Arc<WakeSignal>,
}

impl TaskMailboxes {
    pub fn new(task: impl Into<String>, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            task: task.into(),
            capacity,
            registry: Mutex::new(Registry {
                active: Vec::new(),
                retired: Vec::new(),
                closed: false,
            }),
            owner: RwLock::new(None),
            trace: RwLock::new(None),
            wake: WakeSignal::new(),
        })
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Signal raised by every write to one of these mailboxes.
    pub fn wake_signal(&self) -> &Arc<WakeSignal> {
        &self.wake
    }

    /// Allocates and registers a mailbox for `client`.
    pub fn allocate(&self, client: &str) -> Arc<Mailbox> {
        let mailbox = Mailbox::allocate(format!("{}<-{}", self.task, client), self.capacity);
        mailbox.set_wake_signal(Arc::clone(&self.wake));
        mailbox.set_trace_hook(self.trace.read().clone());

        let mut registry = self.registry.lock();
        if let Some(owner) = *self.owner.read() {
            mailbox.set_owner_thread(owner);
        }
        if registry.closed {
            mailbox.close();
        }
        registry.active.push(Arc::clone(&mailbox));
        debug!("task '{}': allocated mailbox '{}'", self.task, mailbox.name());
        mailbox
    }

    /// Seals `mailbox` against new writes. It stays registered until the
    /// next drain empties and closes it, or until [`close_all`].
    ///
    /// [`close_all`]: Self::close_all
    pub fn retire(&self, mailbox: &Arc<Mailbox>) {
        let mut registry = self.registry.lock();
        if let Some(pos) = registry.active.iter().position(|m| Arc::ptr_eq(m, mailbox)) {
            let mailbox = registry.active.remove(pos);
            mailbox.seal();
            debug!("task '{}': retired mailbox '{}'", self.task, mailbox.name());
            registry.retired.push(mailbox);
        }
    }

    pub fn set_owner_thread(&self, id: ThreadId) {
        let registry = self.registry.lock();
        *self.owner.write() = Some(id);
        for mailbox in registry.active.iter().chain(registry.retired.iter()) {
            mailbox.set_owner_thread(id);
        }
    }

    pub fn set_trace_hook(&self, hook: Option<TraceHook>) {
        let registry = self.registry.lock();
        for mailbox in registry.active.iter().chain(registry.retired.iter()) {
            mailbox.set_trace_hook(hook.clone());
        }
        *self.trace.write() = hook;
    }

    pub fn len(&self) -> usize {
        self.registry.lock().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains every mailbox to empty, in registration order. Returns the
    /// number of invocations executed.
    pub fn process(&self) -> usize {
        let (active, retired) = {
            let registry = self.registry.lock();
            (registry.active.clone(), registry.retired.clone())
        };
        let executed = active
            .iter()
            .chain(retired.iter())
            .map(|mailbox| mailbox.process())
            .sum();
        if !retired.is_empty() {
            for mailbox in &retired {
                mailbox.close();
            }
            self.registry
                .lock()
                .retired
                .retain(|m| !retired.iter().any(|r| Arc::ptr_eq(m, r)));
        }
        executed
    }

    /// Closes every mailbox, releasing blocked callers. Returns how many
    /// pending invocations were released.
    pub fn close_all(&self) -> usize {
        let mailboxes = {
            let mut registry = self.registry.lock();
            registry.closed = true;
            let mut all = registry.active.clone();
            all.append(&mut registry.retired);
            all
        };
        let released = mailboxes.iter().map(|mailbox| mailbox.close()).sum();
        self.wake.notify();
        released
    }

    pub fn is_closed(&self) -> bool {
        self.registry.lock().closed
    }
}
