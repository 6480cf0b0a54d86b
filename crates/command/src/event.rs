//! Multicast event generators.
//!
//! A provided interface owns its event generators; connected required
//! interfaces register handler commands as observers. Triggering an event
//! executes every observer without blocking, so queued handlers land in the
//! observers' mailboxes.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use mts_core::{Blocking, ExecutionResult, Payload, Prototype};

use crate::command::{VoidCommand, WriteCommand};
use crate::kind::{CommandInfo, CommandKind};

/// Identifies one observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Observers<C: ?Sized> {
    next: AtomicU64,
    list: RwLock<Vec<(ObserverId, Arc<C>)>>,
}

impl<C: ?Sized> Observers<C> {
    fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            list: RwLock::new(Vec::new()),
        }
    }

    fn add(&self, observer: Arc<C>) -> ObserverId {
        let id = ObserverId(self.next.fetch_add(1, Ordering::Relaxed));
        self.list.write().push((id, observer));
        id
    }

    fn remove(&self, id: ObserverId) -> bool {
        let mut list = self.list.write();
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        list.len() != before
    }

    fn len(&self) -> usize {
        self.list.read().len()
    }

    fn snapshot(&self) -> Vec<Arc<C>> {
        self.list.read().iter().map(|(_, o)| Arc::clone(o)).collect()
    }
}

/// Folds observer results: the first failure wins.
fn fold(results: impl Iterator<Item = ExecutionResult>) -> ExecutionResult {
    let mut outcome = ExecutionResult::Succeeded;
    for result in results {
        if !result.is_ok() && outcome.is_ok() {
            outcome = result;
        }
    }
    outcome
}

/// Event without payload.
pub struct EventVoid {
    info: CommandInfo,
    enabled: AtomicBool,
    observers: Observers<dyn VoidCommand>,
}

impl EventVoid {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            info: CommandInfo::void(name),
            enabled: AtomicBool::new(true),
            observers: Observers::new(),
        })
    }

    pub fn info(&self) -> &CommandInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        self.info.name()
    }

    pub fn add_observer(&self, handler: Arc<dyn VoidCommand>) -> ObserverId {
        self.observers.add(handler)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Notifies every observer.
    pub fn trigger(&self) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        fold(
            self.observers
                .snapshot()
                .into_iter()
                .map(|observer| observer.execute(Blocking::No)),
        )
    }
}

/// Event carrying a payload of type `A`.
pub struct EventWrite<A> {
    info: CommandInfo,
    enabled: AtomicBool,
    observers: Observers<dyn WriteCommand<A>>,
}

impl<A: Payload> EventWrite<A> {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            info: CommandInfo::write::<A>(name),
            enabled: AtomicBool::new(true),
            observers: Observers::new(),
        })
    }

    pub fn info(&self) -> &CommandInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        self.info.name()
    }

    pub fn add_observer(&self, handler: Arc<dyn WriteCommand<A>>) -> ObserverId {
        self.observers.add(handler)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Notifies every observer with a copy of `payload`.
    pub fn trigger(&self, payload: &A) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        fold(
            self.observers
                .snapshot()
                .into_iter()
                .map(|observer| observer.execute(payload, Blocking::No)),
        )
    }
}

/// An event generator of any payload type.
#[derive(Clone)]
pub struct AnyEvent {
    info: CommandInfo,
    typed: Arc<dyn Any + Send + Sync>,
}

impl AnyEvent {
    pub fn void(event: Arc<EventVoid>) -> Self {
        Self {
            info: event.info().clone(),
            typed: event,
        }
    }

    pub fn write<A: Payload>(event: Arc<EventWrite<A>>) -> Self {
        Self {
            info: event.info().clone(),
            typed: event,
        }
    }

    pub fn info(&self) -> &CommandInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        self.info.name()
    }

    pub fn kind(&self) -> CommandKind {
        self.info.kind()
    }

    pub fn argument_prototype(&self) -> Option<Prototype> {
        self.info.argument_prototype()
    }

    pub fn as_void(&self) -> Option<Arc<EventVoid>> {
        Arc::clone(&self.typed).downcast::<EventVoid>().ok()
    }

    pub fn as_write<A: Payload>(&self) -> Option<Arc<EventWrite<A>>> {
        Arc::clone(&self.typed).downcast::<EventWrite<A>>().ok()
    }
}

impl fmt::Debug for AnyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyEvent")
            .field("event", &self.info.describe())
            .finish()
    }
}
