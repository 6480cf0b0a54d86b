//! Forward-only lifecycle shared between a task handle and its thread.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use log::{debug, error};
use parking_lot::{Condvar, Mutex, RwLock};

use mts_core::{emit, ComponentState, TraceHook, TraceRecord};

fn bit(state: ComponentState) -> u8 {
    1 << state as u8
}

pub(crate) struct Lifecycle {
    component: String,
    state: Mutex<ComponentState>,
    visited: AtomicU8,
    changed: Condvar,
    trace: RwLock<Option<TraceHook>>,
}

impl Lifecycle {
    pub(crate) fn new(component: &str) -> Self {
        Self {
            component: component.to_owned(),
            state: Mutex::new(ComponentState::Constructed),
            visited: AtomicU8::new(bit(ComponentState::Constructed)),
            changed: Condvar::new(),
            trace: RwLock::new(None),
        }
    }

    pub(crate) fn set_trace_hook(&self, hook: Option<TraceHook>) {
        *self.trace.write() = hook;
    }

    pub(crate) fn trace_hook(&self) -> Option<TraceHook> {
        self.trace.read().clone()
    }

    pub(crate) fn state(&self) -> ComponentState {
        *self.state.lock()
    }

    fn commit(&self, state: &mut ComponentState, next: ComponentState) {
        let from = std::mem::replace(state, next);
        self.visited.fetch_or(bit(next), Ordering::Release);
        debug!("task '{}': {} -> {}", self.component, from, next);
        self.changed.notify_all();
        emit(self.trace.read().as_ref(), || TraceRecord::StateChange {
            component: self.component.clone(),
            from,
            to: next,
        });
    }

    /// Moves to `next` when that is a legal successor of the current
    /// state. Returns `false`, leaving the state untouched, otherwise.
    pub(crate) fn advance_to(&self, next: ComponentState) -> bool {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            if !state.is_terminating() {
                error!(
                    "task '{}': illegal transition {} -> {}",
                    self.component, *state, next
                );
            }
            return false;
        }
        self.commit(&mut state, next);
        true
    }

    /// Enters the terminal path. A task that never got a thread finishes
    /// at once. Returns the state entered, or `None` when already
    /// terminating.
    pub(crate) fn terminate(&self) -> Option<ComponentState> {
        let mut state = self.state.lock();
        let next = match *state {
            ComponentState::Constructed => ComponentState::Finished,
            ComponentState::Finishing | ComponentState::Finished => return None,
            _ => ComponentState::Finishing,
        };
        self.commit(&mut state, next);
        Some(next)
    }

    /// Blocks until the state is `target` or later. Returns `false` when
    /// `timeout` elapses first.
    pub(crate) fn wait_for(&self, target: ComponentState, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        while *state < target {
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut state, deadline).timed_out() {
                        return *state >= target;
                    }
                }
                None => self.changed.wait(&mut state),
            }
        }
        true
    }

    /// `true` once the lifecycle has been in `state`.
    pub(crate) fn has_visited(&self, state: ComponentState) -> bool {
        self.visited.load(Ordering::Acquire) & bit(state) != 0
    }

    /// Blocks until the lifecycle has been in `target`. Returns `false` on
    /// timeout, or as soon as the task moves past `target` without
    /// entering it.
    pub(crate) fn wait_reached(&self, target: ComponentState, timeout: Duration) -> bool {
        self.wait_for(target, timeout);
        self.has_visited(target)
    }

    /// Sleeps for `timeout` unless the task starts terminating first.
    /// Returns `true` when woken by termination.
    pub(crate) fn sleep(&self, timeout: Duration) -> bool {
        self.wait_for(ComponentState::Finishing, timeout)
    }
}
