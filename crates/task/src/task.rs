//! Tasks: one thread, one state table, a set of interfaces.
//!
//! A [`Task`] wraps user behavior held in an [`Instance`]. Once created it
//! owns a dedicated OS thread that runs the behavior's `startup`, then
//! repeats a cycle of draining mailboxes, calling `run` and advancing the
//! state table until the task is killed, then calls `cleanup`.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use mts_command::Instance;
use mts_core::{emit, ComponentState, Payload, TraceHook, TraceRecord};
use mts_state::{Accessor, StateHandle, StateTable, StateTableReader};

use crate::config::{Scheduling, TaskConfig};
use crate::error::{InterfaceError, TaskError};
use crate::lifecycle::Lifecycle;
use crate::mailboxes::TaskMailboxes;
use crate::provided::{ProvidedInterface, QueueingPolicy};
use crate::required::{RequiredInterface, Requirement};

/// User code driven by a task thread.
pub trait TaskBehavior: Send + 'static {
    /// Called once on the task thread before the task becomes ready. An
    /// error keeps the task from ever becoming ready.
    fn startup(&mut self, _ctx: &mut TaskContext<'_>) -> Result<(), TaskError> {
        Ok(())
    }

    /// Called once per cycle while the task is active.
    fn run(&mut self, ctx: &mut TaskContext<'_>);

    /// Called once on the task thread after the last cycle.
    fn cleanup(&mut self, _ctx: &mut TaskContext<'_>) {}
}

/// Object-safe view of a behavior used by the task thread.
trait TaskRunnable: Send {
    fn startup(&self, ctx: &mut TaskContext<'_>) -> Result<(), TaskError>;
    fn run(&self, ctx: &mut TaskContext<'_>);
    fn cleanup(&self, ctx: &mut TaskContext<'_>);
}

impl<B: TaskBehavior> TaskRunnable for Instance<B> {
    fn startup(&self, ctx: &mut TaskContext<'_>) -> Result<(), TaskError> {
        self.lock().startup(ctx)
    }

    fn run(&self, ctx: &mut TaskContext<'_>) {
        self.lock().run(ctx);
    }

    fn cleanup(&self, ctx: &mut TaskContext<'_>) {
        self.lock().cleanup(ctx);
    }
}

struct TaskShared {
    name: String,
    lifecycle: Lifecycle,
    mailboxes: Arc<TaskMailboxes>,
    cycles: AtomicU64,
    overruns: AtomicU64,
    overran: AtomicBool,
}

impl TaskShared {
    fn is_terminating(&self) -> bool {
        self.lifecycle.state().is_terminating()
    }

    fn kill(&self) {
        let Some(next) = self.lifecycle.terminate() else {
            return;
        };
        info!("task '{}': kill requested, now {}", self.name, next);
        let released = self.mailboxes.close_all();
        if released > 0 {
            debug!(
                "task '{}': released {} pending invocations",
                self.name, released
            );
        }
    }
}

/// Per-call view handed to [`TaskBehavior`] hooks.
pub struct TaskContext<'a> {
    shared: &'a TaskShared,
    table: &'a mut StateTable,
    cycle: u64,
}

impl TaskContext<'_> {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Number of cycles completed before this one.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn state(&self) -> ComponentState {
        self.shared.lifecycle.state()
    }

    /// The task's own state table, for manual advance or timing queries.
    pub fn state_table(&mut self) -> &mut StateTable {
        self.table
    }

    /// `true` when the previous cycle of a periodic task ran past its
    /// period boundary.
    pub fn overran_period(&self) -> bool {
        self.shared.overran.load(Ordering::Relaxed)
    }

    /// Requests termination once the current hook returns.
    pub fn kill(&self) {
        self.shared.kill();
    }
}

/// Everything the task thread takes ownership of.
struct TaskCore {
    scheduling: Scheduling,
    table: StateTable,
    runnable: Box<dyn TaskRunnable>,
    required: Vec<Arc<RequiredInterface>>,
}

impl TaskCore {
    fn context<'a>(
        &'a mut self,
        shared: &'a TaskShared,
    ) -> (&'a dyn TaskRunnable, TaskContext<'a>) {
        let cycle = shared.cycles.load(Ordering::Relaxed);
        (
            &*self.runnable,
            TaskContext {
                shared,
                table: &mut self.table,
                cycle,
            },
        )
    }

    fn missing_connections(&self) -> Vec<String> {
        self.required
            .iter()
            .filter(|r| r.is_mandatory() && !r.is_connected())
            .map(|r| r.name().to_owned())
            .collect()
    }

    fn cycle(&mut self, shared: &TaskShared) {
        self.table.start_if_automatic();
        shared.mailboxes.process();
        let (runnable, mut ctx) = self.context(shared);
        runnable.run(&mut ctx);
        self.table.advance_if_automatic();
        shared.cycles.fetch_add(1, Ordering::Relaxed);
    }

    fn run_periodic(&mut self, shared: &TaskShared, period: Duration) {
        let mut next = Instant::now();
        while !shared.is_terminating() {
            let began = Instant::now();
            self.cycle(shared);
            next += period;
            let now = Instant::now();
            if now > next {
                let elapsed = now - began;
                shared.overruns.fetch_add(1, Ordering::Relaxed);
                shared.overran.store(true, Ordering::Relaxed);
                warn!(
                    "task '{}': cycle took {:?}, period is {:?}",
                    shared.name, elapsed, period
                );
                emit(shared.lifecycle.trace_hook().as_ref(), || {
                    TraceRecord::PeriodOverrun {
                        component: shared.name.clone(),
                        elapsed,
                        period,
                    }
                });
                next = now;
            } else {
                shared.overran.store(false, Ordering::Relaxed);
                if shared.lifecycle.sleep(next - now) {
                    break;
                }
            }
        }
    }

    fn run_continuous(&mut self, shared: &TaskShared) {
        while !shared.is_terminating() {
            self.cycle(shared);
            thread::yield_now();
        }
    }

    fn run_from_signal(&mut self, shared: &TaskShared) {
        let wake = Arc::clone(shared.mailboxes.wake_signal());
        loop {
            wake.wait();
            if shared.is_terminating() {
                break;
            }
            self.cycle(shared);
        }
    }

    fn run_loop(&mut self, shared: &TaskShared) {
        match self.scheduling {
            Scheduling::Periodic(period) => self.run_periodic(shared, period),
            Scheduling::Continuous => self.run_continuous(shared),
            Scheduling::FromSignal => self.run_from_signal(shared),
        }
    }

    fn body(mut self, shared: &TaskShared) {
        shared.mailboxes.set_owner_thread(thread::current().id());

        let missing = self.missing_connections();
        if !missing.is_empty() {
            error!(
                "task '{}': required interfaces not connected: {}",
                shared.name,
                missing.join(", ")
            );
            shared.lifecycle.wait_for(ComponentState::Finishing, Duration::MAX);
            shared.lifecycle.advance_to(ComponentState::Finished);
            return;
        }

        let (runnable, mut ctx) = self.context(shared);
        if let Err(err) = runnable.startup(&mut ctx) {
            error!("task '{}': {}", shared.name, err);
            shared.lifecycle.wait_for(ComponentState::Finishing, Duration::MAX);
            shared.lifecycle.advance_to(ComponentState::Finished);
            return;
        }

        if shared.lifecycle.advance_to(ComponentState::Ready) {
            info!("task '{}': ready", shared.name);
            shared.lifecycle.wait_for(ComponentState::Active, Duration::MAX);
            if shared.lifecycle.state() == ComponentState::Active {
                info!("task '{}': active", shared.name);
                let looped = panic::catch_unwind(AssertUnwindSafe(|| self.run_loop(shared)));
                if looped.is_err() {
                    error!("task '{}': cycle panicked, terminating", shared.name);
                    shared.kill();
                }
            }
        }

        let (runnable, mut ctx) = self.context(shared);
        runnable.cleanup(&mut ctx);
        shared.lifecycle.advance_to(ComponentState::Finished);
        info!(
            "task '{}': finished after {} cycles",
            shared.name,
            shared.cycles.load(Ordering::Relaxed)
        );
    }
}

/// A schedulable component.
///
/// Interfaces and state elements are declared while the task is
/// `Constructed`. [`create`](Self::create) spawns the thread, which runs
/// `startup` and parks in `Ready`; [`start`](Self::start) releases it into
/// its cycle loop; [`kill`](Self::kill) ends it.
pub struct Task {
    config: TaskConfig,
    shared: Arc<TaskShared>,
    provided: BTreeMap<String, Arc<ProvidedInterface>>,
    required: BTreeMap<String, Arc<RequiredInterface>>,
    table: Option<StateTable>,
    reader: StateTableReader,
    runnable: Option<Box<dyn TaskRunnable>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Task {
    pub fn new<B: TaskBehavior>(config: TaskConfig, behavior: Instance<B>) -> Self {
        let table = StateTable::new(config.name.clone(), config.history_length);
        let reader = table.reader();
        let shared = Arc::new(TaskShared {
            name: config.name.clone(),
            lifecycle: Lifecycle::new(&config.name),
            mailboxes: TaskMailboxes::new(config.name.clone(), config.mailbox_size),
            cycles: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
            overran: AtomicBool::new(false),
        });
        Self {
            config,
            shared,
            provided: BTreeMap::new(),
            required: BTreeMap::new(),
            table: Some(table),
            reader,
            runnable: Some(Box::new(behavior)),
            thread: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    fn ensure_constructed(&self) -> Result<(), TaskError> {
        match self.state() {
            ComponentState::Constructed => Ok(()),
            state => Err(TaskError::InvalidState {
                task: self.config.name.clone(),
                state,
            }),
        }
    }

    fn check_interface_name(&self, name: &str) -> Result<(), TaskError> {
        self.ensure_constructed()?;
        if self.provided.contains_key(name) || self.required.contains_key(name) {
            return Err(InterfaceError::DuplicateInterface {
                component: self.config.name.clone(),
                name: name.to_owned(),
            }
            .into());
        }
        Ok(())
    }

    /// Adds a provided interface whose commands run on this task's thread.
    pub fn add_provided_interface(
        &mut self,
        name: &str,
    ) -> Result<Arc<ProvidedInterface>, TaskError> {
        self.add_provided_interface_with_policy(name, QueueingPolicy::Queued)
    }

    pub fn add_provided_interface_with_policy(
        &mut self,
        name: &str,
        policy: QueueingPolicy,
    ) -> Result<Arc<ProvidedInterface>, TaskError> {
        self.check_interface_name(name)?;
        let interface = ProvidedInterface::for_task(
            &self.config.name,
            name,
            policy,
            Arc::clone(&self.shared.mailboxes),
            self.config.argument_queue_size,
        );
        self.provided.insert(name.to_owned(), Arc::clone(&interface));
        Ok(interface)
    }

    /// Adds a required interface that must be connected before the task
    /// can become ready.
    pub fn add_required_interface(
        &mut self,
        name: &str,
    ) -> Result<Arc<RequiredInterface>, TaskError> {
        self.insert_required(name, Requirement::Mandatory)
    }

    pub fn add_optional_required_interface(
        &mut self,
        name: &str,
    ) -> Result<Arc<RequiredInterface>, TaskError> {
        self.insert_required(name, Requirement::Optional)
    }

    fn insert_required(
        &mut self,
        name: &str,
        requirement: Requirement,
    ) -> Result<Arc<RequiredInterface>, TaskError> {
        self.check_interface_name(name)?;
        let interface = RequiredInterface::for_task(
            &self.config.name,
            name,
            requirement,
            Arc::clone(&self.shared.mailboxes),
            self.config.argument_queue_size,
        );
        self.required.insert(name.to_owned(), Arc::clone(&interface));
        Ok(interface)
    }

    pub fn provided_interface(&self, name: &str) -> Option<Arc<ProvidedInterface>> {
        self.provided.get(name).cloned()
    }

    pub fn required_interface(&self, name: &str) -> Option<Arc<RequiredInterface>> {
        self.required.get(name).cloned()
    }

    pub fn provided_interface_names(&self) -> Vec<String> {
        self.provided.keys().cloned().collect()
    }

    pub fn required_interface_names(&self) -> Vec<String> {
        self.required.keys().cloned().collect()
    }

    /// Registers a state element. Only possible before [`create`](Self::create).
    pub fn add_state_element<T: Payload>(
        &mut self,
        name: &str,
        initial: T,
    ) -> Result<StateHandle<T>, TaskError> {
        self.ensure_constructed()?;
        let table = self.table.as_mut().ok_or_else(|| TaskError::InvalidState {
            task: self.config.name.clone(),
            state: self.shared.lifecycle.state(),
        })?;
        Ok(table.add_element(name, initial)?)
    }

    /// The state table, until the task thread takes it over.
    pub fn state_table_mut(&mut self) -> Option<&mut StateTable> {
        self.table.as_mut()
    }

    pub fn state_reader(&self) -> StateTableReader {
        self.reader.clone()
    }

    pub fn state_accessor<T: Payload>(&self, name: &str) -> Result<Accessor<T>, TaskError> {
        Ok(self.reader.accessor(name)?)
    }

    /// Spawns the task thread and enters `Initializing`.
    pub fn create(&mut self) -> Result<(), TaskError> {
        self.ensure_constructed()?;
        let (table, runnable) = match (self.table.take(), self.runnable.take()) {
            (Some(table), Some(runnable)) => (table, runnable),
            _ => {
                return Err(TaskError::InvalidState {
                    task: self.config.name.clone(),
                    state: self.state(),
                })
            }
        };
        let core = TaskCore {
            scheduling: self.config.scheduling,
            table,
            runnable,
            required: self.required.values().cloned().collect(),
        };

        self.shared.lifecycle.advance_to(ComponentState::Initializing);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.config.name.clone())
            .spawn(move || core.body(&shared));
        match spawned {
            Ok(handle) => {
                *self.thread.lock() = Some(handle);
                debug!(
                    "task '{}': thread created ({:?})",
                    self.config.name, self.config.scheduling
                );
                Ok(())
            }
            Err(source) => {
                self.shared.kill();
                self.shared.lifecycle.advance_to(ComponentState::Finished);
                Err(TaskError::Spawn {
                    task: self.config.name.clone(),
                    source,
                })
            }
        }
    }

    /// Moves a `Ready` task to `Active`.
    pub fn start(&self) -> Result<(), TaskError> {
        let state = self.state();
        if state != ComponentState::Ready
            || !self.shared.lifecycle.advance_to(ComponentState::Active)
        {
            return Err(TaskError::InvalidState {
                task: self.config.name.clone(),
                state: self.state(),
            });
        }
        Ok(())
    }

    /// Requests termination. Blocked callers of this task's commands are
    /// released with `NoMailbox`. Calling it again has no effect.
    pub fn kill(&self) {
        self.shared.kill();
    }

    pub fn state(&self) -> ComponentState {
        self.shared.lifecycle.state()
    }

    /// Blocks until the task has been in `state`. Returns `false` on
    /// timeout, or when the task skipped `state` on its way to
    /// termination.
    pub fn wait_for_state(&self, state: ComponentState, timeout: Duration) -> bool {
        self.shared.lifecycle.wait_reached(state, timeout)
    }

    pub fn wait_to_start(&self, timeout: Duration) -> bool {
        self.wait_for_state(ComponentState::Active, timeout)
    }

    /// Waits for `Finished` and joins the thread.
    pub fn wait_to_terminate(&self, timeout: Duration) -> bool {
        if !self.wait_for_state(ComponentState::Finished, timeout) {
            return false;
        }
        self.join();
        true
    }

    fn join(&self) {
        let Some(handle) = self.thread.lock().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            error!("task '{}': thread panicked", self.config.name);
        }
    }

    pub fn cycle_count(&self) -> u64 {
        self.shared.cycles.load(Ordering::Relaxed)
    }

    /// Periodic cycles that ran past their period boundary.
    pub fn overrun_count(&self) -> u64 {
        self.shared.overruns.load(Ordering::Relaxed)
    }

    /// Installs a trace hook for lifecycle, mailbox and overrun records.
    ///
    /// The hook runs with internal locks held and must not call back into
    /// the task.
    pub fn set_trace_hook(&self, hook: Option<TraceHook>) {
        self.shared.mailboxes.set_trace_hook(hook.clone());
        self.shared.lifecycle.set_trace_hook(hook);
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        self.kill();
        self.join();
    }
}
