//! The state table writer and its shared reader view.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};
use parking_lot::RwLock;

use mts_core::{Payload, Prototype, DEFAULT_HISTORY_LENGTH, MIN_HISTORY_LENGTH};

use crate::builtin;
use crate::column::{Accessor, ColumnEntry, StateHandle, TypedColumn};
use crate::error::StateTableError;
use crate::index::StateIndex;

/// State reachable from both the writer and its readers.
pub(crate) struct Shared {
    name: String,
    history_length: usize,
    ticks: Box<[AtomicU64]>,
    writer: AtomicUsize,
    reader: AtomicUsize,
    delayed: AtomicUsize,
    columns: RwLock<Vec<ColumnEntry>>,
}

impl Shared {
    pub(crate) fn history_length(&self) -> usize {
        self.history_length
    }

    fn index_at(&self, row: usize) -> StateIndex {
        StateIndex::new(
            row,
            self.ticks[row].load(Ordering::Acquire),
            self.history_length,
        )
    }

    pub(crate) fn index_reader(&self) -> StateIndex {
        self.index_at(self.reader.load(Ordering::Acquire))
    }

    pub(crate) fn index_delayed(&self) -> StateIndex {
        self.index_at(self.delayed.load(Ordering::Acquire))
    }

    pub(crate) fn index_writer(&self) -> StateIndex {
        self.index_at(self.writer.load(Ordering::Acquire))
    }

    pub(crate) fn check(&self, when: &StateIndex) -> Result<(), StateTableError> {
        let found = self.ticks[when.index()].load(Ordering::Acquire);
        if found == when.ticks() {
            Ok(())
        } else {
            Err(StateTableError::StaleIndex {
                index: when.index(),
                expected: when.ticks(),
                found,
            })
        }
    }

    fn find(&self, name: &str) -> Option<ColumnEntry> {
        self.columns
            .read()
            .iter()
            .find(|entry| entry.column.name() == name)
            .cloned()
    }

    fn accessor<T: Payload>(self: &Arc<Self>, name: &str) -> Result<Accessor<T>, StateTableError> {
        let entry = self
            .find(name)
            .ok_or_else(|| StateTableError::UnknownElement(name.to_owned()))?;
        Ok(Accessor::new(Arc::clone(self), entry.typed::<T>()?))
    }

    fn element_names(&self) -> Vec<String> {
        self.columns
            .read()
            .iter()
            .map(|entry| entry.column.name().to_owned())
            .collect()
    }

    fn prototype_of(&self, name: &str) -> Option<Prototype> {
        self.find(name).map(|entry| entry.column.prototype())
    }
}

/// Single-writer circular history of a task's published state.
///
/// The table is owned by its task and mutated only through `&mut self`;
/// readers on other threads use a [`StateTableReader`].
pub struct StateTable {
    shared: Arc<Shared>,
    epoch: Instant,
    tic: StateHandle<f64>,
    toc: StateHandle<f64>,
    period: StateHandle<f64>,
    tic_history: Accessor<f64>,
    period_history: Accessor<f64>,
    sum_of_periods: f64,
    average_period: f64,
    delay: usize,
    started: bool,
    automatic_advance: bool,
}

impl StateTable {
    /// Creates a table keeping `history_length` rows, raised to the minimum
    /// of three when smaller.
    pub fn new(name: impl Into<String>, history_length: usize) -> Self {
        let name = name.into();
        let history_length = if history_length < MIN_HISTORY_LENGTH {
            debug!(
                "state table '{}': history length {} raised to {}",
                name, history_length, MIN_HISTORY_LENGTH
            );
            MIN_HISTORY_LENGTH
        } else {
            history_length
        };

        let shared = Arc::new(Shared {
            name,
            history_length,
            ticks: (0..history_length).map(|_| AtomicU64::new(0)).collect(),
            writer: AtomicUsize::new(0),
            reader: AtomicUsize::new(0),
            delayed: AtomicUsize::new(0),
            columns: RwLock::new(Vec::new()),
        });

        // Toc first: advance stamps it last, after every other column.
        let toc = Self::register(&shared, builtin::TOC, 0.0_f64);
        let tic = Self::register(&shared, builtin::TIC, 0.0_f64);
        let period = Self::register(&shared, builtin::PERIOD, 0.0_f64);
        let tic_history = Accessor::new(Arc::clone(&shared), Arc::clone(&tic));
        let period_history = Accessor::new(Arc::clone(&shared), Arc::clone(&period));

        Self {
            shared,
            epoch: Instant::now(),
            tic: StateHandle::new(tic),
            toc: StateHandle::new(toc),
            period: StateHandle::new(period),
            tic_history,
            period_history,
            sum_of_periods: 0.0,
            average_period: 0.0,
            delay: 0,
            started: false,
            automatic_advance: true,
        }
    }

    fn register<T: Payload>(shared: &Shared, name: &str, initial: T) -> Arc<TypedColumn<T>> {
        let column = Arc::new(TypedColumn::new(name, initial, shared.history_length));
        shared.columns.write().push(ColumnEntry::new(Arc::clone(&column)));
        column
    }

    /// A table with the default history length.
    pub fn with_default_length(name: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_HISTORY_LENGTH)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn history_length(&self) -> usize {
        self.shared.history_length
    }

    /// Registers a new element. Every row starts out holding `initial`.
    pub fn add_element<T: Payload>(
        &mut self,
        name: &str,
        initial: T,
    ) -> Result<StateHandle<T>, StateTableError> {
        if self.shared.find(name).is_some() {
            return Err(StateTableError::DuplicateElement(name.to_owned()));
        }
        trace!("state table '{}': new element '{}'", self.name(), name);
        Ok(StateHandle::new(Self::register(&self.shared, name, initial)))
    }

    /// Cloneable read-only view for other threads.
    pub fn reader(&self) -> StateTableReader {
        StateTableReader {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn accessor<T: Payload>(&self, name: &str) -> Result<Accessor<T>, StateTableError> {
        self.shared.accessor(name)
    }

    pub fn element_names(&self) -> Vec<String> {
        self.shared.element_names()
    }

    pub fn index_writer(&self) -> StateIndex {
        self.shared.index_writer()
    }

    pub fn index_reader(&self) -> StateIndex {
        self.shared.index_reader()
    }

    pub fn index_delayed(&self) -> StateIndex {
        self.shared.index_delayed()
    }

    /// Sets the delay, in rows, used by delayed reads. Returns the old one.
    pub fn set_delay(&mut self, rows: usize) -> usize {
        let rows = rows.min(self.shared.history_length - 2);
        std::mem::replace(&mut self.delay, rows)
    }

    pub fn validate(&self, when: &StateIndex) -> bool {
        self.shared.check(when).is_ok()
    }

    pub fn automatic_advance(&self) -> bool {
        self.automatic_advance
    }

    /// With automatic advance disabled the owning task leaves `start` and
    /// `advance` to user code.
    pub fn set_automatic_advance(&mut self, automatic: bool) {
        self.automatic_advance = automatic;
    }

    /// `true` between `start` and `advance`.
    pub fn is_started(&self) -> bool {
        self.started
    }

    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Seconds since table creation at the start of the current cycle.
    pub fn tic(&self) -> f64 {
        self.tic.get()
    }

    /// Seconds since table creation at the end of the last committed cycle.
    pub fn toc(&self) -> f64 {
        self.toc.get()
    }

    /// Time between the starts of the last two cycles.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.period.get().max(0.0))
    }

    /// Mean period over the rows currently held.
    pub fn average_period(&self) -> Duration {
        Duration::from_secs_f64(self.average_period.max(0.0))
    }

    /// Stamps the start of a cycle.
    pub fn start(&mut self) {
        let tic = self.now();
        let previous = self.tic_history.latest().unwrap_or(0.0);
        self.tic.set(tic);
        self.period.set(tic - previous);
        self.started = true;
    }

    pub fn start_if_automatic(&mut self) {
        if self.automatic_advance {
            self.start();
        }
    }

    /// Commits every working value into the writer row and publishes it.
    pub fn advance(&mut self) {
        let shared = &self.shared;
        let len = shared.history_length;
        let current = shared.writer.load(Ordering::Acquire);
        let next = (current + 1) % len;
        let current_ticks = shared.ticks[current].load(Ordering::Acquire);
        let next_ticks = shared.ticks[next].load(Ordering::Acquire);

        let period = self.period.get();
        self.sum_of_periods += period;
        if current_ticks == next_ticks + len as u64 - 1 {
            // Full table: the row about to be reused leaves the window.
            let oldest = StateIndex::new(next, next_ticks, len);
            self.sum_of_periods -= self.period_history.get(&oldest).unwrap_or(0.0);
            self.average_period = self.sum_of_periods / (len - 1) as f64;
        } else if current_ticks > 0 {
            self.average_period = self.sum_of_periods / current_ticks as f64;
        }

        let toc = self.now();
        self.toc.set(toc);
        for entry in shared.columns.read().iter() {
            entry.column.commit(current);
        }

        shared.ticks[next].store(current_ticks + 1, Ordering::Release);
        shared.writer.store(next, Ordering::Release);
        shared.reader.store(current, Ordering::Release);
        shared
            .delayed
            .store((current + len - self.delay) % len, Ordering::Release);
        self.started = false;
    }

    pub fn advance_if_automatic(&mut self) {
        if self.automatic_advance {
            self.advance();
        }
    }
}

impl fmt::Debug for StateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTable")
            .field("name", &self.shared.name)
            .field("history_length", &self.shared.history_length)
            .field("writer", &self.index_writer())
            .field("elements", &self.element_names())
            .finish()
    }
}

/// Read-only view of a [`StateTable`], safe to share across threads.
#[derive(Clone)]
pub struct StateTableReader {
    shared: Arc<Shared>,
}

impl StateTableReader {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn history_length(&self) -> usize {
        self.shared.history_length
    }

    pub fn accessor<T: Payload>(&self, name: &str) -> Result<Accessor<T>, StateTableError> {
        self.shared.accessor(name)
    }

    pub fn element_names(&self) -> Vec<String> {
        self.shared.element_names()
    }

    pub fn prototype_of(&self, name: &str) -> Option<Prototype> {
        self.shared.prototype_of(name)
    }

    pub fn index_reader(&self) -> StateIndex {
        self.shared.index_reader()
    }

    pub fn index_delayed(&self) -> StateIndex {
        self.shared.index_delayed()
    }

    pub fn validate(&self, when: &StateIndex) -> bool {
        self.shared.check(when).is_ok()
    }
}

impl fmt::Debug for StateTableReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTableReader")
            .field("name", &self.shared.name)
            .finish()
    }
}
