//! Typed columns of a state table and the handles that reach them.
//!
//! Each row sits behind its own `parking_lot::Mutex` instead of being
//! read lock-free. `advance` only locks the writer row and readers only
//! lock rows behind it, so the locks are never contended.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use mts_core::{Payload, Prototype};

use crate::error::StateTableError;
use crate::index::StateIndex;
use crate::table::Shared;

/// Type-erased column operations used by `advance`.
pub(crate) trait Column: Send + Sync {
    fn name(&self) -> &str;

    fn prototype(&self) -> Prototype;

    /// Copies the working value into `row`.
    fn commit(&self, row: usize);
}

pub(crate) struct TypedColumn<T> {
    name: String,
    current: Mutex<T>,
    rows: Box<[Mutex<T>]>,
}

impl<T: Payload> TypedColumn<T> {
    pub(crate) fn new(name: &str, initial: T, history_length: usize) -> Self {
        let rows = (0..history_length)
            .map(|_| Mutex::new(initial.clone()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            name: name.to_owned(),
            current: Mutex::new(initial),
            rows,
        }
    }

    pub(crate) fn set_current(&self, value: T) {
        *self.current.lock() = value;
    }

    fn row(&self, row: usize) -> T {
        self.rows[row].lock().clone()
    }
}

impl<T: Payload> Column for TypedColumn<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn prototype(&self) -> Prototype {
        Prototype::of::<T>()
    }

    fn commit(&self, row: usize) {
        let value = self.current.lock().clone();
        *self.rows[row].lock() = value;
    }
}

/// Registration record kept by the table.
#[derive(Clone)]
pub(crate) struct ColumnEntry {
    pub(crate) column: Arc<dyn Column>,
    typed: Arc<dyn Any + Send + Sync>,
}

impl ColumnEntry {
    pub(crate) fn new<T: Payload>(column: Arc<TypedColumn<T>>) -> Self {
        Self {
            column: column.clone(),
            typed: column,
        }
    }

    pub(crate) fn typed<T: Payload>(&self) -> Result<Arc<TypedColumn<T>>, StateTableError> {
        Arc::clone(&self.typed)
            .downcast::<TypedColumn<T>>()
            .map_err(|_| StateTableError::TypeMismatch {
                name: self.column.name().to_owned(),
                expected: Prototype::of::<T>().short_name(),
                found: self.column.prototype().short_name(),
            })
    }
}

/// Writer-side handle to the working value of one element.
///
/// Values set here become visible to readers at the next
/// [`advance`](crate::StateTable::advance).
pub struct StateHandle<T> {
    column: Arc<TypedColumn<T>>,
}

impl<T: Payload> StateHandle<T> {
    pub(crate) fn new(column: Arc<TypedColumn<T>>) -> Self {
        Self { column }
    }

    pub fn name(&self) -> &str {
        &self.column.name
    }

    pub fn set(&self, value: T) {
        self.column.set_current(value);
    }

    pub fn get(&self) -> T {
        self.column.current.lock().clone()
    }

    /// Modifies the working value in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.column.current.lock())
    }
}

impl<T> Clone for StateHandle<T> {
    fn clone(&self) -> Self {
        Self {
            column: Arc::clone(&self.column),
        }
    }
}

impl<T: Payload + fmt::Debug> fmt::Debug for StateHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHandle")
            .field("name", &self.column.name)
            .field("current", &*self.column.current.lock())
            .finish()
    }
}

/// Reader-side access to the committed history of one element.
pub struct Accessor<T> {
    table: Arc<Shared>,
    column: Arc<TypedColumn<T>>,
}

impl<T: Payload> Accessor<T> {
    pub(crate) fn new(table: Arc<Shared>, column: Arc<TypedColumn<T>>) -> Self {
        Self { table, column }
    }

    pub fn name(&self) -> &str {
        &self.column.name
    }

    /// Value committed at `when`.
    ///
    /// The row is copied first and validated afterwards, so a row the
    /// writer reused in the meantime is reported as stale.
    pub fn get(&self, when: &StateIndex) -> Result<T, StateTableError> {
        if when.index() >= self.column.rows.len() {
            return Err(StateTableError::OffsetOutOfRange {
                offset: when.index(),
                available: self.column.rows.len(),
            });
        }
        let value = self.column.row(when.index());
        self.table.check(when)?;
        Ok(value)
    }

    /// Most recently committed value.
    pub fn latest(&self) -> Result<T, StateTableError> {
        self.get(&self.table.index_reader())
    }

    /// Most recently committed value together with its row index.
    pub fn latest_indexed(&self) -> Result<(StateIndex, T), StateTableError> {
        let index = self.table.index_reader();
        self.get(&index).map(|value| (index, value))
    }

    /// Value committed `delay` cycles before the latest row.
    pub fn delayed(&self) -> Result<T, StateTableError> {
        self.get(&self.table.index_delayed())
    }

    /// Value committed `offset` cycles before the latest row. Offset 0 is
    /// the latest row.
    pub fn history(&self, offset: usize) -> Result<T, StateTableError> {
        let available = self.table.history_length() - 1;
        if offset >= available {
            return Err(StateTableError::OffsetOutOfRange { offset, available });
        }
        let latest = self.table.index_reader();
        let when = latest
            .earlier(offset)
            .ok_or(StateTableError::OffsetOutOfRange {
                offset,
                available: latest.ticks() as usize + 1,
            })?;
        self.get(&when)
    }

    /// Values committed from `first` to `last`, inclusive.
    pub fn range(&self, first: &StateIndex, last: &StateIndex) -> Result<Vec<T>, StateTableError> {
        if last.ticks() < first.ticks() {
            return Ok(Vec::new());
        }
        let count = (last.ticks() - first.ticks()) as usize + 1;
        let available = self.table.history_length() - 1;
        if count > available {
            return Err(StateTableError::OffsetOutOfRange {
                offset: count,
                available,
            });
        }
        let mut values = Vec::with_capacity(count);
        let mut when = *first;
        for _ in 0..count {
            values.push(self.get(&when)?);
            when = when.next();
        }
        Ok(values)
    }
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            column: Arc::clone(&self.column),
        }
    }
}

impl<T> fmt::Debug for Accessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("name", &self.column.name)
            .finish()
    }
}
