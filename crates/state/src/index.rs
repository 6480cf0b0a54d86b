//! Row identifiers.

use core::fmt;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies one committed row of a state table.
///
/// The tick counter of a row increases every time the writer reuses it, so
/// an index taken in one cycle can later be recognised as stale.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateIndex {
    index: usize,
    ticks: u64,
    history_length: usize,
}

impl StateIndex {
    pub const fn new(index: usize, ticks: u64, history_length: usize) -> Self {
        Self {
            index,
            ticks,
            history_length,
        }
    }

    /// Row position in the circular buffer.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of the cycle that wrote the row.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    pub const fn history_length(&self) -> usize {
        self.history_length
    }

    /// Index of the row written `offset` cycles earlier, or `None` when
    /// that row predates the first cycle.
    pub fn earlier(&self, offset: usize) -> Option<Self> {
        if self.history_length == 0 || offset as u64 > self.ticks {
            return None;
        }
        let back = offset % self.history_length;
        Some(Self {
            index: (self.index + self.history_length - back) % self.history_length,
            ticks: self.ticks - offset as u64,
            history_length: self.history_length,
        })
    }

    /// Index of the row written one cycle later.
    pub fn next(&self) -> Self {
        Self {
            index: (self.index + 1) % self.history_length.max(1),
            ticks: self.ticks + 1,
            history_length: self.history_length,
        }
    }
}

impl fmt::Display for StateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} tick {}", self.index, self.ticks)
    }
}
