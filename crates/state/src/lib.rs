//! # mts-state
//!
//! A [`StateTable`] keeps a fixed-length circular history of the state a
//! task publishes. The owning task writes through [`StateHandle`]s and
//! commits one row per cycle with [`StateTable::advance`]; any number of
//! threads read committed rows through [`Accessor`]s obtained from a
//! [`StateTableReader`].
//!
//! Readers never observe a row the writer is filling: the reader index
//! always trails the writer index, and every read is validated against the
//! row's tick counter so data overwritten by a later cycle is reported as
//! stale instead of being returned.

#![forbid(unsafe_code)]

mod column;
pub mod error;
pub mod index;
pub mod table;

pub use column::{Accessor, StateHandle};
pub use error::StateTableError;
pub use index::StateIndex;
pub use table::{StateTable, StateTableReader};

/// Names of the columns every table carries.
pub mod builtin {
    pub const TOC: &str = "Toc";
    pub const TIC: &str = "Tic";
    pub const PERIOD: &str = "Period";
}

#[cfg(test)]
mod tests;
