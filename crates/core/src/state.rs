//! Component lifecycle states.

use core::fmt;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lifecycle state of a task.
///
/// States are totally ordered; a task only ever moves forward:
/// `Constructed → Initializing → Ready → Active → Finishing → Finished`.
/// `Kill` may jump ahead to `Finishing` (or straight to `Finished` when no
/// thread was ever created).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentState {
    Constructed,
    Initializing,
    Ready,
    Active,
    Finishing,
    Finished,
}

impl ComponentState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Constructed => "constructed",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Finishing => "finishing",
            Self::Finished => "finished",
        }
    }

    /// `true` for `Finishing` and `Finished`.
    #[inline]
    pub const fn is_terminating(self) -> bool {
        matches!(self, Self::Finishing | Self::Finished)
    }

    /// Returns whether `next` is a legal successor of `self`.
    ///
    /// Ordinary transitions advance exactly one step. The terminal path
    /// (`Finishing`, or `Finished` from `Constructed`) may be entered from
    /// any earlier state.
    pub fn can_transition_to(self, next: ComponentState) -> bool {
        use ComponentState::*;
        match (self, next) {
            (Constructed, Initializing)
            | (Initializing, Ready)
            | (Ready, Active)
            | (Finishing, Finished)
            | (Constructed, Finished) => true,
            (Initializing | Ready | Active, Finishing) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
