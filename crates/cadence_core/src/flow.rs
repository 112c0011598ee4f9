//! Flow states
//!
//! The four-phase lifecycle every animator moves through:
//!
//! ```text
//!            enter                 (timer)
//!   Exited ─────────▶ Entering ─────────▶ Entered
//!     ▲                 │   ▲                │
//!     │ (timer)    exit │   │ enter     exit │
//!     │                 ▼   │                ▼
//!     └──────────────── Exiting ◀────────────┘
//! ```
//!
//! `FlowSnapshot` is the read-only view handed to descendants. Consumers test
//! the phase flags (`flow.entered()`) rather than matching on the tag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;

/// Animation phase of a single animator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowState {
    Entering,
    Entered,
    Exiting,
    #[default]
    Exited,
}

impl FlowState {
    /// All states in lifecycle order
    pub const ALL: [FlowState; 4] = [
        FlowState::Entering,
        FlowState::Entered,
        FlowState::Exiting,
        FlowState::Exited,
    ];

    /// Starting state for a new animator
    ///
    /// Animated nodes start fully exited and wait for activation. Nodes with
    /// animation disabled are entered from the start.
    pub fn initial(animate: bool) -> Self {
        if animate {
            FlowState::Exited
        } else {
            FlowState::Entered
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Entering => "entering",
            FlowState::Entered => "entered",
            FlowState::Exiting => "exiting",
            FlowState::Exited => "exited",
        }
    }

    /// In or heading toward the entered phase
    pub fn is_entering_or_entered(&self) -> bool {
        matches!(self, FlowState::Entering | FlowState::Entered)
    }

    /// In or heading toward the exited phase
    pub fn is_exiting_or_exited(&self) -> bool {
        matches!(self, FlowState::Exiting | FlowState::Exited)
    }

    /// Whether a timed transition is in progress
    pub fn is_transitioning(&self) -> bool {
        matches!(self, FlowState::Entering | FlowState::Exiting)
    }

    /// Check if `next` is a legal edge from this state
    ///
    /// Besides the main cycle, an entering animator may start exiting and an
    /// exiting animator may start entering again.
    pub fn can_transition_to(&self, next: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, next),
            (Exited, Entering)
                | (Entering, Entered)
                | (Entered, Exiting)
                | (Exiting, Exited)
                | (Exiting, Entering)
                | (Entering, Exiting)
        )
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowState {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        FlowState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| FlowError::UnknownState(trimmed.to_string()))
    }
}

/// Immutable view of a flow state
///
/// Exactly one of the phase flags is set, matching `value()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowSnapshot {
    value: FlowState,
}

impl FlowSnapshot {
    pub fn new(value: FlowState) -> Self {
        Self { value }
    }

    pub fn value(&self) -> FlowState {
        self.value
    }

    pub fn entering(&self) -> bool {
        self.value == FlowState::Entering
    }

    pub fn entered(&self) -> bool {
        self.value == FlowState::Entered
    }

    pub fn exiting(&self) -> bool {
        self.value == FlowState::Exiting
    }

    pub fn exited(&self) -> bool {
        self.value == FlowState::Exited
    }

    /// Flag lookup by state, for table-driven consumers
    pub fn is(&self, state: FlowState) -> bool {
        self.value == state
    }
}

impl From<FlowState> for FlowSnapshot {
    fn from(value: FlowState) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for FlowSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

/// A recorded state assignment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTransition {
    pub from: FlowState,
    pub to: FlowState,
    /// Scheduler time of the assignment, in milliseconds
    pub at_ms: u64,
}
