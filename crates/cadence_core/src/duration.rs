//! Duration model and resolver
//!
//! Durations are layered. From lowest to highest precedence:
//!
//! 1. the built-in default (`200ms` enter, `200ms` exit, no delay)
//! 2. ambient settings inherited from the surrounding tree
//! 3. the animator's declared duration
//! 4. a runtime override set imperatively on the animator
//!
//! Each layer only replaces the fields it defines.

use serde::{Deserialize, Serialize};

/// Default enter/exit time in milliseconds
pub const DEFAULT_TRANSITION_MS: u32 = 200;

/// Fully resolved timing for an animator, in milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowDuration {
    pub enter: u32,
    pub exit: u32,
    pub delay: u32,
}

impl Default for FlowDuration {
    fn default() -> Self {
        Self {
            enter: DEFAULT_TRANSITION_MS,
            exit: DEFAULT_TRANSITION_MS,
            delay: 0,
        }
    }
}

impl FlowDuration {
    pub fn new(enter: u32, exit: u32, delay: u32) -> Self {
        Self { enter, exit, delay }
    }

    /// Total time from activation until fully entered
    pub fn duration_in(&self) -> u32 {
        self.enter.saturating_add(self.delay)
    }

    /// Total time from deactivation until fully exited
    pub fn duration_out(&self) -> u32 {
        self.exit
    }

    /// Replace the fields `layer` defines
    pub fn overlay(self, layer: &DurationConfig) -> Self {
        Self {
            enter: layer.enter.unwrap_or(self.enter),
            exit: layer.exit.unwrap_or(self.exit),
            delay: layer.delay.unwrap_or(self.delay),
        }
    }
}

impl From<FlowDuration> for DurationConfig {
    fn from(duration: FlowDuration) -> Self {
        Self {
            enter: Some(duration.enter),
            exit: Some(duration.exit),
            delay: Some(duration.delay),
        }
    }
}

/// A partial duration layer
///
/// Deserializes from either a bare number (symmetric enter/exit, delay left
/// alone) or a table with any of `enter`, `exit` and `delay`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "DurationRepr")]
pub struct DurationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<u32>,
}

impl DurationConfig {
    /// A layer that defines nothing
    pub const EMPTY: DurationConfig = DurationConfig {
        enter: None,
        exit: None,
        delay: None,
    };

    /// Same enter and exit time, delay untouched
    pub fn symmetric(ms: u32) -> Self {
        Self {
            enter: Some(ms),
            exit: Some(ms),
            delay: None,
        }
    }

    pub fn with_enter(mut self, ms: u32) -> Self {
        self.enter = Some(ms);
        self
    }

    pub fn with_exit(mut self, ms: u32) -> Self {
        self.exit = Some(ms);
        self
    }

    pub fn with_delay(mut self, ms: u32) -> Self {
        self.delay = Some(ms);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.enter.is_none() && self.exit.is_none() && self.delay.is_none()
    }

    /// Overlay a higher-precedence layer on top of this one
    pub fn merge(&self, higher: &DurationConfig) -> DurationConfig {
        DurationConfig {
            enter: higher.enter.or(self.enter),
            exit: higher.exit.or(self.exit),
            delay: higher.delay.or(self.delay),
        }
    }
}

impl From<u32> for DurationConfig {
    fn from(ms: u32) -> Self {
        Self::symmetric(ms)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationRepr {
    Symmetric(u32),
    Fields {
        #[serde(default)]
        enter: Option<u32>,
        #[serde(default)]
        exit: Option<u32>,
        #[serde(default)]
        delay: Option<u32>,
    },
}

impl From<DurationRepr> for DurationConfig {
    fn from(repr: DurationRepr) -> Self {
        match repr {
            DurationRepr::Symmetric(ms) => DurationConfig::symmetric(ms),
            DurationRepr::Fields { enter, exit, delay } => DurationConfig { enter, exit, delay },
        }
    }
}

/// Merge the duration layers into one resolved duration
pub fn resolve(
    ambient: &DurationConfig,
    declared: &DurationConfig,
    overrides: &DurationConfig,
) -> FlowDuration {
    FlowDuration::default()
        .overlay(ambient)
        .overlay(declared)
        .overlay(overrides)
}
