//! Cadence Core
//!
//! Timer-free building blocks for coordinating enter/exit animation timing
//! across a tree of animators:
//!
//! - **Flow states**: the `entering → entered → exiting → exited` lifecycle
//! - **Durations**: layered `{enter, exit, delay}` resolution
//! - **Activation**: root/nested rules with merge and strict coupling
//! - **Settings**: ambient configuration and per-animator props
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{activation, AnimatorProps, AnimatorSettings, FlowSnapshot, FlowState};
//!
//! let settings = AnimatorSettings::new().duration(300u32);
//! let props = AnimatorProps::new().merge(true);
//!
//! let parent = FlowSnapshot::new(FlowState::Entering);
//! let role = props.role(true);
//! assert!(activation::is_activated(role, props.activate, Some(&parent), props.merge));
//!
//! let duration = props.resolve_duration(&settings, &Default::default());
//! assert_eq!(duration.duration_in(), 300);
//! ```

pub mod activation;
pub mod duration;
pub mod error;
pub mod flow;
pub mod settings;

pub use activation::{ActivationTracker, Role};
pub use duration::{DurationConfig, FlowDuration};
pub use error::FlowError;
pub use flow::{FlowSnapshot, FlowState, FlowTransition};
pub use settings::{AnimatorProps, AnimatorSettings};
