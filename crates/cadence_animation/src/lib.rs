//! Cadence Animation
//!
//! Time-driven half of Cadence: a timer scheduler, the animator state
//! machine, and a host tree that propagates flow from parents to children.
//!
//! # Features
//!
//! - **Timer scheduler**: single serialized timeline, virtual or wall clock
//! - **Animators**: `entering → entered → exiting → exited` with delays
//! - **Interfaces**: immutable snapshots with stable live accessors
//! - **Trees**: top-down propagation with merge and strict coupling
//!
//! # Example
//!
//! ```rust
//! use cadence_animation::{AnimatorTree, TimerScheduler};
//! use cadence_core::AnimatorProps;
//!
//! let mut tree = AnimatorTree::new(TimerScheduler::new());
//! let panel = tree.insert(None, AnimatorProps::new()).unwrap();
//! let item = tree.insert(Some(panel), AnimatorProps::new().merge(true)).unwrap();
//!
//! tree.advance(0);
//! assert!(tree.flow(panel).unwrap().entering());
//! assert!(tree.flow(item).unwrap().entering());
//!
//! tree.advance(200);
//! assert!(tree.flow(item).unwrap().entered());
//! ```

pub mod animator;
pub mod error;
pub mod scheduler;
pub mod tree;

pub use animator::{ActivateCallback, Animator, AnimatorHandle, AnimatorInterface, TransitionListener};
pub use error::TreeError;
pub use scheduler::{TimerCallback, TimerId, TimerScheduler, TimerSlot};
pub use tree::{AnimatorTree, NodeId};
