//! Activation rules
//!
//! Decides whether an animator should currently be entered, from its role in
//! the tree and the flow of its parent. The result is re-evaluated on every
//! update; only a change in the result drives the state machine.

use crate::flow::FlowSnapshot;

/// Position of an animator in the tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Self-activated, no dependency on a parent flow
    Root,
    /// Activated by the parent's flow
    Nested,
}

/// Resolve the role from tree position and an explicit root flag
///
/// An animator is nested when it has a parent, unless `explicit_root` says
/// otherwise.
pub fn resolve_role(explicit_root: Option<bool>, has_parent: bool) -> Role {
    match explicit_root {
        Some(true) => Role::Root,
        Some(false) => Role::Nested,
        None if has_parent => Role::Nested,
        None => Role::Root,
    }
}

/// Evaluate activation
///
/// Roots follow `explicit_activate` and default to activated. Nested
/// animators follow the parent: in merge mode they activate as soon as the
/// parent starts entering, otherwise only once it has entered. A nested
/// animator without a parent flow is never activated.
pub fn is_activated(
    role: Role,
    explicit_activate: Option<bool>,
    parent: Option<&FlowSnapshot>,
    merge: bool,
) -> bool {
    match role {
        Role::Root => explicit_activate.unwrap_or(true),
        Role::Nested => match parent {
            Some(flow) if merge => flow.entering() || flow.entered(),
            Some(flow) => flow.entered(),
            None => false,
        },
    }
}

/// Remembers the last observed activation to detect changes
#[derive(Clone, Copy, Debug, Default)]
pub struct ActivationTracker {
    previous: Option<bool>,
}

impl ActivationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new observation
    ///
    /// Returns the new value if it differs from the previous observation. The
    /// first observation only seeds the tracker and never reports a change.
    pub fn observe(&mut self, activated: bool) -> Option<bool> {
        let previous = self.previous.replace(activated);
        match previous {
            Some(prev) if prev != activated => {
                tracing::trace!(from = prev, to = activated, "activation changed");
                Some(activated)
            }
            _ => None,
        }
    }

    /// Last observed value, if any
    pub fn current(&self) -> Option<bool> {
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowState;

    fn flow(state: FlowState) -> FlowSnapshot {
        FlowSnapshot::new(state)
    }

    #[test]
    fn test_role_resolution() {
        assert_eq!(resolve_role(None, false), Role::Root);
        assert_eq!(resolve_role(None, true), Role::Nested);
        assert_eq!(resolve_role(Some(true), true), Role::Root);
        assert_eq!(resolve_role(Some(false), false), Role::Nested);
    }

    #[test]
    fn test_root_activation() {
        assert!(is_activated(Role::Root, None, None, false));
        assert!(is_activated(Role::Root, Some(true), None, false));
        assert!(!is_activated(Role::Root, Some(false), None, false));

        // Parent flow is ignored for roots
        let exited = flow(FlowState::Exited);
        assert!(is_activated(Role::Root, None, Some(&exited), false));
    }

    #[test]
    fn test_nested_strict_waits_for_entered() {
        for (state, expected) in [
            (FlowState::Exited, false),
            (FlowState::Entering, false),
            (FlowState::Entered, true),
            (FlowState::Exiting, false),
        ] {
            assert_eq!(
                is_activated(Role::Nested, None, Some(&flow(state)), false),
                expected,
                "strict mode with parent {state}"
            );
        }
    }

    #[test]
    fn test_nested_merge_follows_entering() {
        for (state, expected) in [
            (FlowState::Exited, false),
            (FlowState::Entering, true),
            (FlowState::Entered, true),
            (FlowState::Exiting, false),
        ] {
            assert_eq!(
                is_activated(Role::Nested, None, Some(&flow(state)), true),
                expected,
                "merge mode with parent {state}"
            );
        }
    }

    #[test]
    fn test_nested_ignores_explicit_activate() {
        let entered = flow(FlowState::Entered);
        assert!(is_activated(Role::Nested, Some(false), Some(&entered), false));
    }

    #[test]
    fn test_nested_without_parent_is_inactive() {
        assert!(!is_activated(Role::Nested, Some(true), None, true));
    }

    #[test]
    fn test_tracker_reports_changes_only() {
        let mut tracker = ActivationTracker::new();
        assert_eq!(tracker.current(), None);

        assert_eq!(tracker.observe(true), None);
        assert_eq!(tracker.observe(true), None);
        assert_eq!(tracker.observe(false), Some(false));
        assert_eq!(tracker.observe(false), None);
        assert_eq!(tracker.observe(true), Some(true));
        assert_eq!(tracker.current(), Some(true));
    }
}
