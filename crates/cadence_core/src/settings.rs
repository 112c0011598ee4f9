//! Ambient settings and per-animator props
//!
//! `AnimatorSettings` is the configuration inherited from the surrounding
//! tree. `AnimatorProps` is what a single animator declares about itself.
//! Explicit props always win over ambient settings.

use serde::{Deserialize, Serialize};

use crate::activation::{resolve_role, Role};
use crate::duration::{self, DurationConfig, FlowDuration};

/// Ambient animation configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorSettings {
    /// Whether animators animate at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animate: Option<bool>,
    /// Inherited duration layer
    #[serde(skip_serializing_if = "DurationConfig::is_empty")]
    pub duration: DurationConfig,
}

impl AnimatorSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn animate(mut self, animate: bool) -> Self {
        self.animate = Some(animate);
        self
    }

    pub fn duration(mut self, duration: impl Into<DurationConfig>) -> Self {
        self.duration = duration.into();
        self
    }

    /// Overlay settings installed by a nested provider
    ///
    /// Fields `inner` defines replace ours; the rest are inherited.
    pub fn merge(&self, inner: &AnimatorSettings) -> AnimatorSettings {
        AnimatorSettings {
            animate: inner.animate.or(self.animate),
            duration: self.duration.merge(&inner.duration),
        }
    }
}

/// Configuration an animator declares about itself
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorProps {
    /// Overrides the ambient `animate` setting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animate: Option<bool>,
    /// Forces root (or nested) behavior regardless of tree position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<bool>,
    /// Activation for root animators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activate: Option<bool>,
    /// Declared duration layer
    #[serde(skip_serializing_if = "DurationConfig::is_empty")]
    pub duration: DurationConfig,
    /// Activate as soon as the parent starts entering
    pub merge: bool,
}

impl AnimatorProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn animate(mut self, animate: bool) -> Self {
        self.animate = Some(animate);
        self
    }

    pub fn root(mut self, root: bool) -> Self {
        self.root = Some(root);
        self
    }

    pub fn activate(mut self, activate: bool) -> Self {
        self.activate = Some(activate);
        self
    }

    pub fn duration(mut self, duration: impl Into<DurationConfig>) -> Self {
        self.duration = duration.into();
        self
    }

    pub fn merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    /// Effective animate flag; animation is on unless something turns it off
    pub fn resolve_animate(&self, settings: &AnimatorSettings) -> bool {
        self.animate.or(settings.animate).unwrap_or(true)
    }

    pub fn role(&self, has_parent: bool) -> Role {
        resolve_role(self.root, has_parent)
    }

    /// Resolve the duration against ambient settings and a runtime override
    pub fn resolve_duration(
        &self,
        settings: &AnimatorSettings,
        overrides: &DurationConfig,
    ) -> FlowDuration {
        duration::resolve(&settings.duration, &self.duration, overrides)
    }
}
