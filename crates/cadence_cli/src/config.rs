//! Scene file handling (cadence.toml)

use anyhow::{Context, Result};
use cadence_core::{AnimatorProps, AnimatorSettings, DurationConfig};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default scene file name inside a directory
pub const SCENE_FILE: &str = "cadence.toml";

/// A scene: an animator tree plus timed events
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SceneConfig {
    /// Ambient settings at the top of the tree
    #[serde(default)]
    pub settings: AnimatorSettings,
    #[serde(default)]
    pub run: RunConfig,
    /// Animators, parents before children
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub events: Vec<EventConfig>,
}

/// Simulation options
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RunConfig {
    /// Stop at this virtual time instead of running until idle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,
}

/// One animator in the scene
#[derive(Debug, Deserialize, Serialize)]
pub struct NodeConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Settings this node installs for itself and its descendants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<AnimatorSettings>,
    #[serde(flatten)]
    pub props: AnimatorProps,
    /// Keys no other field claimed, rejected by `validate`
    #[serde(flatten, skip_serializing_if = "toml::Table::is_empty")]
    pub unknown: toml::Table,
}

/// A change applied to a node at a given virtual time
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EventConfig {
    /// Virtual time in milliseconds
    pub at: u64,
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animate: Option<bool>,
    /// Runtime duration override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationConfig>,
    /// Remove the node and its subtree
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub remove: bool,
}

fn scene_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(SCENE_FILE)
    } else {
        path.to_path_buf()
    }
}

impl SceneConfig {
    /// Load a scene from a file, or from `cadence.toml` inside a directory
    pub fn load(path: &Path) -> Result<Self> {
        let scene_path = scene_path(path);

        if !scene_path.exists() {
            anyhow::bail!(
                "No scene found at {}. Run `cadence init` to create one.",
                scene_path.display()
            );
        }

        let content = fs::read_to_string(&scene_path)
            .with_context(|| format!("Failed to read {}", scene_path.display()))?;

        let scene = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse {}", scene_path.display()))?;

        Ok(scene)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let scene: SceneConfig = toml::from_str(content)?;
        scene.validate()?;
        Ok(scene)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize scene")
    }

    /// Check node and event references
    ///
    /// Node names are unique, nodes carry no unknown keys, parents are
    /// declared before their children, and every event targets a declared
    /// node.
    pub fn validate(&self) -> Result<()> {
        let mut declared: FxHashSet<&str> = FxHashSet::default();

        for node in &self.nodes {
            if let Some(key) = node.unknown.keys().next() {
                anyhow::bail!("Node `{}` has unknown key `{}`", node.name, key);
            }
            if let Some(parent) = node.parent.as_deref() {
                if !declared.contains(parent) {
                    anyhow::bail!(
                        "Node `{}` references parent `{}` which is not declared before it",
                        node.name,
                        parent
                    );
                }
            }
            if !declared.insert(node.name.as_str()) {
                anyhow::bail!("Duplicate node name `{}`", node.name);
            }
        }

        for event in &self.events {
            if !declared.contains(event.node.as_str()) {
                anyhow::bail!(
                    "Event at {}ms targets unknown node `{}`",
                    event.at,
                    event.node
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"
        [settings]
        duration = { enter = 100, exit = 100 }

        [[nodes]]
        name = "panel"
        duration = 300

        [[nodes]]
        name = "item"
        parent = "panel"
        merge = true
        settings = { duration = { delay = 20 } }

        [[events]]
        at = 1000
        node = "panel"
        activate = false
    "#;

    #[test]
    fn test_parse_scene() {
        let scene = SceneConfig::from_toml(SCENE).unwrap();

        assert_eq!(scene.settings.duration, DurationConfig::symmetric(100));
        assert_eq!(scene.nodes.len(), 2);
        assert_eq!(scene.nodes[0].props.duration, DurationConfig::symmetric(300));
        assert!(scene.nodes[1].props.merge);
        assert_eq!(scene.nodes[1].parent.as_deref(), Some("panel"));
        assert_eq!(
            scene.nodes[1].settings.as_ref().map(|s| s.duration),
            Some(DurationConfig::default().with_delay(20))
        );
        assert_eq!(scene.events[0].activate, Some(false));
        assert!(scene.run.until.is_none());
    }

    #[test]
    fn test_to_toml_reparses() {
        let scene = SceneConfig::from_toml(SCENE).unwrap();
        let reparsed = SceneConfig::from_toml(&scene.to_toml().unwrap()).unwrap();

        assert_eq!(reparsed.nodes.len(), scene.nodes.len());
        assert_eq!(reparsed.nodes[1].props, scene.nodes[1].props);
        assert_eq!(reparsed.settings, scene.settings);
        assert_eq!(reparsed.events[0].at, 1000);
    }

    #[test]
    fn test_parent_must_come_first() {
        let err = SceneConfig::from_toml(
            r#"
            [[nodes]]
            name = "item"
            parent = "panel"

            [[nodes]]
            name = "panel"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not declared before it"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = SceneConfig::from_toml(
            r#"
            [[nodes]]
            name = "panel"
            merg = true
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown key `merg`"));

        let err = SceneConfig::from_toml(
            r#"
            [[nodes]]
            name = "panel"
            [[events]]
            at = 10
            node = "panel"
            activte = false
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("activte"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = SceneConfig::from_toml(
            r#"
            [[nodes]]
            name = "a"
            [[nodes]]
            name = "a"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate node name"));
    }

    #[test]
    fn test_event_targets_known_node() {
        let err = SceneConfig::from_toml(
            r#"
            [[nodes]]
            name = "a"
            [[events]]
            at = 10
            node = "b"
            remove = true
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown node `b`"));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SCENE_FILE), SCENE).unwrap();

        let scene = SceneConfig::load(dir.path()).unwrap();
        assert_eq!(scene.nodes.len(), 2);

        let missing = SceneConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(missing.to_string().contains("cadence init"));
    }
}
