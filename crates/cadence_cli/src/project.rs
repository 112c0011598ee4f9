//! Scene scaffolding

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{SceneConfig, SCENE_FILE};

const SAMPLE_SCENE: &str = r#"# Cadence scene
#
# Ambient settings apply to every node unless a node overrides them.
[settings]
animate = true
duration = { enter = 200, exit = 200 }

[[nodes]]
name = "panel"

[[nodes]]
name = "title"
parent = "panel"
# Start entering together with the panel
merge = true

[[nodes]]
name = "content"
parent = "panel"
duration = { enter = 300, delay = 50 }

# Hide the panel; children exit with it
[[events]]
at = 1500
node = "panel"
activate = false
"#;

/// Write a sample `cadence.toml` into `path`
///
/// Refuses to overwrite an existing scene unless `force` is set.
pub fn create_scene(path: &Path, force: bool) -> Result<PathBuf> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let scene_path = path.join(SCENE_FILE);
    if scene_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            scene_path.display()
        );
    }

    // Catch a broken sample before it reaches disk
    SceneConfig::from_toml(SAMPLE_SCENE)?;

    fs::write(&scene_path, SAMPLE_SCENE)
        .with_context(|| format!("Failed to write {}", scene_path.display()))?;
    tracing::info!(path = %scene_path.display(), "scene created");

    Ok(scene_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::run_scene;
    use cadence_core::FlowState;

    #[test]
    fn test_create_scene() {
        let dir = tempfile::tempdir().unwrap();
        let scene_path = create_scene(dir.path(), false).unwrap();
        assert!(scene_path.exists());

        let scene = SceneConfig::load(dir.path()).unwrap();
        assert_eq!(scene.nodes.len(), 3);
    }

    #[test]
    fn test_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        create_scene(dir.path(), false).unwrap();

        let err = create_scene(dir.path(), false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert!(create_scene(dir.path(), true).is_ok());
    }

    #[test]
    fn test_sample_scene_settles_exited() {
        let scene = SceneConfig::from_toml(SAMPLE_SCENE).unwrap();
        let report = run_scene(&scene, None).unwrap();

        assert!(report
            .nodes
            .iter()
            .all(|node| node.state == FlowState::Exited && node.has_entered));
    }
}
