//! Scene simulation on a virtual clock

use anyhow::{Context, Result};
use cadence_animation::{AnimatorTree, NodeId, TimerScheduler};
use cadence_core::FlowState;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::{EventConfig, SceneConfig};

/// One observed state change
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub node: String,
    pub from: FlowState,
    pub to: FlowState,
    pub at_ms: u64,
}

/// Final state of a node still in the tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub node: String,
    pub state: FlowState,
    pub has_entered: bool,
    pub has_exited: bool,
}

/// Result of running a scene
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub end_ms: u64,
    pub timeline: Vec<TimelineEntry>,
    pub nodes: Vec<NodeSummary>,
}

/// Build the scene's tree, apply its events and run it to completion
///
/// `until` overrides the scene's `[run] until`. Without either the
/// simulation runs until no timers remain.
pub fn run_scene(scene: &SceneConfig, until: Option<u64>) -> Result<SimulationReport> {
    let scheduler = TimerScheduler::new();
    let mut tree = AnimatorTree::new(scheduler.clone()).with_settings(scene.settings.clone());
    let timeline: Rc<RefCell<Vec<TimelineEntry>>> = Rc::new(RefCell::new(Vec::new()));
    let mut ids: FxHashMap<&str, NodeId> = FxHashMap::default();

    for node in &scene.nodes {
        let parent = match node.parent.as_deref() {
            Some(name) => Some(
                *ids
                    .get(name)
                    .with_context(|| format!("Unknown parent `{}` for `{}`", name, node.name))?,
            ),
            None => None,
        };

        let name = node.name.clone();
        let sink = timeline.clone();
        let clock = scheduler.clone();
        let id = tree
            .insert_scoped(
                parent,
                node.props.clone(),
                node.settings.clone(),
                move |animator| {
                    let animator = animator.named(name.clone());
                    let previous = Cell::new(animator.flow().value());
                    animator.subscribe(move |interface| {
                        let to = interface.flow().value();
                        sink.borrow_mut().push(TimelineEntry {
                            node: name.clone(),
                            from: previous.replace(to),
                            to,
                            at_ms: clock.now_ms(),
                        });
                    });
                    animator
                },
            )
            .with_context(|| format!("Failed to insert `{}`", node.name))?;
        ids.insert(node.name.as_str(), id);
    }

    let mut events: Vec<&EventConfig> = scene.events.iter().collect();
    events.sort_by_key(|event| event.at);

    for event in events {
        tree.advance_to(event.at);
        let id = *ids
            .get(event.node.as_str())
            .with_context(|| format!("Event targets unknown node `{}`", event.node))?;
        apply_event(&mut tree, id, event)?;
    }

    match until.or(scene.run.until) {
        Some(deadline) => tree.advance_to(deadline),
        None => {
            tree.run_until_idle();
        }
    }

    let nodes = scene
        .nodes
        .iter()
        .filter_map(|node| {
            let animator = tree.get(*ids.get(node.name.as_str())?)?;
            Some(NodeSummary {
                node: node.name.clone(),
                state: animator.flow().value(),
                has_entered: animator.has_entered(),
                has_exited: animator.has_exited(),
            })
        })
        .collect();

    let timeline = timeline.borrow().clone();
    Ok(SimulationReport {
        end_ms: scheduler.now_ms(),
        timeline,
        nodes,
    })
}

fn apply_event(tree: &mut AnimatorTree, id: NodeId, event: &EventConfig) -> Result<()> {
    if event.remove {
        if tree.contains(id) {
            tree.remove(id)?;
        } else {
            tracing::warn!(node = %event.node, at_ms = event.at, "node already removed");
        }
        return Ok(());
    }

    let Some(animator) = tree.get(id) else {
        tracing::warn!(node = %event.node, at_ms = event.at, "event for removed node ignored");
        return Ok(());
    };

    if let Some(duration) = event.duration {
        tree.set_duration(id, duration)?;
    }

    let mut props = animator.props();
    if event.activate.is_some() {
        props.activate = event.activate;
    }
    if event.animate.is_some() {
        props.animate = event.animate;
    }
    tracing::debug!(node = %event.node, at_ms = event.at, ?props, "applying event");
    tree.set_props(id, props)?;
    Ok(())
}
