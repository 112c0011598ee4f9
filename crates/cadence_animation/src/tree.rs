//! Animator tree
//!
//! Host integration for a tree of animators. The tree plays the part a UI
//! framework's context mechanism would: it hands each animator its ambient
//! settings and its parent's latest interface, top-down, after every change.
//!
//! Propagation is eventual. When a timer moves a parent to a new state the
//! tree re-syncs, children observe the new parent interface and schedule
//! their own transitions, and grandchildren see those on later syncs.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use cadence_core::{AnimatorProps, AnimatorSettings, DurationConfig, FlowSnapshot};

use crate::animator::{Animator, AnimatorInterface};
use crate::error::TreeError;
use crate::scheduler::TimerScheduler;

new_key_type! {
    /// Identifier for a node in an animator tree
    pub struct NodeId;
}

struct Node {
    animator: Animator,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
    /// Settings installed for this node and its descendants
    provided: Option<AnimatorSettings>,
}

/// A tree of animators sharing one scheduler
pub struct AnimatorTree {
    scheduler: TimerScheduler,
    settings: AnimatorSettings,
    nodes: SlotMap<NodeId, Node>,
    roots: SmallVec<[NodeId; 4]>,
}

impl AnimatorTree {
    pub fn new(scheduler: TimerScheduler) -> Self {
        Self {
            scheduler,
            settings: AnimatorSettings::default(),
            nodes: SlotMap::with_key(),
            roots: SmallVec::new(),
        }
    }

    /// Set the ambient settings at the top of the tree
    pub fn with_settings(mut self, settings: AnimatorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn scheduler(&self) -> &TimerScheduler {
        &self.scheduler
    }

    pub fn settings(&self) -> &AnimatorSettings {
        &self.settings
    }

    /// Insert and mount a new animator
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        props: AnimatorProps,
    ) -> Result<NodeId, TreeError> {
        self.insert_with(parent, props, |animator| animator)
    }

    /// Insert an animator, configuring it before it mounts
    ///
    /// `configure` receives the freshly built animator, so callbacks and
    /// labels are in place before the first evaluation.
    pub fn insert_with(
        &mut self,
        parent: Option<NodeId>,
        props: AnimatorProps,
        configure: impl FnOnce(Animator) -> Animator,
    ) -> Result<NodeId, TreeError> {
        self.insert_scoped(parent, props, None, configure)
    }

    /// Insert an animator that installs settings for itself and its
    /// descendants
    ///
    /// The installed settings are merged in before the animator is built, so
    /// its initial state and first evaluation already see them.
    pub fn insert_scoped(
        &mut self,
        parent: Option<NodeId>,
        props: AnimatorProps,
        provided: Option<AnimatorSettings>,
        configure: impl FnOnce(Animator) -> Animator,
    ) -> Result<NodeId, TreeError> {
        let parent_interface = match parent {
            Some(parent_id) => Some(
                self.nodes
                    .get(parent_id)
                    .ok_or(TreeError::UnknownParent(parent_id))?
                    .animator
                    .interface(),
            ),
            None => None,
        };

        let inherited = match parent {
            Some(parent_id) => self.effective_settings(parent_id)?,
            None => self.settings.clone(),
        };
        let settings = match &provided {
            Some(provided) => inherited.merge(provided),
            None => inherited,
        };

        let mut animator = configure(Animator::new(&self.scheduler, props, &settings));
        animator.mount(parent_interface.as_ref());

        let id = self.nodes.insert(Node {
            animator,
            parent,
            children: SmallVec::new(),
            provided,
        });

        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.nodes.get_mut(parent_id) {
                    parent_node.children.push(id);
                }
            }
            None => self.roots.push(id),
        }

        tracing::debug!(?id, ?parent, "animator inserted");
        Ok(id)
    }

    /// Remove a node and its whole subtree
    ///
    /// Dropped animators cancel their pending timers.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.node(id)?.parent;

        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.nodes.get_mut(parent_id) {
                    parent_node.children.retain(|child| *child != id);
                }
            }
            None => self.roots.retain(|root| *root != id),
        }

        let mut stack: SmallVec<[NodeId; 8]> = SmallVec::new();
        stack.push(id);
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children.iter().copied());
            }
        }

        tracing::debug!(?id, "animator subtree removed");
        Ok(())
    }

    /// Replace a node's declared props and re-sync
    pub fn set_props(&mut self, id: NodeId, props: AnimatorProps) -> Result<(), TreeError> {
        self.node_mut(id)?.animator.set_props(props);
        self.sync();
        Ok(())
    }

    /// Replace the top-level ambient settings and re-sync
    pub fn set_settings(&mut self, settings: AnimatorSettings) {
        self.settings = settings;
        self.sync();
    }

    /// Install (or clear) settings for a node and its descendants
    ///
    /// Installed settings overlay whatever the node would otherwise inherit.
    pub fn set_subtree_settings(
        &mut self,
        id: NodeId,
        settings: Option<AnimatorSettings>,
    ) -> Result<(), TreeError> {
        self.node_mut(id)?.provided = settings;
        self.sync();
        Ok(())
    }

    /// Set a node's runtime duration override
    pub fn set_duration(
        &self,
        id: NodeId,
        duration: impl Into<DurationConfig>,
    ) -> Result<(), TreeError> {
        self.node(id)?.animator.set_duration(duration);
        Ok(())
    }

    /// Re-evaluate every animator, parents before children
    pub fn sync(&mut self) {
        let mut stack: Vec<(NodeId, AnimatorSettings, Option<AnimatorInterface>)> = self
            .roots
            .iter()
            .rev()
            .map(|id| (*id, self.settings.clone(), None))
            .collect();

        while let Some((id, inherited, parent)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };

            let settings = match &node.provided {
                Some(provided) => inherited.merge(provided),
                None => inherited,
            };
            node.animator.update(&settings, parent.as_ref());

            let interface = node.animator.interface();
            for child in node.children.iter().rev() {
                stack.push((*child, settings.clone(), Some(interface.clone())));
            }
        }
    }

    /// Advance virtual time, re-syncing after every fired timer
    pub fn advance(&mut self, ms: u64) {
        let deadline = self.scheduler.now_ms().saturating_add(ms);
        self.advance_to(deadline);
    }

    /// Advance virtual time to an absolute instant
    pub fn advance_to(&mut self, deadline_ms: u64) {
        self.sync();
        while self.scheduler.fire_next(deadline_ms) {
            self.sync();
        }
        self.scheduler.advance_to(deadline_ms);
    }

    /// Fire timers until the tree is settled, returning how many fired
    pub fn run_until_idle(&mut self) -> usize {
        self.sync();
        let mut fired = 0;
        while let Some(due) = self.scheduler.next_due_ms() {
            if self.scheduler.fire_next(due) {
                fired += 1;
                self.sync();
            }
        }
        fired
    }

    /// Drive the tree from the wall clock
    pub fn tick(&mut self) {
        let now = self.scheduler.elapsed_ms();
        self.advance_to(now);
    }

    /// Settings a node sees, including those it installs itself
    pub fn effective_settings(&self, id: NodeId) -> Result<AnimatorSettings, TreeError> {
        let mut chain: SmallVec<[&AnimatorSettings; 4]> = SmallVec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            if let Some(provided) = &node.provided {
                chain.push(provided);
            }
            current = node.parent;
        }

        Ok(chain
            .iter()
            .rev()
            .fold(self.settings.clone(), |acc, provided| acc.merge(provided)))
    }

    pub fn get(&self, id: NodeId) -> Option<&Animator> {
        self.nodes.get(id).map(|node| &node.animator)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Animator> {
        self.nodes.get_mut(id).map(|node| &mut node.animator)
    }

    pub fn flow(&self, id: NodeId) -> Option<FlowSnapshot> {
        self.get(id).map(Animator::flow)
    }

    pub fn interface(&self, id: NodeId) -> Option<AnimatorInterface> {
        self.get(id).map(Animator::interface)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get the number of animators in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all animators (unordered)
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Animator)> {
        self.nodes.iter().map(|(id, node)| (id, &node.animator))
    }

    fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes.get(id).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(id).ok_or(TreeError::UnknownNode(id))
    }
}
