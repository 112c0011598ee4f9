//! Animator state machine
//!
//! An `Animator` owns one flow state and moves it through the lifecycle in
//! response to activation changes. It is driven by three host calls:
//!
//! - [`Animator::mount`] once, after construction
//! - [`Animator::update`] whenever ambient settings or the parent interface
//!   may have changed
//! - drop (or [`Animator::destroy`]) on teardown, which cancels the pending
//!   timer
//!
//! Every state change rebuilds an [`AnimatorInterface`], the read-only value
//! descendants observe. Its accessors go through an [`AnimatorHandle`] whose
//! identity is stable for the animator's whole life.
//!
//! ```ignore
//! let scheduler = TimerScheduler::new();
//! let mut animator = Animator::new(&scheduler, AnimatorProps::new(), &AnimatorSettings::new())
//!     .named("panel");
//! animator.mount(None);
//!
//! scheduler.advance(0);
//! assert!(animator.flow().entering());
//! scheduler.advance(200);
//! assert!(animator.flow().entered());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use cadence_core::activation::{self, ActivationTracker, Role};
use cadence_core::{
    AnimatorProps, AnimatorSettings, DurationConfig, FlowDuration, FlowSnapshot, FlowState,
    FlowTransition,
};

use crate::scheduler::{TimerScheduler, TimerSlot};

/// Called with the new activation value on every observed change
pub type ActivateCallback = Box<dyn FnMut(bool)>;

/// Called with the rebuilt interface after every flow state change
pub type TransitionListener = Box<dyn FnMut(&AnimatorInterface)>;

struct AnimatorState {
    label: Option<String>,
    props: AnimatorProps,
    settings: AnimatorSettings,
    duration_override: DurationConfig,
    flow: FlowState,
    revision: u64,
    has_entered: bool,
    has_exited: bool,
    history: Vec<FlowTransition>,
    slot: TimerSlot,
}

impl AnimatorState {
    fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("animator")
    }

    fn animate(&self) -> bool {
        self.props.resolve_animate(&self.settings)
    }

    fn duration(&self) -> FlowDuration {
        self.props
            .resolve_duration(&self.settings, &self.duration_override)
    }

    /// Assign a new flow state and rebuild the interface
    fn assign(&mut self, next: FlowState, handle: &AnimatorHandle) -> AnimatorInterface {
        let from = self.flow;
        if !from.can_transition_to(next) {
            tracing::warn!(animator = self.label(), %from, to = %next, "unexpected flow transition");
        }

        let at_ms = self.slot.scheduler().now_ms();
        self.flow = next;
        self.revision += 1;
        match next {
            FlowState::Entered => self.has_entered = true,
            FlowState::Exited => self.has_exited = true,
            FlowState::Entering | FlowState::Exiting => {}
        }
        self.history.push(FlowTransition {
            from,
            to: next,
            at_ms,
        });
        tracing::debug!(animator = self.label(), %from, to = %next, at_ms, "flow transition");

        self.interface(handle)
    }

    fn interface(&self, handle: &AnimatorHandle) -> AnimatorInterface {
        AnimatorInterface {
            flow: FlowSnapshot::new(self.flow),
            revision: self.revision,
            handle: handle.clone(),
        }
    }
}

struct AnimatorCore {
    state: RefCell<AnimatorState>,
    listeners: RefCell<Vec<TransitionListener>>,
    handle: AnimatorHandle,
}

impl AnimatorCore {
    fn publish(&self, interface: &AnimatorInterface) {
        // Listeners run unborrowed so they may subscribe or read accessors
        let mut listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for listener in listeners.iter_mut() {
            listener(interface);
        }
        let mut slot = self.listeners.borrow_mut();
        listeners.append(&mut slot);
        *slot = listeners;
    }
}

/// Start entering: after the delay (only when fully exited), become
/// `Entering`, then `Entered` once the enter time has passed.
fn enter(core: &Rc<AnimatorCore>) {
    let mut state = core.state.borrow_mut();
    if state.flow.is_entering_or_entered() {
        return;
    }

    let delay = if state.flow == FlowState::Exited {
        state.duration().delay
    } else {
        0
    };

    let weak = Rc::downgrade(core);
    state.slot.schedule(delay, move || {
        if let Some(core) = weak.upgrade() {
            begin(&core, FlowState::Entering);
        }
    });
}

/// Start exiting: become `Exiting` on the next timer turn, then `Exited` once
/// the exit time has passed.
fn exit(core: &Rc<AnimatorCore>) {
    let mut state = core.state.borrow_mut();
    if state.flow.is_exiting_or_exited() {
        return;
    }

    let weak = Rc::downgrade(core);
    state.slot.schedule(0, move || {
        if let Some(core) = weak.upgrade() {
            begin(&core, FlowState::Exiting);
        }
    });
}

/// Enter a transitional state and schedule its completion
fn begin(core: &Rc<AnimatorCore>, transitional: FlowState) {
    let settled = match transitional {
        FlowState::Entering => FlowState::Entered,
        _ => FlowState::Exited,
    };

    let interface = {
        let mut state = core.state.borrow_mut();
        let duration = state.duration();
        let wait_ms = match settled {
            FlowState::Entered => duration.enter,
            _ => duration.exit,
        };
        let interface = state.assign(transitional, &core.handle);

        let weak = Rc::downgrade(core);
        state.slot.schedule(wait_ms, move || {
            if let Some(core) = weak.upgrade() {
                settle(&core, settled);
            }
        });
        interface
    };
    core.publish(&interface);
}

fn settle(core: &Rc<AnimatorCore>, settled: FlowState) {
    let interface = core.state.borrow_mut().assign(settled, &core.handle);
    core.publish(&interface);
}

/// Animation flow state machine for one node
pub struct Animator {
    core: Rc<AnimatorCore>,
    tracker: ActivationTracker,
    on_activate: Option<ActivateCallback>,
    mounted: bool,
}

impl Animator {
    /// Create an animator
    ///
    /// The initial state is `Exited` when animation is enabled, otherwise
    /// `Entered`. Nothing is scheduled until [`mount`](Self::mount).
    pub fn new(
        scheduler: &TimerScheduler,
        props: AnimatorProps,
        settings: &AnimatorSettings,
    ) -> Self {
        let flow = FlowState::initial(props.resolve_animate(settings));
        let state = AnimatorState {
            label: None,
            props,
            settings: settings.clone(),
            duration_override: DurationConfig::EMPTY,
            flow,
            revision: 0,
            has_entered: false,
            has_exited: false,
            history: Vec::new(),
            slot: TimerSlot::new(scheduler.clone()),
        };

        let core = Rc::new_cyclic(|weak: &Weak<AnimatorCore>| AnimatorCore {
            state: RefCell::new(state),
            listeners: RefCell::new(Vec::new()),
            handle: AnimatorHandle {
                core: Rc::new(weak.clone()),
            },
        });

        Self {
            core,
            tracker: ActivationTracker::new(),
            on_activate: None,
            mounted: false,
        }
    }

    /// Name used in logs
    pub fn named(self, label: impl Into<String>) -> Self {
        self.core.state.borrow_mut().label = Some(label.into());
        self
    }

    /// Set the activation change callback
    pub fn on_activate<F: FnMut(bool) + 'static>(mut self, callback: F) -> Self {
        self.on_activate = Some(Box::new(callback));
        self
    }

    /// Register a listener for flow state changes
    pub fn subscribe<F: FnMut(&AnimatorInterface) + 'static>(&self, listener: F) {
        self.core
            .listeners
            .borrow_mut()
            .push(Box::new(listener));
    }

    /// First evaluation after construction
    ///
    /// Seeds the activation tracker and, when animating and already
    /// activated, starts entering right away. `on_activate` is not called.
    pub fn mount(&mut self, parent: Option<&AnimatorInterface>) {
        if self.mounted {
            return;
        }
        self.mounted = true;

        let (animate, activated) = {
            let state = self.core.state.borrow();
            if parent.is_none() && state.props.role(false) == Role::Nested {
                tracing::warn!(
                    animator = state.label(),
                    "nested animator mounted without a parent interface; treating as not activated"
                );
            }
            (state.animate(), Self::evaluate(&state, parent))
        };

        self.tracker.observe(activated);
        if animate && activated {
            enter(&self.core);
        }
    }

    /// Re-evaluate activation against new inputs
    ///
    /// On a change, `on_activate` runs first, then `enter` or `exit` when
    /// animation is enabled.
    pub fn update(&mut self, settings: &AnimatorSettings, parent: Option<&AnimatorInterface>) {
        {
            let mut state = self.core.state.borrow_mut();
            if state.settings != *settings {
                state.settings = settings.clone();
            }
        }

        if !self.mounted {
            self.mount(parent);
            return;
        }

        let (animate, activated) = {
            let state = self.core.state.borrow();
            (state.animate(), Self::evaluate(&state, parent))
        };

        let Some(activated) = self.tracker.observe(activated) else {
            return;
        };

        if let Some(callback) = self.on_activate.as_mut() {
            callback(activated);
        }

        if animate {
            if activated {
                enter(&self.core);
            } else {
                exit(&self.core);
            }
        }
    }

    /// Replace the declared props
    ///
    /// Takes effect at the next [`update`](Self::update). The runtime
    /// duration override is kept.
    pub fn set_props(&mut self, props: AnimatorProps) {
        self.core.state.borrow_mut().props = props;
    }

    fn evaluate(state: &AnimatorState, parent: Option<&AnimatorInterface>) -> bool {
        let role = state.props.role(parent.is_some());
        let parent_flow = parent.map(|p| p.flow());
        activation::is_activated(
            role,
            state.props.activate,
            parent_flow.as_ref(),
            state.props.merge,
        )
    }

    /// Start entering; no-op while entering or entered
    pub fn enter(&self) {
        enter(&self.core);
    }

    /// Start exiting; no-op while exiting or exited
    pub fn exit(&self) {
        exit(&self.core);
    }

    /// Tear down, cancelling any pending transition
    pub fn destroy(self) {
        drop(self);
    }

    pub fn flow(&self) -> FlowSnapshot {
        FlowSnapshot::new(self.core.state.borrow().flow)
    }

    /// Current interface for descendants
    pub fn interface(&self) -> AnimatorInterface {
        self.core.state.borrow().interface(&self.core.handle)
    }

    /// Stable accessor handle
    pub fn handle(&self) -> AnimatorHandle {
        self.core.handle.clone()
    }

    pub fn label(&self) -> Option<String> {
        self.core.state.borrow().label.clone()
    }

    pub fn props(&self) -> AnimatorProps {
        self.core.state.borrow().props.clone()
    }

    /// Effective animate flag
    pub fn animate(&self) -> bool {
        self.core.state.borrow().animate()
    }

    /// Last observed activation
    pub fn is_activated(&self) -> bool {
        self.tracker.current().unwrap_or(false)
    }

    pub fn duration(&self) -> FlowDuration {
        self.core.state.borrow().duration()
    }

    /// Set the runtime duration override
    ///
    /// The override has the highest precedence and persists until replaced,
    /// regardless of later prop or settings changes.
    pub fn set_duration(&self, duration: impl Into<DurationConfig>) {
        self.core.handle.set_duration(duration);
    }

    pub fn has_entered(&self) -> bool {
        self.core.state.borrow().has_entered
    }

    pub fn has_exited(&self) -> bool {
        self.core.state.borrow().has_exited
    }

    /// Whether a transition step is waiting on the scheduler
    pub fn is_scheduled(&self) -> bool {
        self.core.state.borrow().slot.is_pending()
    }

    /// Recorded state assignments, oldest first
    pub fn history(&self) -> Vec<FlowTransition> {
        self.core.state.borrow().history.clone()
    }

    pub fn clear_history(&self) {
        self.core.state.borrow_mut().history.clear();
    }
}

impl Drop for Animator {
    fn drop(&mut self) {
        if let Ok(mut state) = self.core.state.try_borrow_mut() {
            state.slot.unschedule();
        }
    }
}

impl fmt::Debug for Animator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.state.borrow();
        f.debug_struct("Animator")
            .field("label", &state.label)
            .field("flow", &state.flow)
            .field("revision", &state.revision)
            .field("activated", &self.tracker.current())
            .finish()
    }
}

/// Stable accessors into a live animator
///
/// Clones share identity, see [`ptr_eq`](Self::ptr_eq). Once the animator is
/// gone, getters return defaults and `set_duration` is ignored.
#[derive(Clone)]
pub struct AnimatorHandle {
    core: Rc<Weak<AnimatorCore>>,
}

impl AnimatorHandle {
    fn read<R>(&self, f: impl FnOnce(&AnimatorState) -> R) -> Option<R> {
        let core = self.core.upgrade()?;
        let state = core.state.borrow();
        let value = f(&state);
        Some(value)
    }

    pub fn is_alive(&self) -> bool {
        self.core.strong_count() > 0
    }

    /// Whether both handles belong to the same animator
    pub fn ptr_eq(&self, other: &AnimatorHandle) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    pub fn get_duration(&self) -> FlowDuration {
        self.read(AnimatorState::duration).unwrap_or_default()
    }

    /// Time from activation to entered: `enter + delay`
    pub fn duration_in(&self) -> u32 {
        self.get_duration().duration_in()
    }

    /// Time from deactivation to exited: `exit`
    pub fn duration_out(&self) -> u32 {
        self.get_duration().duration_out()
    }

    pub fn has_entered(&self) -> bool {
        self.read(|state| state.has_entered).unwrap_or(false)
    }

    pub fn has_exited(&self) -> bool {
        self.read(|state| state.has_exited).unwrap_or(false)
    }

    /// Set the animator's runtime duration override
    pub fn set_duration(&self, duration: impl Into<DurationConfig>) {
        let Some(core) = self.core.upgrade() else {
            return;
        };
        let duration = duration.into();
        let mut state = core.state.borrow_mut();
        tracing::debug!(animator = state.label(), ?duration, "duration override set");
        state.duration_override = duration;
    }
}

impl fmt::Debug for AnimatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimatorHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Read-only snapshot broadcast to descendants
///
/// A new interface is built on every flow state change; the one with the
/// higher revision supersedes the other entirely. The accessors read live
/// animator state through the stable handle.
#[derive(Clone)]
pub struct AnimatorInterface {
    flow: FlowSnapshot,
    revision: u64,
    handle: AnimatorHandle,
}

impl AnimatorInterface {
    pub fn flow(&self) -> FlowSnapshot {
        self.flow
    }

    /// Number of state changes the animator had gone through
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn handle(&self) -> &AnimatorHandle {
        &self.handle
    }

    /// Whether this interface replaces `other`
    pub fn supersedes(&self, other: &AnimatorInterface) -> bool {
        self.handle.ptr_eq(&other.handle) && self.revision > other.revision
    }

    pub fn get_duration(&self) -> FlowDuration {
        self.handle.get_duration()
    }

    pub fn duration_in(&self) -> u32 {
        self.handle.duration_in()
    }

    pub fn duration_out(&self) -> u32 {
        self.handle.duration_out()
    }

    pub fn has_entered(&self) -> bool {
        self.handle.has_entered()
    }

    pub fn has_exited(&self) -> bool {
        self.handle.has_exited()
    }
}

impl fmt::Debug for AnimatorInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimatorInterface")
            .field("flow", &self.flow.value())
            .field("revision", &self.revision)
            .finish()
    }
}
