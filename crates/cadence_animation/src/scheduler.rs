//! Timer scheduler
//!
//! A single serialized timeline of delayed callbacks. Time is either virtual
//! (`advance`) or read from the wall clock each frame (`tick`). Callbacks never
//! run synchronously from `schedule_after`, even with a zero delay; they run
//! from the next `advance`/`tick`, ordered by due time and then by scheduling
//! order.

use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

new_key_type! {
    /// Handle to a pending timer
    pub struct TimerId;
}

/// A callback run once when its timer fires
pub type TimerCallback = Box<dyn FnOnce()>;

struct Timer {
    due_ms: u64,
    seq: u64,
    callback: TimerCallback,
}

struct TimerQueue {
    timers: SlotMap<TimerId, Timer>,
    now_ms: u64,
    next_seq: u64,
}

/// Shared handle to the timer timeline
///
/// Cloning is cheap; all clones drive the same timeline.
#[derive(Clone)]
pub struct TimerScheduler {
    queue: Rc<RefCell<TimerQueue>>,
    epoch: Instant,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self {
            queue: Rc::new(RefCell::new(TimerQueue {
                timers: SlotMap::with_key(),
                now_ms: 0,
                next_seq: 0,
            })),
            epoch: Instant::now(),
        }
    }

    /// Current scheduler time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.queue.borrow().now_ms
    }

    /// Run `callback` once after `delay_ms`
    pub fn schedule_after(&self, delay_ms: u32, callback: impl FnOnce() + 'static) -> TimerId {
        let mut queue = self.queue.borrow_mut();
        let due_ms = queue.now_ms.saturating_add(u64::from(delay_ms));
        let seq = queue.next_seq;
        queue.next_seq += 1;

        let id = queue.timers.insert(Timer {
            due_ms,
            seq,
            callback: Box::new(callback),
        });
        tracing::trace!(?id, delay_ms, due_ms, "timer scheduled");
        id
    }

    /// Cancel a pending timer
    ///
    /// Returns false if the timer already fired or was cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        let removed = self.queue.borrow_mut().timers.remove(id).is_some();
        if removed {
            tracing::trace!(?id, "timer cancelled");
        }
        removed
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.queue.borrow().timers.contains_key(id)
    }

    /// Get the number of pending timers
    pub fn pending_count(&self) -> usize {
        self.queue.borrow().timers.len()
    }

    /// Check if any timers are waiting to fire
    pub fn has_pending(&self) -> bool {
        !self.queue.borrow().timers.is_empty()
    }

    /// Due time of the earliest pending timer
    pub fn next_due_ms(&self) -> Option<u64> {
        self.queue
            .borrow()
            .timers
            .values()
            .map(|timer| timer.due_ms)
            .min()
    }

    /// Fire the earliest timer due at or before `deadline_ms`
    ///
    /// Moves the clock to that timer's due time. Returns false when nothing
    /// is due.
    pub fn fire_next(&self, deadline_ms: u64) -> bool {
        let timer = {
            let mut queue = self.queue.borrow_mut();
            let next = queue
                .timers
                .iter()
                .filter(|(_, timer)| timer.due_ms <= deadline_ms)
                .min_by_key(|(_, timer)| (timer.due_ms, timer.seq))
                .map(|(id, _)| id);

            let Some(id) = next else {
                return false;
            };
            let Some(timer) = queue.timers.remove(id) else {
                return false;
            };
            queue.now_ms = queue.now_ms.max(timer.due_ms);
            tracing::trace!(?id, at_ms = queue.now_ms, "timer fired");
            timer
        };

        // The queue borrow is released so the callback can schedule more work
        (timer.callback)();
        true
    }

    /// Advance virtual time by `ms`, firing every timer that comes due
    ///
    /// Timers scheduled by callbacks fire in the same call if they come due
    /// before the new time.
    pub fn advance(&self, ms: u64) {
        let deadline = self.now_ms().saturating_add(ms);
        self.advance_to(deadline);
    }

    /// Advance virtual time to an absolute instant
    pub fn advance_to(&self, deadline_ms: u64) {
        while self.fire_next(deadline_ms) {}
        let mut queue = self.queue.borrow_mut();
        queue.now_ms = queue.now_ms.max(deadline_ms);
    }

    /// Fire timers until none remain, returning how many fired
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        while let Some(due) = self.next_due_ms() {
            if self.fire_next(due) {
                fired += 1;
            }
        }
        fired
    }

    /// Wall-clock milliseconds since the scheduler was created
    pub fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Advance to the wall-clock time elapsed since creation
    pub fn tick(&self) {
        self.advance_to(self.elapsed_ms());
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// A single-slot timer owned by one animator
///
/// At most one callback is pending. Scheduling replaces (cancels) the
/// previous one.
pub struct TimerSlot {
    scheduler: TimerScheduler,
    pending: Option<TimerId>,
}

impl TimerSlot {
    pub fn new(scheduler: TimerScheduler) -> Self {
        Self {
            scheduler,
            pending: None,
        }
    }

    pub fn scheduler(&self) -> &TimerScheduler {
        &self.scheduler
    }

    /// Cancel any pending callback, then schedule `callback`
    pub fn schedule(&mut self, delay_ms: u32, callback: impl FnOnce() + 'static) {
        self.unschedule();
        self.pending = Some(self.scheduler.schedule_after(delay_ms, callback));
    }

    /// Cancel the pending callback, if any
    pub fn unschedule(&mut self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel(id);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .map(|id| self.scheduler.is_pending(id))
            .unwrap_or(false)
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.unschedule();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |label: &'static str| {
            let sink = sink.clone();
            Box::new(move || sink.borrow_mut().push(label)) as Box<dyn FnOnce()>
        };
        (log, make)
    }

    #[test]
    fn test_zero_delay_is_deferred() {
        let scheduler = TimerScheduler::new();
        let (log, make) = recorder();

        scheduler.schedule_after(0, make("a"));
        assert!(log.borrow().is_empty());
        assert!(scheduler.has_pending());

        scheduler.advance(0);
        assert_eq!(*log.borrow(), vec!["a"]);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn test_fires_in_due_then_schedule_order() {
        let scheduler = TimerScheduler::new();
        let (log, make) = recorder();

        scheduler.schedule_after(50, make("late"));
        scheduler.schedule_after(10, make("first"));
        scheduler.schedule_after(10, make("second"));

        scheduler.advance(20);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(scheduler.now_ms(), 20);

        scheduler.advance(30);
        assert_eq!(*log.borrow(), vec!["first", "second", "late"]);
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let scheduler = TimerScheduler::new();
        let (log, make) = recorder();

        let id = scheduler.schedule_after(10, make("never"));
        assert!(scheduler.is_pending(id));
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));

        scheduler.advance(100);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_nested_scheduling_within_advance() {
        let scheduler = TimerScheduler::new();
        let fired_at = Rc::new(RefCell::new(Vec::new()));

        let inner_scheduler = scheduler.clone();
        let sink = fired_at.clone();
        scheduler.schedule_after(10, move || {
            sink.borrow_mut().push(inner_scheduler.now_ms());
            let sink = sink.clone();
            let clock = inner_scheduler.clone();
            inner_scheduler.schedule_after(15, move || sink.borrow_mut().push(clock.now_ms()));
        });

        scheduler.advance(100);
        assert_eq!(*fired_at.borrow(), vec![10, 25]);
        assert_eq!(scheduler.now_ms(), 100);
    }

    #[test]
    fn test_slot_replaces_pending() {
        let scheduler = TimerScheduler::new();
        let (log, make) = recorder();
        let mut slot = TimerSlot::new(scheduler.clone());

        slot.schedule(10, make("replaced"));
        slot.schedule(10, make("kept"));
        assert_eq!(scheduler.pending_count(), 1);

        scheduler.advance(10);
        assert_eq!(*log.borrow(), vec!["kept"]);
        assert!(!slot.is_pending());
    }

    #[test]
    fn test_slot_drop_unschedules() {
        let scheduler = TimerScheduler::new();
        let (log, make) = recorder();

        {
            let mut slot = TimerSlot::new(scheduler.clone());
            slot.schedule(5, make("dropped"));
        }

        assert!(!scheduler.has_pending());
        scheduler.advance(10);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_run_until_idle() {
        let scheduler = TimerScheduler::new();
        let (log, make) = recorder();

        scheduler.schedule_after(300, make("b"));
        scheduler.schedule_after(100, make("a"));

        assert_eq!(scheduler.run_until_idle(), 2);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
        assert_eq!(scheduler.now_ms(), 300);
    }

    #[test]
    fn test_tick_uses_elapsed_time() {
        let scheduler = TimerScheduler::new();
        let (log, make) = recorder();

        scheduler.schedule_after(0, make("now"));
        scheduler.schedule_after(60_000, make("later"));

        std::thread::sleep(std::time::Duration::from_millis(5));
        scheduler.tick();

        assert_eq!(*log.borrow(), vec!["now"]);
        assert!(scheduler.now_ms() >= 5);
        assert!(scheduler.now_ms() <= scheduler.elapsed_ms());
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn test_large_delays_saturate() {
        let scheduler = TimerScheduler::new();
        let (log, make) = recorder();

        scheduler.advance(u64::MAX - 10);
        scheduler.schedule_after(u32::MAX, make("clamped"));
        assert_eq!(scheduler.next_due_ms(), Some(u64::MAX));

        scheduler.advance(u64::MAX);
        assert_eq!(*log.borrow(), vec!["clamped"]);
    }
}
