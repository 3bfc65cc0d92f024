//! Tick scheduler state machine
//!
//! Tracks whether playback is running, which actors still have work, and
//! when the next tick is due on the virtual clock. A single periodic tick
//! serves every scheduled actor; unscheduling an actor is the equivalent of
//! cancelling its timer.

use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

use super::actor::ActorId;

/// Global playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    /// Nothing runs
    Idle,
    /// Scheduled actors advance on every tick
    Running,
}

/// Periodic tick scheduler
#[derive(Debug)]
pub struct Scheduler {
    /// Current playback state
    state: PlayState,

    /// Actors that advance on the next tick
    scheduled: BTreeSet<ActorId>,

    /// Time between ticks
    period: Duration,

    /// Virtual time of the next tick while running
    next_tick_at: Option<Duration>,

    /// Ticks run since the last start
    ticks: u64,
}

impl Scheduler {
    /// Create an idle scheduler
    pub fn new(period: Duration) -> Self {
        Self {
            state: PlayState::Idle,
            scheduled: BTreeSet::new(),
            period,
            next_tick_at: None,
            ticks: 0,
        }
    }

    /// Current playback state
    pub fn state(&self) -> PlayState {
        self.state
    }

    /// Whether playback is running
    pub fn is_running(&self) -> bool {
        self.state == PlayState::Running
    }

    /// Enter `Running` with the given actors scheduled
    ///
    /// The first tick is due one period after `now`.
    pub fn start(&mut self, now: Duration, actors: impl IntoIterator<Item = ActorId>) {
        self.state = PlayState::Running;
        self.scheduled = actors.into_iter().collect();
        self.next_tick_at = Some(now + self.period);
        self.ticks = 0;
    }

    /// Enter `Idle`, dropping every scheduled actor
    pub fn stop(&mut self) {
        self.state = PlayState::Idle;
        self.scheduled.clear();
        self.next_tick_at = None;
    }

    /// Schedule an actor; ignored unless running
    pub fn schedule(&mut self, actor: ActorId) -> bool {
        self.is_running() && self.scheduled.insert(actor)
    }

    /// Stop advancing an actor
    pub fn unschedule(&mut self, actor: ActorId) -> bool {
        self.scheduled.remove(&actor)
    }

    /// Whether the actor advances on the next tick
    pub fn is_scheduled(&self, actor: ActorId) -> bool {
        self.scheduled.contains(&actor)
    }

    /// Snapshot of the scheduled actors in id order
    pub fn scheduled_ids(&self) -> Vec<ActorId> {
        self.scheduled.iter().copied().collect()
    }

    /// Number of scheduled actors
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }

    /// Virtual time of the next tick, if running
    pub fn next_tick_at(&self) -> Option<Duration> {
        self.next_tick_at
    }

    /// Record a tick run at `now` and schedule the following one
    pub fn tick_completed(&mut self, now: Duration) {
        self.ticks += 1;
        if self.is_running() {
            self.next_tick_at = Some(now + self.period);
        }
    }

    /// Ticks run since the last start
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Go idle if running with no scheduled actors; returns whether it did
    pub fn finish_if_drained(&mut self) -> bool {
        if self.is_running() && self.scheduled.is_empty() {
            self.stop();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_schedules_first_tick_one_period_out() {
        let mut scheduler = Scheduler::new(Duration::from_millis(500));
        scheduler.start(Duration::from_secs(2), [ActorId(2), ActorId(1)]);

        assert!(scheduler.is_running());
        assert_eq!(scheduler.scheduled_ids(), vec![ActorId(1), ActorId(2)]);
        assert_eq!(scheduler.next_tick_at(), Some(Duration::from_millis(2500)));

        scheduler.tick_completed(Duration::from_millis(2500));
        assert_eq!(scheduler.next_tick_at(), Some(Duration::from_secs(3)));
        assert_eq!(scheduler.ticks(), 1);
    }

    #[test]
    fn test_schedule_ignored_while_idle() {
        let mut scheduler = Scheduler::new(Duration::from_millis(500));
        assert!(!scheduler.schedule(ActorId(1)));
        assert_eq!(scheduler.scheduled_count(), 0);
    }

    #[test]
    fn test_drained_scheduler_goes_idle() {
        let mut scheduler = Scheduler::new(Duration::from_millis(500));
        scheduler.start(Duration::ZERO, [ActorId(1)]);
        assert!(!scheduler.finish_if_drained());

        scheduler.unschedule(ActorId(1));
        assert!(scheduler.finish_if_drained());
        assert_eq!(scheduler.state(), PlayState::Idle);
        assert_eq!(scheduler.next_tick_at(), None);
    }
}
