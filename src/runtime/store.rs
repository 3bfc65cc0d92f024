//! Actor store: the stage and its public command surface
//!
//! [`Stage`] owns every actor together with the tick scheduler and the bubble
//! timer queue. All mutation goes through `&mut self`; views read actors
//! directly or take a [`StageSnapshot`], and observers are told about every
//! change as it is committed.
//!
//! Time only moves through [`Stage::advance_time`], which fires bubble
//! deadlines and scheduler ticks in deadline order, and [`Stage::tick`],
//! which forces a tick now.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use super::actor::{Actor, ActorId, BubbleKind};
use super::collision::{self, CollisionPair};
use super::command::{Command, CommandPatch};
use super::cursor::{self, CursorEvent};
use super::error::{ConfigResult, StageError, StageResult};
use super::executor::{ExecContext, apply_command};
use super::geometry::{StageBounds, normalize_heading};
use super::scheduler::{PlayState, Scheduler};
use super::snapshot::{ActorSnapshot, StageSnapshot};
use super::timer::{BubbleTimer, TimerQueue};
use super::StageConfig;

/// Most passes `execute_immediate` runs for one `Repeat`
pub const IMMEDIATE_REPEAT_LIMIT: i64 = 1_000;

/// Change notifications delivered to observers
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    /// An actor joined the stage
    ActorAdded(ActorId),
    /// An actor left the stage
    ActorRemoved(ActorId),
    /// Pose, program, name or bubble of an actor changed
    ActorUpdated(ActorId),
    /// Two actors traded programs
    ProgramsSwapped(CollisionPair),
    /// Playback entered `Running`
    PlaybackStarted,
    /// Playback entered `Idle`
    PlaybackStopped(StopReason),
    /// A bubble expired on its own
    BubbleCleared {
        /// Owner of the bubble
        actor: ActorId,
        /// Bubble that cleared
        kind: BubbleKind,
    },
}

/// Why playback stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` was called
    Requested,
    /// Every scheduled program ran out
    Finished,
}

/// Receiver of [`StageEvent`]s
pub trait StageObserver: Send {
    /// Handle one committed change
    fn on_event(&mut self, event: &StageEvent);
}

impl<F> StageObserver for F
where
    F: FnMut(&StageEvent) + Send,
{
    fn on_event(&mut self, event: &StageEvent) {
        self(event)
    }
}

/// Handle returned by [`Stage::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// What one scheduler tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Actors that executed a command
    pub stepped: Vec<ActorId>,
    /// Actors whose program ran out this tick
    pub completed: Vec<ActorId>,
    /// Program swaps caused by collisions
    pub swaps: Vec<CollisionPair>,
    /// Whether playback went idle at the end of the tick
    pub finished: bool,
}

/// Shared animation state: actors, playback and timers
pub struct Stage {
    config: StageConfig,
    bounds: StageBounds,
    actors: Vec<Actor>,
    active: Option<ActorId>,
    scheduler: Scheduler,
    timers: TimerQueue,
    now: Duration,
    observers: Vec<(ObserverId, Box<dyn StageObserver>)>,
    next_observer: u64,
}

impl Default for Stage {
    fn default() -> Self {
        let config = StageConfig::default();
        Self {
            bounds: config.bounds(),
            scheduler: Scheduler::new(config.tick_period()),
            config,
            actors: Vec::new(),
            active: None,
            timers: TimerQueue::new(),
            now: Duration::ZERO,
            observers: Vec::new(),
            next_observer: 0,
        }
    }
}

impl Stage {
    /// Create an empty stage
    pub fn new(config: StageConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            bounds: config.bounds(),
            scheduler: Scheduler::new(config.tick_period()),
            config,
            ..Self::default()
        })
    }

    /// Create a stage with two cats walking towards each other
    pub fn with_default_cast(config: StageConfig) -> ConfigResult<Self> {
        let mut stage = Self::new(config)?;
        stage.place(
            Actor::new(ActorId(1), "Cat 1")
                .at(-200.0, 0.0)
                .with_program(vec![Command::repeat(40, vec![Command::move_by(10.0)])]),
        );
        stage.place(
            Actor::new(ActorId(2), "Cat 2")
                .at(200.0, 0.0)
                .with_program(vec![Command::repeat(40, vec![Command::move_by(-10.0)])]),
        );
        Ok(stage)
    }

    /// Stage configuration
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Reachable area for sprite centres
    pub fn bounds(&self) -> StageBounds {
        self.bounds
    }

    /// Every actor in stage order
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// Look up one actor
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id == id)
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Playback state
    pub fn play_state(&self) -> PlayState {
        self.scheduler.state()
    }

    /// Whether playback is running
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Not running and no bubble waiting to clear
    pub fn is_quiescent(&self) -> bool {
        !self.is_running() && self.timers.is_empty()
    }

    /// Whether the scheduler still advances this actor
    pub fn is_scheduled(&self, id: ActorId) -> bool {
        self.scheduler.is_scheduled(id)
    }

    /// Number of armed bubble timers
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Virtual time of the next scheduler tick
    pub fn next_tick_at(&self) -> Option<Duration> {
        self.scheduler.next_tick_at()
    }

    /// Actor selected in the editor
    pub fn active_actor(&self) -> Option<ActorId> {
        self.active
    }

    /// Copy of the whole stage
    pub fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            time_ms: self.now.as_millis(),
            state: self.scheduler.state(),
            ticks: self.scheduler.ticks(),
            active: self.active,
            actors: self
                .actors
                .iter()
                .map(|a| ActorSnapshot::capture(a, self.scheduler.is_scheduled(a.id)))
                .collect(),
        }
    }

    /// Register an observer for every future change
    pub fn subscribe(&mut self, observer: impl StageObserver + 'static) -> ObserverId {
        self.next_observer += 1;
        let id = ObserverId(self.next_observer);
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Drop an observer; returns whether it was registered
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _)| *observer != id);
        self.observers.len() != before
    }

    fn emit(&mut self, event: StageEvent) {
        for (_, observer) in &mut self.observers {
            observer.on_event(&event);
        }
    }

    /// Add a sprite with the default pose and select it
    pub fn add_actor(&mut self) -> ActorId {
        let id = self.next_actor_id();
        self.place(Actor::new(id, format!("Sprite {id}")));
        self.active = Some(id);
        id
    }

    /// One past the highest id, or the smallest free id once that overflows
    fn next_actor_id(&self) -> ActorId {
        let Some(max) = self.actors.iter().map(|a| a.id.0).max() else {
            return ActorId(1);
        };
        if let Some(next) = max.checked_add(1) {
            return ActorId(next);
        }
        let used: BTreeSet<u32> = self.actors.iter().map(|a| a.id.0).collect();
        let free = (1..=u32::MAX).find(|n| !used.contains(n)).unwrap_or(0);
        ActorId(free)
    }

    /// Add a prepared actor
    ///
    /// The position is clamped onto the stage and the run state reset.
    pub fn insert_actor(&mut self, actor: Actor) -> StageResult<ActorId> {
        if self.actor(actor.id).is_some() {
            return Err(self.reject("insert_actor", StageError::DuplicateActor(actor.id)));
        }
        for command in &actor.program {
            command.validate().map_err(|e| self.reject("insert_actor", e))?;
        }
        Ok(self.place(actor))
    }

    fn place(&mut self, mut actor: Actor) -> ActorId {
        let id = actor.id;
        (actor.x, actor.y) = self.bounds.clamp(actor.x, actor.y);
        actor.heading = normalize_heading(actor.heading);
        actor.cursor.reset();
        actor.bubble = None;
        self.actors.push(actor);
        if self.active.is_none() {
            self.active = Some(id);
        }
        tracing::debug!(actor = %id, "actor added");
        self.emit(StageEvent::ActorAdded(id));
        id
    }

    /// Remove an actor, cancelling its tick and bubble timers
    pub fn remove_actor(&mut self, id: ActorId) -> StageResult<Actor> {
        let index = self.index_of(id, "remove_actor")?;
        let actor = self.actors.remove(index);
        self.timers.cancel_actor(id);
        self.scheduler.unschedule(id);
        if self.active == Some(id) {
            self.active = self.actors.first().map(|a| a.id);
        }
        tracing::debug!(actor = %id, "actor removed");
        self.emit(StageEvent::ActorRemoved(id));
        self.finish_if_drained();
        Ok(actor)
    }

    /// Select the actor shown in the editor
    pub fn set_active_actor(&mut self, id: ActorId) -> StageResult<()> {
        self.index_of(id, "set_active_actor")?;
        self.active = Some(id);
        Ok(())
    }

    /// Rename an actor
    pub fn rename_actor(&mut self, id: ActorId, name: impl Into<String>) -> StageResult<()> {
        let index = self.index_of(id, "rename_actor")?;
        self.actors[index].name = name.into();
        self.emit(StageEvent::ActorUpdated(id));
        Ok(())
    }

    /// Move an actor directly, e.g. when dragged; the position is clamped
    pub fn set_position(&mut self, id: ActorId, x: f64, y: f64) -> StageResult<()> {
        let index = self.index_of(id, "set_position")?;
        let actor = &mut self.actors[index];
        (actor.x, actor.y) = self.bounds.clamp(x, y);
        self.emit(StageEvent::ActorUpdated(id));
        Ok(())
    }

    /// Point an actor in a direction, normalized into `0..360`
    pub fn set_heading(&mut self, id: ActorId, degrees: i64) -> StageResult<()> {
        let index = self.index_of(id, "set_heading")?;
        self.actors[index].heading = normalize_heading(degrees);
        self.emit(StageEvent::ActorUpdated(id));
        Ok(())
    }

    /// Append a command to an actor's program
    pub fn append_command(&mut self, id: ActorId, command: Command) -> StageResult<()> {
        command.validate().map_err(|e| self.reject("append_command", e))?;
        let index = self.index_of(id, "append_command")?;
        self.actors[index].program.push(command);
        self.emit(StageEvent::ActorUpdated(id));
        Ok(())
    }

    /// Overwrite fields of one command
    pub fn update_command(
        &mut self,
        id: ActorId,
        position: usize,
        patch: CommandPatch,
    ) -> StageResult<()> {
        let index = self.index_of(id, "update_command")?;
        let updated = match self.actors[index].program.get(position) {
            Some(existing) => existing.patched(&patch).map_err(|e| self.reject("update_command", e))?,
            None => {
                let err = self.out_of_range(index, position);
                return Err(self.reject("update_command", err));
            }
        };

        let actor = &mut self.actors[index];
        actor.program[position] = updated;
        actor.cursor.exit_loop(position);
        self.emit(StageEvent::ActorUpdated(id));
        Ok(())
    }

    /// Remove one command, returning it
    pub fn remove_command(&mut self, id: ActorId, position: usize) -> StageResult<Command> {
        let index = self.index_of(id, "remove_command")?;
        if position >= self.actors[index].program.len() {
            let err = self.out_of_range(index, position);
            return Err(self.reject("remove_command", err));
        }

        let actor = &mut self.actors[index];
        let removed = actor.program.remove(position);
        actor.cursor.command_removed(position);
        self.emit(StageEvent::ActorUpdated(id));
        Ok(removed)
    }

    /// Trade two actors' programs and restart both
    pub fn swap_programs(&mut self, a: ActorId, b: ActorId) -> StageResult<()> {
        self.index_of(a, "swap_programs")?;
        self.index_of(b, "swap_programs")?;
        if let Some((first, second)) = collision::pair_mut(&mut self.actors, a, b) {
            collision::swap_programs(first, second, &mut self.timers);
            self.after_swap(CollisionPair::new(a, b));
        }
        Ok(())
    }

    fn after_swap(&mut self, pair: CollisionPair) {
        for id in [pair.0, pair.1] {
            let has_program = self.actor(id).is_some_and(|a| !a.program.is_empty());
            if has_program {
                self.scheduler.schedule(id);
            } else {
                self.scheduler.unschedule(id);
            }
        }
        self.emit(StageEvent::ProgramsSwapped(pair));
    }

    /// Run one command right away, outside playback
    ///
    /// Any bubble is cleared first. A `Repeat` runs its whole body `count`
    /// times in this call, at most [`IMMEDIATE_REPEAT_LIMIT`] times.
    pub fn execute_immediate(&mut self, id: ActorId, command: Command) -> StageResult<()> {
        command.validate().map_err(|e| self.reject("execute_immediate", e))?;
        let index = self.index_of(id, "execute_immediate")?;

        let mut ctx = ExecContext {
            bounds: self.bounds,
            motion: self.config.motion,
            now: self.now,
            timers: &mut self.timers,
        };
        let actor = &mut self.actors[index];
        if let Some(timer) = actor.clear_bubble() {
            ctx.timers.cancel(timer);
        }

        match &command {
            Command::Repeat { count, body } if !body.is_empty() => {
                let passes = (*count).clamp(0, IMMEDIATE_REPEAT_LIMIT);
                if passes < *count {
                    tracing::debug!(actor = %id, count = *count, passes, "immediate repeat capped");
                }
                for _ in 0..passes {
                    for step in body {
                        apply_command(actor, step, &mut ctx);
                    }
                }
            }
            Command::Repeat { .. } => {}
            other => apply_command(actor, other, &mut ctx),
        }

        self.emit(StageEvent::ActorUpdated(id));
        Ok(())
    }

    /// Start playback from the top of every program
    ///
    /// Calling `play` while running restarts playback.
    pub fn play(&mut self) {
        self.reset_all();
        let ready: Vec<ActorId> = self
            .actors
            .iter()
            .filter(|a| !a.program.is_empty())
            .map(|a| a.id)
            .collect();
        tracing::debug!(scheduled = ready.len(), "playback started");
        self.scheduler.start(self.now, ready);
        self.emit(StageEvent::PlaybackStarted);
        self.finish_if_drained();
    }

    /// Stop playback, rewinding every program and clearing every bubble
    pub fn stop(&mut self) {
        let was_running = self.scheduler.is_running();
        self.scheduler.stop();
        self.reset_all();
        self.timers.clear();
        if was_running {
            tracing::debug!("playback stopped");
            self.emit(StageEvent::PlaybackStopped(StopReason::Requested));
        }
    }

    fn reset_all(&mut self) {
        for actor in &mut self.actors {
            if let Some(timer) = actor.reset_run_state() {
                self.timers.cancel(timer);
            }
        }
    }

    fn finish_if_drained(&mut self) -> bool {
        if self.scheduler.finish_if_drained() {
            tracing::debug!(ticks = self.scheduler.ticks(), "playback finished");
            self.emit(StageEvent::PlaybackStopped(StopReason::Finished));
            true
        } else {
            false
        }
    }

    /// Move virtual time forward, firing everything that falls due
    ///
    /// Bubble timers fire before a tick due at the same instant. Returns a
    /// report for every tick that ran.
    pub fn advance_time(&mut self, elapsed: Duration) -> Vec<TickReport> {
        let target = self.now.saturating_add(elapsed);
        let mut reports = Vec::new();

        loop {
            let bubble = self.timers.next_deadline().filter(|at| *at <= target);
            let tick = self.scheduler.next_tick_at().filter(|at| *at <= target);
            match (bubble, tick) {
                (Some(at), Some(tick_at)) if at <= tick_at => self.fire_bubbles(at),
                (Some(at), None) => self.fire_bubbles(at),
                (_, Some(tick_at)) => {
                    self.now = tick_at;
                    reports.push(self.run_tick());
                }
                (None, None) => break,
            }
        }

        self.now = target;
        reports
    }

    /// Run one scheduler tick now; does nothing while idle
    pub fn tick(&mut self) -> TickReport {
        if !self.scheduler.is_running() {
            return TickReport::default();
        }
        self.run_tick()
    }

    fn run_tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let mut swapped = HashSet::new();

        for id in self.scheduler.scheduled_ids() {
            if self.scheduler.is_scheduled(id) {
                self.tick_actor(id, &mut swapped, &mut report);
            }
        }

        self.scheduler.tick_completed(self.now);
        tracing::trace!(
            tick = self.scheduler.ticks(),
            stepped = report.stepped.len(),
            swaps = report.swaps.len(),
            "tick"
        );
        report.finished = self.finish_if_drained();
        report
    }

    fn tick_actor(&mut self, id: ActorId, swapped: &mut HashSet<ActorId>, report: &mut TickReport) {
        let Some(index) = self.actors.iter().position(|a| a.id == id) else {
            tracing::trace!(actor = %id, "tick for removed actor ignored");
            self.scheduler.unschedule(id);
            return;
        };
        if !self.scheduler.is_running() || self.actors[index].program.is_empty() {
            self.scheduler.unschedule(id);
            return;
        }

        let event = {
            let mut ctx = ExecContext {
                bounds: self.bounds,
                motion: self.config.motion,
                now: self.now,
                timers: &mut self.timers,
            };
            cursor::advance(&mut self.actors[index], &mut ctx)
        };
        if event != CursorEvent::Exhausted {
            report.stepped.push(id);
        }
        self.emit(StageEvent::ActorUpdated(id));

        let swaps = collision::resolve_collisions(
            &mut self.actors,
            self.config.collision_distance,
            swapped,
            &mut self.timers,
        );
        for pair in swaps {
            tracing::info!(a = %pair.0, b = %pair.1, "collision swapped programs");
            self.after_swap(pair);
            report.swaps.push(pair);
        }

        let actor = &mut self.actors[index];
        if actor.is_finished() {
            actor.cursor.reset();
            self.scheduler.unschedule(id);
            report.completed.push(id);
            tracing::debug!(actor = %id, "program completed");
        }
    }

    fn fire_bubbles(&mut self, at: Duration) {
        self.now = at;
        while let Some(timer) = self.timers.pop_due(at) {
            self.expire_bubble(timer);
        }
    }

    fn expire_bubble(&mut self, timer: BubbleTimer) {
        let Some(actor) = self.actors.iter_mut().find(|a| a.id == timer.actor) else {
            tracing::trace!(actor = %timer.actor, "bubble timer for removed actor ignored");
            return;
        };
        let current = actor
            .bubble
            .as_ref()
            .is_some_and(|b| b.kind == timer.kind && b.timer == Some(timer.handle));
        if !current {
            tracing::trace!(actor = %timer.actor, "stale bubble timer ignored");
            return;
        }

        actor.bubble = None;
        self.emit(StageEvent::BubbleCleared {
            actor: timer.actor,
            kind: timer.kind,
        });
    }

    fn index_of(&self, id: ActorId, op: &'static str) -> StageResult<usize> {
        self.actors
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| self.reject(op, StageError::ActorNotFound(id)))
    }

    fn out_of_range(&self, index: usize, position: usize) -> StageError {
        let actor = &self.actors[index];
        StageError::CommandIndexOutOfRange {
            actor: actor.id,
            index: position,
            len: actor.program.len(),
        }
    }

    fn reject(&self, op: &'static str, err: StageError) -> StageError {
        tracing::warn!(op, error = %err, "stage operation rejected");
        err
    }
}
