//! Single-step command execution
//!
//! Applies one non-repeat command to one actor. The only side effect besides
//! the actor itself is arming or cancelling bubble timers in the supplied
//! queue.

use std::time::Duration;

use super::MotionModel;
use super::actor::{Actor, Bubble, BubbleKind};
use super::command::Command;
use super::geometry::{StageBounds, normalize_heading};
use super::timer::TimerQueue;

/// Everything a command may need besides the actor
pub struct ExecContext<'a> {
    /// Reachable area for sprite centres
    pub bounds: StageBounds,
    /// How `Move` interprets its distance
    pub motion: MotionModel,
    /// Current virtual time, used to compute bubble deadlines
    pub now: Duration,
    /// Queue that owns bubble timers
    pub timers: &'a mut TimerQueue,
}

/// Apply `command` to `actor`
///
/// # Panics
///
/// Panics when handed a `Repeat`; loops are unfolded by the cursor and never
/// reach the executor.
pub fn apply_command(actor: &mut Actor, command: &Command, ctx: &mut ExecContext<'_>) {
    match command {
        Command::Move { distance } => apply_move(actor, *distance, ctx),
        Command::Turn { degrees } => {
            actor.heading = normalize_heading(actor.heading + degrees.rem_euclid(360));
        }
        Command::GoTo { x, y } => {
            (actor.x, actor.y) = ctx.bounds.clamp(*x, *y);
        }
        Command::Say { text, duration } => {
            show_bubble(actor, BubbleKind::Speech, text, *duration, ctx);
        }
        Command::Think { text, duration } => {
            show_bubble(actor, BubbleKind::Thought, text, *duration, ctx);
        }
        Command::Repeat { .. } => {
            panic!("repeat commands are unfolded by the program cursor, never executed directly")
        }
    }

    tracing::trace!(
        actor = %actor.id,
        kind = command.kind(),
        x = actor.x,
        y = actor.y,
        heading = actor.heading,
        "applied command"
    );
}

fn apply_move(actor: &mut Actor, distance: f64, ctx: &ExecContext<'_>) {
    match ctx.motion {
        MotionModel::Horizontal { floor_y } => {
            actor.x = ctx.bounds.clamp_x(actor.x + distance);
            if let Some(floor) = floor_y {
                actor.y = ctx.bounds.clamp_y(actor.y.max(floor));
            }
        }
        MotionModel::Heading => {
            let radians = (actor.heading as f64).to_radians();
            let x = actor.x + distance * radians.sin();
            let y = actor.y + distance * radians.cos();
            (actor.x, actor.y) = ctx.bounds.clamp(x, y);
        }
    }
}

fn show_bubble(
    actor: &mut Actor,
    kind: BubbleKind,
    text: &str,
    duration: Option<f64>,
    ctx: &mut ExecContext<'_>,
) {
    if let Some(previous) = actor.clear_bubble() {
        ctx.timers.cancel(previous);
    }

    // a deadline past the end of the clock never fires, so none is armed
    let timer = duration
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .and_then(|after| ctx.now.checked_add(after))
        .map(|deadline| ctx.timers.arm(actor.id, kind, deadline));

    actor.bubble = Some(Bubble {
        kind,
        text: text.to_string(),
        timer,
    });
}
