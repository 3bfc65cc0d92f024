//! Read-only, serializable views of a stage
//!
//! Views hand out copies, so holding one never blocks the store.

use serde::Serialize;

use super::actor::{Actor, ActorId};
use super::command::Command;
use super::scheduler::PlayState;

/// Snapshot of one actor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorSnapshot {
    /// Actor id
    pub id: ActorId,

    /// Display name
    pub name: String,

    /// Centre x
    pub x: f64,

    /// Centre y
    pub y: f64,

    /// Heading in degrees
    pub heading: i64,

    /// Program commands
    pub program: Vec<Command>,

    /// Index of the next top-level command
    pub program_counter: usize,

    /// Speech bubble text, empty when none
    pub speech: String,

    /// Thought bubble text, empty when none
    pub thought: String,

    /// Whether the scheduler still advances this actor
    pub scheduled: bool,
}

impl ActorSnapshot {
    /// Capture an actor
    pub fn capture(actor: &Actor, scheduled: bool) -> Self {
        Self {
            id: actor.id,
            name: actor.name.clone(),
            x: actor.x,
            y: actor.y,
            heading: actor.heading,
            program: actor.program.clone(),
            program_counter: actor.cursor.pc,
            speech: actor.speech_text().to_string(),
            thought: actor.thought_text().to_string(),
            scheduled,
        }
    }
}

/// Snapshot of a whole stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSnapshot {
    /// Virtual time in milliseconds
    pub time_ms: u128,

    /// Playback state
    pub state: PlayState,

    /// Ticks run since playback last started
    pub ticks: u64,

    /// Actor selected in the editor
    pub active: Option<ActorId>,

    /// Every actor in stage order
    pub actors: Vec<ActorSnapshot>,
}
