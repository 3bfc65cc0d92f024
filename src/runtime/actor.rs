//! Actors: sprites with a pose, a program and transient bubbles
//!
//! An [`Actor`] owns its program and the cursor state that tracks progress
//! through it. Bubble timers are referenced by handle only; the timer queue
//! that fires them lives in the store.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::command::Command;
use super::timer::TimerHandle;

/// Stable actor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which bubble an actor is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BubbleKind {
    /// Speech bubble (`Say`)
    Speech,
    /// Thought bubble (`Think`)
    Thought,
}

/// A visible bubble and its pending auto-clear
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    /// Speech or thought
    pub kind: BubbleKind,
    /// Displayed text
    pub text: String,
    /// Auto-clear timer, if armed
    pub timer: Option<TimerHandle>,
}

/// Position of an actor inside its program
///
/// `loop_counters` and `nested` are keyed by the index of a `Repeat` command
/// in the top-level program and hold entries only while that loop is
/// running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramCursor {
    /// Index of the next top-level command
    pub pc: usize,
    /// Remaining passes per running loop
    pub loop_counters: BTreeMap<usize, i64>,
    /// Next body index per running loop
    pub nested: BTreeMap<usize, usize>,
}

impl ProgramCursor {
    /// Back to the start with no loop state
    pub fn reset(&mut self) {
        self.pc = 0;
        self.loop_counters.clear();
        self.nested.clear();
    }

    /// Whether the cursor is at its initial position
    pub fn is_reset(&self) -> bool {
        self.pc == 0 && self.loop_counters.is_empty() && self.nested.is_empty()
    }

    /// Forget the bookkeeping of the loop at `index`
    pub(crate) fn exit_loop(&mut self, index: usize) {
        self.loop_counters.remove(&index);
        self.nested.remove(&index);
    }

    /// Keep positions aligned after the command at `index` was removed
    pub(crate) fn command_removed(&mut self, index: usize) {
        self.exit_loop(index);
        if self.pc > index {
            self.pc -= 1;
        }
        self.loop_counters = shift_keys_down(std::mem::take(&mut self.loop_counters), index);
        self.nested = shift_keys_down(std::mem::take(&mut self.nested), index);
    }
}

fn shift_keys_down<V>(map: BTreeMap<usize, V>, removed: usize) -> BTreeMap<usize, V> {
    map.into_iter()
        .map(|(k, v)| if k > removed { (k - 1, v) } else { (k, v) })
        .collect()
}

/// A sprite on the stage
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    /// Identifier
    pub id: ActorId,
    /// Display name
    pub name: String,
    /// Centre x in stage coordinates
    pub x: f64,
    /// Centre y in stage coordinates
    pub y: f64,
    /// Heading in degrees, `0..360`, 90 pointing right
    pub heading: i64,
    /// Commands run on play
    pub program: Vec<Command>,
    /// Progress through `program`
    pub cursor: ProgramCursor,
    /// Current speech or thought bubble
    pub bubble: Option<Bubble>,
}

impl Actor {
    /// Create an actor with the default pose and an empty program
    pub fn new(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            x: 0.0,
            y: 100.0,
            heading: 90,
            program: Vec::new(),
            cursor: ProgramCursor::default(),
            bubble: None,
        }
    }

    /// Place the actor (unclamped; the store clamps on insertion)
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Seed the program
    pub fn with_program(mut self, program: Vec<Command>) -> Self {
        self.program = program;
        self
    }

    /// Text of the speech bubble, empty when none is shown
    pub fn speech_text(&self) -> &str {
        self.bubble_text(BubbleKind::Speech)
    }

    /// Text of the thought bubble, empty when none is shown
    pub fn thought_text(&self) -> &str {
        self.bubble_text(BubbleKind::Thought)
    }

    fn bubble_text(&self, kind: BubbleKind) -> &str {
        match &self.bubble {
            Some(b) if b.kind == kind => &b.text,
            _ => "",
        }
    }

    /// Pending auto-clear timer of the current bubble
    pub fn bubble_timer(&self) -> Option<TimerHandle> {
        self.bubble.as_ref().and_then(|b| b.timer)
    }

    /// Remove any bubble, returning the timer the caller must cancel
    pub fn clear_bubble(&mut self) -> Option<TimerHandle> {
        self.bubble.take().and_then(|b| b.timer)
    }

    /// Rewind the program and drop bubbles, returning the timer to cancel
    pub fn reset_run_state(&mut self) -> Option<TimerHandle> {
        self.cursor.reset();
        self.clear_bubble()
    }

    /// Whether the cursor has run off the end of the program
    pub fn is_finished(&self) -> bool {
        self.cursor.pc >= self.program.len()
    }
}
