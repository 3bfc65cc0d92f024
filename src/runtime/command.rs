//! Command vocabulary for sprite programs
//!
//! A program is an ordered list of [`Command`]s. Every command except
//! [`Command::Repeat`] is executed directly by the executor; repeats are
//! unfolded by the program cursor.

use serde::Serialize;

use super::error::{StageError, StageResult};

/// One block of a sprite program
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Move by `distance` stage units
    Move {
        /// Signed distance
        distance: f64,
    },
    /// Rotate clockwise by `degrees` (negative turns counter-clockwise)
    Turn {
        /// Signed rotation in degrees
        degrees: i64,
    },
    /// Jump to an absolute stage position
    GoTo {
        /// Target x
        x: f64,
        /// Target y
        y: f64,
    },
    /// Show a speech bubble
    Say {
        /// Bubble text
        text: String,
        /// Seconds until the bubble clears itself; `None` or zero keeps it
        duration: Option<f64>,
    },
    /// Show a thought bubble
    Think {
        /// Bubble text
        text: String,
        /// Seconds until the bubble clears itself; `None` or zero keeps it
        duration: Option<f64>,
    },
    /// Run `body` `count` times; a count of zero or less skips the block
    Repeat {
        /// Number of passes over the body
        count: i64,
        /// Commands executed on each pass
        body: Vec<Command>,
    },
}

impl Command {
    /// `Move` shorthand
    pub fn move_by(distance: f64) -> Self {
        Command::Move { distance }
    }

    /// `Turn` shorthand
    pub fn turn(degrees: i64) -> Self {
        Command::Turn { degrees }
    }

    /// `GoTo` shorthand
    pub fn go_to(x: f64, y: f64) -> Self {
        Command::GoTo { x, y }
    }

    /// `Say` shorthand
    pub fn say(text: impl Into<String>, duration: Option<f64>) -> Self {
        Command::Say {
            text: text.into(),
            duration,
        }
    }

    /// `Think` shorthand
    pub fn think(text: impl Into<String>, duration: Option<f64>) -> Self {
        Command::Think {
            text: text.into(),
            duration,
        }
    }

    /// `Repeat` shorthand
    pub fn repeat(count: i64, body: Vec<Command>) -> Self {
        Command::Repeat { count, body }
    }

    /// Short lowercase name of the command kind
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Move { .. } => "move",
            Command::Turn { .. } => "turn",
            Command::GoTo { .. } => "goto",
            Command::Say { .. } => "say",
            Command::Think { .. } => "think",
            Command::Repeat { .. } => "repeat",
        }
    }

    /// Whether this command is unfolded by the cursor rather than executed
    pub fn is_repeat(&self) -> bool {
        matches!(self, Command::Repeat { .. })
    }

    /// Check structural shape: repeat bodies may only hold plain commands
    pub fn validate(&self) -> StageResult<()> {
        if let Command::Repeat { body, .. } = self {
            if body.iter().any(Command::is_repeat) {
                return Err(StageError::NestedRepeat);
            }
        }
        Ok(())
    }

    /// Produce a copy of this command with the patch applied
    ///
    /// Every `Some` field of the patch must exist on this command kind.
    pub fn patched(&self, patch: &CommandPatch) -> StageResult<Command> {
        let mut updated = self.clone();
        let mut rejected = Vec::new();

        match &mut updated {
            Command::Move { distance } => {
                if let Some(d) = patch.distance {
                    *distance = d;
                }
            }
            Command::Turn { degrees } => {
                if let Some(d) = patch.degrees {
                    *degrees = d;
                }
            }
            Command::GoTo { x, y } => {
                if let Some(v) = patch.x {
                    *x = v;
                }
                if let Some(v) = patch.y {
                    *y = v;
                }
            }
            Command::Say { text, duration } | Command::Think { text, duration } => {
                if let Some(t) = &patch.text {
                    *text = t.clone();
                }
                if let Some(d) = patch.duration {
                    *duration = d;
                }
            }
            Command::Repeat { count, body } => {
                if let Some(c) = patch.count {
                    *count = c;
                }
                if let Some(b) = &patch.body {
                    *body = b.clone();
                }
            }
        }

        for field in patch.fields() {
            if !updated.has_field(field) {
                rejected.push(field);
            }
        }
        if !rejected.is_empty() {
            return Err(StageError::InvalidPatch {
                kind: self.kind(),
                detail: rejected.join(", "),
            });
        }

        updated.validate()?;
        Ok(updated)
    }

    fn has_field(&self, field: &str) -> bool {
        matches!(
            (self, field),
            (Command::Move { .. }, "distance")
                | (Command::Turn { .. }, "degrees")
                | (Command::GoTo { .. }, "x" | "y")
                | (Command::Say { .. } | Command::Think { .. }, "text" | "duration")
                | (Command::Repeat { .. }, "count" | "body")
        )
    }
}

/// Partial update for an existing command
///
/// Only fields set to `Some` are written. `duration` is doubly optional so a
/// patch can clear an existing duration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandPatch {
    /// New `Move` distance
    pub distance: Option<f64>,
    /// New `Turn` angle
    pub degrees: Option<i64>,
    /// New `GoTo` x
    pub x: Option<f64>,
    /// New `GoTo` y
    pub y: Option<f64>,
    /// New bubble text
    pub text: Option<String>,
    /// New bubble duration
    pub duration: Option<Option<f64>>,
    /// New repeat count
    pub count: Option<i64>,
    /// New repeat body
    pub body: Option<Vec<Command>>,
}

impl CommandPatch {
    fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.distance.is_some() {
            fields.push("distance");
        }
        if self.degrees.is_some() {
            fields.push("degrees");
        }
        if self.x.is_some() {
            fields.push("x");
        }
        if self.y.is_some() {
            fields.push("y");
        }
        if self.text.is_some() {
            fields.push("text");
        }
        if self.duration.is_some() {
            fields.push("duration");
        }
        if self.count.is_some() {
            fields.push("count");
        }
        if self.body.is_some() {
            fields.push("body");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_repeat_is_rejected() {
        let nested = Command::repeat(2, vec![Command::repeat(3, vec![Command::move_by(1.0)])]);
        assert_eq!(nested.validate(), Err(StageError::NestedRepeat));

        let flat = Command::repeat(2, vec![Command::move_by(1.0), Command::turn(15)]);
        assert!(flat.validate().is_ok());
    }

    #[test]
    fn test_patch_overwrites_matching_fields() {
        let cmd = Command::go_to(10.0, 20.0);
        let patch = CommandPatch {
            y: Some(-5.0),
            ..Default::default()
        };
        assert_eq!(cmd.patched(&patch).unwrap(), Command::go_to(10.0, -5.0));

        let say = Command::say("hi", Some(2.0));
        let patch = CommandPatch {
            duration: Some(None),
            ..Default::default()
        };
        assert_eq!(say.patched(&patch).unwrap(), Command::say("hi", None));
    }

    #[test]
    fn test_patch_with_foreign_field_is_rejected() {
        let cmd = Command::move_by(10.0);
        let patch = CommandPatch {
            text: Some("nope".into()),
            count: Some(3),
            ..Default::default()
        };
        match cmd.patched(&patch) {
            Err(StageError::InvalidPatch { kind, detail }) => {
                assert_eq!(kind, "move");
                assert_eq!(detail, "text, count");
            }
            other => panic!("expected InvalidPatch, got {:?}", other),
        }
    }

    #[test]
    fn test_patch_cannot_smuggle_nested_repeat() {
        let cmd = Command::repeat(2, vec![Command::move_by(1.0)]);
        let patch = CommandPatch {
            body: Some(vec![Command::repeat(1, vec![])]),
            ..Default::default()
        };
        assert_eq!(cmd.patched(&patch), Err(StageError::NestedRepeat));
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let json = serde_json::to_value(Command::turn(-45)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "turn", "degrees": -45 }));
    }
}
