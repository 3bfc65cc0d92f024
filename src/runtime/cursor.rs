//! Program cursor and loop tracker
//!
//! Each call to [`advance`] executes exactly one command, either a
//! top-level command or one command of a repeat body. Loop bookkeeping
//! (entering, restarting a pass, leaving, skipping empty or zero-count
//! repeats) never costs a step: the cursor settles onto the next executable
//! command before and after every execution.

use super::actor::{Actor, ProgramCursor};
use super::command::Command;
use super::executor::{ExecContext, apply_command};

/// Outcome of one [`advance`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorEvent {
    /// A command ran and more remain
    Progress,
    /// A command ran and the program is now exhausted
    Completed,
    /// No command was left to run
    Exhausted,
}

/// Execute the next command of the actor's program
pub fn advance(actor: &mut Actor, ctx: &mut ExecContext<'_>) -> CursorEvent {
    settle(&actor.program, &mut actor.cursor);

    let index = actor.cursor.pc;
    let command = match actor.program.get(index) {
        None => return CursorEvent::Exhausted,
        Some(Command::Repeat { count, body }) => {
            let next = actor.cursor.nested.get(&index).copied().unwrap_or(0);
            actor.cursor.loop_counters.entry(index).or_insert(*count);
            actor.cursor.nested.insert(index, next + 1);
            body[next].clone()
        }
        Some(command) => {
            actor.cursor.pc += 1;
            command.clone()
        }
    };

    apply_command(actor, &command, ctx);
    settle(&actor.program, &mut actor.cursor);

    if actor.is_finished() {
        CursorEvent::Completed
    } else {
        CursorEvent::Progress
    }
}

/// Move the cursor past every zero-cost loop transition
///
/// Stops on a plain command, on a repeat with body commands left in its
/// current pass, or at the end of the program.
pub fn settle(program: &[Command], cursor: &mut ProgramCursor) {
    while let Some(command) = program.get(cursor.pc) {
        let Command::Repeat { count, body } = command else {
            return;
        };
        let index = cursor.pc;
        let remaining = cursor.loop_counters.get(&index).copied().unwrap_or(*count);

        if remaining > 0 && !body.is_empty() {
            let next = cursor.nested.get(&index).copied().unwrap_or(0);
            if next < body.len() {
                return;
            }

            // pass complete
            let remaining = remaining - 1;
            if remaining > 0 {
                cursor.loop_counters.insert(index, remaining);
                cursor.nested.insert(index, 0);
                return;
            }
        }

        cursor.exit_loop(index);
        cursor.pc += 1;
    }
}
