//! Blockstage – tick-driven execution engine for block-based sprite scripts
//!
//! This crate implements the runtime behind a Scratch-style animation editor:
//! - A closed command vocabulary (move, turn, go to, say, think, repeat)
//! - A program cursor that unfolds repeat blocks one command per tick
//! - Stage boundary clamping and transient speech/thought bubbles
//! - Proximity collisions that swap the colliding sprites' programs
//! - A store with change notifications for view layers, driven by virtual
//!   time or by a real-time tokio driver

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Runtime modules: commands, actors, scheduling and the stage store
pub mod runtime;

// Re-export key types for convenience
pub use runtime::{Command, Stage, StageConfig};

/// Current version of the blockstage runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
