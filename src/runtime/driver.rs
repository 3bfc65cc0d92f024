//! Real-time driver
//!
//! Feeds wall-clock time into a shared [`Stage`] from a tokio interval. The
//! lock is held only while virtual time is advanced, never across an await,
//! so view code can read and edit the stage between frames.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::store::Stage;

/// Stage shared between the driver and view code
pub type SharedStage = Arc<Mutex<Stage>>;

/// Default gap between driver frames
pub const DEFAULT_FRAME: Duration = Duration::from_millis(50);

/// Why [`Driver::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// Playback ended and no bubble is waiting to clear
    Quiescent,
    /// The time limit passed first
    TimedOut,
}

/// Advances a shared stage in real time
pub struct Driver {
    stage: SharedStage,
    frame: Duration,
    limit: Option<Duration>,
}

impl Driver {
    /// Drive `stage` with the default frame length and no time limit
    pub fn new(stage: SharedStage) -> Self {
        Self {
            stage,
            frame: DEFAULT_FRAME,
            limit: None,
        }
    }

    /// Set the frame length
    pub fn with_frame(mut self, frame: Duration) -> Self {
        self.frame = frame.max(Duration::from_millis(1));
        self
    }

    /// Stop after this much wall-clock time even if still playing
    pub fn with_limit(mut self, limit: Duration) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Handle to the driven stage
    pub fn stage(&self) -> SharedStage {
        Arc::clone(&self.stage)
    }

    /// Run until the stage is quiescent or the limit passes
    pub async fn run(self) -> DriverExit {
        let started = Instant::now();
        let mut last = started;
        let mut interval = tokio::time::interval(self.frame);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let now = Instant::now();
            let elapsed = now - last;
            last = now;

            let quiescent = {
                let mut stage = self.stage.lock();
                let reports = stage.advance_time(elapsed);
                if !reports.is_empty() {
                    tracing::trace!(ticks = reports.len(), "driver frame");
                }
                stage.is_quiescent()
            };

            if quiescent {
                tracing::debug!(elapsed = ?(now - started), "driver finished");
                return DriverExit::Quiescent;
            }
            if self.limit.is_some_and(|limit| now - started >= limit) {
                tracing::debug!("driver time limit reached");
                return DriverExit::TimedOut;
            }
        }
    }

    /// Run on the current tokio runtime in the background
    pub fn spawn(self) -> JoinHandle<DriverExit> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::command::Command;

    #[tokio::test(start_paused = true)]
    async fn test_driver_plays_program_to_completion() {
        let mut stage = Stage::default();
        let id = stage.add_actor();
        stage.set_position(id, 0.0, 0.0).unwrap();
        for _ in 0..3 {
            stage.append_command(id, Command::move_by(10.0)).unwrap();
        }
        stage.play();

        let shared = Arc::new(Mutex::new(stage));
        let exit = Driver::new(Arc::clone(&shared)).run().await;

        assert_eq!(exit, DriverExit::Quiescent);
        let stage = shared.lock();
        assert!(!stage.is_running());
        assert_eq!(stage.actor(id).unwrap().x, 30.0);
        assert!(stage.now() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_waits_for_bubble_to_clear() {
        let mut stage = Stage::default();
        let id = stage.add_actor();
        stage.append_command(id, Command::say("hello", Some(2.0))).unwrap();
        stage.play();

        let shared = Arc::new(Mutex::new(stage));
        let exit = Driver::new(Arc::clone(&shared)).spawn().await.unwrap();

        assert_eq!(exit, DriverExit::Quiescent);
        let stage = shared.lock();
        assert_eq!(stage.actor(id).unwrap().speech_text(), "");
        assert!(stage.now() >= Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_respects_limit() {
        let mut stage = Stage::default();
        let id = stage.add_actor();
        stage
            .append_command(id, Command::repeat(1_000, vec![Command::turn(1)]))
            .unwrap();
        stage.play();

        let shared = Arc::new(Mutex::new(stage));
        let exit = Driver::new(Arc::clone(&shared))
            .with_limit(Duration::from_secs(2))
            .run()
            .await;

        assert_eq!(exit, DriverExit::TimedOut);
        assert!(shared.lock().is_running());
    }
}
