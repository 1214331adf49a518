//! Sound collaborator interface
//!
//! The controller asks for one cue per phase and one for the terminal relax
//! signal. Asset selection and pitch handling live behind this trait.

use crate::error::Result;
use crate::plan::SoundChoice;
use breathe_common::PhaseKind;
use tracing::info;

/// Plays phase cues
///
/// Implementations must be cheap to call from the run task; any failure is
/// logged by the controller and never stops the exercise.
pub trait SoundPlayer: Send + Sync {
    /// Start the cue for `kind` after `delay_ms`, lasting `duration_ms`
    fn play(&self, choice: &SoundChoice, kind: PhaseKind, delay_ms: u64, duration_ms: u64)
        -> Result<()>;

    /// Pause whatever cue is currently audible
    fn pause(&self) -> Result<()>;

    /// Stop and release any playing cue
    fn stop(&self) -> Result<()>;
}

/// Sound player that only logs cues, used by the CLI
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSoundPlayer;

impl SoundPlayer for LogSoundPlayer {
    fn play(
        &self,
        choice: &SoundChoice,
        kind: PhaseKind,
        delay_ms: u64,
        duration_ms: u64,
    ) -> Result<()> {
        info!(
            "♪ {} cue '{}' (delay {}ms, {}ms)",
            kind, choice, delay_ms, duration_ms
        );
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        info!("♪ paused");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        info!("♪ stopped");
        Ok(())
    }
}
