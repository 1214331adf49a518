//! Run task - steps one exercise in real time
//!
//! Each phase is announced (mirror + event + sound cue), then slept for its
//! duration minus the sound pre-roll, measured from the moment the phase was
//! fetched. Dispatch latency is charged to the phase and does not drift.
//! Between phases the task honours pause, pending plan replacement and
//! cancellation. Completion plays the terminal relax signal and releases the
//! run's resources.

use super::controller::{lock_slot, ActiveRun, SharedSlot};
use super::cursor::StepCursor;
use super::sound::SoundPlayer;
use super::wake_lock::WakeLock;
use crate::plan::ExercisePlan;
use crate::state::SharedState;
use breathe_common::config::PlaybackSettings;
use breathe_common::events::BreathEvent;
use breathe_common::{Phase, PhaseKind, PlayStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Fallback deadline offset when a phase is too long to represent
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Everything the run task needs, cloned out of the controller at start
pub(super) struct RunContext {
    pub(super) id: Uuid,
    pub(super) slot: SharedSlot,
    pub(super) state: Arc<SharedState>,
    pub(super) sound: Arc<dyn SoundPlayer>,
    pub(super) wake_lock: Arc<dyn WakeLock>,
    pub(super) settings: PlaybackSettings,
    pub(super) cancel: CancellationToken,
    pub(super) wake: Arc<Notify>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SleepOutcome {
    Elapsed,
    Skipped,
    Cancelled,
}

pub(super) async fn run_exercise(ctx: RunContext, mut cursor: StepCursor) {
    debug!("Run {} task started", ctx.id);
    let mut phases_played: u64 = 0;

    loop {
        if ctx.cancel.is_cancelled() {
            debug!("Run {} cancelled before next phase", ctx.id);
            return;
        }

        if let Some(plan) = ctx.take_replacement() {
            info!(
                "Run {} continues with updated plan '{}' from repetition {}",
                ctx.id,
                plan.name(),
                cursor.current_repetition().max(1)
            );
            cursor.replace_plan(plan);
            cursor.go_back_to_repetition_start();
        }

        let next = ctx.next_phase(&mut cursor);
        let plan = cursor.plan();
        let Some(phase) = next else {
            ctx.finish(plan, phases_played).await;
            return;
        };

        let started = Instant::now();
        if ctx.cancel.is_cancelled() {
            return;
        }
        ctx.announce(plan, phase).await;
        phases_played += 1;

        let deadline = phase_deadline(
            started,
            phase.duration_ms(),
            ctx.settings.sound_pre_roll_ms,
        );
        match ctx.sleep_phase(phase, deadline).await {
            SleepOutcome::Cancelled => return,
            SleepOutcome::Skipped => debug!("Run {}: cut {} short", ctx.id, phase),
            SleepOutcome::Elapsed => {}
        }

        if !ctx.wait_while_paused().await {
            return;
        }
    }
}

/// Deadline for a phase fetched at `started`; the pre-roll is already spent
fn phase_deadline(started: Instant, duration_ms: u64, pre_roll_ms: u64) -> Instant {
    let sleep = Duration::from_millis(duration_ms.saturating_sub(pre_roll_ms));
    started
        .checked_add(sleep)
        .unwrap_or_else(|| started + FAR_FUTURE)
}

impl RunContext {
    /// Apply `f` to this run's entry, if the slot still holds it
    fn with_run<R>(&self, f: impl FnOnce(&mut ActiveRun) -> R) -> Option<R> {
        let mut slot = lock_slot(&self.slot);
        slot.current
            .as_mut()
            .filter(|run| run.id == self.id)
            .map(f)
    }

    fn take_replacement(&self) -> Option<ExercisePlan> {
        self.with_run(|run| run.replacement.take()).flatten()
    }

    fn take_skip_flag(&self) -> bool {
        self.with_run(|run| std::mem::take(&mut run.skipping))
            .unwrap_or(false)
    }

    fn skip_requested(&self) -> bool {
        self.with_run(|run| run.skipping).unwrap_or(false)
    }

    fn is_paused(&self) -> bool {
        self.with_run(|run| run.paused).unwrap_or(false)
    }

    /// Next phase to play; a pending skip drops holds queued up front
    fn next_phase(&self, cursor: &mut StepCursor) -> Option<Phase> {
        let skipping = self.take_skip_flag();
        let mut phase = cursor.next()?;
        if skipping {
            while phase.kind().is_hold() {
                debug!("Run {}: skipping {}", self.id, phase);
                phase = cursor.next()?;
            }
        }
        Some(phase)
    }

    async fn announce(&self, plan: &ExercisePlan, phase: Phase) {
        debug!("Run {}: {}", self.id, phase);
        self.state.set_phase(self.id, plan.name(), phase).await;
        self.state.broadcast_event(BreathEvent::PhaseStarted {
            run_id: self.id,
            status: PlayStatus::Playing,
            phase,
            plan_name: plan.name().to_string(),
            timestamp: chrono::Utc::now(),
        });

        if let Err(e) = self.sound.play(
            plan.sound_choice(),
            phase.kind(),
            self.settings.sound_pre_roll_ms,
            phase.sound_duration_ms(),
        ) {
            warn!("Sound cue for {} failed: {}", phase, e);
        }
    }

    /// Sleep until `deadline`; holds can be cut short by a skip request
    async fn sleep_phase(&self, phase: Phase, deadline: Instant) -> SleepOutcome {
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return SleepOutcome::Cancelled,
                _ = &mut sleep => return SleepOutcome::Elapsed,
                _ = self.wake.notified() => {
                    if phase.kind().is_hold() && self.skip_requested() {
                        return SleepOutcome::Skipped;
                    }
                }
            }
        }
    }

    /// Block while paused; false if the run was cancelled meanwhile
    async fn wait_while_paused(&self) -> bool {
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            if !self.is_paused() {
                return true;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                _ = self.wake.notified() => {}
            }
        }
    }

    fn release_resources(&self, wake_lock_held: bool) {
        if wake_lock_held {
            if let Err(e) = self.wake_lock.release() {
                warn!("Failed to release wake lock: {}", e);
            }
        }
        if let Err(e) = self.sound.stop() {
            warn!("Failed to stop sound: {}", e);
        }
    }

    /// Play the relax signal, then release the run if nobody stopped it
    async fn finish(&self, plan: &ExercisePlan, phases_played: u64) {
        let relax = Phase::new(PhaseKind::Relax, self.settings.relax_duration_ms);
        if self.cancel.is_cancelled() {
            return;
        }
        self.announce(plan, relax).await;

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return,
            _ = tokio::time::sleep(Duration::from_millis(relax.duration_ms())) => {}
        }

        // Sound and wake lock are shared with the next run, so release them
        // before the slot is freed for a new start.
        let run = {
            let mut slot = lock_slot(&self.slot);
            if slot.current.as_ref().map(|run| run.id) != Some(self.id) {
                None
            } else {
                let run = slot.current.take();
                if let Some(run) = &run {
                    self.release_resources(run.wake_lock_held);
                }
                run
            }
        };
        let Some(run) = run else {
            debug!("Run {} already taken over, skipping finalization", self.id);
            return;
        };

        self.state.clear_run(self.id).await;

        self.state.broadcast_event(BreathEvent::ExerciseCompleted {
            run_id: self.id,
            plan_name: plan.name().to_string(),
            phases_played,
            timestamp: chrono::Utc::now(),
        });
        self.state.broadcast_event(BreathEvent::PlayStatusChanged {
            run_id: self.id,
            old_status: run.status,
            new_status: PlayStatus::Stopped,
            phase: Some(relax),
            plan_name: plan.name().to_string(),
            timestamp: chrono::Utc::now(),
        });
        info!(
            "Run {} completed '{}' ({} phases)",
            self.id,
            plan.name(),
            phases_played
        );
    }
}
