//! Playback controller - command surface and run ownership
//!
//! **Responsibilities:**
//! - Owns at most one active run in a single slot
//! - Start/Stop/Pause/Resume/Skip commands with their interruption semantics
//! - Wake lock and sound lifecycle around a run
//! - Mirroring status into [`SharedState`] and emitting status events
//!
//! The slot and the run's flags (pause, skip, pending plan replacement) sit
//! behind one mutex shared with the run task. Start and Stop are serialized
//! by an async command lock so that a superseded run has fully terminated
//! before the next one begins stepping.

use super::cursor::StepCursor;
use super::run::{run_exercise, RunContext};
use super::sound::SoundPlayer;
use super::wake_lock::WakeLock;
use crate::error::{Error, Result};
use crate::plan::{ExercisePlan, RandomVariation, VariationSource};
use crate::state::{NowPlaying, SharedState};
use breathe_common::config::PlaybackSettings;
use breathe_common::events::BreathEvent;
use breathe_common::{Phase, PlayStatus};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Single-slot registry of the active run
#[derive(Default)]
pub(super) struct RunSlot {
    pub(super) current: Option<ActiveRun>,
}

/// Command-visible state of the active run
pub(super) struct ActiveRun {
    pub(super) id: Uuid,
    pub(super) plan_name: String,
    pub(super) status: PlayStatus,

    /// Run blocks after its current phase while set
    pub(super) paused: bool,

    /// One-shot request to cut the current hold short and skip pending holds
    pub(super) skipping: bool,

    /// Updated plan handed over by Resume, applied by the run task
    pub(super) replacement: Option<ExercisePlan>,

    pub(super) wake_lock_held: bool,
    pub(super) cancel: CancellationToken,

    /// Wakes the run task out of a phase sleep or the pause wait
    pub(super) wake: Arc<Notify>,

    pub(super) task: Option<JoinHandle<()>>,
}

pub(super) type SharedSlot = Arc<Mutex<RunSlot>>;

/// Lock the slot, recovering the data if a previous holder panicked
pub(super) fn lock_slot(slot: &Mutex<RunSlot>) -> MutexGuard<'_, RunSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Real-time executor of exercise plans
///
/// Collaborators are injected at construction; the controller is meant to
/// be shared behind an `Arc` and driven from any task.
pub struct PlaybackController {
    state: Arc<SharedState>,
    sound: Arc<dyn SoundPlayer>,
    wake_lock: Arc<dyn WakeLock>,
    settings: PlaybackSettings,
    slot: SharedSlot,
    commands: tokio::sync::Mutex<()>,
}

impl PlaybackController {
    pub fn new(
        sound: Arc<dyn SoundPlayer>,
        wake_lock: Arc<dyn WakeLock>,
        settings: PlaybackSettings,
    ) -> Self {
        let state = Arc::new(SharedState::new(settings.event_capacity));
        Self {
            state,
            sound,
            wake_lock,
            settings,
            slot: Arc::new(Mutex::new(RunSlot::default())),
            commands: tokio::sync::Mutex::new(()),
        }
    }

    /// UI-facing state mirror
    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BreathEvent> {
        self.state.subscribe_events()
    }

    /// Status of the active run, `Stopped` when there is none
    pub fn status(&self) -> PlayStatus {
        lock_slot(&self.slot)
            .current
            .as_ref()
            .map(|run| run.status)
            .unwrap_or(PlayStatus::Stopped)
    }

    /// Status of `plan_name`; `Other` if a different plan owns the run
    pub fn status_for(&self, plan_name: &str) -> PlayStatus {
        match lock_slot(&self.slot).current.as_ref() {
            None => PlayStatus::Stopped,
            Some(run) if run.plan_name == plan_name => run.status,
            Some(_) => PlayStatus::Other,
        }
    }

    pub async fn current_phase(&self) -> Option<Phase> {
        self.state.current_phase().await
    }

    /// Start `plan` with an entropy-seeded variation source
    pub async fn start(&self, plan: ExercisePlan) -> Uuid {
        self.start_with_source(plan, Box::new(RandomVariation::new()))
            .await
    }

    /// Start `plan`, drawing hold variation from `source`
    ///
    /// Any active run is stopped and awaited first. Returns the new run id.
    pub async fn start_with_source(
        &self,
        plan: ExercisePlan,
        source: Box<dyn VariationSource>,
    ) -> Uuid {
        let _commands = self.commands.lock().await;

        if let Some(previous) = self.take_active() {
            info!(
                "Superseding run {} ('{}') with '{}'",
                previous.id,
                previous.plan_name,
                plan.name()
            );
            self.shutdown_run(previous).await;
        }

        let run_id = Uuid::new_v4();
        let plan_name = plan.name().to_string();
        info!(
            "Starting run {}: '{}' ({} repetitions)",
            run_id,
            plan_name,
            plan.repetitions()
        );

        let wake_lock_held = match self.wake_lock.acquire() {
            Ok(()) => true,
            Err(e) => {
                warn!("Wake lock unavailable, continuing without it: {}", e);
                false
            }
        };

        self.state
            .set_now_playing(Some(NowPlaying {
                run_id,
                plan_name: plan_name.clone(),
                status: PlayStatus::Playing,
                phase: None,
            }))
            .await;
        self.state.broadcast_event(BreathEvent::PlayStatusChanged {
            run_id,
            old_status: PlayStatus::Stopped,
            new_status: PlayStatus::Playing,
            phase: None,
            plan_name: plan_name.clone(),
            timestamp: chrono::Utc::now(),
        });

        let cancel = CancellationToken::new();
        let wake = Arc::new(Notify::new());
        let ctx = RunContext {
            id: run_id,
            slot: Arc::clone(&self.slot),
            state: Arc::clone(&self.state),
            sound: Arc::clone(&self.sound),
            wake_lock: Arc::clone(&self.wake_lock),
            settings: self.settings.clone(),
            cancel: cancel.clone(),
            wake: Arc::clone(&wake),
        };
        let cursor = StepCursor::new(plan, source);

        // The run task looks itself up in the slot, so register it while
        // holding the lock it will need.
        {
            let mut slot = lock_slot(&self.slot);
            let task = tokio::spawn(run_exercise(ctx, cursor));
            slot.current = Some(ActiveRun {
                id: run_id,
                plan_name,
                status: PlayStatus::Playing,
                paused: false,
                skipping: false,
                replacement: None,
                wake_lock_held,
                cancel,
                wake,
                task: Some(task),
            });
        }

        run_id
    }

    /// Stop the active run and wait for its task to end
    ///
    /// No phase events from the stopped run are emitted after this returns.
    /// Stopping with no active run is a no-op.
    pub async fn stop(&self) {
        let _commands = self.commands.lock().await;
        match self.take_active() {
            Some(run) => self.shutdown_run(run).await,
            None => debug!("Stop requested with no active run"),
        }
    }

    /// Suspend the run once its current phase has elapsed
    pub async fn pause(&self) -> Result<()> {
        let (run_id, plan_name) = {
            let mut slot = lock_slot(&self.slot);
            let run = slot
                .current
                .as_mut()
                .ok_or_else(|| Error::InvalidState("no active run to pause".to_string()))?;
            if run.status != PlayStatus::Playing {
                debug!("Pause ignored, run {} is {}", run.id, run.status);
                return Ok(());
            }
            run.paused = true;
            run.status = PlayStatus::Paused;
            (run.id, run.plan_name.clone())
        };

        self.emit_status_change(run_id, &plan_name, PlayStatus::Playing, PlayStatus::Paused)
            .await;
        if let Err(e) = self.sound.pause() {
            warn!("Failed to pause sound: {}", e);
        }
        self.state.set_status(run_id, PlayStatus::Paused).await;
        info!("Run {} paused", run_id);
        Ok(())
    }

    /// Continue a paused run, optionally with an edited plan
    ///
    /// With `updated_plan` the current repetition restarts from its first
    /// phase using the new configuration; repetition progress is kept.
    pub async fn resume(&self, updated_plan: Option<ExercisePlan>) -> Result<()> {
        let (run_id, plan_name, wake) = {
            let mut slot = lock_slot(&self.slot);
            let run = slot
                .current
                .as_mut()
                .ok_or_else(|| Error::InvalidState("no active run to resume".to_string()))?;
            if run.status != PlayStatus::Paused {
                if updated_plan.is_some() {
                    warn!("Ignoring updated plan, run {} is {}", run.id, run.status);
                }
                return Ok(());
            }
            if let Some(plan) = updated_plan {
                run.plan_name = plan.name().to_string();
                run.replacement = Some(plan);
            }
            run.paused = false;
            run.status = PlayStatus::Playing;
            (run.id, run.plan_name.clone(), Arc::clone(&run.wake))
        };

        self.emit_status_change(run_id, &plan_name, PlayStatus::Paused, PlayStatus::Playing)
            .await;
        self.state.set_status(run_id, PlayStatus::Playing).await;
        wake.notify_one();
        info!("Run {} resumed", run_id);
        Ok(())
    }

    /// Cut the current hold short and skip holds pending right after it
    ///
    /// Breath phases are never cut: during an inhale or exhale the request
    /// takes effect once that phase has elapsed.
    pub async fn skip(&self) -> Result<()> {
        let mut slot = lock_slot(&self.slot);
        let run = slot
            .current
            .as_mut()
            .ok_or_else(|| Error::InvalidState("no active run to skip in".to_string()))?;
        run.skipping = true;
        run.wake.notify_one();
        debug!("Skip requested for run {}", run.id);
        Ok(())
    }

    fn take_active(&self) -> Option<ActiveRun> {
        lock_slot(&self.slot).current.take()
    }

    /// Cancel a run already removed from the slot, await it and release
    /// everything it held
    async fn shutdown_run(&self, mut run: ActiveRun) {
        run.cancel.cancel();
        if let Some(task) = run.task.take() {
            if let Err(e) = task.await {
                error!("Run {} task ended abnormally: {}", run.id, e);
            }
        }

        if run.wake_lock_held {
            if let Err(e) = self.wake_lock.release() {
                warn!("Failed to release wake lock: {}", e);
            }
        }
        if let Err(e) = self.sound.stop() {
            warn!("Failed to stop sound: {}", e);
        }

        let phase = self
            .state
            .get_now_playing()
            .await
            .filter(|n| n.run_id == run.id)
            .and_then(|n| n.phase);
        self.state.clear_run(run.id).await;
        self.state.broadcast_event(BreathEvent::PlayStatusChanged {
            run_id: run.id,
            old_status: run.status,
            new_status: PlayStatus::Stopped,
            phase,
            plan_name: run.plan_name.clone(),
            timestamp: chrono::Utc::now(),
        });
        info!("Run {} ('{}') stopped", run.id, run.plan_name);
    }

    async fn emit_status_change(
        &self,
        run_id: Uuid,
        plan_name: &str,
        old_status: PlayStatus,
        new_status: PlayStatus,
    ) {
        let phase = self.state.current_phase().await;
        self.state.broadcast_event(BreathEvent::PlayStatusChanged {
            run_id,
            old_status,
            new_status,
            phase,
            plan_name: plan_name.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Some(run) = lock_slot(&self.slot).current.take() {
            run.cancel.cancel();
        }
    }
}
