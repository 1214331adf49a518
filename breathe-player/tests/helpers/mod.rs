//! Shared fakes and plan builders for integration tests
//!
//! Recording collaborators let tests assert on the cues and wake-lock calls
//! a run makes without real audio or power management.

#![allow(dead_code)]

use breathe_common::config::PlaybackSettings;
use breathe_common::events::BreathEvent;
use breathe_common::{Phase, PhaseKind};
use breathe_player::plan::{ExercisePlan, HoldConfig, SinglePlan, SinglePlanConfig, SoundChoice};
use breathe_player::playback::{SoundPlayer, WakeLock};
use breathe_player::{Error, PlaybackController, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Upper bound for waiting on an event (virtual time in paused tests)
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(3600);

/// One `play` call as seen by the sound collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub choice: String,
    pub kind: PhaseKind,
    pub delay_ms: u64,
    pub duration_ms: u64,
}

/// Sound collaborator calls in the order they were made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCall {
    Play(PhaseKind),
    Pause,
    Stop,
}

/// Sound player that records every call, optionally failing each one
#[derive(Default)]
pub struct RecordingSound {
    cues: Mutex<Vec<Cue>>,
    calls: Mutex<Vec<SoundCall>>,
    pauses: AtomicUsize,
    stops: AtomicUsize,
    fail: bool,
}

impl RecordingSound {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.cues.lock().unwrap().clone()
    }

    pub fn cue_kinds(&self) -> Vec<PhaseKind> {
        self.cues().iter().map(|c| c.kind).collect()
    }

    pub fn calls(&self) -> Vec<SoundCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    fn result(&self) -> Result<()> {
        if self.fail {
            Err(Error::Sound("audio device unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl SoundPlayer for RecordingSound {
    fn play(
        &self,
        choice: &SoundChoice,
        kind: PhaseKind,
        delay_ms: u64,
        duration_ms: u64,
    ) -> Result<()> {
        self.cues.lock().unwrap().push(Cue {
            choice: choice.to_string(),
            kind,
            delay_ms,
            duration_ms,
        });
        self.calls.lock().unwrap().push(SoundCall::Play(kind));
        self.result()
    }

    fn pause(&self) -> Result<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(SoundCall::Pause);
        self.result()
    }

    fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(SoundCall::Stop);
        self.result()
    }
}

/// Wake lock that counts acquire/release calls
#[derive(Default)]
pub struct RecordingWakeLock {
    acquired: AtomicUsize,
    released: AtomicUsize,
    fail_acquire: bool,
}

impl RecordingWakeLock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_acquire: true,
            ..Self::default()
        })
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl WakeLock for RecordingWakeLock {
    fn acquire(&self) -> Result<()> {
        if self.fail_acquire {
            return Err(Error::WakeLock("power manager refused".to_string()));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) -> Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn settings(relax_duration_ms: u64) -> PlaybackSettings {
    PlaybackSettings {
        relax_duration_ms,
        sound_pre_roll_ms: 0,
        event_capacity: 256,
    }
}

pub fn controller_with(
    sound: &Arc<RecordingSound>,
    wake_lock: &Arc<RecordingWakeLock>,
    settings: PlaybackSettings,
) -> PlaybackController {
    PlaybackController::new(
        Arc::clone(sound) as Arc<dyn SoundPlayer>,
        Arc::clone(wake_lock) as Arc<dyn WakeLock>,
        settings,
    )
}

/// Even inhale/exhale split, no holds
pub fn breath_plan(name: &str, repetitions: i64, breath_ms: u64) -> ExercisePlan {
    SinglePlan::new(SinglePlanConfig::new(name, repetitions, breath_ms))
        .unwrap()
        .into()
}

/// Inhale, Hold, Exhale with fixed lengths of `side_ms` each
pub fn hold_plan(name: &str, repetitions: i64, side_ms: u64) -> ExercisePlan {
    let mut config = SinglePlanConfig::new(name, repetitions, 2 * side_ms);
    config.hold_in = HoldConfig::only_end(side_ms);
    SinglePlan::new(config).unwrap().into()
}

pub async fn next_event(rx: &mut broadcast::Receiver<BreathEvent>) -> BreathEvent {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event bus closed")
}

/// Skip ahead to the next PhaseStarted event
pub async fn next_phase(rx: &mut broadcast::Receiver<BreathEvent>) -> Phase {
    loop {
        if let BreathEvent::PhaseStarted { phase, .. } = next_event(rx).await {
            return phase;
        }
    }
}
