//! Shared playback state
//!
//! UI-facing mirror of the controller's run: status, current phase, plan
//! name, plus the event bus notification collaborators subscribe to. The
//! controller owns the authoritative status; this is what observers read.

use breathe_common::events::{BreathEvent, EventBus};
use breathe_common::{Phase, PlayStatus};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Snapshot of the active run
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub run_id: Uuid,
    pub plan_name: String,
    pub status: PlayStatus,
    /// Phase currently being played (None before the first phase)
    pub phase: Option<Phase>,
}

/// Shared state accessible by the controller, its run task and observers
pub struct SharedState {
    now_playing: RwLock<Option<NowPlaying>>,
    events: EventBus,
}

impl SharedState {
    /// Create new shared state with an event bus of `event_capacity`
    pub fn new(event_capacity: usize) -> Self {
        Self {
            now_playing: RwLock::new(None),
            events: EventBus::new(event_capacity),
        }
    }

    /// Broadcast an event to all listeners
    pub fn broadcast_event(&self, event: BreathEvent) {
        // No receivers is OK
        self.events.emit_lossy(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<BreathEvent> {
        self.events.subscribe()
    }

    pub async fn get_now_playing(&self) -> Option<NowPlaying> {
        self.now_playing.read().await.clone()
    }

    pub async fn set_now_playing(&self, now_playing: Option<NowPlaying>) {
        *self.now_playing.write().await = now_playing;
    }

    /// Update the status of run `run_id`; ignored for stale runs
    pub async fn set_status(&self, run_id: Uuid, status: PlayStatus) {
        if let Some(current) = self.now_playing.write().await.as_mut() {
            if current.run_id == run_id {
                current.status = status;
            }
        }
    }

    /// Update phase and plan name of run `run_id`; ignored for stale runs
    pub async fn set_phase(&self, run_id: Uuid, plan_name: &str, phase: Phase) {
        if let Some(current) = self.now_playing.write().await.as_mut() {
            if current.run_id == run_id {
                current.phase = Some(phase);
                if current.plan_name != plan_name {
                    current.plan_name = plan_name.to_string();
                }
            }
        }
    }

    /// Clear the mirror if it still describes run `run_id`
    pub async fn clear_run(&self, run_id: Uuid) {
        let mut now_playing = self.now_playing.write().await;
        if now_playing.as_ref().map(|n| n.run_id) == Some(run_id) {
            *now_playing = None;
        }
    }

    pub async fn current_phase(&self) -> Option<Phase> {
        self.now_playing.read().await.as_ref().and_then(|n| n.phase)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(100)
    }
}
