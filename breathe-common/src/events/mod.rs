//! Event types for the breathing player event system
//!
//! Provides shared event definitions and the EventBus used to fan out
//! step and status changes to UI/notification collaborators.

mod phase_types;

pub use phase_types::{Phase, PhaseKind, PlayStatus, RepetitionInfo};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Breathing player event types
///
/// Every event carries the play status, the phase (when one is current) and
/// the plan name, which is the tuple notification collaborators render.
/// Events are serializable so they can be forwarded to other processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BreathEvent {
    /// Play status changed (Start, Stop, Pause, Resume)
    PlayStatusChanged {
        /// Run that changed status
        run_id: Uuid,
        /// Status before change
        old_status: PlayStatus,
        /// Status after change
        new_status: PlayStatus,
        /// Phase displayed at the moment of the change
        phase: Option<Phase>,
        /// Name of the plan owning the run
        plan_name: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A phase started playing
    ///
    /// Emitted once per phase, including the terminal relax signal.
    PhaseStarted {
        run_id: Uuid,
        status: PlayStatus,
        phase: Phase,
        plan_name: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The last repetition finished and the relax signal completed
    ExerciseCompleted {
        run_id: Uuid,
        plan_name: String,
        /// Number of phases played, excluding the relax signal
        phases_played: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl BreathEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn event_type(&self) -> &str {
        match self {
            BreathEvent::PlayStatusChanged { .. } => "PlayStatusChanged",
            BreathEvent::PhaseStarted { .. } => "PhaseStarted",
            BreathEvent::ExerciseCompleted { .. } => "ExerciseCompleted",
        }
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            BreathEvent::PlayStatusChanged { run_id, .. }
            | BreathEvent::PhaseStarted { run_id, .. }
            | BreathEvent::ExerciseCompleted { run_id, .. } => *run_id,
        }
    }

    pub fn plan_name(&self) -> &str {
        match self {
            BreathEvent::PlayStatusChanged { plan_name, .. }
            | BreathEvent::PhaseStarted { plan_name, .. }
            | BreathEvent::ExerciseCompleted { plan_name, .. } => plan_name,
        }
    }
}

/// Broadcast bus for [`BreathEvent`]s
///
/// Delivery is best-effort: slow subscribers lose the oldest events once
/// the channel capacity is exceeded.
///
/// # Examples
///
/// ```
/// use breathe_common::events::EventBus;
///
/// let bus = EventBus::new(100);
/// let _rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BreathEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<BreathEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: BreathEvent,
    ) -> Result<usize, broadcast::error::SendError<BreathEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: BreathEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
