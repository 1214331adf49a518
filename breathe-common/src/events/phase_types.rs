//! Phase and play-status type definitions
//!
//! Supporting types for the step generator and the playback controller.

use serde::{Deserialize, Serialize};

/// Kind of a single timed breathing segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Inhale,
    Exhale,
    Hold,
    /// Second or later part of an inhale that was split by a hold
    ContinueInhale,
    /// Second or later part of an exhale that was split by a hold
    ContinueExhale,
    /// Terminal signal played after the last repetition
    Relax,
}

impl PhaseKind {
    /// Continuation kind used for the parts of a split breath phase.
    ///
    /// Inhale and Exhale map to their `Continue*` variants; every other kind
    /// (including the continuations themselves) maps to itself.
    pub fn continuation(self) -> PhaseKind {
        match self {
            PhaseKind::Inhale => PhaseKind::ContinueInhale,
            PhaseKind::Exhale => PhaseKind::ContinueExhale,
            other => other,
        }
    }

    pub fn is_hold(self) -> bool {
        matches!(self, PhaseKind::Hold)
    }

    /// True for inhale/exhale and their continuations
    pub fn is_breath(self) -> bool {
        matches!(
            self,
            PhaseKind::Inhale
                | PhaseKind::Exhale
                | PhaseKind::ContinueInhale
                | PhaseKind::ContinueExhale
        )
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseKind::Inhale => write!(f, "inhale"),
            PhaseKind::Exhale => write!(f, "exhale"),
            PhaseKind::Hold => write!(f, "hold"),
            PhaseKind::ContinueInhale => write!(f, "continue-inhale"),
            PhaseKind::ContinueExhale => write!(f, "continue-exhale"),
            PhaseKind::Relax => write!(f, "relax"),
        }
    }
}

/// Position of a phase within the exercise
///
/// For a single plan the part fields mirror the overall fields and the part
/// index is 1. For a combined plan the part fields describe the position
/// inside the currently active child plan (part index is 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepetitionInfo {
    pub current_repetition: u32,
    pub total_repetitions: u32,
    pub current_part_repetition: u32,
    pub total_part_repetitions: u32,
    pub current_part_index: u32,
}

impl RepetitionInfo {
    pub fn new(
        current_repetition: u32,
        total_repetitions: u32,
        current_part_repetition: u32,
        total_part_repetitions: u32,
        current_part_index: u32,
    ) -> Self {
        Self {
            current_repetition,
            total_repetitions,
            current_part_repetition,
            total_part_repetitions,
            current_part_index,
        }
    }

    /// Info for a plan that is not composed of parts
    pub fn single(current_repetition: u32, total_repetitions: u32) -> Self {
        Self::new(
            current_repetition,
            total_repetitions,
            current_repetition,
            total_repetitions,
            1,
        )
    }

    /// Checks `1 <= current <= total` for both the outer and the part pair.
    ///
    /// An all-zero info (unstamped phase) is considered valid.
    pub fn is_consistent(&self) -> bool {
        let pair_ok = |current: u32, total: u32| current == 0 || (1..=total).contains(&current);
        pair_ok(self.current_repetition, self.total_repetitions)
            && pair_ok(self.current_part_repetition, self.total_part_repetitions)
    }
}

/// One timed segment of a breathing repetition
///
/// Immutable once created: the `with_*` builders return modified copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    kind: PhaseKind,
    duration_ms: u64,
    sound_duration_ms: u64,
    repetition: RepetitionInfo,
}

impl Phase {
    /// Create a phase whose sound lasts as long as the phase itself
    pub fn new(kind: PhaseKind, duration_ms: u64) -> Self {
        Self {
            kind,
            duration_ms,
            sound_duration_ms: duration_ms,
            repetition: RepetitionInfo::default(),
        }
    }

    pub fn hold(duration_ms: u64) -> Self {
        Self::new(PhaseKind::Hold, duration_ms)
    }

    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn sound_duration_ms(&self) -> u64 {
        self.sound_duration_ms
    }

    pub fn repetition(&self) -> RepetitionInfo {
        self.repetition
    }

    /// Same phase with a different kind; sound duration is kept
    pub fn with_kind(self, kind: PhaseKind) -> Self {
        Self { kind, ..self }
    }

    /// Same phase with a different duration; sound duration follows
    pub fn with_duration(self, duration_ms: u64) -> Self {
        Self {
            duration_ms,
            sound_duration_ms: duration_ms,
            ..self
        }
    }

    pub fn with_sound_duration(self, sound_duration_ms: u64) -> Self {
        Self {
            sound_duration_ms,
            ..self
        }
    }

    pub fn with_repetition(self, repetition: RepetitionInfo) -> Self {
        Self { repetition, ..self }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}ms) rep {}/{}",
            self.kind,
            self.duration_ms,
            self.repetition.current_repetition,
            self.repetition.total_repetitions
        )
    }
}

/// Play status of an exercise plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
    /// Another, unrelated plan is the active one
    Other,
}

impl PlayStatus {
    /// True while a run exists (playing or paused)
    pub fn is_active(self) -> bool {
        matches!(self, PlayStatus::Playing | PlayStatus::Paused)
    }
}

impl std::fmt::Display for PlayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayStatus::Stopped => write!(f, "stopped"),
            PlayStatus::Playing => write!(f, "playing"),
            PlayStatus::Paused => write!(f, "paused"),
            PlayStatus::Other => write!(f, "other"),
        }
    }
}
