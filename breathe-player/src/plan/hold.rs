//! Hold policies: where holds are inserted into a breath phase
//!
//! A policy turns one breath phase plus a hold duration into the ordered
//! sub-sequence of breath parts and Hold phases. Policies are pure apart
//! from the values they draw from the variation source, and the draw order
//! is fixed so a given source sequence always yields the same output.

use super::variation::{apply_variation, VariationSource};
use breathe_common::{Phase, PhaseKind};
use serde::{Deserialize, Serialize};

/// Below or at this length the variable policy inserts no holds at all.
///
/// Applies to both the breath phase and the varied total hold.
pub const VARIABLE_SPLIT_FLOOR_MS: u64 = 2000;

/// Minimum length of every part produced by the variable policy
pub const VARIABLE_PART_FLOOR_MS: u64 = 1000;

/// Strategy for inserting holds into a breath phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldPolicy {
    /// Single hold after the complete phase
    #[default]
    OnlyEnd,
    /// Phase split in two, a hold after each half
    OneIntermittent,
    /// Phase split in three, a hold after each third
    TwoIntermittent,
    /// Random number of holds at random positions
    Variable,
}

impl HoldPolicy {
    pub const ALL: [HoldPolicy; 4] = [
        HoldPolicy::OnlyEnd,
        HoldPolicy::OneIntermittent,
        HoldPolicy::TwoIntermittent,
        HoldPolicy::Variable,
    ];

    /// Stable ordinal used by settings stores that persist enum positions
    pub fn ordinal(self) -> u8 {
        match self {
            HoldPolicy::OnlyEnd => 0,
            HoldPolicy::OneIntermittent => 1,
            HoldPolicy::TwoIntermittent => 2,
            HoldPolicy::Variable => 3,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Insert a hold of `hold_ms` into `phase` according to this policy.
    ///
    /// `phase` is expected to be an Inhale or Exhale phase. `hold_ms` is the
    /// interpolated hold before variation; `variation` is the jitter
    /// fraction handed to [`apply_variation`].
    pub fn apply_hold(
        self,
        phase: Phase,
        hold_ms: u64,
        variation: f64,
        source: &mut dyn VariationSource,
    ) -> Vec<Phase> {
        match self {
            HoldPolicy::OnlyEnd => {
                let hold = apply_variation(hold_ms, variation, source);
                vec![phase, Phase::hold(hold)]
            }
            HoldPolicy::OneIntermittent => split_evenly(phase, hold_ms, 2, variation, source),
            HoldPolicy::TwoIntermittent => split_evenly(phase, hold_ms, 3, variation, source),
            HoldPolicy::Variable => split_variable(phase, hold_ms, variation, source),
        }
    }
}

impl std::fmt::Display for HoldPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HoldPolicy::OnlyEnd => write!(f, "only_end"),
            HoldPolicy::OneIntermittent => write!(f, "one_intermittent"),
            HoldPolicy::TwoIntermittent => write!(f, "two_intermittent"),
            HoldPolicy::Variable => write!(f, "variable"),
        }
    }
}

/// Split phase and hold into `parts` equal (truncated) pieces, each breath
/// piece followed by its own varied hold.
fn split_evenly(
    phase: Phase,
    hold_ms: u64,
    parts: u64,
    variation: f64,
    source: &mut dyn VariationSource,
) -> Vec<Phase> {
    let phase_part = phase.duration_ms() / parts;
    let hold_part = hold_ms / parts;

    let mut out = Vec::with_capacity(parts as usize * 2);
    for index in 0..parts {
        out.push(breath_part(phase, index as usize, phase_part));
        out.push(Phase::hold(apply_variation(hold_part, variation, source)));
    }
    out
}

fn split_variable(
    phase: Phase,
    hold_ms: u64,
    variation: f64,
    source: &mut dyn VariationSource,
) -> Vec<Phase> {
    let total_hold = apply_variation(hold_ms, variation, source);
    let phase_ms = phase.duration_ms();

    if phase_ms <= VARIABLE_SPLIT_FLOOR_MS || total_hold <= VARIABLE_SPLIT_FLOOR_MS {
        return vec![phase];
    }

    let max_for = |ms: u64| ((ms as f64 / 1000.0) - 2.0).sqrt().floor() as u64;
    let max_holds = max_for(phase_ms).min(max_for(total_hold));
    let intermediate = (source.next_uniform() * (max_holds + 1) as f64).floor() as usize;
    let parts = intermediate + 1;

    let phase_parts = random_partition(phase_ms, parts, source);
    let hold_parts = random_partition(total_hold, parts, source);

    phase_parts
        .into_iter()
        .zip(hold_parts)
        .enumerate()
        .flat_map(|(index, (breath_ms, hold_ms))| {
            [breath_part(phase, index, breath_ms), Phase::hold(hold_ms)]
        })
        .collect()
}

/// Split `total_ms` into `parts` random pieces of at least
/// [`VARIABLE_PART_FLOOR_MS`] each.
///
/// Draws `parts - 1` split points, sorts them together with the fixed
/// endpoints 0 and 1, and gives every piece the floor plus its share of the
/// remaining time, rounded to the nearest millisecond.
fn random_partition(total_ms: u64, parts: usize, source: &mut dyn VariationSource) -> Vec<u64> {
    let mut points: Vec<f64> = (0..parts.saturating_sub(1))
        .map(|_| source.next_uniform())
        .collect();
    points.push(0.0);
    points.push(1.0);
    points.sort_by(|a, b| a.total_cmp(b));

    let spare = total_ms.saturating_sub(parts as u64 * VARIABLE_PART_FLOOR_MS) as f64;
    points
        .windows(2)
        .map(|w| (VARIABLE_PART_FLOOR_MS as f64 + (w[1] - w[0]) * spare).round() as u64)
        .collect()
}

/// Breath piece `index` of a split phase; pieces after the first use the
/// continuation kind.
fn breath_part(phase: Phase, index: usize, duration_ms: u64) -> Phase {
    let kind = if index == 0 {
        phase.kind()
    } else {
        phase.kind().continuation()
    };
    phase.with_kind(kind).with_duration(duration_ms)
}
