//! Exercise plans and the step generator
//!
//! A plan turns a repetition index into the ordered phases of that
//! repetition. Plans are either a single breathing pattern or a combination
//! of several patterns played back to back.

pub mod combined;
pub mod hold;
pub mod interpolate;
pub mod single;
pub mod variation;

pub use combined::{CombinedPlan, CombinedPlanConfig};
pub use hold::HoldPolicy;
pub use interpolate::interpolate;
pub use single::{HoldConfig, SinglePlan, SinglePlanConfig};
pub use variation::{
    apply_variation, RandomVariation, SeededVariation, SequenceVariation, VariationSource,
};

use crate::error::{Error, Result};
use breathe_common::Phase;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Opaque identifier of the sound set used for phase cues
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundChoice(String);

impl SoundChoice {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SoundChoice {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl std::fmt::Display for SoundChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serialized plan configuration exchanged with settings storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanConfig {
    Single(SinglePlanConfig),
    Combined(CombinedPlanConfig),
}

/// A breathing exercise plan
#[derive(Debug, Clone, PartialEq)]
pub enum ExercisePlan {
    Single(SinglePlan),
    Combined(CombinedPlan),
}

impl ExercisePlan {
    /// Validate a configuration into a plan
    pub fn from_config(config: PlanConfig) -> Result<Self> {
        match config {
            PlanConfig::Single(config) => Ok(ExercisePlan::Single(SinglePlan::new(config)?)),
            PlanConfig::Combined(config) => {
                Ok(ExercisePlan::Combined(CombinedPlan::from_config(config)?))
            }
        }
    }

    pub fn to_config(&self) -> PlanConfig {
        match self {
            ExercisePlan::Single(plan) => PlanConfig::Single(plan.config().clone()),
            ExercisePlan::Combined(plan) => PlanConfig::Combined(plan.to_config()),
        }
    }

    /// Load a plan from a `.toml` or `.json` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PlanConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?,
            _ => toml::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?,
        };
        debug!("Loaded plan configuration from {}", path.display());
        Self::from_config(config)
    }

    pub fn name(&self) -> &str {
        match self {
            ExercisePlan::Single(plan) => plan.name(),
            ExercisePlan::Combined(plan) => plan.name(),
        }
    }

    pub fn repetitions(&self) -> u32 {
        match self {
            ExercisePlan::Single(plan) => plan.repetitions(),
            ExercisePlan::Combined(plan) => plan.repetitions(),
        }
    }

    pub fn sound_choice(&self) -> &SoundChoice {
        match self {
            ExercisePlan::Single(plan) => plan.sound_choice(),
            ExercisePlan::Combined(plan) => plan.sound_choice(),
        }
    }

    /// Phases of repetition `repetition` (1-based), `None` past the end
    pub fn steps_for_repetition(
        &self,
        repetition: u32,
        source: &mut dyn VariationSource,
    ) -> Option<Vec<Phase>> {
        match self {
            ExercisePlan::Single(plan) => plan.steps_for_repetition(repetition, source),
            ExercisePlan::Combined(plan) => plan.steps_for_repetition(repetition, source),
        }
    }

    /// Total length of all repetitions drawn with a constant midpoint source.
    ///
    /// A midpoint draw applies no hold jitter, which makes the result a
    /// stable preview of the exercise length.
    pub fn nominal_duration_ms(&self) -> u64 {
        let mut source = SequenceVariation::constant(0.5);
        (1..=self.repetitions())
            .filter_map(|r| self.steps_for_repetition(r, &mut source))
            .flatten()
            .map(|p| p.duration_ms())
            .fold(0, u64::saturating_add)
    }
}

impl From<SinglePlan> for ExercisePlan {
    fn from(plan: SinglePlan) -> Self {
        ExercisePlan::Single(plan)
    }
}

impl From<CombinedPlan> for ExercisePlan {
    fn from(plan: CombinedPlan) -> Self {
        ExercisePlan::Combined(plan)
    }
}
