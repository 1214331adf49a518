//! Combined exercise plan: several single plans played back to back

use super::single::{SinglePlan, SinglePlanConfig};
use super::variation::VariationSource;
use super::SoundChoice;
use crate::error::{Error, Result};
use breathe_common::{Phase, RepetitionInfo};
use serde::{Deserialize, Serialize};

/// Persisted configuration of a combined plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedPlanConfig {
    pub name: String,

    #[serde(default)]
    pub sound_choice: SoundChoice,

    /// Child plans in playback order
    pub parts: Vec<SinglePlanConfig>,
}

/// Concatenation of single plans by repetition range
///
/// Combined repetition `r` belongs to the child whose cumulative repetition
/// range contains it; phases carry the combined numbering in the outer
/// repetition pair and the child's own numbering in the part pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedPlan {
    name: String,
    sound_choice: SoundChoice,
    parts: Vec<SinglePlan>,
    repetitions: u32,
}

impl CombinedPlan {
    pub fn new(name: impl Into<String>, sound_choice: SoundChoice, parts: Vec<SinglePlan>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidPlan("plan name must not be empty".to_string()));
        }
        if parts.is_empty() {
            return Err(Error::InvalidPlan(format!(
                "'{}': combined plan needs at least one part",
                name
            )));
        }
        let repetitions = parts
            .iter()
            .try_fold(0u32, |acc, p| acc.checked_add(p.repetitions()))
            .ok_or_else(|| {
                Error::InvalidPlan(format!("'{}': total repetitions overflow", name))
            })?;

        Ok(Self {
            name,
            sound_choice,
            parts,
            repetitions,
        })
    }

    /// Validate a configuration into a plan
    pub fn from_config(config: CombinedPlanConfig) -> Result<Self> {
        let parts = config
            .parts
            .into_iter()
            .map(SinglePlan::new)
            .collect::<Result<Vec<_>>>()?;
        Self::new(config.name, config.sound_choice, parts)
    }

    pub fn to_config(&self) -> CombinedPlanConfig {
        CombinedPlanConfig {
            name: self.name.clone(),
            sound_choice: self.sound_choice.clone(),
            parts: self.parts.iter().map(|p| p.config().clone()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sound_choice(&self) -> &SoundChoice {
        &self.sound_choice
    }

    /// Sum of all parts' repetitions
    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    pub fn parts(&self) -> &[SinglePlan] {
        &self.parts
    }

    /// Map a combined repetition to `(part index, part, local repetition)`
    pub fn locate(&self, repetition: u32) -> Option<(usize, &SinglePlan, u32)> {
        if repetition == 0 {
            return None;
        }
        let mut local = repetition;
        for (index, part) in self.parts.iter().enumerate() {
            if local <= part.repetitions() {
                return Some((index, part, local));
            }
            local -= part.repetitions();
        }
        None
    }

    pub fn steps_for_repetition(
        &self,
        repetition: u32,
        source: &mut dyn VariationSource,
    ) -> Option<Vec<Phase>> {
        let (index, part, local) = self.locate(repetition)?;
        let info = RepetitionInfo::new(
            repetition,
            self.repetitions,
            local,
            part.repetitions(),
            index as u32 + 1,
        );
        let steps = part.steps_for_repetition(local, source)?;
        Some(steps.into_iter().map(|p| p.with_repetition(info)).collect())
    }
}
