//! Single exercise plan: one breathing pattern repeated N times

use super::hold::HoldPolicy;
use super::interpolate::interpolate;
use super::variation::VariationSource;
use super::SoundChoice;
use crate::error::{Error, Result};
use breathe_common::{Phase, PhaseKind, RepetitionInfo};
use serde::{Deserialize, Serialize};

/// Hold settings for one side of the breath (after inhale or after exhale)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HoldConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Hold duration at the first repetition
    #[serde(default)]
    pub start_ms: u64,

    /// Hold duration at the last repetition (defaults to `start_ms`)
    #[serde(default)]
    pub end_ms: Option<u64>,

    #[serde(default)]
    pub policy: HoldPolicy,
}

impl HoldConfig {
    pub fn only_end(duration_ms: u64) -> Self {
        Self {
            enabled: true,
            start_ms: duration_ms,
            end_ms: None,
            policy: HoldPolicy::OnlyEnd,
        }
    }

    fn end_ms(&self) -> u64 {
        self.end_ms.unwrap_or(self.start_ms)
    }
}

/// Persisted configuration of a single plan
///
/// `repetitions` is signed so that corrupt stored values are rejected at
/// plan construction instead of wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinglePlanConfig {
    pub name: String,

    #[serde(default = "default_repetitions")]
    pub repetitions: i64,

    /// Full breath (inhale + exhale) duration at the first repetition
    pub breath_start_ms: u64,

    /// Full breath duration at the last repetition (defaults to start)
    #[serde(default)]
    pub breath_end_ms: Option<u64>,

    /// Share of the breath spent inhaling, in `[0, 1]`
    #[serde(default = "default_in_out_relation")]
    pub in_out_relation: f64,

    #[serde(default)]
    pub hold_in: HoldConfig,

    #[serde(default)]
    pub hold_out: HoldConfig,

    /// Jitter fraction applied to every hold, in `[0, 1]`
    #[serde(default)]
    pub hold_variation: f64,

    #[serde(default)]
    pub sound_choice: SoundChoice,
}

fn default_repetitions() -> i64 {
    10
}

fn default_in_out_relation() -> f64 {
    0.5
}

impl SinglePlanConfig {
    /// Evenly split breath without holds
    pub fn new(name: impl Into<String>, repetitions: i64, breath_ms: u64) -> Self {
        Self {
            name: name.into(),
            repetitions,
            breath_start_ms: breath_ms,
            breath_end_ms: None,
            in_out_relation: default_in_out_relation(),
            hold_in: HoldConfig::default(),
            hold_out: HoldConfig::default(),
            hold_variation: 0.0,
            sound_choice: SoundChoice::default(),
        }
    }
}

/// Validated single plan
#[derive(Debug, Clone, PartialEq)]
pub struct SinglePlan {
    config: SinglePlanConfig,
    repetitions: u32,
}

impl SinglePlan {
    /// Validate a configuration into a plan
    pub fn new(config: SinglePlanConfig) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(Error::InvalidPlan("plan name must not be empty".to_string()));
        }
        let repetitions = u32::try_from(config.repetitions).map_err(|_| {
            Error::InvalidPlan(format!(
                "'{}': repetitions must be between 0 and {}, got {}",
                config.name,
                u32::MAX,
                config.repetitions
            ))
        })?;
        if !(0.0..=1.0).contains(&config.in_out_relation) {
            return Err(Error::InvalidPlan(format!(
                "'{}': in_out_relation must be within [0, 1], got {}",
                config.name, config.in_out_relation
            )));
        }
        if !(0.0..=1.0).contains(&config.hold_variation) {
            return Err(Error::InvalidPlan(format!(
                "'{}': hold_variation must be within [0, 1], got {}",
                config.name, config.hold_variation
            )));
        }

        Ok(Self {
            config,
            repetitions,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    pub fn sound_choice(&self) -> &SoundChoice {
        &self.config.sound_choice
    }

    pub fn config(&self) -> &SinglePlanConfig {
        &self.config
    }

    /// Generate the phases of repetition `repetition` (1-based).
    ///
    /// Returns `None` outside `1..=repetitions`. Zero-length phases are
    /// dropped, so a repetition can legitimately come back empty.
    pub fn steps_for_repetition(
        &self,
        repetition: u32,
        source: &mut dyn VariationSource,
    ) -> Option<Vec<Phase>> {
        if repetition == 0 || repetition > self.repetitions {
            return None;
        }

        let cfg = &self.config;
        let total = self.repetitions;
        let breath_end = cfg.breath_end_ms.unwrap_or(cfg.breath_start_ms);
        let breath_ms = interpolate(cfg.breath_start_ms, breath_end, repetition, total);

        let inhale_ms = (breath_ms as f64 * cfg.in_out_relation).round() as u64;
        let exhale_ms = (breath_ms as f64 * (1.0 - cfg.in_out_relation)).round() as u64;

        let mut phases = self.breath_with_hold(
            Phase::new(PhaseKind::Inhale, inhale_ms),
            &cfg.hold_in,
            repetition,
            source,
        );
        phases.extend(self.breath_with_hold(
            Phase::new(PhaseKind::Exhale, exhale_ms),
            &cfg.hold_out,
            repetition,
            source,
        ));

        let info = RepetitionInfo::single(repetition, total);
        Some(
            phases
                .into_iter()
                .filter(|p| p.duration_ms() > 0)
                .map(|p| p.with_repetition(info))
                .collect(),
        )
    }

    fn breath_with_hold(
        &self,
        breath: Phase,
        hold: &HoldConfig,
        repetition: u32,
        source: &mut dyn VariationSource,
    ) -> Vec<Phase> {
        if !hold.enabled {
            return vec![breath];
        }
        let hold_ms = interpolate(hold.start_ms, hold.end_ms(), repetition, self.repetitions);
        if hold_ms == 0 {
            return vec![breath];
        }
        hold.policy
            .apply_hold(breath, hold_ms, self.config.hold_variation, source)
    }
}
