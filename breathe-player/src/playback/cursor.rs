//! Step cursor
//!
//! Walks a plan phase by phase across repetitions, generating each
//! repetition's phases lazily when the previous repetition is exhausted.

use crate::plan::{ExercisePlan, VariationSource};
use breathe_common::Phase;
use tracing::debug;

/// Stateful iterator over the phases of an [`ExercisePlan`]
///
/// Owned by exactly one run; only that run's task advances it.
pub struct StepCursor {
    plan: ExercisePlan,
    source: Box<dyn VariationSource>,

    /// Repetition of the current phase list (0 before the first `next`)
    current_repetition: u32,

    /// Index into `current_phases` of the phase last returned
    current_phase_index: usize,

    /// Phases of the current repetition (empty = none generated yet)
    current_phases: Vec<Phase>,

    finished: bool,
}

impl StepCursor {
    pub fn new(plan: ExercisePlan, source: Box<dyn VariationSource>) -> Self {
        Self {
            plan,
            source,
            current_repetition: 0,
            current_phase_index: 0,
            current_phases: Vec::new(),
            finished: false,
        }
    }

    /// Advance to the next phase; `None` once the plan is complete.
    ///
    /// Empty repetitions are skipped. After the first `None` every further
    /// call returns `None` without generating anything.
    pub fn next(&mut self) -> Option<Phase> {
        if self.finished {
            return None;
        }

        if self.current_phase_index + 1 < self.current_phases.len() {
            self.current_phase_index += 1;
            return self.current_phases.get(self.current_phase_index).copied();
        }

        loop {
            self.current_repetition = self.current_repetition.saturating_add(1);
            if self.current_repetition > self.plan.repetitions() {
                return self.finish();
            }

            match self
                .plan
                .steps_for_repetition(self.current_repetition, self.source.as_mut())
            {
                Some(phases) if !phases.is_empty() => {
                    self.current_phases = phases;
                    self.current_phase_index = 0;
                    return self.current_phases.first().copied();
                }
                Some(_) => {
                    debug!(
                        "Skipping empty repetition {} of '{}'",
                        self.current_repetition,
                        self.plan.name()
                    );
                }
                None => return self.finish(),
            }
        }
    }

    /// Make the next `next()` call restart the current repetition from its
    /// first phase, regenerating it from the (possibly replaced) plan.
    pub fn go_back_to_repetition_start(&mut self) {
        self.current_repetition = self.current_repetition.saturating_sub(1);
        self.current_phases.clear();
        self.current_phase_index = 0;
        self.finished = false;
    }

    /// Swap in an updated plan, keeping repetition progress.
    ///
    /// If the new plan is shorter than the progress made so far the cursor
    /// simply reports completion on the next advance.
    pub fn replace_plan(&mut self, plan: ExercisePlan) {
        debug!(
            "Replacing plan '{}' with '{}' at repetition {}",
            self.plan.name(),
            plan.name(),
            self.current_repetition
        );
        self.plan = plan;
    }

    pub fn plan(&self) -> &ExercisePlan {
        &self.plan
    }

    pub fn current_repetition(&self) -> u32 {
        self.current_repetition
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) -> Option<Phase> {
        self.finished = true;
        self.current_phases.clear();
        self.current_phase_index = 0;
        self.current_repetition = self.plan.repetitions().saturating_add(1);
        None
    }
}

impl std::fmt::Debug for StepCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepCursor")
            .field("plan", &self.plan.name())
            .field("current_repetition", &self.current_repetition)
            .field("current_phase_index", &self.current_phase_index)
            .field("finished", &self.finished)
            .finish()
    }
}
