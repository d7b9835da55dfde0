//! Aggregate tracker state for one person.

use std::collections::BTreeSet;

use repsense_common::results::ResultsSummary;
use repsense_model::label::ExerciseLabel;
use repsense_model::met::MetTable;
use repsense_model::summary::{round_calories, FrameSummary, SessionSummary};

use crate::calories::CalorieTracker;
use crate::rep_counter::{RepCounterSet, DEFAULT_DEBOUNCE_SECS};

/// Everything that accumulates across frames for one batch job or one live
/// session: calories, per-exercise rep counters, and the set of distinct
/// labels seen.
#[derive(Debug, Clone)]
pub struct ExerciseTracker {
    met_table: MetTable,
    calories: CalorieTracker,
    reps: RepCounterSet,
    exercise_types: BTreeSet<ExerciseLabel>,
}

impl ExerciseTracker {
    pub fn new(met_table: MetTable) -> Self {
        Self::with_debounce(met_table, DEFAULT_DEBOUNCE_SECS)
    }

    pub fn with_debounce(met_table: MetTable, debounce_secs: f64) -> Self {
        let reps = RepCounterSet::for_table(&met_table, debounce_secs);
        Self {
            met_table,
            calories: CalorieTracker::new(),
            reps,
            exercise_types: BTreeSet::new(),
        }
    }

    /// Record one classified frame and return the resulting summary.
    pub fn observe(&mut self, label: &ExerciseLabel, weight_kg: f64, now: f64) -> FrameSummary {
        self.exercise_types.insert(label.clone());
        if let Some(exercise) = self.reps.update(label, now) {
            tracing::debug!(
                exercise = %exercise,
                reps = self.reps.get(&exercise).map(|c| c.rep_count()).unwrap_or_default(),
                "Repetition counted"
            );
        }
        self.calories.update(label, &self.met_table, weight_kg, now);

        FrameSummary {
            calories: round_calories(self.calories.calories()),
            exercise_types_count: self.exercise_types.len(),
            current_state: self
                .met_table
                .is_trackable(label)
                .then(|| label.clone()),
            reps: self.reps.counts(),
        }
    }

    /// Unrounded cumulative calories.
    pub fn calories(&self) -> f64 {
        self.calories.calories()
    }

    pub fn exercise_types(&self) -> &BTreeSet<ExerciseLabel> {
        &self.exercise_types
    }

    pub fn reps(&self) -> &RepCounterSet {
        &self.reps
    }

    pub fn met_table(&self) -> &MetTable {
        &self.met_table
    }

    /// Terminal summary with calories rounded to two decimals.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            calories: round_calories(self.calories.calories()),
            exercise_types_count: self.exercise_types.len(),
            reps: self.reps.counts(),
        }
    }

    /// The subset persisted to the results file.
    pub fn results(&self) -> ResultsSummary {
        ResultsSummary {
            calories: round_calories(self.calories.calories()),
            exercise_types_count: self.exercise_types.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: f64 = 1_700_000_000.0;

    fn live_table() -> MetTable {
        [(ExerciseLabel::Squats, 5.0), (ExerciseLabel::PushUps, 8.0)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_fresh_tracker_summary() {
        let tracker = ExerciseTracker::new(live_table());
        let summary = tracker.summary();
        assert_eq!(summary.calories, 0.0);
        assert_eq!(summary.exercise_types_count, 0);
        assert_eq!(summary.reps.len(), 2);
        assert_eq!(summary.total_reps(), 0);
    }

    #[test]
    fn test_observe_reports_trackable_state_only() {
        let mut tracker = ExerciseTracker::new(live_table());
        let idle = tracker.observe(&ExerciseLabel::Idle, 75.0, T0);
        assert_eq!(idle.current_state, None);
        assert_eq!(idle.exercise_types_count, 1);

        let squat = tracker.observe(&ExerciseLabel::Squats, 75.0, T0 + 1.0);
        assert_eq!(squat.current_state, Some(ExerciseLabel::Squats));
        assert_eq!(squat.exercise_types_count, 2);
        assert_eq!(squat.reps[&ExerciseLabel::Squats], 1);

        let unknown = tracker.observe(&ExerciseLabel::parse("Lunges"), 75.0, T0 + 2.0);
        assert_eq!(unknown.current_state, None);
        assert_eq!(unknown.exercise_types_count, 3);
    }

    #[test]
    fn test_results_match_summary() {
        let mut tracker = ExerciseTracker::new(live_table());
        tracker.observe(&ExerciseLabel::PushUps, 70.0, T0);
        tracker.observe(&ExerciseLabel::PushUps, 70.0, T0 + 90.0);
        let results = tracker.results();
        let summary = tracker.summary();
        assert_eq!(results.calories, summary.calories);
        assert_eq!(results.exercise_types_count, 1);
        assert_eq!(results.calories, 14.0);
    }
}
