//! MET-based calorie integration.

use repsense_model::label::ExerciseLabel;
use repsense_model::met::MetTable;

/// Gaps longer than this between two trackable frames are still charged in
/// full, but are worth a debug line.
const LONG_GAP_SECS: f64 = 5.0;

/// Accumulates calories while a trackable exercise is held.
///
/// Each trackable frame charges `MET × kg × elapsed / 3600` for the time since
/// the previous trackable frame. The first frame of a streak only starts the
/// clock, and any non-trackable label ends the streak.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalorieTracker {
    calories: f64,
    active_since: Option<f64>,
}

impl CalorieTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one observed label at time `now` for a person of `weight_kg`.
    pub fn update(&mut self, label: &ExerciseLabel, table: &MetTable, weight_kg: f64, now: f64) {
        let Some(met) = table.get(label) else {
            self.active_since = None;
            return;
        };

        let since = *self.active_since.get_or_insert(now);
        // Out-of-order timestamps charge nothing rather than going negative.
        let elapsed = (now - since).max(0.0);
        if elapsed > LONG_GAP_SECS {
            tracing::debug!(
                exercise = %label,
                elapsed_secs = elapsed,
                "Long gap between tracked frames, charging in full"
            );
        }
        self.calories += met * weight_kg * elapsed / 3600.0;
        self.active_since = Some(now);
    }

    pub fn calories(&self) -> f64 {
        self.calories
    }

    pub fn is_active(&self) -> bool {
        self.active_since.is_some()
    }

    pub fn active_since(&self) -> Option<f64> {
        self.active_since
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T0: f64 = 1_700_000_000.0;

    fn batch_table() -> MetTable {
        [
            (ExerciseLabel::Squats, 5.0),
            (ExerciseLabel::PushUps, 2.0),
            (ExerciseLabel::JumpingJacks, 8.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_hour_of_squats() {
        let table = batch_table();
        let mut tracker = CalorieTracker::new();
        tracker.update(&ExerciseLabel::Squats, &table, 75.0, T0);
        tracker.update(&ExerciseLabel::Squats, &table, 75.0, T0 + 3600.0);
        assert!((tracker.calories() - 375.0).abs() < 1e-6);
    }

    #[test]
    fn test_first_trackable_frame_only_starts_clock() {
        let table = batch_table();
        let mut tracker = CalorieTracker::new();
        tracker.update(&ExerciseLabel::Squats, &table, 80.0, T0);
        assert_eq!(tracker.calories(), 0.0);
        assert_eq!(tracker.active_since(), Some(T0));
    }

    #[test]
    fn test_idle_ends_streak() {
        let table = batch_table();
        let mut tracker = CalorieTracker::new();
        tracker.update(&ExerciseLabel::Squats, &table, 75.0, T0);
        tracker.update(&ExerciseLabel::Idle, &table, 75.0, T0 + 10.0);
        assert!(!tracker.is_active());
        // Time spent idle is not charged.
        tracker.update(&ExerciseLabel::Squats, &table, 75.0, T0 + 100.0);
        assert_eq!(tracker.calories(), 0.0);
    }

    #[test]
    fn test_switching_exercise_charges_new_rate() {
        let table = batch_table();
        let mut tracker = CalorieTracker::new();
        tracker.update(&ExerciseLabel::Squats, &table, 60.0, T0);
        tracker.update(&ExerciseLabel::JumpingJacks, &table, 60.0, T0 + 60.0);
        let expected = 8.0 * 60.0 * 60.0 / 3600.0;
        assert!((tracker.calories() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_label_is_not_trackable() {
        let table = batch_table();
        let mut tracker = CalorieTracker::new();
        tracker.update(&ExerciseLabel::Squats, &table, 75.0, T0);
        tracker.update(&ExerciseLabel::parse("Lunges"), &table, 75.0, T0 + 5.0);
        assert!(!tracker.is_active());
        assert_eq!(tracker.calories(), 0.0);
    }

    #[test]
    fn test_backwards_clock_charges_nothing() {
        let table = batch_table();
        let mut tracker = CalorieTracker::new();
        tracker.update(&ExerciseLabel::Squats, &table, 75.0, T0 + 10.0);
        tracker.update(&ExerciseLabel::Squats, &table, 75.0, T0);
        assert_eq!(tracker.calories(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_calories_are_monotonic(
            steps in proptest::collection::vec((0usize..4, -1.0f64..30.0), 1..50),
            weight in 1.0f64..200.0,
        ) {
            let labels = [
                ExerciseLabel::Idle,
                ExerciseLabel::Squats,
                ExerciseLabel::PushUps,
                ExerciseLabel::JumpingJacks,
            ];
            let table = batch_table();
            let mut tracker = CalorieTracker::new();
            let mut now = T0;
            let mut last = 0.0;
            for (idx, dt) in steps {
                now += dt;
                tracker.update(&labels[idx], &table, weight, now);
                prop_assert!(tracker.calories() >= last);
                prop_assert_eq!(tracker.is_active(), table.is_trackable(&labels[idx]));
                last = tracker.calories();
            }
        }
    }
}
