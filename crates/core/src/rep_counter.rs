//! Debounced repetition counting.
//!
//! A repetition is an Idle → exercise transition. Label changes arriving
//! within the debounce window of the last counted transition are ignored, so
//! classifier flicker around a pose boundary does not inflate the count.

use std::collections::BTreeMap;

use repsense_model::label::ExerciseLabel;
use repsense_model::met::MetTable;

/// Default minimum spacing between counted transitions, in seconds.
pub const DEFAULT_DEBOUNCE_SECS: f64 = 0.5;

/// Repetition counter for a single exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct RepCounter {
    exercise: ExerciseLabel,
    rep_count: u32,
    previous_state: ExerciseLabel,
    last_transition: Option<f64>,
    debounce_secs: f64,
}

impl RepCounter {
    pub fn new(exercise: ExerciseLabel) -> Self {
        Self::with_debounce(exercise, DEFAULT_DEBOUNCE_SECS)
    }

    pub fn with_debounce(exercise: ExerciseLabel, debounce_secs: f64) -> Self {
        Self {
            exercise,
            rep_count: 0,
            previous_state: ExerciseLabel::Idle,
            last_transition: None,
            debounce_secs,
        }
    }

    /// Feed one observed label at time `now`.
    ///
    /// Returns `true` when this observation completed a repetition.
    pub fn update(&mut self, label: &ExerciseLabel, now: f64) -> bool {
        let mut counted = false;
        // An unset transition reads as time zero; with epoch timestamps the
        // first change always clears the window.
        let since_last = now - self.last_transition.unwrap_or(0.0);
        if *label != self.previous_state
            && since_last > self.debounce_secs
            && *label == self.exercise
            && self.previous_state.is_idle()
        {
            self.rep_count += 1;
            self.last_transition = Some(now);
            counted = true;
        }
        self.previous_state = label.clone();
        counted
    }

    pub fn exercise(&self) -> &ExerciseLabel {
        &self.exercise
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn previous_state(&self) -> &ExerciseLabel {
        &self.previous_state
    }

    pub fn last_transition(&self) -> Option<f64> {
        self.last_transition
    }
}

/// One [`RepCounter`] per trackable exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct RepCounterSet {
    counters: BTreeMap<ExerciseLabel, RepCounter>,
}

impl RepCounterSet {
    /// Create a counter for every label in the MET table.
    pub fn for_table(table: &MetTable, debounce_secs: f64) -> Self {
        let counters = table
            .labels()
            .map(|label| {
                (
                    label.clone(),
                    RepCounter::with_debounce(label.clone(), debounce_secs),
                )
            })
            .collect();
        Self { counters }
    }

    /// Feed a label to every counter. Returns the exercise that completed a
    /// repetition, if any.
    pub fn update(&mut self, label: &ExerciseLabel, now: f64) -> Option<ExerciseLabel> {
        let mut completed = None;
        for counter in self.counters.values_mut() {
            if counter.update(label, now) {
                completed = Some(counter.exercise.clone());
            }
        }
        completed
    }

    pub fn get(&self, exercise: &ExerciseLabel) -> Option<&RepCounter> {
        self.counters.get(exercise)
    }

    /// Repetition count per exercise.
    pub fn counts(&self) -> BTreeMap<ExerciseLabel, u32> {
        self.counters
            .iter()
            .map(|(label, counter)| (label.clone(), counter.rep_count))
            .collect()
    }

    pub fn total(&self) -> u32 {
        self.counters.values().map(|c| c.rep_count).sum()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T0: f64 = 1_700_000_000.0;

    fn feed(counter: &mut RepCounter, labels: &[ExerciseLabel], spacing: f64) {
        for (i, label) in labels.iter().enumerate() {
            counter.update(label, T0 + i as f64 * spacing);
        }
    }

    #[test]
    fn test_fresh_counter() {
        let counter = RepCounter::new(ExerciseLabel::Squats);
        assert_eq!(counter.rep_count(), 0);
        assert_eq!(counter.previous_state(), &ExerciseLabel::Idle);
        assert_eq!(counter.last_transition(), None);
    }

    #[test]
    fn test_two_spaced_squats() {
        use ExerciseLabel::*;
        let mut counter = RepCounter::new(Squats);
        feed(&mut counter, &[Idle, Squats, Idle, Squats], 0.6);
        assert_eq!(counter.rep_count(), 2);
    }

    #[test]
    fn test_rapid_transitions_are_debounced() {
        use ExerciseLabel::*;
        let mut counter = RepCounter::new(Squats);
        feed(&mut counter, &[Idle, Squats, Idle, Squats, Idle, Squats], 0.1);
        assert_eq!(counter.rep_count(), 1);
    }

    #[test]
    fn test_other_exercise_does_not_count() {
        use ExerciseLabel::*;
        let mut counter = RepCounter::new(Squats);
        feed(&mut counter, &[Idle, PushUps, Idle, PushUps], 1.0);
        assert_eq!(counter.rep_count(), 0);
        assert_eq!(counter.previous_state(), &PushUps);
    }

    #[test]
    fn test_exercise_to_exercise_is_not_a_rep() {
        use ExerciseLabel::*;
        let mut counter = RepCounter::new(Squats);
        feed(&mut counter, &[Idle, PushUps, Squats], 1.0);
        assert_eq!(counter.rep_count(), 0);
    }

    #[test]
    fn test_set_counts_each_exercise_separately() {
        use ExerciseLabel::*;
        let table: MetTable = [(Squats, 5.0), (PushUps, 8.0)].into_iter().collect();
        let mut set = RepCounterSet::for_table(&table, DEFAULT_DEBOUNCE_SECS);
        let sequence = [Idle, Squats, Idle, PushUps, Idle, Squats];
        let mut completed = Vec::new();
        for (i, label) in sequence.iter().enumerate() {
            if let Some(done) = set.update(label, T0 + i as f64) {
                completed.push(done);
            }
        }
        assert_eq!(completed, vec![Squats, PushUps, Squats]);
        assert_eq!(set.counts()[&Squats], 2);
        assert_eq!(set.counts()[&PushUps], 1);
        assert_eq!(set.total(), 3);
    }

    fn label_strategy() -> impl Strategy<Value = ExerciseLabel> {
        prop_oneof![
            Just(ExerciseLabel::Idle),
            Just(ExerciseLabel::Squats),
            Just(ExerciseLabel::PushUps),
        ]
    }

    proptest! {
        #[test]
        fn prop_rep_count_is_monotonic(
            steps in proptest::collection::vec((label_strategy(), 0.0f64..2.0), 1..60)
        ) {
            let mut counter = RepCounter::new(ExerciseLabel::Squats);
            let mut now = T0;
            let mut last = 0;
            for (label, dt) in steps {
                now += dt;
                counter.update(&label, now);
                prop_assert!(counter.rep_count() >= last);
                last = counter.rep_count();
            }
        }

        #[test]
        fn prop_counted_reps_are_spaced(
            steps in proptest::collection::vec((label_strategy(), 0.0f64..1.0), 1..60)
        ) {
            let mut counter = RepCounter::new(ExerciseLabel::Squats);
            let mut now = T0;
            let mut counted_at: Vec<f64> = Vec::new();
            for (label, dt) in steps {
                now += dt;
                if counter.update(&label, now) {
                    counted_at.push(now);
                }
            }
            for pair in counted_at.windows(2) {
                prop_assert!(pair[1] - pair[0] > DEFAULT_DEBOUNCE_SECS);
            }
        }
    }
}
