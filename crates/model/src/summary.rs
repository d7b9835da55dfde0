//! Tracking output records.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::label::ExerciseLabel;

/// Sentinel written for `current_state` when no trackable exercise is active.
pub const NO_CURRENT_STATE: &str = "None";

/// Summary returned after each processed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Cumulative calories, rounded to two decimals.
    pub calories: f64,

    /// Distinct labels observed so far, including Idle.
    pub exercise_types_count: usize,

    /// The trackable exercise detected on this frame, if any.
    #[serde(
        serialize_with = "serialize_current_state",
        deserialize_with = "deserialize_current_state"
    )]
    pub current_state: Option<ExerciseLabel>,

    /// Repetitions counted so far, per trackable exercise.
    #[serde(default)]
    pub reps: BTreeMap<ExerciseLabel, u32>,
}

/// Terminal summary of a batch job or a finished live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Calories burned, rounded to two decimals.
    pub calories: f64,

    /// Distinct labels observed, including Idle.
    pub exercise_types_count: usize,

    /// Repetitions counted per trackable exercise.
    #[serde(default)]
    pub reps: BTreeMap<ExerciseLabel, u32>,
}

impl SessionSummary {
    /// Total repetitions across all exercises.
    pub fn total_reps(&self) -> u32 {
        self.reps.values().sum()
    }
}

/// Round to two decimal places, the precision calories are reported at.
pub fn round_calories(calories: f64) -> f64 {
    (calories * 100.0).round() / 100.0
}

fn serialize_current_state<S: Serializer>(
    state: &Option<ExerciseLabel>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match state {
        Some(label) => serializer.serialize_str(label.as_str()),
        None => serializer.serialize_str(NO_CURRENT_STATE),
    }
}

fn deserialize_current_state<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ExerciseLabel>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(if raw == NO_CURRENT_STATE {
        None
    } else {
        Some(ExerciseLabel::parse(&raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding() {
        assert_eq!(round_calories(1.23456), 1.23);
        assert_eq!(round_calories(0.126), 0.13);
        assert_eq!(round_calories(0.0), 0.0);
    }

    #[test]
    fn test_no_current_state_uses_sentinel() {
        let summary = FrameSummary {
            calories: 0.0,
            exercise_types_count: 1,
            current_state: None,
            reps: BTreeMap::new(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["current_state"], "None");

        let back: FrameSummary = serde_json::from_value(json).unwrap();
        assert_eq!(back.current_state, None);
    }

    #[test]
    fn test_current_state_serializes_label() {
        let mut reps = BTreeMap::new();
        reps.insert(ExerciseLabel::Squats, 3);
        let summary = FrameSummary {
            calories: 1.5,
            exercise_types_count: 2,
            current_state: Some(ExerciseLabel::Squats),
            reps,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["current_state"], "Squats");
        assert_eq!(json["reps"]["Squats"], 3);
    }

    proptest::proptest! {
        #[test]
        fn prop_rounding_stays_within_half_a_cent(calories in 0.0f64..1.0e6) {
            let rounded = round_calories(calories);
            proptest::prop_assert!(rounded >= 0.0);
            proptest::prop_assert!((rounded - calories).abs() <= 0.005 + 1e-9);
        }

        #[test]
        fn prop_rounding_preserves_order(a in 0.0f64..1.0e4, b in 0.0f64..1.0e4) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            proptest::prop_assert!(round_calories(lo) <= round_calories(hi));
        }
    }
}
