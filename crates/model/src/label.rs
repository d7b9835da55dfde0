//! Exercise-state labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One exercise state as reported by the classifier.
///
/// The known labels serialize to the exact strings the classifier emits
/// (`"Push Ups"`, `"Pull-ups"`, ...). Anything else is kept verbatim in
/// [`ExerciseLabel::Other`] so an unexpected classifier output is still
/// observed and counted as a distinct type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExerciseLabel {
    /// Baseline, no activity.
    #[default]
    Idle,
    Squats,
    PushUps,
    JumpingJacks,
    PullUps,
    RussianTwists,
    /// Any classifier output outside the known set.
    Other(String),
}

impl ExerciseLabel {
    /// The known exercise labels, excluding Idle.
    pub const EXERCISES: [ExerciseLabel; 5] = [
        ExerciseLabel::Squats,
        ExerciseLabel::PushUps,
        ExerciseLabel::JumpingJacks,
        ExerciseLabel::PullUps,
        ExerciseLabel::RussianTwists,
    ];

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Squats => "Squats",
            Self::PushUps => "Push Ups",
            Self::JumpingJacks => "Jumping Jacks",
            Self::PullUps => "Pull-ups",
            Self::RussianTwists => "Russian Twists",
            Self::Other(label) => label,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Parse a classifier output. Never fails: unknown strings map to `Other`.
    pub fn parse(label: &str) -> Self {
        match label {
            "Idle" => Self::Idle,
            "Squats" => Self::Squats,
            "Push Ups" => Self::PushUps,
            "Jumping Jacks" => Self::JumpingJacks,
            "Pull-ups" => Self::PullUps,
            "Russian Twists" => Self::RussianTwists,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ExerciseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseLabel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for ExerciseLabel {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for ExerciseLabel {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<ExerciseLabel> for String {
    fn from(value: ExerciseLabel) -> Self {
        match value {
            ExerciseLabel::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels_roundtrip_through_strings() {
        for label in ExerciseLabel::EXERCISES
            .iter()
            .cloned()
            .chain(std::iter::once(ExerciseLabel::Idle))
        {
            assert_eq!(ExerciseLabel::parse(label.as_str()), label);
        }
    }

    #[test]
    fn test_serializes_as_classifier_strings() {
        let json = serde_json::to_string(&ExerciseLabel::PushUps).unwrap();
        assert_eq!(json, "\"Push Ups\"");
        let parsed: ExerciseLabel = serde_json::from_str("\"Pull-ups\"").unwrap();
        assert_eq!(parsed, ExerciseLabel::PullUps);
    }

    #[test]
    fn test_unknown_label_is_preserved() {
        let label = ExerciseLabel::parse("Lunges");
        assert_eq!(label, ExerciseLabel::Other("Lunges".to_string()));
        assert_eq!(label.to_string(), "Lunges");
        assert!(!label.is_idle());
    }
}
