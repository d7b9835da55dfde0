//! Metabolic-equivalent (MET) rate tables.
//!
//! A label is *trackable* when it has an entry in the table in effect: it
//! accrues calories and gets its own rep counter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::label::ExerciseLabel;

/// Mapping from trackable exercise label to MET value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetTable {
    rates: BTreeMap<ExerciseLabel, f64>,
}

impl MetTable {
    pub fn new(rates: BTreeMap<ExerciseLabel, f64>) -> Self {
        Self { rates }
    }

    /// Build a table from string-keyed entries, as found in configuration.
    ///
    /// An `Idle` entry is dropped: Idle is the baseline and never trackable.
    pub fn from_named<'a>(entries: impl IntoIterator<Item = (&'a String, &'a f64)>) -> Self {
        entries
            .into_iter()
            .map(|(label, met)| (ExerciseLabel::parse(label), *met))
            .filter(|(label, _)| !label.is_idle())
            .collect()
    }

    /// MET value for a label, if it is trackable.
    pub fn get(&self, label: &ExerciseLabel) -> Option<f64> {
        self.rates.get(label).copied()
    }

    pub fn is_trackable(&self, label: &ExerciseLabel) -> bool {
        self.rates.contains_key(label)
    }

    /// Trackable labels in stable order.
    pub fn labels(&self) -> impl Iterator<Item = &ExerciseLabel> {
        self.rates.keys()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl FromIterator<(ExerciseLabel, f64)> for MetTable {
    fn from_iter<T: IntoIterator<Item = (ExerciseLabel, f64)>>(iter: T) -> Self {
        Self {
            rates: iter.into_iter().collect(),
        }
    }
}
