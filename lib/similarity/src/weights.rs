//! Section weight table
//!
//! Declares how much each section contributes to the final match score.
//! Weights need not sum to 1.0: the scorer normalizes per comparison over
//! the sections present on both sides.

use resumatch_core::Section;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Section weight table, version 1
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionWeights {
    /// Table version for future compatibility
    #[serde(default = "default_version")]
    pub version: u32,

    /// Positive weight per section; iteration follows section order
    pub weights: BTreeMap<Section, f32>,
}

fn default_version() -> u32 {
    1
}

impl Default for SectionWeights {
    /// skills 0.25, experience 0.25, education 0.15, job_titles 0.35
    fn default() -> Self {
        Self::new(BTreeMap::from([
            (Section::Skills, 0.25),
            (Section::Experience, 0.25),
            (Section::Education, 0.15),
            (Section::JobTitles, 0.35),
        ]))
    }
}

impl SectionWeights {
    pub fn new(weights: BTreeMap<Section, f32>) -> Self {
        Self {
            version: 1,
            weights,
        }
    }

    /// Check that the table is non-empty and every weight is finite and positive
    pub fn validate(&self) -> Result<(), WeightError> {
        if self.weights.is_empty() {
            return Err(WeightError::EmptyTable);
        }

        for (section, weight) in &self.weights {
            if !weight.is_finite() || *weight <= 0.0 {
                return Err(WeightError::NonPositiveWeight(*section, *weight));
            }
        }

        Ok(())
    }

    pub fn get(&self, section: Section) -> Option<f32> {
        self.weights.get(&section).copied()
    }

    /// Weighted sections in section order
    pub fn iter(&self) -> impl Iterator<Item = (Section, f32)> + '_ {
        self.weights.iter().map(|(s, w)| (*s, *w))
    }

    pub fn total(&self) -> f32 {
        self.weights.values().sum()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Copy of this table with some weights replaced.
    ///
    /// Overrides may add a section that had no weight (e.g. `state`); a
    /// weight of zero removes the section. The result is validated.
    pub fn with_overrides(&self, overrides: &HashMap<Section, f32>) -> Result<Self, WeightError> {
        let mut modified = self.clone();

        for (section, weight) in overrides {
            if *weight == 0.0 {
                modified.weights.remove(section);
            } else {
                modified.weights.insert(*section, *weight);
            }
        }

        modified.validate()?;
        Ok(modified)
    }
}

/// Errors that can occur during weight validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("Weight table cannot be empty")]
    EmptyTable,

    #[error("Section '{0}' has non-positive weight {1}")]
    NonPositiveWeight(Section, f32),
}
