//! Semantic sections of a profile and their per-section vectors.

use crate::vector::Vector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A semantic section of a profile that gets its own embedding.
///
/// Declaration order is the iteration order everywhere (`Ord` is derived),
/// which keeps weighted sums reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Skills,
    Experience,
    Education,
    JobTitles,
    State,
}

impl Section {
    /// Every tracked section, in iteration order
    pub const ALL: [Section; 5] = [
        Section::Skills,
        Section::Experience,
        Section::Education,
        Section::JobTitles,
        Section::State,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Skills => "skills",
            Section::Experience => "experience",
            Section::Education => "education",
            Section::JobTitles => "job_titles",
            Section::State => "state",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skills" => Ok(Section::Skills),
            "experience" => Ok(Section::Experience),
            "education" => Ok(Section::Education),
            "job_titles" | "job_title" | "jobtitles" => Ok(Section::JobTitles),
            "state" | "region" => Ok(Section::State),
            other => Err(format!("unknown section '{}'", other)),
        }
    }
}

/// One vector per section. Sections may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionVectors {
    vectors: BTreeMap<Section, Vector>,
}

impl SectionVectors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, section: Section, vector: Vector) -> Self {
        self.vectors.insert(section, vector);
        self
    }

    pub fn insert(&mut self, section: Section, vector: Vector) -> Option<Vector> {
        self.vectors.insert(section, vector)
    }

    pub fn remove(&mut self, section: Section) -> Option<Vector> {
        self.vectors.remove(&section)
    }

    /// The vector for `section`, treating a zero-length vector as absent.
    pub fn get(&self, section: Section) -> Option<&Vector> {
        self.vectors.get(&section).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, section: Section) -> bool {
        self.get(section).is_some()
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Iterate in section order
    pub fn iter(&self) -> impl Iterator<Item = (Section, &Vector)> {
        self.vectors.iter().map(|(s, v)| (*s, v))
    }
}

impl FromIterator<(Section, Vector)> for SectionVectors {
    fn from_iter<I: IntoIterator<Item = (Section, Vector)>>(iter: I) -> Self {
        Self {
            vectors: iter.into_iter().collect(),
        }
    }
}
