use crate::section::Section;
use serde::{Deserialize, Serialize};

/// Structured form of a free-text job description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredQuery {
    pub job_title: String,
    pub required_skills: Vec<String>,
    pub required_experience: String,
    pub required_education: String,
    pub location: String,
}

impl StructuredQuery {
    /// Sections embedded for a query, in section order. The query carries no
    /// region vector; eligibility is resolved from `location` instead.
    pub const SECTIONS: [Section; 4] = [
        Section::Skills,
        Section::Experience,
        Section::Education,
        Section::JobTitles,
    ];

    pub fn section_text(&self, section: Section) -> Option<String> {
        match section {
            Section::Skills => Some(self.required_skills.join(", ")),
            Section::Experience => Some(self.required_experience.clone()),
            Section::Education => Some(self.required_education.clone()),
            Section::JobTitles => Some(self.job_title.clone()),
            Section::State => None,
        }
    }

    /// `(section, text)` pairs to embed
    pub fn section_texts(&self) -> Vec<(Section, String)> {
        Self::SECTIONS
            .iter()
            .filter_map(|s| self.section_text(*s).map(|text| (*s, text)))
            .collect()
    }
}
