//! Display attributes of a candidate, as returned by the structuring service.
//!
//! Every field is optional on the wire; accessors fall back to an empty
//! string so that partially-filled profiles never fail downstream.

use crate::section::Section;
use serde::{Deserialize, Serialize};

/// One position in a candidate's work history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub company: Option<String>,
    pub title: Option<String>,
    pub duration: Option<String>,
    pub description: Option<String>,
}

impl ExperienceEntry {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn company(&self) -> &str {
        self.company.as_deref().unwrap_or("")
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn duration(&self) -> &str {
        self.duration.as_deref().unwrap_or("")
    }
}

/// One degree or qualification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field: Option<String>,
    pub year: Option<String>,
}

impl EducationEntry {
    pub fn institution(&self) -> &str {
        self.institution.as_deref().unwrap_or("")
    }

    pub fn degree(&self) -> &str {
        self.degree.as_deref().unwrap_or("")
    }

    pub fn field(&self) -> &str {
        self.field.as_deref().unwrap_or("")
    }

    pub fn year(&self) -> &str {
        self.year.as_deref().unwrap_or("")
    }
}

/// Structured resume
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: Option<String>,
    pub location: Option<String>,
    /// Declared state/province; inferred from `location` at ingest when absent
    pub state: Option<String>,
    pub current_job_title: Option<String>,
    pub preferred_job_title: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
}

impl Profile {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or("")
    }

    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or("")
    }

    pub fn current_job_title(&self) -> &str {
        self.current_job_title.as_deref().unwrap_or("")
    }

    pub fn preferred_job_title(&self) -> &str {
        self.preferred_job_title.as_deref().unwrap_or("")
    }

    /// Text fed to the embedding service for one section.
    pub fn section_text(&self, section: Section) -> String {
        match section {
            Section::Skills => self.skills.join(", "),
            Section::Experience => self
                .experience
                .iter()
                .map(|e| format!("{} at {} - {}", e.title(), e.company(), e.description()))
                .collect::<Vec<_>>()
                .join(" "),
            Section::Education => self
                .education
                .iter()
                .map(|e| format!("{} in {} from {}", e.degree(), e.field(), e.institution()))
                .collect::<Vec<_>>()
                .join(" "),
            Section::JobTitles => format!(
                "{} {}",
                self.current_job_title(),
                self.preferred_job_title()
            )
            .trim()
            .to_string(),
            Section::State => self.state().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Profile {
        Profile {
            name: Some("Asha Rao".into()),
            location: Some("Pune, India".into()),
            current_job_title: Some("Data Analyst".into()),
            preferred_job_title: Some("Data Scientist".into()),
            skills: vec!["Python".into(), "SQL".into()],
            experience: vec![ExperienceEntry {
                company: Some("Acme".into()),
                title: Some("Analyst".into()),
                duration: None,
                description: Some("Dashboards".into()),
            }],
            education: vec![EducationEntry {
                institution: Some("COEP".into()),
                degree: Some("B.Tech".into()),
                field: Some("Computer Science".into()),
                year: Some("2019".into()),
            }],
            ..Profile::default()
        }
    }

    #[test]
    fn test_section_texts() {
        let p = sample();
        assert_eq!(p.section_text(Section::Skills), "Python, SQL");
        assert_eq!(p.section_text(Section::Experience), "Analyst at Acme - Dashboards");
        assert_eq!(
            p.section_text(Section::Education),
            "B.Tech in Computer Science from COEP"
        );
        assert_eq!(p.section_text(Section::JobTitles), "Data Analyst Data Scientist");
        assert_eq!(p.section_text(Section::State), "");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let p: Profile = serde_json::from_str(
            r#"{"name": null, "experience": [{"title": "Dev"}], "education": [{}]}"#,
        )
        .unwrap();
        assert_eq!(p.name(), "");
        assert_eq!(p.experience[0].company(), "");
        assert_eq!(p.section_text(Section::Experience), "Dev at  - ");
        assert_eq!(p.section_text(Section::JobTitles), "");
    }
}
