use crate::profile::Profile;
use crate::region::Region;
use crate::section::SectionVectors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CandidateId = u64;

/// An ingested resume: display attributes, declared region and one vector
/// per tracked section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub profile: Profile,
    pub region: Option<Region>,
    pub vectors: SectionVectors,
    /// SHA-256 of the canonical profile JSON, used for dedup
    pub content_hash: String,
    pub ingested_at: DateTime<Utc>,
}

impl CandidateRecord {
    /// Create a record; the id is assigned by the store on insert
    #[must_use]
    pub fn new(profile: Profile, region: Option<Region>, vectors: SectionVectors) -> Self {
        Self {
            id: 0,
            profile,
            region,
            vectors,
            content_hash: String::new(),
            ingested_at: Utc::now(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: CandidateId) -> Self {
        self.id = id;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = hash.into();
        self
    }

    pub fn name(&self) -> &str {
        self.profile.name()
    }
}
