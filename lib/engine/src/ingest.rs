//! Resume ingestion: structure, dedup, region inference, embed, insert

use crate::config::TimeoutSettings;
use crate::matcher::{embed_sections, with_timeout};
use resumatch_core::{
    CandidateId, CandidateRecord, Collaborator, Error, GeoTables, Profile, Region, Result, Section,
};
use resumatch_services::{Embedder, Structurer};
use resumatch_storage::MemoryStore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to an ingested resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "id", rename_all = "snake_case")]
pub enum IngestOutcome {
    Inserted(CandidateId),
    /// Same content was already stored under this id
    Duplicate(CandidateId),
}

impl IngestOutcome {
    pub fn id(&self) -> CandidateId {
        match self {
            IngestOutcome::Inserted(id) | IngestOutcome::Duplicate(id) => *id,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, IngestOutcome::Inserted(_))
    }
}

/// Tally of a batch ingest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// SHA-256 over the canonical JSON of a profile
pub fn content_hash(profile: &Profile) -> Result<String> {
    let canonical = serde_json::to_vec(profile)?;
    Ok(format!("{:x}", Sha256::digest(&canonical)))
}

/// Turns resumes into stored candidate records
pub struct Ingestor<E, S> {
    embedder: Arc<E>,
    structurer: Arc<S>,
    store: Arc<MemoryStore>,
    tables: Arc<GeoTables>,
    timeouts: TimeoutSettings,
}

impl<E: Embedder, S: Structurer> Ingestor<E, S> {
    pub fn new(
        embedder: Arc<E>,
        structurer: Arc<S>,
        store: Arc<MemoryStore>,
        tables: Arc<GeoTables>,
        timeouts: TimeoutSettings,
    ) -> Self {
        Self {
            embedder,
            structurer,
            store,
            tables,
            timeouts,
        }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Structure plain resume text and ingest the result
    pub async fn ingest_text(&self, text: &str) -> Result<IngestOutcome> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("resume text is empty".to_string()));
        }

        let profile = with_timeout(
            Collaborator::Structuring,
            self.timeouts.structuring(),
            self.structurer.structure_profile(text),
        )
        .await?;
        self.ingest_profile(profile).await
    }

    /// Ingest an already structured profile
    pub async fn ingest_profile(&self, mut profile: Profile) -> Result<IngestOutcome> {
        let hash = content_hash(&profile)?;
        if let Some(existing) = self.store.find_by_hash(&hash) {
            debug!(candidate = existing, "duplicate resume skipped");
            return Ok(IngestOutcome::Duplicate(existing));
        }

        let region = self.resolve_region(&profile);
        if profile.state().trim().is_empty() {
            profile.state = region.as_ref().map(|r| r.as_str().to_string());
        }

        let texts: Vec<(Section, String)> = Section::ALL
            .iter()
            .map(|s| (*s, profile.section_text(*s)))
            .collect();
        let vectors =
            embed_sections(self.embedder.as_ref(), &texts, self.timeouts.embedding()).await?;

        let record = CandidateRecord::new(profile, region, vectors).with_content_hash(hash.clone());
        match self.store.insert(record) {
            Ok(id) => {
                info!(candidate = id, "resume ingested");
                Ok(IngestOutcome::Inserted(id))
            }
            // Lost a race with a concurrent ingest of the same resume.
            Err(Error::Duplicate(_)) => self
                .store
                .find_by_hash(&hash)
                .map(IngestOutcome::Duplicate)
                .ok_or_else(|| Error::Store(format!("duplicate hash {hash} vanished"))),
            Err(e) => Err(e),
        }
    }

    /// Ingest each file in turn. A file that cannot be read or ingested is
    /// logged and counted as failed; the rest of the batch still runs.
    pub async fn ingest_files(&self, paths: &[PathBuf]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for path in paths {
            match self.ingest_file(path).await {
                Ok(IngestOutcome::Inserted(_)) => summary.inserted += 1,
                Ok(IngestOutcome::Duplicate(_)) => summary.duplicates += 1,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "ingest failed");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    async fn ingest_file(&self, path: &Path) -> Result<IngestOutcome> {
        let text = std::fs::read_to_string(path)?;
        self.ingest_text(&text).await
    }

    /// Declared state, canonicalized; otherwise inferred from the location
    fn resolve_region(&self, profile: &Profile) -> Option<Region> {
        self.tables
            .eligible_regions(profile.state())
            .map(|eligible| eligible.canonical().clone())
            .or_else(|| self.tables.infer_region(profile.location()))
    }
}
