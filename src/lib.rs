//! # resumatch
//!
//! Region-aware resume ranking.
//!
//! A job description is structured by an LLM, embedded per section, narrowed to
//! candidates in the job's region and its neighbours, retrieved by approximate
//! nearest neighbour on the job-title vector, and finally ranked by a weighted
//! average of per-section cosine similarities.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! export RESUMATCH_LLM_API_KEY=...
//! resumatch --config resumatch.json serve
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use resumatch::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo() -> resumatch::Result<()> {
//! let store = Arc::new(MemoryStore::default());
//! let matcher = Matcher::new(
//!     Arc::new(HashEmbedder::default()),
//!     Arc::new(FixedStructurer::new()),
//!     store,
//!     Arc::new(GeoTables::india()),
//!     SectionWeights::default(),
//!     MatcherConfig::default(),
//! );
//!
//! let query = r#"{"job_title": "Data Scientist", "location": "Mumbai, India"}"#;
//! let ranked = matcher.rank(query, TopN::Count(5)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - `resumatch-core` - vectors, sections, candidate records, geo tables, HNSW
//! - `resumatch-similarity` - section weights, weighted scorer, ranking
//! - `resumatch-storage` - candidate store trait, in-memory store, snapshots
//! - `resumatch-services` - embedding and structuring clients
//! - `resumatch-engine` - matcher, ingestion, settings
//! - `resumatch-api` - REST API

// Re-export core types
pub use resumatch_core::{
    CandidateId, CandidateRecord, Collaborator, EligibleRegions, Error, GeoTables, HnswIndex,
    Profile, Region, Result, Section, SectionVectors, StructuredQuery, Vector,
};

pub use resumatch_similarity::{rank, ScoredMatch, SectionScorer, SectionWeights, TopN};

// Re-export storage
pub use resumatch_storage::{BackfillReport, CandidateStore, MemoryStore, SnapshotStore, StoreConfig};

pub use resumatch_services::{
    ChatStructurer, Embedder, FixedStructurer, HashEmbedder, HttpEmbedder, Structurer,
};

pub use resumatch_engine::{IngestOutcome, Ingestor, Matcher, MatcherConfig, RankedCandidate, Settings};

// Re-export API
pub use resumatch_api::{AppState, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CandidateRecord, CandidateStore, Embedder, Error, FixedStructurer, GeoTables,
        HashEmbedder, Ingestor, Matcher, MatcherConfig, MemoryStore, Profile, RankedCandidate,
        Result, Section, SectionWeights, Settings, Structurer, StructuredQuery, TopN, Vector,
    };
}
