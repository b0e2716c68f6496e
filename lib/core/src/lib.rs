//! # resumatch Core
//!
//! Core types for the resumatch ranking pipeline.
//!
//! - [`Vector`] - dense section embedding with cosine kernels
//! - [`Section`] / [`SectionVectors`] - the semantic sections of a profile
//! - [`CandidateRecord`] - an ingested resume with its section vectors
//! - [`StructuredQuery`] - a job description in structured form
//! - [`GeoTables`] - locality/adjacency tables and the eligibility filter
//! - [`HnswIndex`] - approximate nearest neighbour index over one section
//!
//! ## Example
//!
//! ```rust
//! use resumatch_core::GeoTables;
//!
//! let tables = GeoTables::india();
//! let eligible = tables.eligible_regions("Mumbai, India").unwrap();
//! assert_eq!(eligible.canonical().as_str(), "maharashtra");
//! assert!(tables.eligible_regions("  ").is_none());
//! ```

pub mod distance;
pub mod error;
pub mod filter;
pub mod hnsw;
pub mod profile;
pub mod query;
pub mod record;
pub mod region;
pub mod section;
pub mod vector;

pub use error::{Collaborator, Error, Result};
pub use filter::{Filter, RegionFilter};
pub use hnsw::HnswIndex;
pub use profile::{EducationEntry, ExperienceEntry, Profile};
pub use query::StructuredQuery;
pub use record::{CandidateId, CandidateRecord};
pub use region::{normalize_locality, EligibleRegions, GeoTables, Region};
pub use section::{Section, SectionVectors};
pub use vector::Vector;
