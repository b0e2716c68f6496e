//! # resumatch Engine
//!
//! Wires the collaborators, the candidate store and the scorer together:
//!
//! - [`Matcher`] ranks stored candidates against a job description
//! - [`Ingestor`] turns resume text into stored candidate records
//! - [`Settings`] is the JSON settings file shared by server and CLI

pub mod config;
pub mod ingest;
pub mod matcher;

pub use config::{MatchSettings, Settings, TimeoutSettings, EMBED_API_KEY_ENV, LLM_API_KEY_ENV};
pub use ingest::{content_hash, BatchSummary, IngestOutcome, Ingestor};
pub use matcher::{Matcher, MatcherConfig, RankedCandidate};
