//! # resumatch Similarity
//!
//! Weighted multi-section scoring for resume/job matching.
//!
//! A job description and a resume are each embedded per [`Section`]. The
//! [`SectionScorer`] combines the per-section cosine similarities with a
//! [`SectionWeights`] table, normalizing over the sections both sides have,
//! and [`rank`] orders the result.
//!
//! ## Example
//!
//! ```rust
//! use resumatch_core::{Section, SectionVectors, Vector};
//! use resumatch_similarity::{SectionScorer, SectionWeights};
//!
//! let query = SectionVectors::new()
//!     .with(Section::Skills, Vector::new(vec![1.0, 0.0]))
//!     .with(Section::JobTitles, Vector::new(vec![0.0, 1.0]));
//! let candidate = query.clone();
//!
//! let scorer = SectionScorer::new(SectionWeights::default());
//! let result = scorer.score(&query, &candidate);
//! assert!((result.score - 1.0).abs() < 1e-6);
//! ```
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Weights   │────>│   Scorer    │────>│    rank     │
//! │ (per section│     │ (Σ cos·w/Σw)│     │ (stable,    │
//! └─────────────┘     └─────────────┘     │  top-N)     │
//!                            ▲            └─────────────┘
//!                     retrieved pool
//! ```
//!
//! [`Section`]: resumatch_core::Section

pub mod rank;
pub mod scorer;
pub mod weights;

pub use rank::{rank, TopN};
pub use scorer::{ScoredMatch, ScorerStats, SectionScore, SectionScorer};
pub use weights::{SectionWeights, WeightError};
