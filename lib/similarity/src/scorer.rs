//! Weighted section scorer
//!
//! Computes a single match score from per-section cosine similarities:
//!
//! ```text
//! score = Σ cos(q_s, c_s) · w_s / Σ w_s      over sections s present on both sides
//! ```
//!
//! The result stays in [-1, 1]. When no weighted section is shared the score is
//! a neutral 0.0. Vectors whose dimension disagrees are treated as absent and
//! counted in [`ScorerStats`].

use crate::weights::SectionWeights;
use rayon::prelude::*;
use resumatch_core::{CandidateId, CandidateRecord, Section, SectionVectors};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Data-quality counters, shared across clones of a scorer
#[derive(Debug, Default)]
pub struct ScorerStats {
    dimension_mismatches: AtomicU64,
    missing_sections: AtomicU64,
}

impl ScorerStats {
    /// Candidate vectors skipped because their dimension was wrong
    pub fn dimension_mismatches(&self) -> u64 {
        self.dimension_mismatches.load(Ordering::Relaxed)
    }

    /// Weighted sections the query had but the candidate lacked
    pub fn missing_sections(&self) -> u64 {
        self.missing_sections.load(Ordering::Relaxed)
    }
}

/// Score with per-section breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionScore {
    /// Weighted average cosine similarity in [-1, 1]
    pub score: f32,
    /// Normalized contribution per compared section; sums to `score`
    pub sections: BTreeMap<Section, f32>,
}

impl SectionScore {
    fn neutral() -> Self {
        Self {
            score: 0.0,
            sections: BTreeMap::new(),
        }
    }
}

/// A candidate with its match score
#[derive(Debug, Clone)]
pub struct ScoredMatch {
    pub record: CandidateRecord,
    pub score: f32,
    pub section_scores: BTreeMap<Section, f32>,
}

impl ScoredMatch {
    pub fn id(&self) -> CandidateId {
        self.record.id
    }
}

/// Scores candidates against a query using a section weight table
#[derive(Debug, Clone)]
pub struct SectionScorer {
    weights: SectionWeights,
    expected_dim: Option<usize>,
    stats: Arc<ScorerStats>,
}

impl SectionScorer {
    pub fn new(weights: SectionWeights) -> Self {
        Self {
            weights,
            expected_dim: None,
            stats: Arc::new(ScorerStats::default()),
        }
    }

    /// Also reject candidate vectors whose dimension differs from `dim`
    #[must_use]
    pub fn with_expected_dim(mut self, dim: usize) -> Self {
        self.expected_dim = Some(dim);
        self
    }

    pub fn weights(&self) -> &SectionWeights {
        &self.weights
    }

    pub fn stats(&self) -> &ScorerStats {
        &self.stats
    }

    /// Score two sets of section vectors
    pub fn score(&self, query: &SectionVectors, candidate: &SectionVectors) -> SectionScore {
        self.score_inner(query, candidate, None)
    }

    /// Score a stored candidate; data-quality warnings carry its id
    pub fn score_record(&self, query: &SectionVectors, record: &CandidateRecord) -> SectionScore {
        self.score_inner(query, &record.vectors, Some(record.id))
    }

    /// Score a retrieved pool, keeping retrieval order
    pub fn score_pool(&self, query: &SectionVectors, pool: Vec<CandidateRecord>) -> Vec<ScoredMatch> {
        pool.into_par_iter()
            .map(|record| {
                let SectionScore { score, sections } = self.score_record(query, &record);
                ScoredMatch {
                    record,
                    score,
                    section_scores: sections,
                }
            })
            .collect()
    }

    fn score_inner(
        &self,
        query: &SectionVectors,
        candidate: &SectionVectors,
        candidate_id: Option<CandidateId>,
    ) -> SectionScore {
        let mut total = 0.0f32;
        let mut weight_sum = 0.0f32;
        let mut contributions = BTreeMap::new();

        for (section, weight) in self.weights.iter() {
            let Some(q) = query.get(section) else {
                continue;
            };
            let Some(c) = candidate.get(section) else {
                self.stats.missing_sections.fetch_add(1, Ordering::Relaxed);
                debug!(candidate = ?candidate_id, %section, "candidate lacks section vector");
                continue;
            };

            let expected = self.expected_dim.unwrap_or(q.dim());
            if c.dim() != q.dim() || c.dim() != expected {
                self.stats.dimension_mismatches.fetch_add(1, Ordering::Relaxed);
                warn!(
                    candidate = ?candidate_id,
                    %section,
                    expected,
                    actual = c.dim(),
                    "section vector dimension mismatch, excluding section"
                );
                continue;
            }

            let similarity = q.cosine_similarity(c);
            total += similarity * weight;
            weight_sum += weight;
            contributions.insert(section, similarity * weight);
        }

        if weight_sum <= 0.0 {
            return SectionScore::neutral();
        }

        for value in contributions.values_mut() {
            *value /= weight_sum;
        }

        SectionScore {
            score: (total / weight_sum).clamp(-1.0, 1.0),
            sections: contributions,
        }
    }
}
