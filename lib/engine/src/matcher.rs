//! Ranking orchestrator
//!
//! ```text
//! query text ─> structure ─> embed sections ─> eligible regions ─> retrieve ─> score ─> rank
//! ```
//!
//! Every collaborator call is bounded by a timeout. A query with no usable
//! location, or whose eligible regions hold no candidates, yields an empty
//! result rather than an error.

use crate::config::{Settings, TimeoutSettings};
use futures_util::future::try_join_all;
use resumatch_core::{
    CandidateId, Collaborator, Error, GeoTables, Profile, Region, Result, Section, SectionVectors,
    StructuredQuery, Vector,
};
use resumatch_services::{Embedder, Structurer};
use resumatch_similarity::{rank, ScoredMatch, ScorerStats, SectionScorer, SectionWeights, TopN};
use resumatch_storage::CandidateStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Run `fut`, turning expiry of `limit` into [`Error::Timeout`]
pub(crate) async fn with_timeout<T>(
    collaborator: Collaborator,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(%collaborator, timeout_ms = limit.as_millis() as u64, "collaborator call timed out");
            Err(Error::Timeout {
                collaborator,
                timeout_ms: limit.as_millis() as u64,
            })
        }
    }
}

/// Embed `(section, text)` pairs concurrently, each call under `limit`
pub(crate) async fn embed_sections<E: Embedder>(
    embedder: &E,
    texts: &[(Section, String)],
    limit: Duration,
) -> Result<SectionVectors> {
    let calls = texts.iter().map(|(section, text)| async move {
        let vector = with_timeout(Collaborator::Embedding, limit, embedder.embed(text)).await?;
        Ok::<(Section, Vector), Error>((*section, vector))
    });
    Ok(try_join_all(calls).await?.into_iter().collect())
}

/// Tunables for a [`Matcher`]
#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    /// Candidates retrieved before scoring
    pub pool_size: usize,
    pub timeouts: TimeoutSettings,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            pool_size: 300,
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl From<&Settings> for MatcherConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            pool_size: settings.matching.pool_size,
            timeouts: settings.timeouts,
        }
    }
}

/// One ranked result: the candidate's display attributes plus its score
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub id: CandidateId,
    #[serde(flatten)]
    pub profile: Profile,
    pub region: Option<Region>,
    #[serde(rename = "similarity_score")]
    pub score: f32,
    pub section_scores: BTreeMap<Section, f32>,
}

impl From<ScoredMatch> for RankedCandidate {
    fn from(scored: ScoredMatch) -> Self {
        Self {
            id: scored.record.id,
            profile: scored.record.profile,
            region: scored.record.region,
            score: scored.score,
            section_scores: scored.section_scores,
        }
    }
}

/// Ranks stored candidates against job descriptions
pub struct Matcher<E, S, C> {
    embedder: Arc<E>,
    structurer: Arc<S>,
    store: Arc<C>,
    tables: Arc<GeoTables>,
    scorer: SectionScorer,
    config: MatcherConfig,
}

impl<E, S, C> Matcher<E, S, C>
where
    E: Embedder,
    S: Structurer,
    C: CandidateStore,
{
    pub fn new(
        embedder: Arc<E>,
        structurer: Arc<S>,
        store: Arc<C>,
        tables: Arc<GeoTables>,
        weights: SectionWeights,
        config: MatcherConfig,
    ) -> Self {
        let scorer = SectionScorer::new(weights).with_expected_dim(embedder.dimensions());
        Self {
            embedder,
            structurer,
            store,
            tables,
            scorer,
            config,
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn tables(&self) -> &GeoTables {
        &self.tables
    }

    /// Data-quality counters accumulated while scoring
    pub fn scorer_stats(&self) -> &ScorerStats {
        self.scorer.stats()
    }

    /// Rank candidates for a free-text job description.
    ///
    /// Empty or whitespace-only text is rejected before any collaborator is
    /// called. "No match" is `Ok(vec![])`.
    pub async fn rank(&self, query_text: &str, top_n: TopN) -> Result<Vec<RankedCandidate>> {
        if query_text.trim().is_empty() {
            return Err(Error::InvalidInput("query text is empty".to_string()));
        }

        let query = with_timeout(
            Collaborator::Structuring,
            self.config.timeouts.structuring(),
            self.structurer.structure_query(query_text),
        )
        .await?;
        debug!(job_title = %query.job_title, location = %query.location, "structured query");

        self.rank_structured(&query, top_n).await
    }

    /// Rank candidates for an already structured query
    pub async fn rank_structured(
        &self,
        query: &StructuredQuery,
        top_n: TopN,
    ) -> Result<Vec<RankedCandidate>> {
        let texts = query.section_texts();
        let vectors =
            embed_sections(self.embedder.as_ref(), &texts, self.config.timeouts.embedding()).await?;

        let Some(regions) = self.tables.eligible_regions(&query.location) else {
            info!(location = %query.location, "no usable location, nothing to rank");
            return Ok(Vec::new());
        };
        debug!(regions = ?regions.as_slice(), "eligible regions");

        let order_vector = vectors.get(Section::JobTitles).cloned().unwrap_or_default();
        let pool = with_timeout(
            Collaborator::Store,
            self.config.timeouts.store(),
            self.store
                .fetch_eligible(&regions, &order_vector, self.config.pool_size),
        )
        .await?;

        if pool.is_empty() {
            info!(canonical = %regions.canonical(), "no candidates in eligible regions");
            return Ok(Vec::new());
        }

        let retrieved = pool.len();
        let scored = self.scorer.score_pool(&vectors, pool);
        let ranked: Vec<RankedCandidate> = rank(scored, top_n)
            .into_iter()
            .map(RankedCandidate::from)
            .collect();

        info!(retrieved, returned = ranked.len(), "ranking complete");
        Ok(ranked)
    }
}
