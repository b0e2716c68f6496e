use resumatch_core::{CandidateRecord, EligibleRegions, Result, Vector};
use std::future::Future;
use std::sync::Arc;

/// Read side of a candidate store as seen by the ranking pipeline.
///
/// Implementations return at most `limit` records whose declared region is in
/// `regions`, ordered by ascending distance between their job-title vector and
/// `order_vector`. Every returned record carries all of its section vectors.
/// An empty result is not an error.
pub trait CandidateStore: Send + Sync {
    fn fetch_eligible(
        &self,
        regions: &EligibleRegions,
        order_vector: &Vector,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<CandidateRecord>>> + Send;
}

impl<T: CandidateStore> CandidateStore for Arc<T> {
    fn fetch_eligible(
        &self,
        regions: &EligibleRegions,
        order_vector: &Vector,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<CandidateRecord>>> + Send {
        (**self).fetch_eligible(regions, order_vector, limit)
    }
}
