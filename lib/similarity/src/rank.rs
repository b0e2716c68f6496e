//! Final ordering and truncation of scored candidates

use crate::scorer::ScoredMatch;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How many ranked candidates to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopN {
    All,
    Count(usize),
}

impl Default for TopN {
    fn default() -> Self {
        TopN::Count(5)
    }
}

impl From<Option<usize>> for TopN {
    fn from(value: Option<usize>) -> Self {
        value.map_or(TopN::All, TopN::Count)
    }
}

impl TopN {
    pub fn limit(&self) -> Option<usize> {
        match self {
            TopN::All => None,
            TopN::Count(n) => Some(*n),
        }
    }
}

/// Descending by score; NaN sorts after every real score
fn by_score_desc(a: &ScoredMatch, b: &ScoredMatch) -> Ordering {
    match (a.score.is_nan(), b.score.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.score.total_cmp(&a.score),
    }
}

/// Sort descending by score and keep the first `top_n`.
///
/// The sort is stable, so equal scores keep their retrieval order.
pub fn rank(mut scored: Vec<ScoredMatch>, top_n: TopN) -> Vec<ScoredMatch> {
    scored.sort_by(by_score_desc);
    if let TopN::Count(n) = top_n {
        scored.truncate(n);
    }
    scored
}
