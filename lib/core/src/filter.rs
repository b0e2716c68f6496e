// Candidate filters applied by stores before distance ordering
use crate::record::CandidateRecord;
use crate::region::{EligibleRegions, Region};
use ahash::AHashSet;

pub trait Filter {
    fn matches(&self, record: &CandidateRecord) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&CandidateRecord) -> bool,
{
    fn matches(&self, record: &CandidateRecord) -> bool {
        self(record)
    }
}

/// Declared region must be one of the eligible regions.
/// Records without a region never match.
pub struct RegionFilter {
    regions: AHashSet<Region>,
}

impl RegionFilter {
    pub fn new(eligible: &EligibleRegions) -> Self {
        Self {
            regions: eligible.iter().cloned().collect(),
        }
    }

    pub fn accepts(&self, region: Option<&Region>) -> bool {
        region.is_some_and(|r| self.regions.contains(r))
    }
}

impl Filter for RegionFilter {
    fn matches(&self, record: &CandidateRecord) -> bool {
        self.accepts(record.region.as_ref())
    }
}
