//! In-memory candidate store
//!
//! Records live in a `BTreeMap` behind one `parking_lot::RwLock`. Query paths
//! only take the read lock. Ordering by job-title distance uses either an
//! [`HnswIndex`] (over-fetch, then region filter) or an exact scan over the
//! eligible records.

use crate::store::CandidateStore;
use ahash::AHashMap;
use parking_lot::RwLock;
use resumatch_core::distance::cosine_distance;
use resumatch_core::{
    CandidateId, CandidateRecord, EligibleRegions, Error, Filter, GeoTables, HnswIndex, Region,
    RegionFilter, Result, Section, Vector,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Configuration for a [`MemoryStore`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Required section vector dimension; `None` accepts any
    pub dimension: Option<usize>,
    /// Order retrieval with an HNSW index instead of an exact scan
    pub use_hnsw: bool,
    /// Section whose vector orders retrieval
    pub order_section: Section,
    /// HNSW over-fetch factor applied before region filtering
    pub oversample: usize,
    /// HNSW search beam width
    pub ef_search: Option<usize>,
    pub hnsw_m: usize,
    pub hnsw_layers: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dimension: None,
            use_hnsw: true,
            order_section: Section::JobTitles,
            oversample: 4,
            ef_search: None,
            hnsw_m: 16,
            hnsw_layers: 4,
        }
    }
}

/// Outcome of [`MemoryStore::backfill_regions`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub updated: usize,
    pub unresolved: usize,
}

struct Inner {
    records: BTreeMap<CandidateId, CandidateRecord>,
    index: Option<HnswIndex>,
    hashes: AHashMap<String, CandidateId>,
    region_counts: AHashMap<Region, usize>,
    next_id: CandidateId,
}

impl Inner {
    fn new(config: &StoreConfig) -> Self {
        Self {
            records: BTreeMap::new(),
            index: config
                .use_hnsw
                .then(|| HnswIndex::new(config.hnsw_m, config.hnsw_layers)),
            hashes: AHashMap::new(),
            region_counts: AHashMap::new(),
            next_id: 1,
        }
    }

    fn count_region(&mut self, region: Option<&Region>) {
        if let Some(region) = region {
            *self.region_counts.entry(region.clone()).or_insert(0) += 1;
        }
    }

    fn eligible_count(&self, regions: &EligibleRegions) -> usize {
        regions
            .iter()
            .map(|r| self.region_counts.get(r).copied().unwrap_or(0))
            .sum()
    }
}

/// Candidate store held entirely in memory
pub struct MemoryStore {
    config: StoreConfig,
    inner: RwLock<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        let inner = RwLock::new(Inner::new(&config));
        Self { config, inner }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    pub fn get(&self, id: CandidateId) -> Option<CandidateRecord> {
        self.inner.read().records.get(&id).cloned()
    }

    /// Id of the record stored under a content hash
    pub fn find_by_hash(&self, content_hash: &str) -> Option<CandidateId> {
        self.inner.read().hashes.get(content_hash).copied()
    }

    pub fn contains_hash(&self, content_hash: &str) -> bool {
        self.find_by_hash(content_hash).is_some()
    }

    /// Insert a record and assign it an id.
    ///
    /// Fails with [`Error::Duplicate`] when a record with the same content
    /// hash exists, and with [`Error::InvalidDimension`] when a section vector
    /// disagrees with the configured dimension.
    pub fn insert(&self, record: CandidateRecord) -> Result<CandidateId> {
        self.check_dimensions(&record)?;

        let mut inner = self.inner.write();
        if !record.content_hash.is_empty() {
            if let Some(existing) = inner.hashes.get(&record.content_hash) {
                return Err(Error::Duplicate(format!(
                    "content hash {} already stored as candidate {}",
                    record.content_hash, existing
                )));
            }
        }

        let id = inner.next_id;
        let record = record.with_id(id);
        self.insert_locked(&mut inner, record)?;
        inner.next_id = id + 1;
        Ok(id)
    }

    /// Replace the whole contents with previously stored records, keeping their ids
    pub fn restore(&self, records: Vec<CandidateRecord>) -> Result<usize> {
        let mut fresh = Inner::new(&self.config);
        for record in records {
            if let Err(e) = self.check_dimensions(&record) {
                warn!(candidate = record.id, error = %e, "skipping record on restore");
                continue;
            }
            let id = record.id;
            self.insert_locked(&mut fresh, record)?;
            fresh.next_id = fresh.next_id.max(id + 1);
        }

        let restored = fresh.records.len();
        *self.inner.write() = fresh;
        info!(records = restored, "candidate store restored");
        Ok(restored)
    }

    /// Every record, in id order
    pub fn all(&self) -> Vec<CandidateRecord> {
        self.inner.read().records.values().cloned().collect()
    }

    pub fn records_matching(&self, filter: &impl Filter) -> Vec<CandidateRecord> {
        self.inner
            .read()
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    /// Infer a region for every record that has none, from its declared
    /// state first and its location second
    pub fn backfill_regions(&self, tables: &GeoTables) -> BackfillReport {
        let mut inner = self.inner.write();
        let mut report = BackfillReport::default();
        let mut resolved = Vec::new();

        for record in inner.records.values_mut().filter(|r| r.region.is_none()) {
            let inferred = tables
                .infer_region(record.profile.state())
                .or_else(|| tables.infer_region(record.profile.location()));
            match inferred {
                Some(region) => {
                    debug!(candidate = record.id, %region, "backfilled region");
                    record.region = Some(region.clone());
                    resolved.push(region);
                    report.updated += 1;
                }
                None => report.unresolved += 1,
            }
        }

        for region in &resolved {
            inner.count_region(Some(region));
        }

        info!(
            updated = report.updated,
            unresolved = report.unresolved,
            "region backfill complete"
        );
        report
    }

    /// Region-filtered retrieval ordered by distance on the order section
    pub fn retrieve(
        &self,
        regions: &EligibleRegions,
        order_vector: &Vector,
        limit: usize,
    ) -> Vec<CandidateRecord> {
        if limit == 0 {
            return Vec::new();
        }

        let inner = self.inner.read();
        let eligible = inner.eligible_count(regions);
        if eligible == 0 {
            return Vec::new();
        }

        let filter = RegionFilter::new(regions);
        let target = limit.min(eligible);

        if let Some(index) = &inner.index {
            if !order_vector.is_empty() && order_vector.dim() == index.dim() {
                // Scale the over-fetch by how selective the region filter is.
                let selectivity = inner.records.len().div_ceil(eligible).max(1);
                let fetch = (target * self.config.oversample.max(1) * selectivity).min(index.len());
                let picked: Vec<CandidateRecord> = index
                    .search(order_vector, fetch, self.config.ef_search)
                    .into_iter()
                    .filter_map(|(id, _)| inner.records.get(&id))
                    .filter(|r| filter.matches(r))
                    .take(limit)
                    .cloned()
                    .collect();

                if picked.len() >= target {
                    return picked;
                }
                debug!(
                    found = picked.len(),
                    target, "approximate retrieval came up short, falling back to exact scan"
                );
            }
        }

        self.exact_scan(&inner, &filter, order_vector, limit)
    }

    fn exact_scan(
        &self,
        inner: &Inner,
        filter: &RegionFilter,
        order_vector: &Vector,
        limit: usize,
    ) -> Vec<CandidateRecord> {
        let mut ranked: Vec<(Option<f32>, &CandidateRecord)> = inner
            .records
            .values()
            .filter(|r| filter.matches(r))
            .map(|r| {
                let distance = r
                    .vectors
                    .get(self.config.order_section)
                    .filter(|v| v.dim() == order_vector.dim() && !order_vector.is_empty())
                    .map(|v| cosine_distance(v.as_slice(), order_vector.as_slice()));
                (distance, r)
            })
            .collect();

        // Records without a comparable order vector go last; ties by id.
        ranked.sort_by(|(da, ra), (db, rb)| {
            let by_distance = match (da, db) {
                (Some(a), Some(b)) => a.total_cmp(b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            };
            by_distance.then_with(|| ra.id.cmp(&rb.id))
        });

        ranked
            .into_iter()
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect()
    }

    fn check_dimensions(&self, record: &CandidateRecord) -> Result<()> {
        let Some(expected) = self.config.dimension else {
            return Ok(());
        };
        for (_, vector) in record.vectors.iter() {
            if !vector.is_empty() && vector.dim() != expected {
                return Err(Error::InvalidDimension {
                    expected,
                    actual: vector.dim(),
                });
            }
        }
        Ok(())
    }

    fn insert_locked(&self, inner: &mut Inner, record: CandidateRecord) -> Result<()> {
        if let Some(index) = inner.index.as_mut() {
            if let Some(vector) = record.vectors.get(self.config.order_section) {
                index.insert(record.id, vector)?;
            }
        }

        if !record.content_hash.is_empty() {
            inner.hashes.insert(record.content_hash.clone(), record.id);
        }
        inner.count_region(record.region.as_ref());
        inner.records.insert(record.id, record);
        Ok(())
    }
}

impl CandidateStore for MemoryStore {
    async fn fetch_eligible(
        &self,
        regions: &EligibleRegions,
        order_vector: &Vector,
        limit: usize,
    ) -> Result<Vec<CandidateRecord>> {
        Ok(self.retrieve(regions, order_vector, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resumatch_core::{Profile, SectionVectors};

    fn record(region: Option<&str>, title: Vec<f32>) -> CandidateRecord {
        let vectors = SectionVectors::new()
            .with(Section::JobTitles, Vector::new(title))
            .with(Section::Skills, Vector::new(vec![1.0, 0.0, 0.0]));
        CandidateRecord::new(Profile::default(), region.map(Region::new), vectors)
    }

    fn eligible(regions: &[&str]) -> EligibleRegions {
        let all: Vec<Region> = regions.iter().map(|r| Region::new(r)).collect();
        EligibleRegions::new(all[0].clone(), &all[1..])
    }

    fn populated(use_hnsw: bool) -> MemoryStore {
        let store = MemoryStore::new(StoreConfig {
            use_hnsw,
            ..Default::default()
        });
        store.insert(record(Some("maharashtra"), vec![1.0, 0.0, 0.0])).unwrap();
        store.insert(record(Some("gujarat"), vec![0.9, 0.1, 0.0])).unwrap();
        store.insert(record(Some("Kerala"), vec![1.0, 0.0, 0.0])).unwrap();
        store.insert(record(Some("goa"), vec![0.0, 1.0, 0.0])).unwrap();
        store.insert(record(None, vec![1.0, 0.0, 0.0])).unwrap();
        store
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::default();
        assert_eq!(store.insert(record(Some("goa"), vec![1.0, 0.0, 0.0])).unwrap(), 1);
        assert_eq!(store.insert(record(Some("goa"), vec![0.0, 1.0, 0.0])).unwrap(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(2).unwrap().id, 2);
    }

    #[test]
    fn test_region_filter_and_order() {
        for use_hnsw in [true, false] {
            let store = populated(use_hnsw);
            let regions = eligible(&["maharashtra", "gujarat", "goa"]);
            let pool = store.retrieve(&regions, &Vector::new(vec![1.0, 0.0, 0.0]), 10);

            let ids: Vec<u64> = pool.iter().map(|r| r.id).collect();
            assert_eq!(ids, vec![1, 2, 4], "use_hnsw={use_hnsw}");
            assert!(pool.iter().all(|r| r.vectors.contains(Section::Skills)));
        }
    }

    #[test]
    fn test_region_match_is_case_insensitive() {
        let store = populated(false);
        let pool = store.retrieve(&eligible(&["KERALA"]), &Vector::new(vec![1.0, 0.0, 0.0]), 10);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, 3);
    }

    #[test]
    fn test_limit_bounds_pool() {
        for use_hnsw in [true, false] {
            let store = populated(use_hnsw);
            let regions = eligible(&["maharashtra", "gujarat", "goa"]);
            let pool = store.retrieve(&regions, &Vector::new(vec![1.0, 0.0, 0.0]), 2);
            assert_eq!(pool.len(), 2);
            assert_eq!(pool[0].id, 1);
        }
    }

    #[test]
    fn test_no_eligible_records() {
        let store = populated(true);
        let pool = store.retrieve(&eligible(&["assam"]), &Vector::new(vec![1.0, 0.0, 0.0]), 10);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_records_without_order_vector_sort_last() {
        let store = MemoryStore::new(StoreConfig {
            use_hnsw: true,
            ..Default::default()
        });
        let bare = CandidateRecord::new(
            Profile::default(),
            Some(Region::new("goa")),
            SectionVectors::new().with(Section::Skills, Vector::new(vec![1.0, 0.0])),
        );
        store.insert(bare).unwrap();
        store.insert(record(Some("goa"), vec![0.0, 1.0, 0.0])).unwrap();

        // The HNSW index holds only one of the two; the exact scan picks up the rest.
        let pool = store.retrieve(&eligible(&["goa"]), &Vector::new(vec![0.0, 1.0, 0.0]), 10);
        let ids: Vec<u64> = pool.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_hnsw_over_many_records() {
        let store = MemoryStore::default();
        for i in 0..200u32 {
            let region = if i % 4 == 0 { "goa" } else { "kerala" };
            let angle = i as f32 * 0.01;
            store
                .insert(record(Some(region), vec![angle.cos(), angle.sin(), 0.0]))
                .unwrap();
        }

        let pool = store.retrieve(&eligible(&["goa"]), &Vector::new(vec![1.0, 0.0, 0.0]), 10);
        assert_eq!(pool.len(), 10);
        assert!(pool.iter().all(|r| r.region.as_ref().unwrap().as_str() == "goa"));
        // Nearest goa record is the first inserted (angle 0).
        assert_eq!(pool[0].id, 1);
    }

    #[test]
    fn test_duplicate_hash_rejected() {
        let store = MemoryStore::default();
        let first = record(Some("goa"), vec![1.0, 0.0, 0.0]).with_content_hash("abc");
        let id = store.insert(first.clone()).unwrap();
        assert!(matches!(store.insert(first), Err(Error::Duplicate(_))));
        assert_eq!(store.find_by_hash("abc"), Some(id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_dimension_enforced() {
        let store = MemoryStore::new(StoreConfig {
            dimension: Some(4),
            ..Default::default()
        });
        let result = store.insert(record(Some("goa"), vec![1.0, 0.0, 0.0]));
        assert!(matches!(
            result,
            Err(Error::InvalidDimension { expected: 4, actual: 3 })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_backfill_regions() {
        let store = MemoryStore::new(StoreConfig {
            use_hnsw: false,
            ..Default::default()
        });
        let mut located = record(None, vec![1.0, 0.0, 0.0]);
        located.profile.location = Some("Andheri West, Mumbai".into());
        let mut unknown = record(None, vec![1.0, 0.0, 0.0]);
        unknown.profile.location = Some("Somewhere remote".into());
        store.insert(located).unwrap();
        store.insert(unknown).unwrap();
        store.insert(record(Some("goa"), vec![1.0, 0.0, 0.0])).unwrap();

        let report = store.backfill_regions(&GeoTables::india());
        assert_eq!(report, BackfillReport { updated: 1, unresolved: 1 });
        assert_eq!(store.get(1).unwrap().region, Some(Region::new("maharashtra")));

        let pool = store.retrieve(&eligible(&["maharashtra"]), &Vector::new(vec![1.0, 0.0, 0.0]), 5);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_restore_keeps_ids() {
        let store = populated(true);
        let records = store.all();

        let restored = MemoryStore::default();
        assert_eq!(restored.restore(records).unwrap(), 5);
        assert_eq!(restored.get(3).unwrap().region, Some(Region::new("kerala")));
        assert_eq!(
            restored.insert(record(Some("goa"), vec![1.0, 0.0, 0.0])).unwrap(),
            6
        );
    }

    #[test]
    fn test_records_matching_closure() {
        let store = populated(false);
        let without_region = store.records_matching(&|r: &CandidateRecord| r.region.is_none());
        assert_eq!(without_region.len(), 1);
        assert_eq!(without_region[0].id, 5);
    }

    #[tokio::test]
    async fn test_fetch_eligible_via_trait() {
        let store = populated(true);
        let pool = store
            .fetch_eligible(&eligible(&["goa"]), &Vector::new(vec![0.0, 1.0, 0.0]), 5)
            .await
            .unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, 4);
    }
}
