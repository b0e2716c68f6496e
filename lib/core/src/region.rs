//! Geographic eligibility
//!
//! Two immutable tables drive candidate narrowing:
//!
//! - a locality table mapping lowercase city names to a canonical region
//! - an adjacency table mapping each region to its neighbouring regions
//!
//! [`GeoTables::eligible_regions`] turns a free-text location into the ordered
//! set `[canonical, neighbours...]` used to filter the candidate store.

use crate::error::{Error, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Canonical, lowercase region identifier (a state or province).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Region(String);

impl Region {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a raw string
    pub fn matches(&self, raw: &str) -> bool {
        raw.trim().to_lowercase() == self.0
    }
}

impl From<String> for Region {
    fn from(s: String) -> Self {
        Region::new(s)
    }
}

impl From<&str> for Region {
    fn from(s: &str) -> Self {
        Region::new(s)
    }
}

impl From<Region> for String {
    fn from(r: Region) -> Self {
        r.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, non-empty set of regions a candidate must belong to.
/// The canonical region is always first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleRegions {
    regions: Vec<Region>,
}

impl EligibleRegions {
    /// Build from a canonical region plus neighbours. Duplicates keep their
    /// first position.
    pub fn new(canonical: Region, neighbors: &[Region]) -> Self {
        let mut regions = Vec::with_capacity(neighbors.len() + 1);
        regions.push(canonical);
        for n in neighbors {
            if !regions.contains(n) {
                regions.push(n.clone());
            }
        }
        Self { regions }
    }

    pub fn canonical(&self) -> &Region {
        &self.regions[0]
    }

    pub fn contains(&self, region: &Region) -> bool {
        self.regions.contains(region)
    }

    pub fn as_slice(&self) -> &[Region] {
        &self.regions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Never true: the canonical region is always present
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// On-disk form of [`GeoTables`]
#[derive(Debug, Default, Serialize, Deserialize)]
struct GeoTablesFile {
    #[serde(default)]
    localities: BTreeMap<String, String>,
    #[serde(default)]
    neighbors: BTreeMap<String, Vec<String>>,
}

/// Locality and adjacency lookup tables. Built once, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct GeoTables {
    localities: AHashMap<String, Region>,
    neighbors: AHashMap<Region, Vec<Region>>,
}

impl GeoTables {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_locality(mut self, locality: &str, region: &str) -> Self {
        self.localities
            .insert(locality.trim().to_lowercase(), Region::new(region));
        self
    }

    #[must_use]
    pub fn with_neighbors(mut self, region: &str, neighbors: &[&str]) -> Self {
        self.neighbors.insert(
            Region::new(region),
            neighbors.iter().map(Region::new).collect(),
        );
        self
    }

    /// Built-in tables for Indian metros and their bordering states
    pub fn india() -> Self {
        let mut tables = Self::new();
        for (locality, region) in INDIA_LOCALITIES {
            tables = tables.with_locality(locality, region);
        }
        for (region, neighbors) in INDIA_NEIGHBORS {
            tables = tables.with_neighbors(region, neighbors);
        }
        tables
    }

    /// Parse tables from JSON of the form
    /// `{"localities": {"pune": "maharashtra"}, "neighbors": {"maharashtra": ["goa"]}}`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: GeoTablesFile = serde_json::from_str(json)?;
        let mut tables = Self::new();
        for (locality, region) in &file.localities {
            tables = tables.with_locality(locality, region);
        }
        for (region, neighbors) in &file.neighbors {
            let refs: Vec<&str> = neighbors.iter().map(String::as_str).collect();
            tables = tables.with_neighbors(region, &refs);
        }
        Ok(tables)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("cannot read geo tables {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn locality_count(&self) -> usize {
        self.localities.len()
    }

    /// Canonical region for an already-normalized locality. Unknown localities
    /// map to themselves.
    pub fn canonical_region(&self, locality: &str) -> Region {
        self.localities
            .get(locality)
            .cloned()
            .unwrap_or_else(|| Region::new(locality))
    }

    /// Neighbours of a region, empty when the region has no entry
    pub fn neighbors(&self, region: &Region) -> &[Region] {
        self.neighbors.get(region).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Eligible regions for a raw location string, or `None` when nothing
    /// usable remains after normalization.
    pub fn eligible_regions(&self, raw_location: &str) -> Option<EligibleRegions> {
        let locality = normalize_locality(raw_location);
        if locality.is_empty() {
            return None;
        }
        let canonical = self.canonical_region(&locality);
        let neighbors = self.neighbors(&canonical);
        Some(EligibleRegions::new(canonical, neighbors))
    }

    /// Infer a region from free-text location by whole-word locality search.
    /// Longer localities win ("new delhi" over "delhi"), then alphabetical.
    pub fn infer_region(&self, location: &str) -> Option<Region> {
        let haystack = location.to_lowercase();
        if haystack.trim().is_empty() {
            return None;
        }

        let mut keywords: Vec<(&String, &Region)> = self.localities.iter().collect();
        keywords.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

        keywords
            .into_iter()
            .find(|(keyword, _)| contains_word(&haystack, keyword))
            .map(|(_, region)| region.clone())
    }
}

/// Lowercase, drop `(...)` annotations, keep the text before the first comma, trim.
pub fn normalize_locality(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let stripped = strip_parentheticals(&lowered);
    stripped
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

// Removes each "(" up to the next ")"; an unmatched "(" is kept verbatim.
fn strip_parentheticals(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find('(') {
        match rest[open..].find(')') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

const INDIA_LOCALITIES: &[(&str, &str)] = &[
    ("mumbai", "maharashtra"),
    ("pune", "maharashtra"),
    ("nagpur", "maharashtra"),
    ("bangalore", "karnataka"),
    ("bengaluru", "karnataka"),
    ("hyderabad", "telangana"),
    ("chennai", "tamil nadu"),
    ("coimbatore", "tamil nadu"),
    ("delhi", "delhi"),
    ("new delhi", "delhi"),
    ("noida", "uttar pradesh"),
    ("ghaziabad", "uttar pradesh"),
    ("lucknow", "uttar pradesh"),
    ("kanpur", "uttar pradesh"),
    ("gurgaon", "haryana"),
    ("kolkata", "west bengal"),
    ("howrah", "west bengal"),
    ("ahmedabad", "gujarat"),
    ("surat", "gujarat"),
    ("jaipur", "rajasthan"),
    ("udaipur", "rajasthan"),
    ("patna", "bihar"),
    ("bhopal", "madhya pradesh"),
    ("indore", "madhya pradesh"),
    ("goa", "goa"),
    ("panaji", "goa"),
    ("guwahati", "assam"),
    ("chandigarh", "chandigarh"),
    ("ranchi", "jharkhand"),
    ("jamshedpur", "jharkhand"),
    ("bhubaneswar", "odisha"),
    ("cuttack", "odisha"),
    ("amritsar", "punjab"),
    ("ludhiana", "punjab"),
    ("kochi", "kerala"),
    ("visakhapatnam", "andhra pradesh"),
];

const INDIA_NEIGHBORS: &[(&str, &[&str])] = &[
    (
        "maharashtra",
        &["gujarat", "madhya pradesh", "chhattisgarh", "telangana", "karnataka", "goa"],
    ),
    (
        "karnataka",
        &["maharashtra", "andhra pradesh", "telangana", "tamil nadu", "kerala", "goa"],
    ),
    ("telangana", &["maharashtra", "chhattisgarh", "andhra pradesh", "karnataka"]),
    ("tamil nadu", &["kerala", "karnataka", "andhra pradesh"]),
    ("delhi", &["haryana", "uttar pradesh"]),
    (
        "uttar pradesh",
        &["uttarakhand", "delhi", "haryana", "rajasthan", "madhya pradesh", "bihar"],
    ),
    (
        "haryana",
        &["punjab", "delhi", "uttar pradesh", "rajasthan", "himachal pradesh"],
    ),
    ("west bengal", &["bihar", "jharkhand", "odisha", "assam", "sikkim"]),
    ("gujarat", &["maharashtra", "madhya pradesh", "rajasthan"]),
    (
        "rajasthan",
        &["gujarat", "madhya pradesh", "uttar pradesh", "haryana", "punjab"],
    ),
];
