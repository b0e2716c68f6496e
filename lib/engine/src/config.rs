//! Settings file and environment overrides

use resumatch_core::{Error, GeoTables, Result};
use resumatch_services::{ChatStructurerConfig, HttpEmbedderConfig};
use resumatch_similarity::SectionWeights;
use resumatch_storage::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const LLM_API_KEY_ENV: &str = "RESUMATCH_LLM_API_KEY";
pub const EMBED_API_KEY_ENV: &str = "RESUMATCH_EMBED_API_KEY";

/// Ranking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Candidates retrieved per query before scoring
    pub pool_size: usize,
    /// Results returned when a request does not say
    pub default_top_n: usize,
    pub weights: SectionWeights,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            pool_size: 300,
            default_top_n: 5,
            weights: SectionWeights::default(),
        }
    }
}

/// Upper bounds on each collaborator call, in milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub structuring_ms: u64,
    pub embedding_ms: u64,
    pub store_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            structuring_ms: 30_000,
            embedding_ms: 10_000,
            store_ms: 5_000,
        }
    }
}

impl TimeoutSettings {
    pub fn structuring(&self) -> Duration {
        Duration::from_millis(self.structuring_ms)
    }

    pub fn embedding(&self) -> Duration {
        Duration::from_millis(self.embedding_ms)
    }

    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }
}

/// Everything the server and CLI need, loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub http_host: String,
    pub http_port: u16,
    pub embedding: HttpEmbedderConfig,
    pub structuring: ChatStructurerConfig,
    pub matching: MatchSettings,
    pub timeouts: TimeoutSettings,
    pub store: StoreConfig,
    /// JSON file with `localities` and `neighbors`; the built-in Indian table otherwise
    pub geo_tables: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            http_host: "0.0.0.0".to_string(),
            http_port: 8000,
            embedding: HttpEmbedderConfig::default(),
            structuring: ChatStructurerConfig::default(),
            matching: MatchSettings::default(),
            timeouts: TimeoutSettings::default(),
            store: StoreConfig::default(),
            geo_tables: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, apply environment overrides and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("cannot read settings {}: {}", path.display(), e))
        })?;
        let mut settings = Self::from_json_str(&text)?;
        settings.apply_env();
        settings.validate()?;
        info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();
        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(format!("settings: {e}")))
    }

    /// API keys only ever come from the environment
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(LLM_API_KEY_ENV) {
            debug!("structuring API key taken from environment");
            self.structuring.api_key = Some(key);
        }
        if let Ok(key) = std::env::var(EMBED_API_KEY_ENV) {
            debug!("embedding API key taken from environment");
            self.embedding.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.matching.pool_size == 0 {
            return Err(Error::InvalidConfig("matching.pool_size must be positive".into()));
        }
        if self.matching.default_top_n == 0 {
            return Err(Error::InvalidConfig("matching.default_top_n must be positive".into()));
        }
        self.matching
            .weights
            .validate()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        if self.embedding.dimensions == 0 {
            return Err(Error::InvalidConfig("embedding.dimensions must be positive".into()));
        }
        if let Some(dim) = self.store.dimension {
            if dim != self.embedding.dimensions {
                return Err(Error::InvalidConfig(format!(
                    "store.dimension {} disagrees with embedding.dimensions {}",
                    dim, self.embedding.dimensions
                )));
            }
        }

        let t = &self.timeouts;
        if t.structuring_ms == 0 || t.embedding_ms == 0 || t.store_ms == 0 {
            return Err(Error::InvalidConfig("timeouts must be positive".into()));
        }
        Ok(())
    }

    /// Store configuration pinned to the embedding dimension
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            dimension: Some(self.embedding.dimensions),
            ..self.store.clone()
        }
    }

    pub fn geo_tables(&self) -> Result<GeoTables> {
        match &self.geo_tables {
            Some(path) => GeoTables::from_json_file(path),
            None => Ok(GeoTables::india()),
        }
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }
}
