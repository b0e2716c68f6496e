// Snapshot persistence for the in-memory candidate store
use crate::memory::MemoryStore;
use anyhow::{anyhow, Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use resumatch_core::CandidateRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SNAPSHOT_FILE: &str = "candidates.snapshot";
const CHECKSUM_FILE: &str = "candidates.snapshot.sha256";
const SNAPSHOT_VERSION: u32 = 1;

/// Snapshot description for logs and API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDescription {
    pub path: PathBuf,
    pub records: usize,
    pub size: u64,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted store contents
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotData {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub records: Vec<CandidateRecord>,
}

/// Gzip-compressed bincode snapshot with a SHA-256 sidecar
pub struct SnapshotStore {
    dir: PathBuf,
    // Snapshot and sidecar are written as one unit.
    save_lock: Mutex<()>,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating snapshot directory {}", dir.display()))?;
        Ok(Self {
            dir,
            save_lock: Mutex::new(()),
        })
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    fn checksum_path(&self) -> PathBuf {
        self.dir.join(CHECKSUM_FILE)
    }

    /// Write every record of `store`, replacing any previous snapshot atomically
    pub fn save(&self, store: &MemoryStore) -> Result<SnapshotDescription> {
        let data = SnapshotData {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            records: store.all(),
        };

        let encoded =
            bincode::serialize(&data).map_err(|e| anyhow!("Serialization error: {}", e))?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&encoded)?;
        let compressed = encoder.finish()?;
        let checksum = format!("{:x}", Sha256::digest(&compressed));

        let path = self.snapshot_path();
        let _guard = self.save_lock.lock();
        AtomicFile::new(&path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&compressed))
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        AtomicFile::new(self.checksum_path(), OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(checksum.as_bytes()))
            .context("writing snapshot checksum")?;

        info!(records = data.records.len(), bytes = compressed.len(), "snapshot saved");

        Ok(SnapshotDescription {
            path,
            records: data.records.len(),
            size: compressed.len() as u64,
            checksum,
            created_at: data.created_at,
        })
    }

    /// Read the snapshot, if one exists. A checksum mismatch is an error.
    pub fn load(&self) -> Result<Option<SnapshotData>> {
        let _guard = self.save_lock.lock();
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }

        let compressed =
            fs::read(&path).with_context(|| format!("reading snapshot {}", path.display()))?;

        match fs::read_to_string(self.checksum_path()) {
            Ok(expected) => {
                let actual = format!("{:x}", Sha256::digest(&compressed));
                if expected.trim() != actual {
                    return Err(anyhow!(
                        "snapshot checksum mismatch: expected {}, found {}",
                        expected.trim(),
                        actual
                    ));
                }
            }
            Err(e) => warn!(error = %e, "snapshot checksum missing, loading unverified"),
        }

        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut encoded = Vec::new();
        decoder.read_to_end(&mut encoded)?;

        let data: SnapshotData =
            bincode::deserialize(&encoded).map_err(|e| anyhow!("Deserialization error: {}", e))?;
        if data.version != SNAPSHOT_VERSION {
            return Err(anyhow!("unsupported snapshot version {}", data.version));
        }
        Ok(Some(data))
    }

    /// Load the snapshot into `store`; returns the number of records restored
    pub fn load_into(&self, store: &MemoryStore) -> Result<usize> {
        match self.load()? {
            Some(data) => {
                info!(created_at = %data.created_at, "loading snapshot from disk");
                Ok(store.restore(data.records)?)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resumatch_core::{Profile, Region, Section, SectionVectors, Vector};
    use tempfile::TempDir;

    fn sample_store() -> MemoryStore {
        let store = MemoryStore::default();
        for (i, region) in ["goa", "kerala", "assam"].iter().enumerate() {
            let profile = Profile {
                name: Some(format!("Candidate {i}")),
                skills: vec!["Rust".into()],
                ..Default::default()
            };
            let vectors = SectionVectors::new()
                .with(Section::JobTitles, Vector::new(vec![i as f32, 1.0]))
                .with(Section::Skills, Vector::new(vec![1.0, i as f32]));
            let record = CandidateRecord::new(profile, Some(Region::new(region)), vectors)
                .with_content_hash(format!("hash-{i}"));
            store.insert(record).unwrap();
        }
        store
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let snapshots = SnapshotStore::new(temp_dir.path()).unwrap();
        let store = sample_store();

        let description = snapshots.save(&store).unwrap();
        assert_eq!(description.records, 3);
        assert!(description.size > 0);

        let restored = MemoryStore::default();
        assert_eq!(snapshots.load_into(&restored).unwrap(), 3);
        assert_eq!(restored.all(), store.all());
        assert!(restored.contains_hash("hash-1"));
    }

    #[test]
    fn test_missing_snapshot_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let snapshots = SnapshotStore::new(temp_dir.path()).unwrap();
        assert!(snapshots.load().unwrap().is_none());
        assert_eq!(snapshots.load_into(&MemoryStore::default()).unwrap(), 0);
    }

    #[test]
    fn test_corrupted_snapshot_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let snapshots = SnapshotStore::new(temp_dir.path()).unwrap();
        snapshots.save(&sample_store()).unwrap();

        let mut bytes = fs::read(snapshots.snapshot_path()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(snapshots.snapshot_path(), bytes).unwrap();

        assert!(snapshots.load().is_err());
    }

    #[test]
    fn test_save_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let snapshots = SnapshotStore::new(temp_dir.path()).unwrap();
        snapshots.save(&MemoryStore::default()).unwrap();
        snapshots.save(&sample_store()).unwrap();

        let data = snapshots.load().unwrap().unwrap();
        assert_eq!(data.records.len(), 3);
    }

    #[test]
    fn test_concurrent_saves_stay_consistent() {
        let temp_dir = TempDir::new().unwrap();
        let snapshots = SnapshotStore::new(temp_dir.path()).unwrap();
        let small = MemoryStore::default();
        let large = sample_store();

        for _ in 0..50 {
            std::thread::scope(|s| {
                s.spawn(|| snapshots.save(&small).unwrap());
                s.spawn(|| snapshots.save(&large).unwrap());
            });
            let data = snapshots.load().unwrap().unwrap();
            assert!(data.records.is_empty() || data.records.len() == 3);
        }
    }
}
