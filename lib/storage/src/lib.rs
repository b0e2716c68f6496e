pub mod memory;
pub mod snapshot;
pub mod store;

pub use memory::{BackfillReport, MemoryStore, StoreConfig};
pub use snapshot::{SnapshotData, SnapshotDescription, SnapshotStore};
pub use store::CandidateStore;
