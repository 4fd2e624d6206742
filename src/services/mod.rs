// Service exports
pub mod cache;
pub mod history;
pub mod memory;
pub mod rest;
pub mod snapshot;
pub mod store;

pub use cache::{CacheManager, CacheKey, CacheError, CacheStats};
pub use history::{HistoryError, HistoryRepository, HistoryStore};
pub use memory::{MemoryStore, RankingMode};
pub use rest::{RestStore, RestTables};
pub use snapshot::{load_rows, SnapshotError};
pub use store::{BuildingStore, DistanceRankParams, StoreError};
