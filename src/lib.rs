//! Archi Search - faceted search and geo-ranking over the architecture building catalogue
//!
//! Resolves architect names through the composite/individual hierarchy, plans
//! backend queries from filter state, ranks buildings around a point (with a
//! bounding-box fallback), and mirrors the same filter semantics in memory.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    distance::{calculate_bounding_box, haversine_distance},
    EngineOptions, SearchEngine, SearchError,
};
pub use crate::models::{Building, FilterState, GeoPoint, Language, SearchPage};
pub use crate::services::{BuildingStore, MemoryStore, RestStore};
