// Core algorithm exports
pub mod architects;
pub mod debounce;
pub mod distance;
pub mod engine;
pub mod error;
pub mod filters;
pub mod geo;
pub mod history;
pub mod pagination;
pub mod planner;
pub mod transform;

pub use architects::{ArchitectIndex, ArchitectNameResolver};
pub use debounce::{Debouncer, LiveFilter};
pub use distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box};
pub use engine::{EngineOptions, SearchEngine};
pub use error::SearchError;
pub use filters::{filter_buildings, search_local};
pub use geo::{BoundingBoxStrategy, GeoProximitySearch, ProximityRequest, ProximityStrategy, RankedStrategy};
pub use history::SearchHistory;
pub use pagination::{page_range, total_pages, PageItem};
pub use planner::{build_plan, Clause, QueryPlan, QueryPlanner};
pub use transform::{transform_row, transform_rows, TransformError};
