// Model exports
pub mod domain;
pub mod query_params;
pub mod requests;
pub mod responses;
pub mod rows;

pub use domain::{
    split_legacy_names, ArchitectMembers, BoundingBox, Building, CompositeArchitect, FilterFragment,
    FilterState, GeoPoint, HistoryKind, IndividualArchitect, Language, Photo, SearchHistoryEntry,
    SearchPage,
};
pub use requests::{LanguageQuery, RecordHistoryRequest, SearchOptions};
pub use responses::{BuildingArchitects, ErrorResponse, HealthResponse, HistoryResponse, SearchResponse};
pub use rows::{BuildingRow, CompositeRow, CompositionRow, CreditRow, PhotoRow, RawNumber, RowPage};
