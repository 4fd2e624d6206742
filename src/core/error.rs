use std::time::Duration;
use thiserror::Error;

use crate::services::store::StoreError;

/// Query-level failures surfaced to callers
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Backend error: {0}")]
    Backend(#[from] StoreError),

    #[error("Distance ranking timed out after {0:?}")]
    Timeout(Duration),
}
