use std::path::Path;
use thiserror::Error;

use crate::models::BuildingRow;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read a JSON array of building rows (the same shape the REST backend returns)
pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<BuildingRow>, SnapshotError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let rows: Vec<BuildingRow> = serde_json::from_slice(&bytes)?;
    tracing::info!("Loaded {} buildings from {}", rows.len(), path.display());
    Ok(rows)
}
