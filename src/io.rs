//! JSON files at the pipeline boundary: processed source records in,
//! reconciled records out.

use crate::reconcile::{LocationRecord, RegionRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("Cannot access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, IoError> {
    let data = fs::read_to_string(path).map_err(|source| IoError::File { path: path.to_path_buf(), source })?;
    serde_json::from_str(&data).map_err(|source| IoError::Json { path: path.to_path_buf(), source })
}

/// Read a JSON array of location records. Invalid coordinates fail the file.
pub fn read_records(path: &Path) -> Result<Vec<LocationRecord>, IoError> {
    let records: Vec<LocationRecord> = read_json(path)?;
    tracing::debug!(path = %path.display(), count = records.len(), "read location records");
    Ok(records)
}

/// Read a JSON array of region records (e.g. `provinces.json`).
pub fn read_regions(path: &Path) -> Result<Vec<RegionRecord>, IoError> {
    read_json(path)
}

/// Write pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), IoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| IoError::File { path: parent.to_path_buf(), source })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| IoError::Json { path: path.to_path_buf(), source })?;
    fs::write(path, json).map_err(|source| IoError::File { path: path.to_path_buf(), source })
}
