//! Pipeline configuration: JSON file at `~/.config/roma/config.json` (or an
//! explicit path), overridden by `ROMA_*` environment variables.
//!
//! A missing file means defaults. A present but malformed file is an error.

use crate::aggregate::{order_by_priority, RecordFilter, SourceBatch};
use crate::reconcile::LocationRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Every source the pipeline knows about.
pub const ALL_SOURCES: &[&str] = &["pleiades", "awmc", "itinere", "wikidata", "orbis", "topostext"];

/// Location sources in default merge priority.
const DEFAULT_SOURCES: &[&str] = &["pleiades", "orbis", "topostext"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid data source '{0}'. Valid: {}", ALL_SOURCES.join(", "))]
    UnknownSource(String),
    #[error("Source '{name}' is not enabled. Enabled sources: {enabled}")]
    SourceNotEnabled { name: String, enabled: String },
    #[error("Data source '{0}' listed twice")]
    DuplicateSource(String),
    #[error("Invalid time range: start ({0}) > end ({1})")]
    TimeRange(i64, i64),
    #[error("Invalid bbox: {0}")]
    Bbox(String),
    #[error("Invalid value for {name}: {value}")]
    Value { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sources in merge priority order; earlier wins field conflicts.
    pub sources: Vec<String>,
    /// Grid cell size for location lookups, degrees.
    pub cell_size_deg: f64,
    /// Radius for cross-source proximity links, km.
    pub link_radius_km: f64,
    pub time_range: Option<(i64, i64)>,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bbox: Option<[f64; 4]>,
    pub location_types: Option<Vec<String>>,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            cell_size_deg: 1.0,
            link_radius_km: 0.5,
            time_range: None,
            bbox: None,
            location_types: None,
            verbose: false,
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("roma")
            .join("config.json")
    }

    /// Load from `path`, or the default path when `None`. Then apply the
    /// process environment and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let mut config = Self::read_file(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path: path.to_path_buf(), source }),
        };
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Apply overrides from an environment lookup.
    ///
    /// `ROMA_SOURCES` (comma-separated), `ROMA_TIME_START` + `ROMA_TIME_END`
    /// (both required), `ROMA_VERBOSE` (`1`/`true`/`yes`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(sources) = lookup("ROMA_SOURCES") {
            self.sources = sources
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let (Some(start), Some(end)) = (lookup("ROMA_TIME_START"), lookup("ROMA_TIME_END")) {
            self.time_range = Some((parse_year("ROMA_TIME_START", &start)?, parse_year("ROMA_TIME_END", &end)?));
        }

        if let Some(verbose) = lookup("ROMA_VERBOSE") {
            self.verbose = matches!(verbose.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, source) in self.sources.iter().enumerate() {
            if !ALL_SOURCES.contains(&source.as_str()) {
                return Err(ConfigError::UnknownSource(source.clone()));
            }
            if self.sources[..i].contains(source) {
                return Err(ConfigError::DuplicateSource(source.clone()));
            }
        }

        if let Some((start, end)) = self.time_range {
            if start > end {
                return Err(ConfigError::TimeRange(start, end));
            }
        }

        if let Some([min_lon, min_lat, max_lon, max_lat]) = self.bbox {
            if min_lon > max_lon {
                return Err(ConfigError::Bbox(format!("min_lon ({}) > max_lon ({})", min_lon, max_lon)));
            }
            if min_lat > max_lat {
                return Err(ConfigError::Bbox(format!("min_lat ({}) > max_lat ({})", min_lat, max_lat)));
            }
        }

        if !(self.cell_size_deg.is_finite() && self.cell_size_deg > 0.0) {
            return Err(ConfigError::Value { name: "cell_size_deg", value: self.cell_size_deg.to_string() });
        }
        if !(self.link_radius_km.is_finite() && self.link_radius_km > 0.0) {
            return Err(ConfigError::Value { name: "link_radius_km", value: self.link_radius_km.to_string() });
        }
        Ok(())
    }

    /// Wrap loaded `(source, records)` pairs into batches in merge priority
    /// order. Every source must be enabled in [`Config::sources`].
    pub fn select_batches(
        &self,
        loaded: Vec<(String, Vec<LocationRecord>)>,
    ) -> Result<Vec<SourceBatch>, ConfigError> {
        let mut batches = Vec::with_capacity(loaded.len());
        for (name, records) in loaded {
            if !self.sources.contains(&name) {
                return Err(ConfigError::SourceNotEnabled {
                    name,
                    enabled: self.sources.join(", "),
                });
            }
            batches.push(SourceBatch::new(name, records));
        }
        Ok(order_by_priority(batches, &self.sources))
    }

    pub fn record_filter(&self) -> RecordFilter {
        RecordFilter {
            bbox: self.bbox,
            time_range: self.time_range,
            location_types: self.location_types.clone(),
        }
    }
}

fn parse_year(name: &'static str, value: &str) -> Result<i64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Value { name, value: value.to_string() })
}
