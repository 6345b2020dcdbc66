//! Roma Reconcile: spatial indexing and entity resolution for geo-historical
//! gazetteers.
//!
//! Source parsers produce [`LocationRecord`]s; the [`Aggregator`] merges them by
//! id in source-priority order and assigns each record to the region whose
//! centroid is nearest, using the [`GridIndex`] for lookups.

pub mod aggregate;
pub mod config;
pub mod geo;
pub mod io;
pub mod reconcile;
pub mod spatial;
pub mod validation;

pub use aggregate::{Aggregate, AggregateReport, Aggregator, RecordFilter, SourceBatch};
pub use config::Config;
pub use geo::{distance_km, GeoError, GeoPoint};
pub use reconcile::{LocationRecord, RegionCentroid};
pub use spatial::GridIndex;
