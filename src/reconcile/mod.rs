//! Cross-source entity reconciliation.
//!
//! Identifier-based dedup with a first-non-null-wins field merge, region
//! assignment by nearest centroid, and coordinate-based proximity links.

pub mod links;
pub mod merge;
pub mod regions;
pub mod types;

pub use links::{ProximityLink, ProximityLinker};
pub use merge::{deduplicate, merge_into, Deduplicator, MergeOutcome};
pub use regions::{assign_regions, AssignStats, RegionAssigner, REGION_THRESHOLD_SQ_DEG};
pub use types::{centroids_from_regions, LocationRecord, RegionCentroid, RegionRecord};
