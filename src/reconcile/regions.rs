//! Region assignment by nearest centroid.
//!
//! Policy: distance is the planar proxy `Δlat² + Δlon²` in degrees, and a
//! record only takes the nearest region when that value is below
//! [`REGION_THRESHOLD_SQ_DEG`]. This is a coarse approximation of containment,
//! not a point-in-polygon test, and records near borders can land in a
//! neighbouring region.

use super::types::{LocationRecord, RegionCentroid};
use crate::geo::{squared_degree_distance, GeoPoint};
use crate::spatial::GridIndex;
use serde::Serialize;

/// Squared-degree cutoff, roughly 10° in each axis. Fixed, no latitude correction.
pub const REGION_THRESHOLD_SQ_DEG: f64 = 100.0;

/// Cell size matched to the threshold so one ring of cells covers it.
const CENTROID_CELL_DEG: f64 = 10.0;
const _: () = assert!(CENTROID_CELL_DEG > 0.0 && CENTROID_CELL_DEG <= 180.0);

/// Counts from one assignment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssignStats {
    /// Newly assigned in this pass.
    pub assigned: usize,
    /// Already carried a region and were left alone.
    pub preassigned: usize,
    /// No centroid within the threshold.
    pub unassigned: usize,
}

/// Nearest-centroid lookup over a fixed set of regions.
#[derive(Debug, Clone)]
pub struct RegionAssigner {
    index: GridIndex<String>,
    reach: u32,
}

impl RegionAssigner {
    pub fn new(centroids: &[RegionCentroid]) -> Self {
        let mut index = GridIndex::with_cell_size(CENTROID_CELL_DEG);
        for c in centroids {
            index.insert(c.centroid, c.region_id.clone());
        }
        // Any centroid under the threshold differs by < 10° on both axes.
        let reach = (REGION_THRESHOLD_SQ_DEG.sqrt() / index.cell_size_deg()).ceil() as u32;
        Self { index, reach }
    }

    pub fn region_count(&self) -> usize {
        self.index.len()
    }

    /// Nearest region under the threshold with its squared-degree distance.
    ///
    /// Equal distances resolve to the lexicographically smallest region id,
    /// so the answer does not depend on centroid order.
    pub fn nearest(&self, point: GeoPoint) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        self.index.visit_block(point, self.reach, |entity| {
            let d = squared_degree_distance(point, entity.point());
            let id = entity.payload().as_str();
            let better = match best {
                None => true,
                Some((best_id, best_d)) => d < best_d || (d == best_d && id < best_id),
            };
            if better {
                best = Some((id, d));
            }
        });
        best.filter(|(_, d)| *d < REGION_THRESHOLD_SQ_DEG)
    }

    /// Fill `region_id` on every record that lacks one. Existing regions are
    /// never touched.
    pub fn assign(&self, records: &mut [LocationRecord]) -> AssignStats {
        let mut stats = AssignStats::default();
        if self.index.is_empty() {
            tracing::debug!("no region centroids; skipping region assignment");
        }

        for record in records.iter_mut() {
            if record.region_id.is_some() {
                stats.preassigned += 1;
                continue;
            }
            match self.nearest(record.coordinates) {
                Some((region, _)) => {
                    record.region_id = Some(region.to_string());
                    stats.assigned += 1;
                }
                None => stats.unassigned += 1,
            }
        }

        tracing::info!(
            assigned = stats.assigned,
            preassigned = stats.preassigned,
            unassigned = stats.unassigned,
            regions = self.index.len(),
            "region assignment complete"
        );
        stats
    }
}

/// Assign regions to `records` from `centroids` in one call.
pub fn assign_regions(records: &mut [LocationRecord], centroids: &[RegionCentroid]) -> AssignStats {
    RegionAssigner::new(centroids).assign(records)
}
