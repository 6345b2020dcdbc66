//! Record aggregation across sources.
//!
//! Sources are merged strictly in the order given (highest priority first),
//! then the result is sorted by id and passed through region assignment.

use crate::reconcile::{
    AssignStats, Deduplicator, LocationRecord, MergeOutcome, RegionAssigner, RegionCentroid,
};
use serde::Serialize;

/// One source's normalized records.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: String,
    pub records: Vec<LocationRecord>,
}

impl SourceBatch {
    pub fn new(source: impl Into<String>, records: Vec<LocationRecord>) -> Self {
        Self {
            source: source.into(),
            records,
        }
    }
}

/// Reorder batches to follow `priority`. Batches for sources not listed keep
/// their relative order and go last.
pub fn order_by_priority(mut batches: Vec<SourceBatch>, priority: &[String]) -> Vec<SourceBatch> {
    batches.sort_by_key(|b| {
        priority
            .iter()
            .position(|s| *s == b.source)
            .unwrap_or(priority.len())
    });
    batches
}

/// Record-level inclusion rules: bounding box, time window, location type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    /// `[min_lon, min_lat, max_lon, max_lat]`, inclusive.
    pub bbox: Option<[f64; 4]>,
    /// `(start_year, end_year)`, negative years are BCE.
    pub time_range: Option<(i64, i64)>,
    pub location_types: Option<Vec<String>>,
}

impl RecordFilter {
    pub fn accepts(&self, record: &LocationRecord) -> bool {
        if let Some([min_lon, min_lat, max_lon, max_lat]) = self.bbox {
            let (lat, lon) = (record.coordinates.latitude(), record.coordinates.longitude());
            if !(min_lon <= lon && lon <= max_lon && min_lat <= lat && lat <= max_lat) {
                return false;
            }
        }

        if let Some((start, end)) = self.time_range {
            // Unknown bounds never exclude.
            if record.year_attribute("founding_year").is_some_and(|y| y > end) {
                return false;
            }
            if record.year_attribute("destruction_year").is_some_and(|y| y < start) {
                return false;
            }
        }

        if let Some(types) = &self.location_types {
            match record.str_attribute("type") {
                Some(t) if types.iter().any(|allowed| allowed == t) => {}
                _ => return false,
            }
        }

        true
    }
}

/// Per-source counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub source: String,
    pub received: usize,
    pub inserted: usize,
    pub merged: usize,
    pub filtered: usize,
    pub conflicts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    pub sources: Vec<SourceStats>,
    pub total: usize,
    pub regions: AssignStats,
}

/// Aggregated, sorted, region-assigned records.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub records: Vec<LocationRecord>,
    pub report: AggregateReport,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    filter: RecordFilter,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: RecordFilter) -> Self {
        Self { filter }
    }

    /// Merge `batches` in the given priority order, sort by id, assign regions.
    pub fn aggregate(
        &self,
        batches: impl IntoIterator<Item = SourceBatch>,
        centroids: &[RegionCentroid],
    ) -> Aggregate {
        let mut dedup = Deduplicator::new();
        let mut sources = Vec::new();

        for batch in batches {
            let mut stats = SourceStats {
                source: batch.source.clone(),
                received: batch.records.len(),
                ..SourceStats::default()
            };

            for record in batch.records {
                if !self.filter.accepts(&record) {
                    stats.filtered += 1;
                    continue;
                }
                let id = record.id.clone();
                match dedup.push(record) {
                    MergeOutcome::Inserted => stats.inserted += 1,
                    MergeOutcome::Merged { conflicts } => {
                        stats.merged += 1;
                        if !conflicts.is_empty() {
                            stats.conflicts += 1;
                            tracing::debug!(
                                source = %stats.source,
                                id = %id,
                                fields = ?conflicts,
                                "kept earlier values for conflicting fields"
                            );
                        }
                    }
                }
            }

            tracing::info!(
                source = %stats.source,
                received = stats.received,
                inserted = stats.inserted,
                merged = stats.merged,
                filtered = stats.filtered,
                "source aggregated"
            );
            sources.push(stats);
        }

        let mut records = dedup.into_records();
        records.sort_by(|a, b| a.id.cmp(&b.id));

        let regions = RegionAssigner::new(centroids).assign(&mut records);
        let report = AggregateReport {
            sources,
            total: records.len(),
            regions,
        };
        tracing::info!(total = report.total, "aggregation complete");

        Aggregate { records, report }
    }
}
