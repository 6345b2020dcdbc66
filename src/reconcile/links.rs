//! Coordinate-based cross-source linking.
//!
//! Reports pairs of records from different sources that sit within a small
//! radius of each other. Links are advisory: nothing is merged, since ids
//! stay authoritative.

use super::types::LocationRecord;
use crate::geo::{distance_km, GeoError, GeoPoint};
use crate::spatial::GridIndex;
use serde::Serialize;

/// Two records from different sources within the link radius. `a < b`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityLink {
    pub a: String,
    pub b: String,
    pub distance_km: f64,
}

/// Spatial lookups over a reconciled record set.
pub struct ProximityLinker<'r> {
    records: &'r [LocationRecord],
    index: GridIndex<usize>,
}

impl<'r> ProximityLinker<'r> {
    /// Index `records` by coordinates. The index holds exactly these records.
    pub fn new(records: &'r [LocationRecord], cell_size_deg: f64) -> Result<Self, GeoError> {
        let mut index = GridIndex::new(cell_size_deg)?;
        for (i, record) in records.iter().enumerate() {
            index.insert(record.coordinates, i);
        }
        Ok(Self { records, index })
    }

    /// Closest record strictly within `max_distance_km`, with its distance.
    pub fn nearest_location(&self, point: GeoPoint, max_distance_km: f64) -> Option<(&'r LocationRecord, f64)> {
        self.index.find_nearest(point, max_distance_km).map(|hit| {
            let record = &self.records[*hit.payload()];
            (record, distance_km(point, record.coordinates))
        })
    }

    /// Every record within `radius_km`, nearest first (ties by id).
    pub fn within(&self, point: GeoPoint, radius_km: f64) -> Vec<(&'r LocationRecord, f64)> {
        let mut found: Vec<(&'r LocationRecord, f64)> = self
            .index
            .find_within(point, radius_km)
            .into_iter()
            .map(|hit| {
                let record = &self.records[*hit.payload()];
                (record, distance_km(point, record.coordinates))
            })
            .collect();
        found.sort_by(|x, y| x.1.total_cmp(&y.1).then_with(|| x.0.id.cmp(&y.0.id)));
        found
    }

    /// All cross-source pairs within `radius_km`, sorted by `(a, b)`.
    pub fn links(&self, radius_km: f64) -> Vec<ProximityLink> {
        let mut links = Vec::new();
        for (i, record) in self.records.iter().enumerate() {
            for hit in self.index.find_within(record.coordinates, radius_km) {
                let j = *hit.payload();
                // each unordered pair once
                if j <= i {
                    continue;
                }
                let other = &self.records[j];
                if other.source_prefix() == record.source_prefix() {
                    continue;
                }
                let (a, b) = if record.id <= other.id { (record, other) } else { (other, record) };
                links.push(ProximityLink {
                    a: a.id.clone(),
                    b: b.id.clone(),
                    distance_km: distance_km(a.coordinates, b.coordinates),
                });
            }
        }
        links.sort_by(|x, y| (&x.a, &x.b).cmp(&(&y.a, &y.b)));
        tracing::info!(links = links.len(), radius_km, "proximity linking complete");
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, lat: f64, lon: f64) -> LocationRecord {
        LocationRecord::new(id, GeoPoint::new(lat, lon).unwrap())
    }

    fn sample() -> Vec<LocationRecord> {
        vec![
            rec("orbis_50", 41.8920, 12.4855),
            rec("pleiades_423025", 41.8919, 12.4853),
            rec("pleiades_423026", 41.8925, 12.4860),
            rec("topostext_ttp1", 41.8918, 12.4850),
            rec("pleiades_433032", 40.7509, 14.4869),
        ]
    }

    #[test]
    fn test_links_cross_source_only() {
        let records = sample();
        let linker = ProximityLinker::new(&records, 1.0).unwrap();
        let pairs: Vec<(String, String)> = linker.links(0.5).into_iter().map(|l| (l.a, l.b)).collect();
        assert_eq!(
            pairs,
            vec![
                ("orbis_50".to_string(), "pleiades_423025".to_string()),
                ("orbis_50".to_string(), "pleiades_423026".to_string()),
                ("orbis_50".to_string(), "topostext_ttp1".to_string()),
                ("pleiades_423025".to_string(), "topostext_ttp1".to_string()),
                ("pleiades_423026".to_string(), "topostext_ttp1".to_string()),
            ]
        );
    }

    #[test]
    fn test_link_distance_recorded() {
        let records = vec![rec("a_1", 0.0, 0.0), rec("b_1", 0.0, 0.001)];
        let linker = ProximityLinker::new(&records, 1.0).unwrap();
        let links = linker.links(1.0);
        assert_eq!(links.len(), 1);
        assert!((links[0].distance_km - 0.111).abs() < 0.001);
    }

    #[test]
    fn test_nearest_location() {
        let records = sample();
        let linker = ProximityLinker::new(&records, 1.0).unwrap();
        let (hit, d) = linker.nearest_location(GeoPoint::new(40.75, 14.48).unwrap(), 10.0).unwrap();
        assert_eq!(hit.id, "pleiades_433032");
        assert!(d < 1.0);
        assert!(linker.nearest_location(GeoPoint::new(0.0, 0.0).unwrap(), 100.0).is_none());
    }

    #[test]
    fn test_within_sorted_by_distance() {
        let records = sample();
        let linker = ProximityLinker::new(&records, 1.0).unwrap();
        let found = linker.within(GeoPoint::new(41.8919, 12.4853).unwrap(), 1.0);
        assert_eq!(found.len(), 4);
        assert_eq!(found[0].0.id, "pleiades_423025");
        assert_eq!(found[0].1, 0.0);
        assert!(found.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_invalid_cell_size() {
        assert!(ProximityLinker::new(&[], 0.0).is_err());
    }
}
