//! Record shapes consumed and produced by reconciliation.

use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A normalized location from one source.
///
/// On the wire the record is flat: `id`, `latitude`, `longitude`,
/// `region_id` and any other attributes side by side. A legacy `province_id`
/// is read as the region when `region_id` is missing or null, and is always
/// written back as `region_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireLocationRecord")]
pub struct LocationRecord {
    pub id: String,
    #[serde(flatten)]
    pub coordinates: GeoPoint,
    pub region_id: Option<String>,
    /// Named optional attributes (names, temporal bounds, confidence, refs).
    /// A JSON `null` counts as absent.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct WireLocationRecord {
    id: String,
    #[serde(flatten)]
    coordinates: GeoPoint,
    #[serde(default)]
    region_id: Option<String>,
    #[serde(default)]
    province_id: Option<String>,
    #[serde(flatten)]
    attributes: BTreeMap<String, Value>,
}

impl From<WireLocationRecord> for LocationRecord {
    fn from(wire: WireLocationRecord) -> Self {
        Self {
            id: wire.id,
            coordinates: wire.coordinates,
            region_id: wire.region_id.or(wire.province_id),
            attributes: wire.attributes,
        }
    }
}

impl LocationRecord {
    pub fn new(id: impl Into<String>, coordinates: GeoPoint) -> Self {
        Self {
            id: id.into(),
            coordinates,
            region_id: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_region(mut self, region_id: impl Into<String>) -> Self {
        self.region_id = Some(region_id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Attribute value, treating JSON `null` as missing.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    pub fn str_attribute(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(Value::as_str)
    }

    /// Integer year. Whole-number floats such as `-753.0` count too.
    pub fn year_attribute(&self, key: &str) -> Option<i64> {
        let value = self.attribute(key)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|y| y.is_finite() && y.fract() == 0.0 && y.abs() < i64::MAX as f64)
                .map(|y| y as i64)
        })
    }

    /// Namespace of the id: the part before the first `:`, or before the
    /// first `_` for ids like `pleiades_423025`.
    pub fn source_prefix(&self) -> &str {
        let cut = self.id.find(':').or_else(|| self.id.find('_'));
        match cut {
            Some(i) => &self.id[..i],
            None => &self.id,
        }
    }
}

/// Region id plus centroid, used only for nearest-centroid lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCentroid {
    pub region_id: String,
    pub centroid: GeoPoint,
}

impl RegionCentroid {
    pub fn new(region_id: impl Into<String>, centroid: GeoPoint) -> Self {
        Self {
            region_id: region_id.into(),
            centroid,
        }
    }
}

/// An administrative region as emitted by boundary sources (e.g. AWMC
/// provinces). Only the fields needed to derive a centroid are typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub id: String,
    #[serde(default)]
    pub centroid_lat: Option<f64>,
    #[serde(default)]
    pub centroid_lon: Option<f64>,
    #[serde(default)]
    pub start_year: Option<i64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RegionRecord {
    /// The centroid, if both coordinates are present and valid.
    pub fn centroid(&self) -> Option<GeoPoint> {
        GeoPoint::new(self.centroid_lat?, self.centroid_lon?).ok()
    }
}

/// Project region records to centroids, ordered by `(start_year, id)`.
/// Regions without a usable centroid are skipped.
pub fn centroids_from_regions(regions: &[RegionRecord]) -> Vec<RegionCentroid> {
    let mut ordered: Vec<&RegionRecord> = regions.iter().collect();
    ordered.sort_by(|a, b| {
        (a.start_year.unwrap_or(0), &a.id).cmp(&(b.start_year.unwrap_or(0), &b.id))
    });

    ordered
        .into_iter()
        .filter_map(|region| match region.centroid() {
            Some(centroid) => Some(RegionCentroid::new(region.id.clone(), centroid)),
            None => {
                tracing::debug!(region = %region.id, "skipping region without a valid centroid");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_record_from_flat_json() {
        let rec: LocationRecord = serde_json::from_value(json!({
            "id": "pleiades_423025",
            "name_latin": "Roma",
            "type": "city",
            "latitude": 41.8919,
            "longitude": 12.4853,
            "founding_year": -753,
            "province_id": null,
            "wikidata_id": null
        }))
        .unwrap();

        assert_eq!(rec.id, "pleiades_423025");
        assert_eq!(rec.coordinates, p(41.8919, 12.4853));
        assert_eq!(rec.region_id, None);
        assert_eq!(rec.str_attribute("name_latin"), Some("Roma"));
        assert_eq!(rec.year_attribute("founding_year"), Some(-753));
        assert!(rec.attribute("wikidata_id").is_none());
        assert!(!rec.attributes.contains_key("latitude"));
    }

    #[test]
    fn test_record_with_region_and_province_ids() {
        let both: LocationRecord = serde_json::from_value(json!({
            "id": "x", "latitude": 41.0, "longitude": 12.0, "province_id": null, "region_id": "italia"
        }))
        .unwrap();
        assert_eq!(both.region_id.as_deref(), Some("italia"));
        assert!(both.attributes.is_empty());

        let legacy: LocationRecord = serde_json::from_value(json!({
            "id": "y", "latitude": 41.0, "longitude": 12.0, "province_id": "awmc_ce_117_0"
        }))
        .unwrap();
        assert_eq!(legacy.region_id.as_deref(), Some("awmc_ce_117_0"));
        let v = serde_json::to_value(&legacy).unwrap();
        assert_eq!(v["region_id"], json!("awmc_ce_117_0"));
        assert!(v.get("province_id").is_none());

        let preferred: LocationRecord = serde_json::from_value(json!({
            "id": "z", "latitude": 41.0, "longitude": 12.0,
            "province_id": "awmc_ce_117_0", "region_id": "italia"
        }))
        .unwrap();
        assert_eq!(preferred.region_id.as_deref(), Some("italia"));
    }

    #[test]
    fn test_year_attribute_accepts_whole_floats() {
        let rec = LocationRecord::new("p_1", p(41.9, 12.5))
            .with_attribute("founding_year", -753.0)
            .with_attribute("destruction_year", 79)
            .with_attribute("half_year", 79.5)
            .with_attribute("label_year", "79");
        assert_eq!(rec.year_attribute("founding_year"), Some(-753));
        assert_eq!(rec.year_attribute("destruction_year"), Some(79));
        assert_eq!(rec.year_attribute("half_year"), None);
        assert_eq!(rec.year_attribute("label_year"), None);
        assert_eq!(rec.year_attribute("missing"), None);
    }

    #[test]
    fn test_record_rejects_bad_coordinates() {
        let bad = serde_json::from_value::<LocationRecord>(json!({
            "id": "orbis_1", "latitude": 12.0, "longitude": 212.0
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_record_serializes_flat() {
        let rec = LocationRecord::new("orbis_50", p(40.75, 14.49))
            .with_region("awmc_ce_117_3")
            .with_attribute("name_latin", "Pompeii");
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["latitude"], json!(40.75));
        assert_eq!(v["region_id"], json!("awmc_ce_117_3"));
        assert_eq!(v["name_latin"], json!("Pompeii"));

        let back: LocationRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn test_source_prefix() {
        let at = p(0.0, 0.0);
        assert_eq!(LocationRecord::new("pleiades_423025", at).source_prefix(), "pleiades");
        assert_eq!(LocationRecord::new("topostext:ttp_1", at).source_prefix(), "topostext");
        assert_eq!(LocationRecord::new("bare", at).source_prefix(), "bare");
    }

    #[test]
    fn test_centroids_from_regions() {
        let regions: Vec<RegionRecord> = serde_json::from_value(json!([
            {"id": "awmc_ce_200_2", "start_year": 200, "centroid_lat": 38.0, "centroid_lon": 23.7},
            {"id": "awmc_bce_60_0", "start_year": -60, "centroid_lat": 41.5, "centroid_lon": 12.5},
            {"id": "awmc_ce_200_1", "start_year": 200, "centroid_lat": null, "centroid_lon": 30.0},
            {"id": "awmc_ce_117_0", "start_year": 117, "centroid_lat": 95.0, "centroid_lon": 30.0},
            {"id": "awmc_ce_200_0", "start_year": 200, "centroid_lat": 31.0, "centroid_lon": 31.0,
             "name": "Aegyptus"}
        ]))
        .unwrap();

        let ids: Vec<String> = centroids_from_regions(&regions).into_iter().map(|c| c.region_id).collect();
        assert_eq!(ids, vec!["awmc_bce_60_0", "awmc_ce_200_0", "awmc_ce_200_2"]);
    }
}
