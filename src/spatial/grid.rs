//! Grid-bucket spatial index.
//!
//! Entities are bucketed by `(floor(lat / cell), floor(lon / cell))`. Queries
//! visit a ring of cells around the query point sized from the search radius
//! at 111 km per degree plus one extra cell, widen the longitude span for the
//! query latitude, wrap across the antimeridian and fall back to a full
//! latitude band when the search circle reaches a pole. Every visited entity is
//! checked with exact haversine distance, so the ring only has to be a superset.

use crate::geo::{distance_km, GeoError, GeoPoint, KM_PER_DEGREE};
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Integer cell coordinates: `(row, column)`.
pub type CellKey = (i64, i64);

/// An entity stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntity<T> {
    point: GeoPoint,
    payload: T,
    seq: u64,
}

impl<T> IndexedEntity<T> {
    pub fn point(&self) -> GeoPoint {
        self.point
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Insertion order, starting at 0. Used only to break distance ties.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Grid-accelerated nearest-neighbor and radius index.
///
/// Single writer: populate with [`insert`](Self::insert), then query.
#[derive(Debug, Clone)]
pub struct GridIndex<T> {
    cell_size_deg: f64,
    cells: HashMap<CellKey, Vec<IndexedEntity<T>>>,
    next_seq: u64,
}

impl<T> Default for GridIndex<T> {
    fn default() -> Self {
        Self {
            cell_size_deg: Self::DEFAULT_CELL_SIZE_DEG,
            cells: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T> GridIndex<T> {
    /// One degree, roughly 111 km at the equator.
    pub const DEFAULT_CELL_SIZE_DEG: f64 = 1.0;

    /// Create an empty index. `cell_size_deg` must be finite and positive.
    pub fn new(cell_size_deg: f64) -> Result<Self, GeoError> {
        if !(cell_size_deg.is_finite() && cell_size_deg > 0.0) {
            return Err(GeoError::InvalidCellSize(cell_size_deg));
        }
        Ok(Self::with_cell_size(cell_size_deg))
    }

    /// Create an empty index from a cell size already checked by the caller,
    /// e.g. a crate constant guarded by a `const` assertion.
    pub(crate) fn with_cell_size(cell_size_deg: f64) -> Self {
        debug_assert!(cell_size_deg.is_finite() && cell_size_deg > 0.0);
        Self {
            cell_size_deg,
            ..Self::default()
        }
    }

    pub fn cell_size_deg(&self) -> f64 {
        self.cell_size_deg
    }

    /// Number of entities inserted.
    pub fn len(&self) -> usize {
        self.next_seq as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next_seq == 0
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// All entities, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexedEntity<T>> {
        self.cells.values().flatten()
    }

    /// Cell containing `point`.
    pub fn cell_key(&self, point: GeoPoint) -> CellKey {
        (
            (point.latitude() / self.cell_size_deg).floor() as i64,
            (point.longitude() / self.cell_size_deg).floor() as i64,
        )
    }

    /// Append an entity to its cell and return its insertion sequence number.
    /// Duplicate coordinates are allowed.
    pub fn insert(&mut self, point: GeoPoint, payload: T) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        let key = self.cell_key(point);
        self.cells
            .entry(key)
            .or_default()
            .push(IndexedEntity { point, payload, seq });
        seq
    }

    /// Closest entity strictly within `max_distance_km`.
    ///
    /// Exact distance ties go to the entity inserted first.
    pub fn find_nearest(&self, point: GeoPoint, max_distance_km: f64) -> Option<&IndexedEntity<T>> {
        // Strict bound: nothing can be closer than 0 km.
        if !(max_distance_km > 0.0) {
            return None;
        }

        let mut best: Option<(f64, &IndexedEntity<T>)> = None;
        self.visit_ring(point, max_distance_km / KM_PER_DEGREE, |entity| {
            let d = distance_km(point, entity.point);
            if d >= max_distance_km {
                return;
            }
            let better = match best {
                None => true,
                Some((best_d, best_e)) => d < best_d || (d == best_d && entity.seq < best_e.seq),
            };
            if better {
                best = Some((d, entity));
            }
        });
        best.map(|(_, entity)| entity)
    }

    /// All entities with distance `<= radius_km`, unordered.
    pub fn find_within(&self, point: GeoPoint, radius_km: f64) -> Vec<&IndexedEntity<T>> {
        let mut found = Vec::new();
        if !(radius_km >= 0.0) {
            return found;
        }
        self.visit_ring(point, radius_km / KM_PER_DEGREE, |entity| {
            if distance_km(point, entity.point) <= radius_km {
                found.push(entity);
            }
        });
        found
    }

    /// Visit every entity in the `(2 * reach + 1)²` block of cells around
    /// `point`'s cell. Plain cell arithmetic: longitudes do not wrap.
    pub fn visit_block<'a>(&'a self, point: GeoPoint, reach: u32, mut visit: impl FnMut(&'a IndexedEntity<T>)) {
        let (row, col) = self.cell_key(point);
        let reach = i64::from(reach);
        for r in row - reach..=row + reach {
            for c in col - reach..=col + reach {
                if let Some(bucket) = self.cells.get(&(r, c)) {
                    bucket.iter().for_each(&mut visit);
                }
            }
        }
    }

    /// Visit a superset of the entities within `radius_deg` of `center`.
    fn visit_ring<'a>(&'a self, center: GeoPoint, radius_deg: f64, visit: impl FnMut(&'a IndexedEntity<T>)) {
        let (row, col) = self.cell_key(center);
        // radius plus one cell
        let reach = ((radius_deg / self.cell_size_deg).ceil() + 1.0) as i64;
        let rows = row.saturating_sub(reach)..=row.saturating_add(reach);

        let lat = center.latitude().abs();
        if lat + radius_deg >= 90.0 {
            // The circle covers a pole, so every longitude is in play.
            self.visit_occupied(|&(r, _): &CellKey| rows.contains(&r), visit);
            return;
        }

        // Widest longitude offset of a spherical cap of this radius.
        let half_span = (radius_deg.to_radians().sin() / lat.to_radians().cos())
            .min(1.0)
            .asin()
            .to_degrees();
        let columns = self.ring_columns(center.longitude(), half_span, col);

        let ring_cells = span_len(&rows).saturating_mul(columns.iter().map(span_len).sum());
        if ring_cells > self.cells.len() as u128 {
            self.visit_occupied(
                |&(r, c): &CellKey| rows.contains(&r) && columns.iter().any(|span| span.contains(&c)),
                visit,
            );
        } else {
            self.visit_cells(rows, &columns, visit);
        }
    }

    fn visit_cells<'a>(
        &'a self,
        rows: RangeInclusive<i64>,
        columns: &[RangeInclusive<i64>],
        mut visit: impl FnMut(&'a IndexedEntity<T>),
    ) {
        for r in rows {
            for span in columns {
                for c in span.clone() {
                    if let Some(bucket) = self.cells.get(&(r, c)) {
                        bucket.iter().for_each(&mut visit);
                    }
                }
            }
        }
    }

    /// Walk the occupied cells instead of the ring when the ring is larger.
    fn visit_occupied<'a>(&'a self, keep: impl Fn(&CellKey) -> bool, mut visit: impl FnMut(&'a IndexedEntity<T>)) {
        for (key, bucket) in &self.cells {
            if keep(key) {
                bucket.iter().for_each(&mut visit);
            }
        }
    }

    /// Disjoint column ranges covering `lon ± half_span` plus one cell on each
    /// side, wrapped at ±180°.
    fn ring_columns(&self, lon: f64, half_span: f64, col: i64) -> Vec<RangeInclusive<i64>> {
        let cell = self.cell_size_deg;
        let to_col = |deg: f64| (deg / cell).floor() as i64;
        let (west, east) = (lon - half_span, lon + half_span);

        let mut spans = vec![to_col(west).saturating_sub(1).min(col)..=to_col(east).saturating_add(1).max(col)];
        if west < -180.0 {
            spans.push(to_col(west + 360.0).saturating_sub(1)..=to_col(180.0));
        }
        if east > 180.0 {
            spans.push(to_col(-180.0)..=to_col(east - 360.0).saturating_add(1));
        }

        spans.sort_by_key(|span| *span.start());
        let mut merged: Vec<RangeInclusive<i64>> = Vec::with_capacity(spans.len());
        for span in spans {
            match merged.last_mut() {
                Some(last) if *span.start() <= last.end().saturating_add(1) => {
                    if span.end() > last.end() {
                        *last = *last.start()..=*span.end();
                    }
                }
                _ => merged.push(span),
            }
        }
        merged
    }
}

fn span_len(span: &RangeInclusive<i64>) -> u128 {
    (i128::from(*span.end()) - i128::from(*span.start()) + 1).max(0) as u128
}
