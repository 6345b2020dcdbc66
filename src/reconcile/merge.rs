//! Identifier-keyed deduplication.
//!
//! Merge rule: the first non-null value for a field wins; later non-null
//! values never overwrite it. The result depends on the order records are
//! fed in, so callers must use a fixed source priority.

use super::types::LocationRecord;
use std::collections::HashMap;

/// Fill the unset fields of `existing` from `incoming`.
///
/// Coordinates always stay those of `existing`. Returns the names of fields
/// where both sides held different non-null values (kept as in `existing`).
pub fn merge_into(existing: &mut LocationRecord, incoming: LocationRecord) -> Vec<String> {
    debug_assert_eq!(existing.id, incoming.id);
    let mut conflicts = Vec::new();

    if existing.coordinates != incoming.coordinates {
        conflicts.push("coordinates".to_string());
    }

    if let Some(other) = incoming.region_id {
        match existing.region_id.as_deref() {
            None => existing.region_id = Some(other),
            Some(current) if current != other => conflicts.push("region_id".to_string()),
            Some(_) => {}
        }
    }

    for (key, value) in incoming.attributes {
        if value.is_null() {
            continue;
        }
        match existing.attributes.get(&key) {
            Some(current) if !current.is_null() => {
                if *current != value {
                    conflicts.push(key);
                }
            }
            _ => {
                existing.attributes.insert(key, value);
            }
        }
    }

    conflicts
}

/// What happened to a record pushed into a [`Deduplicator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First time this id was seen.
    Inserted,
    /// Merged into an existing record; lists conflicting fields.
    Merged { conflicts: Vec<String> },
}

/// Accumulates records keyed by id, in first-seen order.
#[derive(Debug, Default)]
pub struct Deduplicator {
    positions: HashMap<String, usize>,
    records: Vec<LocationRecord>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: LocationRecord) -> MergeOutcome {
        match self.positions.get(&record.id) {
            Some(&pos) => MergeOutcome::Merged {
                conflicts: merge_into(&mut self.records[pos], record),
            },
            None => {
                self.positions.insert(record.id.clone(), self.records.len());
                self.records.push(record);
                MergeOutcome::Inserted
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in first-seen order.
    pub fn into_records(self) -> Vec<LocationRecord> {
        self.records
    }
}

/// Deduplicate a single sequence of records by id.
pub fn deduplicate(records: impl IntoIterator<Item = LocationRecord>) -> Vec<LocationRecord> {
    let mut dedup = Deduplicator::new();
    for record in records {
        dedup.push(record);
    }
    dedup.into_records()
}
