//! Integrity checks over a reconciled record set.
//!
//! Failures break an invariant downstream storage relies on (unique, non-empty,
//! sorted ids). Warnings flag incomplete data that is still loadable.

use crate::reconcile::{LocationRecord, RegionCentroid};
use serde::Serialize;
use std::collections::HashSet;

const NAME_ATTRIBUTES: &[&str] = &["name_latin", "name_modern"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str) -> Self {
        Self { name, passed: true, error: None, warning: None }
    }

    fn fail(name: &'static str, error: String) -> Self {
        Self { name, passed: false, error: Some(error), warning: None }
    }

    fn warn(name: &'static str, warning: String) -> Self {
        Self { name, passed: true, error: None, warning: Some(warning) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegionCoverage {
    pub with_region: usize,
    pub without_region: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub overall_passed: bool,
    pub checks: Vec<CheckResult>,
    pub coverage: RegionCoverage,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = String> + '_ {
        self.checks
            .iter()
            .filter_map(|c| c.error.as_ref().map(|e| format!("{}: {}", c.name, e)))
    }

    pub fn warnings(&self) -> impl Iterator<Item = String> + '_ {
        self.checks
            .iter()
            .filter_map(|c| c.warning.as_ref().map(|w| format!("{}: {}", c.name, w)))
    }
}

/// Run every check over aggregated `records` against the known `centroids`.
pub fn validate(records: &[LocationRecord], centroids: &[RegionCentroid]) -> ValidationReport {
    let checks = vec![
        check_unique_ids(records),
        check_sorted(records),
        check_required_fields(records),
        check_region_references(records, centroids),
    ];

    let with_region = records.iter().filter(|r| r.region_id.is_some()).count();
    ValidationReport {
        overall_passed: checks.iter().all(|c| c.passed),
        checks,
        coverage: RegionCoverage {
            with_region,
            without_region: records.len() - with_region,
        },
    }
}

fn check_unique_ids(records: &[LocationRecord]) -> CheckResult {
    let mut seen = HashSet::new();
    let dupes: Vec<&str> = records
        .iter()
        .filter(|r| !seen.insert(r.id.as_str()))
        .map(|r| r.id.as_str())
        .collect();
    if dupes.is_empty() {
        CheckResult::pass("unique_ids")
    } else {
        CheckResult::fail("unique_ids", format!("{} duplicate ids (first: {})", dupes.len(), dupes[0]))
    }
}

fn check_sorted(records: &[LocationRecord]) -> CheckResult {
    match records.windows(2).position(|w| w[0].id > w[1].id) {
        None => CheckResult::pass("sorted_ids"),
        Some(i) => CheckResult::fail("sorted_ids", format!("'{}' precedes '{}'", records[i].id, records[i + 1].id)),
    }
}

fn check_required_fields(records: &[LocationRecord]) -> CheckResult {
    let missing_ids = records.iter().filter(|r| r.id.trim().is_empty()).count();
    if missing_ids > 0 {
        return CheckResult::fail("required_fields", format!("{} locations missing ID", missing_ids));
    }

    let unnamed = records
        .iter()
        .filter(|r| {
            !NAME_ATTRIBUTES
                .iter()
                .any(|key| r.str_attribute(key).is_some_and(|name| !name.is_empty()))
        })
        .count();
    if unnamed > 0 {
        CheckResult::warn("required_fields", format!("{} locations have no name", unnamed))
    } else {
        CheckResult::pass("required_fields")
    }
}

fn check_region_references(records: &[LocationRecord], centroids: &[RegionCentroid]) -> CheckResult {
    let known: HashSet<&str> = centroids.iter().map(|c| c.region_id.as_str()).collect();
    let orphans = records
        .iter()
        .filter_map(|r| r.region_id.as_deref())
        .filter(|id| !known.contains(id))
        .count();
    if orphans > 0 {
        CheckResult::warn(
            "region_references",
            format!("{} locations reference unknown regions", orphans),
        )
    } else {
        CheckResult::pass("region_references")
    }
}
