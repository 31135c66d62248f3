//! Reconciliation of a source contact set against a remote one
//!
//! # Components
//!
//! - [`normalize`]: raw CSV rows to canonical contacts
//! - [`matcher`]: key-sorted pairing of source and remote contacts
//! - [`differ`]: equality verdict for a matched pair
//! - [`classify`]: add/update/delete buckets and add eligibility
//!
//! The stage functions below advance a [`SyncUnit`] through
//! `Normalized → Sorted → Compared → Classified`. Fetching sits between
//! `Normalized` and `Sorted` and lives with the runner, since it talks to the
//! remote service.

pub mod classify;
pub mod differ;
pub mod matcher;
pub mod normalize;

use tracing::{info, warn};

use crate::models::{ContactRecord, ReconciliationReport, Stage, SyncUnit};
use crate::source::SourceRow;

pub use classify::{aggregate, filter_add_candidates};
pub use differ::{compare, Verdict};
pub use matcher::{match_contacts, sort_by_reference, Pairing};
pub use normalize::{normalize_rows, Normalized};

/// Normalize raw rows into the unit's source set
pub fn normalize_stage(unit: &mut SyncUnit, rows: Vec<SourceRow>, unique_id_column: &str) {
    let normalized = normalize_rows(rows, unique_id_column);
    unit.source = normalized.contacts;
    unit.report.skipped_rows = normalized.skipped_rows;
    unit.advance(Stage::Normalized);
}

/// Sort both contact sets by `externalReference`
pub fn sort_stage(unit: &mut SyncUnit) {
    sort_by_reference(&mut unit.source);
    sort_by_reference(&mut unit.remote);

    let duplicates = unit
        .source
        .windows(2)
        .filter(|w| w[0].external_reference == w[1].external_reference)
        .count();
    if duplicates > 0 {
        warn!(
            list = unit.name(),
            duplicates = duplicates,
            "Source contains duplicate unique ids"
        );
    }

    unit.advance(Stage::Sorted);
}

/// Pair, diff and bucket the sorted sets
pub fn compare_stage(unit: &mut SyncUnit) {
    let pairing = match_contacts(&unit.source, &unit.remote);
    aggregate(pairing, &mut unit.report);
    unit.advance(Stage::Compared);

    info!(
        list = unit.name(),
        changes = unit.report.changes_to_make(),
        "Changes to make"
    );
}

/// Apply the add-eligibility filter
pub fn classify_stage(unit: &mut SyncUnit) {
    filter_add_candidates(&mut unit.report);
    unit.advance(Stage::Classified);
}

/// Reconcile two contact sets in one call
pub fn reconcile(
    mut source: Vec<ContactRecord>,
    mut remote: Vec<ContactRecord>,
) -> ReconciliationReport {
    sort_by_reference(&mut source);
    sort_by_reference(&mut remote);

    let mut report = ReconciliationReport::default();
    aggregate(match_contacts(&source, &remote), &mut report);
    filter_add_candidates(&mut report);
    report
}
