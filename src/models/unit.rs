//! Per-list working state
//!
//! A [`SyncUnit`] is created when a mailing list's turn comes up, owned by the
//! run processing it, and dropped once its report has been written.

use super::contact::ContactRecord;
use super::report::ReconciliationReport;
use crate::config::MailingListConfig;
use crate::error::FileError;

/// Pipeline progress of a unit
///
/// Stages only move forward. A unit that is skipped by the hash gate or hits a
/// file error jumps straight to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Created,
    Normalized,
    Fetched,
    Sorted,
    Compared,
    Classified,
    Applied,
    Done,
}

/// One mailing list's working state
#[derive(Debug, Clone)]
pub struct SyncUnit {
    pub config: MailingListConfig,
    pub source: Vec<ContactRecord>,
    pub remote: Vec<ContactRecord>,
    pub report: ReconciliationReport,
    stage: Stage,
}

impl SyncUnit {
    pub fn new(config: MailingListConfig) -> Self {
        Self {
            config,
            source: Vec::new(),
            remote: Vec::new(),
            report: ReconciliationReport::default(),
            stage: Stage::Created,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Name used in logs and reports
    pub fn name(&self) -> &str {
        &self.config.csv
    }

    pub fn list_id(&self) -> &str {
        &self.config.mailing_list_id
    }

    /// Move to a later stage
    pub(crate) fn advance(&mut self, next: Stage) {
        debug_assert!(
            next > self.stage,
            "stage cannot move from {:?} to {:?}",
            self.stage,
            next
        );
        self.stage = next;
    }

    /// Record a list-level failure and stop the pipeline for this unit
    pub(crate) fn abort(&mut self, error: FileError) {
        self.report.file_error = Some(error);
        self.stage = Stage::Done;
    }
}
