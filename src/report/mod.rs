//! Run reporting and failure notification
//!
//! - [`log_file`]: appends the human-readable run log and optional per-list JSON
//! - [`notify`]: tells someone when a run had failures

pub mod log_file;
pub mod notify;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::ReportError;
use crate::models::{ActionCounts, SyncUnit};

pub use log_file::LogFileReport;
pub use notify::{notifier_from_config, LogNotifier, Notifier, RunContext, WebhookNotifier};

/// Outcome of one mailing list, kept after its unit is dropped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSummary {
    pub name: String,
    pub list_id: String,
    pub file_error: Option<String>,
    pub matching_hash: bool,
    pub to_add: usize,
    pub to_update: usize,
    pub to_delete: usize,
    pub completed: ActionCounts,
    pub failed: usize,
    pub skipped_rows: usize,
}

impl ListSummary {
    pub fn from_unit(unit: &SyncUnit) -> Self {
        let report = &unit.report;
        Self {
            name: unit.name().to_string(),
            list_id: unit.list_id().to_string(),
            file_error: report.file_error.as_ref().map(ToString::to_string),
            matching_hash: report.matching_hash,
            to_add: report.to_add.len(),
            to_update: report.to_update.len(),
            to_delete: report.to_delete.len(),
            completed: report.completed,
            failed: report.failed.len(),
            skipped_rows: report.skipped_rows,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.file_error.is_some() || self.failed > 0
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub started: DateTime<Local>,
    pub finished: Option<DateTime<Local>>,
    pub lists: Vec<ListSummary>,
    /// Set when the run could not process any list
    pub fatal: Option<String>,
}

impl RunSummary {
    pub fn new(started: DateTime<Local>) -> Self {
        Self {
            started,
            finished: None,
            lists: Vec::new(),
            fatal: None,
        }
    }

    pub fn finish(&mut self) {
        self.finished = Some(Local::now());
    }

    /// Lists that got through without a file-level error
    pub fn files_synced(&self) -> usize {
        self.lists.iter().filter(|l| l.file_error.is_none()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.fatal.is_some() || self.lists.iter().any(ListSummary::has_errors)
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished.unwrap_or_else(Local::now) - self.started
    }
}

/// Destination for run reports
///
/// Write failures are logged by the caller and never undo remote work.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Opening block of a run
    async fn write_header(&self, started: DateTime<Local>) -> Result<(), ReportError>;

    /// One finished mailing list
    async fn write_list(&self, unit: &SyncUnit) -> Result<(), ReportError>;

    /// Closing block of a run
    async fn write_footer(&self, summary: &RunSummary) -> Result<(), ReportError>;

    /// A run-level error followed by the closing block
    async fn write_fatal(&self, summary: &RunSummary, error: &str) -> Result<(), ReportError>;
}
