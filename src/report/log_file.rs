//! Plain-text run log
//!
//! Every run appends one block to `{log_dir}/log.txt`:
//!
//! ```text
//! ----------------------------------------------------------------
//! Mon Mar 04 2024     09:00:00 GMT-0700
//! ----------------------------------------------------------------
//!
//! Students.csv                  Changes to be Made: 3         Added: 1 ...
//!     Failed to Add contact: C3 missing required field: email
//!
//! Elapsed Time: 0:00:04           Files Successfully Synced: 1
//! ----------------------------------------------------------------
//! ```
//!
//! Lines end in `\r\n`.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::models::{Action, ContactRecord, SyncUnit};

use super::{ReportSink, RunSummary};

const LOG_FILE_NAME: &str = "log.txt";
const LIST_NAME_PREFIX: &str = "QualtricsSync-";
const NEWLINE: &str = "\r\n";

fn line_break() -> String {
    format!("{NEWLINE}{}{NEWLINE}", "-".repeat(127))
}

/// Left-align `text` in exactly `width` characters, truncating if needed
fn fixed(text: &str, width: usize) -> String {
    format!("{:<width$.width$}", text, width = width)
}

/// `H:MM:SS`
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Name shown in the log for a list's CSV file
pub fn display_name(csv: &str) -> &str {
    csv.strip_prefix(LIST_NAME_PREFIX).unwrap_or(csv)
}

pub fn render_header(started: DateTime<Local>) -> String {
    format!(
        "{}{}{}{}",
        line_break(),
        fixed(&started.format("%a %b %d %Y").to_string(), 20),
        started.format("%H:%M:%S GMT%z"),
        line_break()
    )
}

pub fn render_list(unit: &SyncUnit) -> String {
    let report = &unit.report;
    let mut text = format!("{NEWLINE}{}", fixed(display_name(unit.name()), 30));

    if let Some(error) = &report.file_error {
        text.push_str(&format!("{NEWLINE}{}{NEWLINE}", error));
    } else if report.matching_hash {
        text.push_str(&format!("{NEWLINE}\t The hashes matched {NEWLINE}"));
    } else {
        let attempted = |action: Action| report.completed.get(action) + report.failed_count(action);
        let added = attempted(Action::Add);
        let updated = attempted(Action::Update);
        let deleted = attempted(Action::Delete);

        text.push_str(&fixed(
            &format!("Changes to be Made: {}", added + updated + deleted),
            30,
        ));
        text.push_str(&fixed(&format!("Added: {}", report.completed.added), 15));
        text.push_str(&fixed(&format!("Updated: {}", report.completed.updated), 17));
        text.push_str(&fixed(&format!("Deleted: {}", report.completed.deleted), 17));
        text.push_str(NEWLINE);

        if report.skipped_rows > 0 {
            text.push_str(&format!(
                "\tSkipped {} row(s) without a unique id{NEWLINE}",
                report.skipped_rows
            ));
        }
        for failure in &report.failed {
            text.push_str(&format!(
                "\tFailed to {} contact: {} {}{NEWLINE}",
                failure.action, failure.contact.external_reference, failure.error
            ));
        }
    }

    text
}

pub fn render_footer(summary: &RunSummary) -> String {
    format!(
        "{NEWLINE}{NEWLINE}{}{}{}",
        fixed(&format!("Elapsed Time: {}", format_elapsed(summary.elapsed())), 32),
        fixed(
            &format!("Files Successfully Synced: {}", summary.files_synced()),
            36
        ),
        line_break()
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailedFailure<'a> {
    action: Action,
    contact: &'a ContactRecord,
    error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailedReport<'a> {
    mailing_list_id: &'a str,
    added: &'a [ContactRecord],
    updated: &'a [ContactRecord],
    deleted: &'a [ContactRecord],
    failed: Vec<DetailedFailure<'a>>,
}

/// Report sink writing into a log directory
#[derive(Debug, Clone)]
pub struct LogFileReport {
    log_dir: PathBuf,
    detailed: bool,
}

impl LogFileReport {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            log_dir: PathBuf::from(&config.log_dir),
            detailed: config.detailed,
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }

    async fn append(&self, text: &str) -> Result<(), ReportError> {
        tokio::fs::create_dir_all(&self.log_dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Per-list JSON with every contact touched by the run
    async fn write_detailed(&self, unit: &SyncUnit) -> Result<(), ReportError> {
        let report = &unit.report;
        let detailed = DetailedReport {
            mailing_list_id: unit.list_id(),
            added: &report.to_add,
            updated: &report.to_update,
            deleted: &report.to_delete,
            failed: report
                .failed
                .iter()
                .map(|f| DetailedFailure {
                    action: f.action,
                    contact: &f.contact,
                    error: f.error.to_string(),
                })
                .collect(),
        };

        let json = serde_json::to_vec_pretty(&detailed)
            .map_err(|e| ReportError::Serialization(e.to_string()))?;
        let path = self.detailed_path(unit.name());
        debug!(path = %path.display(), "Writing detailed report");
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    fn detailed_path(&self, csv: &str) -> PathBuf {
        let stem = Path::new(display_name(csv))
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| display_name(csv).to_string());
        self.log_dir.join(format!("{}.json", stem))
    }
}

#[async_trait]
impl ReportSink for LogFileReport {
    async fn write_header(&self, started: DateTime<Local>) -> Result<(), ReportError> {
        self.append(&render_header(started)).await
    }

    async fn write_list(&self, unit: &SyncUnit) -> Result<(), ReportError> {
        self.append(&render_list(unit)).await?;

        if self.detailed && unit.report.file_error.is_none() && !unit.report.matching_hash {
            self.write_detailed(unit).await?;
        }
        Ok(())
    }

    async fn write_footer(&self, summary: &RunSummary) -> Result<(), ReportError> {
        self.append(&render_footer(summary)).await
    }

    async fn write_fatal(&self, summary: &RunSummary, error: &str) -> Result<(), ReportError> {
        self.append(&format!("{NEWLINE}{}{NEWLINE}", error)).await?;
        self.write_footer(summary).await
    }
}
