//! One sync run over every configured mailing list
//!
//! Lists are processed strictly one after another. For each list the unit
//! goes through read, hash gate, parse, normalize, fetch, sort, compare,
//! classify and apply, and is then written to the report sink. A file error
//! stops the remaining stages of that list only.

use async_trait::async_trait;
use chrono::Local;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::apply::ApplyExecutor;
use crate::config::{Config, MailingListConfig};
use crate::error::{AppError, FileError};
use crate::models::{Stage, SyncUnit};
use crate::reconcile;
use crate::remote::{ContactApi, QualtricsClient};
use crate::report::{
    notifier_from_config, ListSummary, LogFileReport, Notifier, ReportSink, RunContext,
    RunSummary,
};
use crate::source::{parse_list_configs, parse_rows, read_source_file, HashStore};

use super::retry::RetryPolicy;
use super::scheduler::Syncable;

/// Drives sync runs against one remote service
pub struct SyncRunner {
    config: Config,
    api: Arc<dyn ContactApi>,
    sink: Arc<dyn ReportSink>,
    notifier: Arc<dyn Notifier>,
    force: bool,
}

impl SyncRunner {
    pub fn new(
        config: Config,
        api: Arc<dyn ContactApi>,
        sink: Arc<dyn ReportSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            api,
            sink,
            notifier,
            force: false,
        }
    }

    /// Wire up the HTTP client, log file and notifier described by `config`
    pub fn from_config(config: Config) -> Self {
        let api = Arc::new(QualtricsClient::new(&config.api));
        let sink = Arc::new(LogFileReport::new(&config.report));
        let notifier = notifier_from_config(&config.notify);
        Self::new(config, api, sink, notifier)
    }

    /// Reconcile every list even when its source file is unchanged
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute one complete run
    ///
    /// Never fails: list and contact failures end up in the summary, and an
    /// unusable list configuration is reported as `fatal`.
    pub async fn run_once(&self) -> RunSummary {
        let started = Local::now();
        let mut summary = RunSummary::new(started);
        let mut ctx = RunContext::new();

        info!(force = self.force, "Starting sync run");
        if let Err(e) = self.sink.write_header(started).await {
            warn!(error = %e, "Failed to write report header");
        }

        let lists = match self.resolve_lists().await {
            Ok(lists) => lists,
            Err(e) => {
                error!(error = %e, "Failed to load mailing list configuration");
                summary.fatal = Some(e.to_string());
                summary.finish();
                if let Err(write_err) = self.sink.write_fatal(&summary, &e.to_string()).await {
                    warn!(error = %write_err, "Failed to write fatal error to report");
                }
                ctx.notify_if_needed(self.notifier.as_ref(), &summary).await;
                return summary;
            }
        };
        if lists.is_empty() {
            warn!("No mailing lists configured");
        }

        let mut hashes = HashStore::load(&self.config.sync.hash_file).await;
        let executor = ApplyExecutor::new(self.api.clone(), &self.config.apply);

        for list in lists {
            let unit = self.process_list(list, &mut hashes, &executor).await;

            if let Err(e) = self.sink.write_list(&unit).await {
                warn!(list = unit.name(), error = %e, "Failed to write list report");
            }
            if !unit.report.needs_rerun() {
                hashes.commit(unit.list_id());
            }
            summary.lists.push(ListSummary::from_unit(&unit));
        }

        if let Err(e) = hashes.save().await {
            warn!(error = %e, "Failed to save source hashes");
        }

        summary.finish();
        if let Err(e) = self.sink.write_footer(&summary).await {
            warn!(error = %e, "Failed to write report footer");
        }
        ctx.notify_if_needed(self.notifier.as_ref(), &summary).await;

        info!(
            lists = summary.lists.len(),
            files_synced = summary.files_synced(),
            elapsed_secs = summary.elapsed().num_seconds(),
            "Sync run finished"
        );
        summary
    }

    /// Inline lists followed by the entries of `sync.lists_file`
    pub async fn resolve_lists(&self) -> Result<Vec<MailingListConfig>, AppError> {
        let mut lists = self.config.sync.lists.clone();

        if let Some(path) = &self.config.sync.lists_file {
            let content = tokio::fs::read(path).await.map_err(|e| {
                AppError::Config(format!("Failed to read lists file {}: {}", path, e))
            })?;
            lists.extend(parse_list_configs(&content)?);
        }

        Ok(lists)
    }

    async fn process_list(
        &self,
        config: MailingListConfig,
        hashes: &mut HashStore,
        executor: &ApplyExecutor,
    ) -> SyncUnit {
        let mut unit = SyncUnit::new(config);
        info!(list = unit.name(), list_id = unit.list_id(), "Processing mailing list");

        match self.run_stages(&mut unit, hashes, executor).await {
            Ok(()) => unit.advance(Stage::Done),
            Err(e) => {
                error!(list = unit.name(), error = %e, "Mailing list aborted");
                unit.abort(e);
            }
        }

        unit
    }

    async fn run_stages(
        &self,
        unit: &mut SyncUnit,
        hashes: &mut HashStore,
        executor: &ApplyExecutor,
    ) -> Result<(), FileError> {
        let content =
            read_source_file(Path::new(&self.config.sync.csv_dir), &unit.config.csv).await?;

        if hashes.check_unchanged(unit.list_id(), &content) && !self.force {
            info!(list = unit.name(), "The hashes matched, skipping");
            unit.report.matching_hash = true;
            return Ok(());
        }

        let rows = parse_rows(&content)?;
        reconcile::normalize_stage(unit, rows, &self.config.sync.unique_id_column);
        self.fetch_stage(unit).await?;
        reconcile::sort_stage(unit);
        reconcile::compare_stage(unit);
        reconcile::classify_stage(unit);
        executor.apply(unit).await;

        Ok(())
    }

    /// Load the list's remote contacts, retrying with the fetch policy
    async fn fetch_stage(&self, unit: &mut SyncUnit) -> Result<(), FileError> {
        let policy = RetryPolicy::for_fetch(&self.config.api);
        let api = self.api.as_ref();
        let list_id = unit.list_id().to_string();

        unit.remote = policy
            .run(|| api.fetch_all(&list_id))
            .await
            .map_err(|exhausted| FileError::Fetch {
                attempts: exhausted.attempts,
                error: exhausted.last_error,
            })?;

        info!(
            list = unit.name(),
            source = unit.source.len(),
            remote = unit.remote.len(),
            "Fetched remote contacts"
        );
        unit.advance(Stage::Fetched);
        Ok(())
    }
}

#[async_trait]
impl Syncable for SyncRunner {
    fn name(&self) -> &str {
        "contact-sync"
    }

    fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.config.sync.interval_secs)
    }

    async fn sync(&self) -> RunSummary {
        self.run_once().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NotifyError, SyncError};
    use crate::models::ContactRecord;
    use crate::remote::MockContactApi;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingNotifier {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn notify(&self, _summary: &RunSummary) -> Result<(), NotifyError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.api.token = Some("token".to_string());
        config.sync.csv_dir = dir.display().to_string();
        config.sync.hash_file = dir.join("hashes.json").display().to_string();
        config.report.log_dir = dir.join("logs").display().to_string();
        config.sync.lists = vec![MailingListConfig {
            mailing_list_id: "ML_1".to_string(),
            csv: "Students.csv".to_string(),
        }];
        config
    }

    fn runner(config: Config, api: MockContactApi, notifier: Arc<CountingNotifier>) -> SyncRunner {
        let sink = Arc::new(LogFileReport::new(&config.report));
        SyncRunner::new(config, Arc::new(api), sink, notifier)
    }

    const STUDENTS: &str = "UniqueID,Email,FirstName,LastName\nA1,a@x.com,A,One\n";

    // Test 1: A fetch that keeps failing becomes a file error
    #[tokio::test(start_paused = true)]
    async fn test_fetch_exhaustion_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Students.csv"), STUDENTS).unwrap();

        let mut api = MockContactApi::new();
        api.expect_fetch_all()
            .times(2)
            .returning(|_| Err(SyncError::ServerError(502)));
        api.expect_create().never();

        let notifier = Arc::new(CountingNotifier::default());
        let summary = runner(config(dir.path()), api, notifier.clone())
            .run_once()
            .await;

        assert_eq!(
            summary.lists[0].file_error.as_deref(),
            Some("Failed to fetch remote contacts after 2 attempt(s): Status Code: 502")
        );
        assert_eq!(summary.files_synced(), 0);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
    }

    // Test 2: Unchanged source is skipped on the next run
    #[tokio::test]
    async fn test_hash_gate_skips_unchanged_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Students.csv"), STUDENTS).unwrap();

        let mut api = MockContactApi::new();
        api.expect_fetch_all().times(1).returning(|_| Ok(vec![]));
        api.expect_create().times(1).returning(|_, _| Ok(()));

        let notifier = Arc::new(CountingNotifier::default());
        let runner = runner(config(dir.path()), api, notifier.clone());

        let first = runner.run_once().await;
        assert_eq!(first.lists[0].completed.added, 1);
        assert!(!first.lists[0].matching_hash);

        let second = runner.run_once().await;
        assert!(second.lists[0].matching_hash);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 0);
    }

    // Test 3: Force bypasses the hash gate
    #[tokio::test]
    async fn test_force_bypasses_hash_gate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Students.csv"), STUDENTS).unwrap();

        let mut api = MockContactApi::new();
        api.expect_fetch_all().times(2).returning(|_| {
            Ok(vec![ContactRecord::new("A1", "a@x.com", "A", "One").with_id("1")])
        });

        let runner = runner(
            config(dir.path()),
            api,
            Arc::new(CountingNotifier::default()),
        )
        .with_force(true);

        runner.run_once().await;
        let second = runner.run_once().await;

        assert!(!second.lists[0].matching_hash);
        assert_eq!(second.lists[0].completed.total(), 0);
    }

    // Test 4: Unreadable lists file is fatal for the run
    #[tokio::test]
    async fn test_missing_lists_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.sync.lists_file = Some(dir.path().join("missing.csv").display().to_string());

        let mut api = MockContactApi::new();
        api.expect_fetch_all().never();

        let notifier = Arc::new(CountingNotifier::default());
        let summary = runner(config, api, notifier.clone()).run_once().await;

        assert!(summary.fatal.as_deref().unwrap().contains("missing.csv"));
        assert!(summary.lists.is_empty());
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
    }

    // Test 5: Lists file entries are appended to inline lists
    #[tokio::test]
    async fn test_resolve_lists() {
        let dir = tempfile::tempdir().unwrap();
        let lists_file = dir.path().join("lists.csv");
        std::fs::write(&lists_file, "MailingListID,csv\nML_2,Staff.csv\n").unwrap();
        let mut config = config(dir.path());
        config.sync.lists_file = Some(lists_file.display().to_string());

        let runner = runner(
            config,
            MockContactApi::new(),
            Arc::new(CountingNotifier::default()),
        );
        let lists = runner.resolve_lists().await.unwrap();

        let ids: Vec<_> = lists.iter().map(|l| l.mailing_list_id.as_str()).collect();
        assert_eq!(ids, vec!["ML_1", "ML_2"]);
    }

    // Test 6: Validation failures alone do not keep the source from being skipped
    #[tokio::test]
    async fn test_validation_failure_commits_hash() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Students.csv"),
            "UniqueID,Email,FirstName,LastName\nA1,a@x.com,A,One\nC3,,C,Three\n",
        )
        .unwrap();

        let mut api = MockContactApi::new();
        api.expect_fetch_all().times(1).returning(|_| {
            Ok(vec![ContactRecord::new("A1", "a@x.com", "A", "One").with_id("1")])
        });
        api.expect_create().never();

        let notifier = Arc::new(CountingNotifier::default());
        let runner = runner(config(dir.path()), api, notifier.clone());

        let first = runner.run_once().await;
        assert_eq!(first.lists[0].failed, 1);
        assert!(!first.lists[0].matching_hash);

        let second = runner.run_once().await;
        assert!(second.lists[0].matching_hash);
        assert_eq!(second.lists[0].failed, 0);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
    }
}
