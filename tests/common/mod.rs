//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use contact_sync::config::{Config, MailingListConfig};
use contact_sync::error::{NotifyError, SyncError};
use contact_sync::models::ContactRecord;
use contact_sync::remote::ContactApi;
use contact_sync::report::{LogFileReport, Notifier, RunSummary};
use contact_sync::sync::SyncRunner;
use tempfile::TempDir;

/// In-memory stand-in for the remote mailing list service
#[derive(Default)]
pub struct InMemoryApi {
    lists: Mutex<HashMap<String, Vec<ContactRecord>>>,
    next_id: AtomicUsize,
    failing_refs: Mutex<HashSet<String>>,
    failing_lists: Mutex<HashSet<String>>,
    pub fetches: AtomicUsize,
    pub mutations: AtomicUsize,
}

impl InMemoryApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a list with remote contacts; contacts without an id get one
    pub fn seed(&self, list_id: &str, contacts: Vec<ContactRecord>) {
        let contacts = contacts
            .into_iter()
            .map(|c| match c.id {
                Some(_) => c,
                None => {
                    let id = self.assign_id();
                    c.with_id(id)
                }
            })
            .collect();
        self.lists
            .lock()
            .unwrap()
            .insert(list_id.to_string(), contacts);
    }

    /// Every mutation of this contact fails
    pub fn fail_contact(&self, external_reference: &str) {
        self.failing_refs
            .lock()
            .unwrap()
            .insert(external_reference.to_string());
    }

    /// Every fetch of this list fails
    pub fn fail_list(&self, list_id: &str) {
        self.failing_lists
            .lock()
            .unwrap()
            .insert(list_id.to_string());
    }

    pub fn contacts(&self, list_id: &str) -> Vec<ContactRecord> {
        let mut contacts = self
            .lists
            .lock()
            .unwrap()
            .get(list_id)
            .cloned()
            .unwrap_or_default();
        contacts.sort_by(|a, b| a.external_reference.cmp(&b.external_reference));
        contacts
    }

    fn assign_id(&self) -> String {
        format!("MLRP_{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn check_failing(&self, external_reference: &str) -> Result<(), SyncError> {
        if self.failing_refs.lock().unwrap().contains(external_reference) {
            return Err(SyncError::ServerError(500));
        }
        Ok(())
    }
}

/// Embedded values sent empty clear the key
fn merged_embedded(contact: &ContactRecord) -> Option<contact_sync::models::EmbeddedData> {
    let embedded: contact_sync::models::EmbeddedData = contact
        .embedded()
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    (!embedded.is_empty()).then_some(embedded)
}

#[async_trait]
impl ContactApi for InMemoryApi {
    async fn fetch_all(&self, list_id: &str) -> Result<Vec<ContactRecord>, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing_lists.lock().unwrap().contains(list_id) {
            return Err(SyncError::ServerError(503));
        }
        Ok(self
            .lists
            .lock()
            .unwrap()
            .get(list_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create(&self, list_id: &str, contact: &ContactRecord) -> Result<(), SyncError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.check_failing(&contact.external_reference)?;

        let mut created = contact.clone().with_id(self.assign_id());
        created.embedded_data = merged_embedded(contact);
        self.lists
            .lock()
            .unwrap()
            .entry(list_id.to_string())
            .or_default()
            .push(created);
        Ok(())
    }

    async fn update(
        &self,
        list_id: &str,
        id: &str,
        contact: &ContactRecord,
    ) -> Result<(), SyncError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.check_failing(&contact.external_reference)?;

        let mut lists = self.lists.lock().unwrap();
        let existing = lists
            .get_mut(list_id)
            .and_then(|contacts| contacts.iter_mut().find(|c| c.id.as_deref() == Some(id)))
            .ok_or(SyncError::NotFound)?;

        let mut updated = contact.clone().with_id(id);
        updated.embedded_data = merged_embedded(contact);
        *existing = updated;
        Ok(())
    }

    async fn delete(&self, list_id: &str, id: &str) -> Result<(), SyncError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);

        let mut lists = self.lists.lock().unwrap();
        let contacts = lists.get_mut(list_id).ok_or(SyncError::NotFound)?;
        if let Some(contact) = contacts.iter().find(|c| c.id.as_deref() == Some(id)) {
            self.check_failing(&contact.external_reference)?;
        }
        let before = contacts.len();
        contacts.retain(|c| c.id.as_deref() != Some(id));
        if contacts.len() == before {
            return Err(SyncError::NotFound);
        }
        Ok(())
    }
}

/// Notifier that only counts deliveries
#[derive(Default)]
pub struct CountingNotifier {
    pub sent: AtomicUsize,
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn notify(&self, _summary: &RunSummary) -> Result<(), NotifyError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl CountingNotifier {
    pub fn count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

/// Temporary directory holding CSV extracts, hashes and logs
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_csv(&self, name: &str, content: &str) {
        std::fs::write(self.path().join(name), content).expect("Failed to write CSV");
    }

    pub fn log(&self) -> String {
        std::fs::read_to_string(self.path().join("logs").join("log.txt")).unwrap_or_default()
    }

    /// Configuration pointing at this workspace with short retry delays
    pub fn config(&self, lists: &[(&str, &str)]) -> Config {
        let mut config = Config::default();
        config.api.token = Some("test-token".to_string());
        config.api.fetch_retry_delay_ms = 10;
        config.apply.retry_delay_ms = 10;
        config.sync.csv_dir = self.path().display().to_string();
        config.sync.hash_file = self.path().join("hashes.json").display().to_string();
        config.report.log_dir = self.path().join("logs").display().to_string();
        config.sync.lists = lists
            .iter()
            .map(|(id, csv)| MailingListConfig {
                mailing_list_id: id.to_string(),
                csv: csv.to_string(),
            })
            .collect();
        config
    }
}

/// Runner wired to the in-memory API, the workspace log and a counting notifier
pub fn create_test_runner(
    config: Config,
    api: Arc<InMemoryApi>,
    notifier: Arc<CountingNotifier>,
) -> SyncRunner {
    let sink = Arc::new(LogFileReport::new(&config.report));
    SyncRunner::new(config, api, sink, notifier)
}
