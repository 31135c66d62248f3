//! Apply phase: pushes a list's add/update/delete buckets to the remote API
//!
//! Groups run strictly in the order Add, Update, Delete. Inside a group up to
//! `concurrency` operations are in flight at once, each wrapped in the apply
//! [`RetryPolicy`]. A contact whose operation is exhausted moves from its
//! bucket to `failed`; the group carries on with the rest.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::ApplyConfig;
use crate::error::ContactError;
use crate::models::{Action, ContactRecord, ReconciliationReport, Stage, SyncUnit};
use crate::remote::ContactApi;
use crate::sync::RetryPolicy;

/// Executes the remote mutations of a classified [`SyncUnit`]
#[derive(Clone)]
pub struct ApplyExecutor {
    api: Arc<dyn ContactApi>,
    policy: RetryPolicy,
    concurrency: usize,
}

impl ApplyExecutor {
    pub fn new(api: Arc<dyn ContactApi>, config: &ApplyConfig) -> Self {
        Self::with_policy(api, RetryPolicy::for_apply(config), config.concurrency)
    }

    pub fn with_policy(api: Arc<dyn ContactApi>, policy: RetryPolicy, concurrency: usize) -> Self {
        Self {
            api,
            policy,
            concurrency: concurrency.max(1),
        }
    }

    /// Run every action group of `unit` and mark it applied
    pub async fn apply(&self, unit: &mut SyncUnit) {
        let list_id = unit.list_id().to_string();
        let list_name = unit.name().to_string();

        for action in Action::ALL {
            self.apply_group(&list_id, &list_name, action, &mut unit.report)
                .await;
        }

        unit.advance(Stage::Applied);
    }

    /// Run one action group to completion
    ///
    /// Successful contacts stay in the bucket in their original order.
    async fn apply_group(
        &self,
        list_id: &str,
        list_name: &str,
        action: Action,
        report: &mut ReconciliationReport,
    ) {
        let contacts = std::mem::take(report.bucket_mut(action));
        if contacts.is_empty() {
            return;
        }
        let total = contacts.len();
        debug!(list = list_name, action = %action, total = total, "Starting action group");

        let semaphore = Semaphore::new(self.concurrency);
        let outcomes = join_all(contacts.into_iter().map(|contact| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("Semaphore closed unexpectedly");
                let result = self.execute(list_id, action, &contact).await;
                (contact, result)
            }
        }))
        .await;

        for (contact, result) in outcomes {
            match result {
                Ok(()) => {
                    report.completed.increment(action);
                    report.bucket_mut(action).push(contact);
                }
                Err(error) => {
                    warn!(
                        list = list_name,
                        action = %action,
                        contact = %contact.external_reference,
                        error = %error,
                        "Failed to apply contact"
                    );
                    report.fail(contact, action, error);
                }
            }
        }

        info!(
            list = list_name,
            action = %action,
            completed = report.completed.get(action),
            failed = report.failed_count(action),
            total = total,
            "{} - Completed: {}",
            action,
            report.completed.get(action)
        );
    }

    /// One contact, with retries
    async fn execute(
        &self,
        list_id: &str,
        action: Action,
        contact: &ContactRecord,
    ) -> Result<(), ContactError> {
        let api = self.api.as_ref();

        let outcome = match action {
            Action::Add => self.policy.run(|| api.create(list_id, contact)).await,
            Action::Update => {
                let id = remote_id(contact)?;
                self.policy.run(|| api.update(list_id, id, contact)).await
            }
            Action::Delete => {
                let id = remote_id(contact)?;
                self.policy.run(|| api.delete(list_id, id)).await
            }
        };

        outcome.map_err(|exhausted| ContactError::Remote {
            attempts: exhausted.attempts,
            error: exhausted.last_error,
        })
    }
}

fn remote_id(contact: &ContactRecord) -> Result<&str, ContactError> {
    contact
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(ContactError::MissingRemoteId)
}
