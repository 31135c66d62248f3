//! Failure notification
//!
//! A run notifies at most once, and only when some list ended with a file
//! error or failed contacts, or the run itself could not start.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::NotifyConfig;
use crate::error::NotifyError;

use super::RunSummary;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Somewhere to send a failed run's summary
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary: &RunSummary) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: String,
    summary: &'a RunSummary,
}

/// POSTs the run summary as JSON
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, summary: &RunSummary) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            text: headline(summary),
            summary,
        };
        let body =
            serde_json::to_vec(&payload).map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Delivery(format!(
                "webhook returned {}",
                response.status().as_u16()
            )));
        }

        info!(url = %self.url, "Failure notification sent");
        Ok(())
    }
}

/// Logs the notification when no webhook is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, summary: &RunSummary) -> Result<(), NotifyError> {
        warn!(
            lists_failed = summary.lists.iter().filter(|l| l.has_errors()).count(),
            fatal = summary.fatal.as_deref().unwrap_or(""),
            "{}",
            headline(summary)
        );
        Ok(())
    }
}

pub fn notifier_from_config(config: &NotifyConfig) -> Arc<dyn Notifier> {
    match config.webhook_url.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => Arc::new(WebhookNotifier::new(url)),
        None => Arc::new(LogNotifier),
    }
}

fn headline(summary: &RunSummary) -> String {
    match &summary.fatal {
        Some(error) => format!("Contact sync could not run: {}", error),
        None => {
            let names: Vec<&str> = summary
                .lists
                .iter()
                .filter(|l| l.has_errors())
                .map(|l| l.name.as_str())
                .collect();
            format!("Contact sync finished with errors in: {}", names.join(", "))
        }
    }
}

/// Per-run notification state
#[derive(Debug, Default)]
pub struct RunContext {
    notified: bool,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notified(&self) -> bool {
        self.notified
    }

    /// Notify if the run had errors and nobody was told yet
    ///
    /// Returns whether a notification was attempted.
    pub async fn notify_if_needed(&mut self, notifier: &dyn Notifier, summary: &RunSummary) -> bool {
        if self.notified || !summary.has_errors() {
            return false;
        }
        self.notified = true;

        if let Err(e) = notifier.notify(summary).await {
            warn!(error = %e, "Failed to send failure notification");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ListSummary;
    use chrono::Local;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

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

    fn list(name: &str, failed: usize) -> ListSummary {
        ListSummary {
            name: name.to_string(),
            list_id: "ML_1".to_string(),
            file_error: None,
            matching_hash: false,
            to_add: 0,
            to_update: 0,
            to_delete: 0,
            completed: Default::default(),
            failed,
            skipped_rows: 0,
        }
    }

    // Test 1: Clean runs do not notify
    #[tokio::test]
    async fn test_clean_run_not_notified() {
        let notifier = CountingNotifier::default();
        let mut summary = RunSummary::new(Local::now());
        summary.lists.push(list("Students.csv", 0));

        let mut ctx = RunContext::new();
        assert!(!ctx.notify_if_needed(&notifier, &summary).await);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 0);
    }

    // Test 2: Notification fires once per run
    #[tokio::test]
    async fn test_notifies_at_most_once() {
        let notifier = CountingNotifier::default();
        let mut summary = RunSummary::new(Local::now());
        summary.lists.push(list("Students.csv", 1));
        summary.lists.push(list("Staff.csv", 2));

        let mut ctx = RunContext::new();
        assert!(ctx.notify_if_needed(&notifier, &summary).await);
        assert!(!ctx.notify_if_needed(&notifier, &summary).await);

        assert!(ctx.notified());
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
    }

    // Test 3: Webhook receives the summary
    #[tokio::test]
    async fn test_webhook_posts_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "text": "Contact sync finished with errors in: Staff.csv"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut summary = RunSummary::new(Local::now());
        summary.lists.push(list("Students.csv", 0));
        summary.lists.push(list("Staff.csv", 3));

        let notifier = WebhookNotifier::new(format!("{}/hook", server.uri()));
        notifier.notify(&summary).await.unwrap();
    }

    // Test 4: Webhook error status is a delivery failure
    #[tokio::test]
    async fn test_webhook_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut summary = RunSummary::new(Local::now());
        summary.fatal = Some("lists file missing".to_string());

        let notifier = WebhookNotifier::new(server.uri());
        assert_eq!(
            notifier.notify(&summary).await,
            Err(NotifyError::Delivery("webhook returned 500".to_string()))
        );
    }
}
