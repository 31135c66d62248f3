//! Qualtrics v3 mailing list client
//!
//! Contacts live under `{base}/mailinglists/{listId}/contacts`. Listing is
//! paginated: every page carries `result.elements` and a `result.nextPage`
//! URL that is `null` on the last page. Every response the API considers
//! successful is a `200` with a JSON body.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::SyncError;
use crate::models::{ContactRecord, EmbeddedData};

use super::ContactApi;

const TOKEN_HEADER: &str = "x-api-token";
const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactPage {
    #[serde(default)]
    elements: Vec<ContactRecord>,
    #[serde(default)]
    next_page: Option<String>,
}

/// Body of a create call; this endpoint names the reference `externalDataRef`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody<'a> {
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    external_data_ref: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedded_data: Option<&'a EmbeddedData>,
}

/// Body of an update call; the id travels in the path only
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody<'a> {
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    external_data_reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedded_data: Option<&'a EmbeddedData>,
}

/// HTTP client for Qualtrics mailing lists
#[derive(Debug, Clone)]
pub struct QualtricsClient {
    client: Client,
    base_url: String,
    token: String,
}

impl QualtricsClient {
    /// Create a client from the `api` configuration section
    pub fn new(config: &ApiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self::with_client(
            client,
            config.base_url.clone(),
            config.token.clone().unwrap_or_default(),
        )
    }

    /// Create a client around an existing reqwest Client
    pub fn with_client(client: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn contacts_url(&self, list_id: &str) -> String {
        format!("{}/mailinglists/{}/contacts", self.base_url, list_id)
    }

    fn contact_url(&self, list_id: &str, id: &str) -> String {
        format!("{}/{}", self.contacts_url(list_id), id)
    }

    /// Send a request and return the raw JSON body of a successful response
    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, SyncError> {
        let response = request
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SyncError::NetworkTimeout
                } else if e.is_connect() {
                    SyncError::ConnectionRefused
                } else {
                    SyncError::Network(e.to_string())
                }
            })?;

        let url = response.url().to_string();

        match response.status() {
            StatusCode::OK => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if !content_type.starts_with("application/json") {
                    warn!(url = url, content_type = content_type, "Unexpected content type");
                    return Err(SyncError::InvalidData(format!(
                        "Content Type: {}",
                        content_type
                    )));
                }

                let body = response
                    .bytes()
                    .await
                    .map_err(|e| SyncError::Network(e.to_string()))?;
                debug!(url = url, body_size = body.len(), "Received response");
                Ok(body.to_vec())
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let wait = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS);

                warn!(url = url, retry_after = wait, "Rate limited by remote service");
                Err(SyncError::RateLimited(wait))
            }
            StatusCode::NOT_FOUND => {
                debug!(url = url, "Resource not found (404)");
                Err(SyncError::NotFound)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(url = url, status = ?response.status(), "Unauthorized");
                Err(SyncError::Unauthorized)
            }
            status => {
                warn!(url = url, status = status.as_u16(), "Unexpected status");
                Err(SyncError::ServerError(status.as_u16()))
            }
        }
    }
}

#[async_trait]
impl ContactApi for QualtricsClient {
    async fn fetch_all(&self, list_id: &str) -> Result<Vec<ContactRecord>, SyncError> {
        let mut contacts = Vec::new();
        let mut next = Some(self.contacts_url(list_id));

        while let Some(url) = next {
            let body = self.send(self.client.get(&url)).await?;
            let page: Envelope<ContactPage> = serde_json::from_slice(&body)
                .map_err(|e| SyncError::InvalidData(e.to_string()))?;

            contacts.extend(page.result.elements);
            debug!(list_id = list_id, retrieved = contacts.len(), "Contacts retrieved");
            next = page.result.next_page;
        }

        Ok(contacts)
    }

    async fn create(&self, list_id: &str, contact: &ContactRecord) -> Result<(), SyncError> {
        let body = CreateBody {
            email: &contact.email,
            first_name: &contact.first_name,
            last_name: &contact.last_name,
            external_data_ref: &contact.external_reference,
            embedded_data: contact.embedded_data.as_ref(),
        };

        self.send(self.client.post(self.contacts_url(list_id)).json(&body)).await?;
        Ok(())
    }

    async fn update(
        &self,
        list_id: &str,
        id: &str,
        contact: &ContactRecord,
    ) -> Result<(), SyncError> {
        let body = UpdateBody {
            email: &contact.email,
            first_name: &contact.first_name,
            last_name: &contact.last_name,
            external_data_reference: &contact.external_reference,
            embedded_data: contact.embedded_data.as_ref(),
        };

        self.send(self.client.put(self.contact_url(list_id, id)).json(&body)).await?;
        Ok(())
    }

    async fn delete(&self, list_id: &str, id: &str) -> Result<(), SyncError> {
        self.send(self.client.delete(self.contact_url(list_id, id))).await?;
        Ok(())
    }
}
