//! Contact record model
//!
//! One canonical shape serves both sides of a reconciliation: contacts built
//! from the CSV extract and contacts returned by the remote mailing list.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Custom key/value fields attached to a contact
pub type EmbeddedData = BTreeMap<String, String>;

/// Canonical contact record
///
/// Remote-only metadata (`language`, `unsubscribed`, `responseHistory`,
/// `emailHistory`) is dropped on deserialization and never written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    /// Remote identifier, present only once the remote service assigned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Stable business key used for sorting and matching
    #[serde(rename = "externalDataReference", default, deserialize_with = "null_as_empty")]
    pub external_reference: String,

    /// Email address
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,

    /// First name
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: String,

    /// Last name
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: String,

    /// Custom fields; `None` and an empty map mean the same thing
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "embedded_from_json"
    )]
    pub embedded_data: Option<EmbeddedData>,
}

impl ContactRecord {
    /// Create a contact with the required fields set
    pub fn new(
        external_reference: impl Into<String>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            external_reference: external_reference.into(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            embedded_data: None,
        }
    }

    /// Set the remote id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add one embedded data field
    pub fn with_embedded(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.embedded_data
            .get_or_insert_with(EmbeddedData::new)
            .insert(key.into(), value.into());
        self
    }

    /// Embedded data as a map, empty when absent
    pub fn embedded(&self) -> &EmbeddedData {
        static EMPTY: EmbeddedData = EmbeddedData::new();
        self.embedded_data.as_ref().unwrap_or(&EMPTY)
    }

    /// Top-level fields that take part in equality, by canonical name
    pub fn top_level_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("externalReference", self.external_reference.as_str()),
            ("email", self.email.as_str()),
            ("firstName", self.first_name.as_str()),
            ("lastName", self.last_name.as_str()),
        ]
    }

    /// First required field without a value, if any
    pub fn missing_required_field(&self) -> Option<&'static str> {
        self.top_level_fields()
            .into_iter()
            .find(|(_, value)| value.is_empty())
            .map(|(name, _)| name)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts null values and non-string scalars in the remote `embeddedData` object
fn embedded_from_json<'de, D>(deserializer: D) -> Result<Option<EmbeddedData>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw.and_then(|map| {
        let data: EmbeddedData = map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();
        (!data.is_empty()).then_some(data)
    }))
}
