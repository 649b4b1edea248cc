pub mod infoblox;

use async_trait::async_trait;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fmt,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("infoblox api error: status={status}, message={message:?}")]
    Api { status: u16, message: String },

    #[error("invalid provider connection settings: {0}")]
    Connection(String),
}

/// A TXT record as returned by the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider assigned identifier, the only handle usable for deletion.
    #[serde(rename = "_ref")]
    pub reference: String,
    #[serde(default)]
    pub view: String,
    pub name: String,
    pub text: String,
}

/// Exact-match filter for TXT record lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxtRecordFilter {
    pub view: String,
    pub name: String,
    pub text: String,
}

impl TxtRecordFilter {
    pub fn new(view: impl ToString, name: impl ToString, text: impl ToString) -> Self {
        Self {
            view: view.to_string(),
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    /// Query parameters for the lookup. An empty view is left out so the provider falls back to its default view.
    pub fn query_params(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![("name", self.name.as_str()), ("text", self.text.as_str())];
        if !self.view.is_empty() {
            params.push(("view", self.view.as_str()));
        }
        params
    }
}

/// Request payload for creating a TXT record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewTxtRecord {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub view: String,
    pub name: String,
    pub text: String,
    pub ttl: u32,
    pub use_ttl: bool,
    pub extattrs: BTreeMap<String, Value>,
}

impl NewTxtRecord {
    /// A challenge record: zero TTL which is not enforced, no extensible attributes.
    pub fn challenge(view: impl ToString, name: impl ToString, text: impl ToString) -> Self {
        Self {
            view: view.to_string(),
            name: name.to_string(),
            text: text.to_string(),
            ttl: 0,
            use_ttl: false,
            extattrs: BTreeMap::new(),
        }
    }
}

/// Username and password used to authenticate against the provider.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything needed to reach the provider's record API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionParams {
    pub scheme: String,
    pub host: String,
    pub port: String,
    pub version: String,
    pub tls_verify: bool,
    pub credentials: Credentials,
}

/// The provider's TXT record API.
///
/// Implementations must be usable from several challenges at once and must not hold any per-request state between
/// calls.
#[async_trait]
pub trait RecordApi: Send + Sync {
    /// Returns all TXT records matching `filter`, in provider response order.
    async fn query(&self, filter: &TxtRecordFilter) -> Result<Vec<DnsRecord>, ProviderError>;

    /// Creates a record and returns its reference.
    async fn create(&self, record: &NewTxtRecord) -> Result<String, ProviderError>;

    /// Deletes the record with the given reference and returns the reference of the deleted object.
    async fn delete(&self, reference: &str) -> Result<String, ProviderError>;
}

/// Builds a [`RecordApi`] for a set of connection parameters.
pub trait Connector: Send + Sync {
    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn RecordApi>, ProviderError>;
}
