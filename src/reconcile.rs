//! Converges the provider towards "challenge record present" or "challenge record absent".
//!
//! Records are matched on view, name *and* text. Two validations of the same domain running at the same time use
//! different keys, so neither can see, skip on, or delete the other's record.

use crate::dns::{
    DnsRecord,
    NewTxtRecord,
    ProviderError,
    RecordApi,
    TxtRecordFilter,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("unable to query TXT records for {name:?}: {source}")]
    Query {
        name: String,
        #[source]
        source: ProviderError,
    },

    #[error("unable to create TXT record for {name:?}: {source}")]
    Create {
        name: String,
        #[source]
        source: ProviderError,
    },

    #[error("unable to delete TXT record for {name:?}: {source}")]
    Delete {
        name: String,
        #[source]
        source: ProviderError,
    },
}

/// Result of [`RecordReconciler::present`], carrying the record reference for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Presence {
    Created(String),
    AlreadyPresent(String),
}

/// Result of [`RecordReconciler::cleanup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Removal {
    Deleted(String),
    NotFound,
}

/// Strips a single trailing root label dot.
pub fn normalize_fqdn(fqdn: &str) -> &str {
    fqdn.strip_suffix('.').unwrap_or(fqdn)
}

pub struct RecordReconciler<'a> {
    api: &'a dyn RecordApi,
    view: &'a str,
}

impl<'a> RecordReconciler<'a> {
    pub fn new(api: &'a dyn RecordApi, view: &'a str) -> Self {
        Self { api, view }
    }

    /// Makes sure a TXT record `name = fqdn, text = key` exists. Creates it at most once.
    pub async fn present(&self, fqdn: &str, key: &str) -> Result<Presence, ReconcileError> {
        let name = normalize_fqdn(fqdn);

        let existing = self.find(name, key).await.map_err(|source| ReconcileError::Query {
            name: name.to_string(),
            source,
        })?;

        if let Some(record) = existing {
            info!(%name, reference = %record.reference, "Skipping creation, existing record found");
            return Ok(Presence::AlreadyPresent(record.reference));
        }

        let reference = self
            .api
            .create(&NewTxtRecord::challenge(self.view, name, key))
            .await
            .map_err(|source| ReconcileError::Create {
                name: name.to_string(),
                source,
            })?;

        info!(%name, %reference, "Created TXT record");
        Ok(Presence::Created(reference))
    }

    /// Makes sure no TXT record `name = fqdn, text = key` exists. Records with other keys are left alone.
    ///
    /// A failed lookup counts as "nothing to delete": cleanup reports success rather than blocking the host on a
    /// provider outage.
    pub async fn cleanup(&self, fqdn: &str, key: &str) -> Result<Removal, ReconcileError> {
        let name = normalize_fqdn(fqdn);

        let existing = match self.find(name, key).await {
            Ok(existing) => existing,
            Err(err) => {
                warn!(%name, %err, "There was an error when checking if record already exists");
                None
            }
        };

        let Some(record) = existing else {
            info!(%name, "Skipping deletion, no existing record found");
            return Ok(Removal::NotFound);
        };

        self.api
            .delete(&record.reference)
            .await
            .map_err(|source| ReconcileError::Delete {
                name: name.to_string(),
                source,
            })?;

        info!(%name, reference = %record.reference, "Deleted TXT record");
        Ok(Removal::Deleted(record.reference))
    }

    /// First matching record in provider order.
    async fn find(&self, name: &str, key: &str) -> Result<Option<DnsRecord>, ProviderError> {
        let records = self.api.query(&TxtRecordFilter::new(self.view, name, key)).await?;

        if records.len() > 1 {
            warn!(
                %name,
                view = %self.view,
                count = records.len(),
                "Found multiple matching TXT records, acting on the first one only"
            );
        }

        Ok(records.into_iter().next())
    }
}
