//! Per-challenge solver configuration.
//!
//! The configuration is set by users in `issuer.spec.acme.dns01.webhook.config` and handed to the solver as raw JSON
//! with every challenge. Credentials are never part of it directly, only references to secrets in the challenge's
//! namespace.

use crate::{
    dns::{
        ConnectionParams,
        Credentials,
    },
    secrets::{
        SecretError,
        SecretStore,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

/// Fallback values for string fields that were absent or empty, keyed by JSON field name.
pub const FIELD_DEFAULTS: [(&str, &str); 3] = [("scheme", "https"), ("port", "443"), ("version", "2.8")];

pub const DEFAULT_TLS_VERIFY: bool = true;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to decode solver config: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Secret(#[from] SecretError),
}

/// Points at a key of a secret in the challenge's namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretKeyRef {
    pub name: String,
    pub key: String,
}

/// The configuration as it appears on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawProviderConfig {
    view: String,
    host: String,
    scheme: String,
    port: String,
    version: String,
    ssl_verify: Option<bool>,
    username_secret_ref: SecretKeyRef,
    password_secret_ref: SecretKeyRef,
}

impl RawProviderConfig {
    fn field_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "scheme" => Some(&mut self.scheme),
            "port" => Some(&mut self.port),
            "version" => Some(&mut self.version),
            _ => None,
        }
    }

    fn with_defaults(mut self) -> Self {
        for (field, default) in FIELD_DEFAULTS {
            if let Some(value) = self.field_mut(field).filter(|value| value.is_empty()) {
                *value = default.to_string();
            }
        }
        self
    }
}

/// Decoded solver configuration with defaults applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    pub view: String,
    pub host: String,
    pub scheme: String,
    pub port: String,
    pub version: String,
    pub tls_verify: bool,
    pub username_ref: SecretKeyRef,
    pub password_ref: SecretKeyRef,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        RawProviderConfig::default().into()
    }
}

impl From<RawProviderConfig> for ProviderConfig {
    fn from(raw: RawProviderConfig) -> Self {
        let RawProviderConfig {
            view,
            host,
            scheme,
            port,
            version,
            ssl_verify,
            username_secret_ref,
            password_secret_ref,
        } = raw.with_defaults();

        Self {
            view,
            host,
            scheme,
            port,
            version,
            tls_verify: ssl_verify.unwrap_or(DEFAULT_TLS_VERIFY),
            username_ref: username_secret_ref,
            password_ref: password_secret_ref,
        }
    }
}

impl ProviderConfig {
    /// Decodes the raw JSON config. A challenge without config yields the defaults.
    ///
    /// Unknown fields are ignored. A string field set to `""` is treated like an absent one.
    pub fn decode(raw: Option<&[u8]>) -> Result<Self, ConfigError> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };

        let raw: RawProviderConfig = serde_json::from_slice(raw).inspect_err(|err| {
            error!(%err, "unable to decode the solver config");
        })?;

        Ok(raw.into())
    }
}

/// Decoded configuration together with the credentials it refers to.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub config: ProviderConfig,
    pub credentials: Credentials,
}

impl ResolvedConfig {
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            scheme: self.config.scheme.clone(),
            host: self.config.host.clone(),
            port: self.config.port.clone(),
            version: self.config.version.clone(),
            tls_verify: self.config.tls_verify,
            credentials: self.credentials.clone(),
        }
    }
}

/// Decodes challenge config and resolves the credentials it references.
pub struct ConfigResolver<'a> {
    secrets: &'a dyn SecretStore,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(secrets: &'a dyn SecretStore) -> Self {
        Self { secrets }
    }

    /// Decodes `raw` and looks up both credentials in `namespace`.
    ///
    /// A challenge without config decodes to the defaults without error (see [`ProviderConfig::decode`]), but the
    /// defaults reference no secrets, so resolving it fails with [`SecretError::NotFound`]. Infoblox always needs
    /// credentials.
    pub async fn resolve(&self, raw: Option<&[u8]>, namespace: &str) -> Result<ResolvedConfig, ConfigError> {
        let config = ProviderConfig::decode(raw)?;

        let username = self.resolve_ref(&config.username_ref, namespace).await?;
        let password = self.resolve_ref(&config.password_ref, namespace).await?;

        Ok(ResolvedConfig {
            config,
            credentials: Credentials { username, password },
        })
    }

    async fn resolve_ref(&self, selector: &SecretKeyRef, namespace: &str) -> Result<String, SecretError> {
        if selector.name.is_empty() {
            return Err(SecretError::NotFound {
                namespace: namespace.to_string(),
                name: selector.name.clone(),
            });
        }

        let value = self
            .secrets
            .get_secret(namespace, &selector.name, &selector.key)
            .await?;

        Ok(value.trim_end_matches(['\r', '\n']).to_string())
    }
}
