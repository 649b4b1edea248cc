use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Api;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("key {key:?} not found in secret {namespace}/{name}")]
    KeyMissing {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("value of key {key:?} in secret {namespace}/{name} is not valid utf-8")]
    InvalidUtf8 {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("unable to look up secret {namespace}/{name}: {source}")]
    Lookup {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
}

/// Key-value secret lookup, scoped by namespace.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the plaintext value stored under `key` in secret `name`.
    async fn get_secret(&self, namespace: &str, name: &str, key: &str) -> Result<String, SecretError>;
}

/// Reads Kubernetes `Secret` resources.
#[derive(Clone)]
pub struct KubeSecretStore {
    client: kube::Client,
}

impl KubeSecretStore {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get_secret(&self, namespace: &str, name: &str, key: &str) -> Result<String, SecretError> {
        trace!(%name, %namespace, %key, "secret lookup");

        let secret = Api::<Secret>::namespaced(self.client.clone(), namespace)
            .get_opt(name)
            .await
            .map_err(|source| SecretError::Lookup {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })?
            .ok_or_else(|| SecretError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        secret_value(secret, key)
            .ok_or_else(|| SecretError::KeyMissing {
                namespace: namespace.to_string(),
                name: name.to_string(),
                key: key.to_string(),
            })?
            .map_err(|_| SecretError::InvalidUtf8 {
                namespace: namespace.to_string(),
                name: name.to_string(),
                key: key.to_string(),
            })
    }
}

/// Looks `key` up in the secret's `data`, falling back to `stringData` for secrets that have not been round-tripped
/// through the API server.
fn secret_value(secret: Secret, key: &str) -> Option<Result<String, std::string::FromUtf8Error>> {
    if let Some(bytes) = secret.data.and_then(|mut data| data.remove(key)) {
        return Some(String::from_utf8(bytes.0));
    }
    secret.string_data.and_then(|mut data| data.remove(key)).map(Ok)
}
