use super::{
    ConnectionParams,
    Connector,
    Credentials,
    DnsRecord,
    NewTxtRecord,
    ProviderError,
    RecordApi,
    TxtRecordFilter,
};
use async_trait::async_trait;
use reqwest::Method;
use serde::{
    de::DeserializeOwned,
    Deserialize,
    Serialize,
};
use std::time::Duration;

// curl -k -u admin:infoblox 'https://gridmaster:443/wapi/v2.8/record:txt?name=_acme-challenge.example.com&view=default'

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const POOL_CONNECTIONS: usize = 10;

const TXT_RECORD_OBJECT: &str = "record:txt";

/// Error document returned by WAPI for failed requests.
#[derive(Debug, Deserialize)]
struct WapiError {
    #[serde(rename = "Error")]
    error: Option<String>,
    text: Option<String>,
}

/// Builds a [`WapiClient`] per set of connection parameters.
#[derive(Clone, Debug)]
pub struct WapiConnector {
    timeout: Duration,
}

impl WapiConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for WapiConnector {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Connector for WapiConnector {
    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn RecordApi>, ProviderError> {
        Ok(Box::new(WapiClient::new(params, self.timeout)?))
    }
}

/// Client for the Infoblox WAPI REST interface.
pub struct WapiClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl WapiClient {
    pub fn new(params: &ConnectionParams, timeout: Duration) -> Result<Self, ProviderError> {
        if params.host.is_empty() {
            return Err(ProviderError::Connection("no infoblox host configured".to_string()));
        }

        if !params.tls_verify {
            warn!(host = %params.host, "TLS certificate verification is disabled");
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(POOL_CONNECTIONS)
            .danger_accept_invalid_certs(!params.tls_verify)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url(params),
            credentials: params.credentials.clone(),
        })
    }

    async fn request<R, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<R, ProviderError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        trace!(%method, %url, "wapi request");

        let req = self
            .client
            .request(method, url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .query(query);

        let req = if let Some(body) = body { req.json(body) } else { req };

        // reqwest errors print the request url, which carries record references and challenge keys
        let res = req.send().await.map_err(reqwest::Error::without_url)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| status.to_string()),
            });
        }

        Ok(res.json().await.map_err(reqwest::Error::without_url)?)
    }
}

#[async_trait]
impl RecordApi for WapiClient {
    async fn query(&self, filter: &TxtRecordFilter) -> Result<Vec<DnsRecord>, ProviderError> {
        self.request::<_, ()>(Method::GET, TXT_RECORD_OBJECT, &filter.query_params(), None)
            .await
    }

    async fn create(&self, record: &NewTxtRecord) -> Result<String, ProviderError> {
        self.request(Method::POST, TXT_RECORD_OBJECT, &[], Some(record)).await
    }

    async fn delete(&self, reference: &str) -> Result<String, ProviderError> {
        self.request::<_, ()>(Method::DELETE, reference, &[], None).await
    }
}

fn base_url(params: &ConnectionParams) -> String {
    let ConnectionParams {
        scheme,
        host,
        port,
        version,
        ..
    } = params;
    format!("{scheme}://{host}:{port}/wapi/v{version}/")
}

fn error_message(body: &str) -> Option<String> {
    let err: WapiError = serde_json::from_str(body).ok()?;
    err.text.or(err.error)
}
