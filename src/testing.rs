//! In-memory stand-ins for the secret store and the provider API.

use crate::{
    dns::{
        ConnectionParams,
        Connector,
        DnsRecord,
        NewTxtRecord,
        ProviderError,
        RecordApi,
        TxtRecordFilter,
    },
    secrets::{
        SecretError,
        SecretStore,
    },
};
use async_trait::async_trait;
use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    sync::{
        Arc,
        Mutex,
    },
};

#[derive(Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<(String, String), BTreeMap<String, String>>>,
    lookups: Mutex<usize>,
}

impl MemorySecretStore {
    pub fn insert(&self, namespace: &str, name: &str, key: &str, value: &str) {
        self.secrets
            .lock()
            .unwrap()
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret(&self, namespace: &str, name: &str, key: &str) -> Result<String, SecretError> {
        *self.lookups.lock().unwrap() += 1;

        let secrets = self.secrets.lock().unwrap();
        let data = secrets
            .get(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| SecretError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;
        data.get(key).cloned().ok_or_else(|| SecretError::KeyMissing {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
        })
    }
}

#[derive(Default)]
struct ProviderState {
    records: Vec<DnsRecord>,
    next_id: u64,
    queries: usize,
    created: Vec<NewTxtRecord>,
    deleted: Vec<String>,
    fail_query: bool,
    fail_create: bool,
    fail_delete: bool,
}

/// A provider holding its records in memory. Clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryRecordApi {
    state: Arc<Mutex<ProviderState>>,
}

fn injected_failure() -> ProviderError {
    ProviderError::Api {
        status: 500,
        message: "injected failure".to_string(),
    }
}

impl MemoryRecordApi {
    /// Adds a record without going through [`RecordApi::create`].
    pub fn seed(&self, view: &str, name: &str, text: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let reference = state.next_reference(name, view);
        state.records.push(DnsRecord {
            reference: reference.clone(),
            view: view.to_string(),
            name: name.to_string(),
            text: text.to_string(),
        });
        reference
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn queries(&self) -> usize {
        self.state.lock().unwrap().queries
    }

    pub fn created(&self) -> Vec<NewTxtRecord> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn fail_query(&self) {
        self.state.lock().unwrap().fail_query = true;
    }

    pub fn fail_create(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    pub fn fail_delete(&self) {
        self.state.lock().unwrap().fail_delete = true;
    }
}

impl ProviderState {
    fn next_reference(&mut self, name: &str, view: &str) -> String {
        self.next_id += 1;
        format!("record:txt/{:08x}:{name}/{view}", self.next_id)
    }
}

#[async_trait]
impl RecordApi for MemoryRecordApi {
    async fn query(&self, filter: &TxtRecordFilter) -> Result<Vec<DnsRecord>, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.queries += 1;
        if state.fail_query {
            return Err(injected_failure());
        }
        Ok(state
            .records
            .iter()
            .filter(|record| {
                record.name == filter.name
                    && record.text == filter.text
                    && (filter.view.is_empty() || record.view == filter.view)
            })
            .cloned()
            .collect())
    }

    async fn create(&self, record: &NewTxtRecord) -> Result<String, ProviderError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(injected_failure());
        }
        let reference = state.next_reference(&record.name, &record.view);
        state.created.push(record.clone());
        state.records.push(DnsRecord {
            reference: reference.clone(),
            view: record.view.clone(),
            name: record.name.clone(),
            text: record.text.clone(),
        });
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<String, ProviderError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete {
            return Err(injected_failure());
        }
        let before = state.records.len();
        state.records.retain(|record| record.reference != reference);
        if state.records.len() == before {
            return Err(ProviderError::Api {
                status: 404,
                message: "AdmConDataNotFoundError: Reference not found".to_string(),
            });
        }
        state.deleted.push(reference.to_string());
        Ok(reference.to_string())
    }
}

/// Hands out the same [`MemoryRecordApi`] for every connection and remembers the parameters it was asked for.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    pub api: MemoryRecordApi,
    connections: Arc<Mutex<Vec<ConnectionParams>>>,
}

impl MemoryConnector {
    pub fn connections(&self) -> Vec<ConnectionParams> {
        self.connections.lock().unwrap().clone()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn RecordApi>, ProviderError> {
        self.connections.lock().unwrap().push(params.clone());
        Ok(Box::new(self.api.clone()))
    }
}
