//! Nullable JSON-LD document store.

use crate::lock;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use zkauth_verification::backend::{DocumentFetcher, FetchError};

#[derive(Default)]
pub struct NullDocumentFetcher {
    documents: Mutex<HashMap<String, Value>>,
    failures: Mutex<VecDeque<FetchError>>,
}

impl NullDocumentFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uri: &str, document: Value) {
        lock(&self.documents).insert(uri.to_string(), document);
    }

    /// Serve a minimal context at `uri` declaring `types`.
    pub fn declare(&self, uri: &str, types: &[&str]) {
        let ctx: Map<String, Value> = types
            .iter()
            .map(|t| (t.to_string(), json!({"@id": format!("urn:zkauth:{t}")})))
            .collect();
        self.insert(uri, json!({"@context": [Value::Object(ctx)]}));
    }

    pub fn fail_next(&self, error: FetchError) {
        lock(&self.failures).push_back(error);
    }
}

#[async_trait]
impl DocumentFetcher for NullDocumentFetcher {
    async fn fetch(&self, uri: &str) -> Result<Value, FetchError> {
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }
        lock(&self.documents)
            .get(uri)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(uri.to_string()))
    }
}
