//! Nullable key storage.

use crate::lock;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use zkauth_types::CircuitId;
use zkauth_verification::backend::{KeyLoadError, KeyLoader};

/// In-memory verification keys, keyed by circuit.
#[derive(Default)]
pub struct NullKeyLoader {
    keys: Mutex<HashMap<CircuitId, Vec<u8>>>,
    failures: Mutex<VecDeque<KeyLoadError>>,
    loads: Mutex<Vec<CircuitId>>,
}

impl NullKeyLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader holding a placeholder key for each of `circuits`.
    pub fn with_circuits<'a>(circuits: impl IntoIterator<Item = &'a str>) -> Self {
        let loader = Self::new();
        for circuit in circuits {
            loader.insert(CircuitId::new(circuit), format!("vk:{circuit}").into_bytes());
        }
        loader
    }

    pub fn insert(&self, circuit: CircuitId, key: Vec<u8>) {
        lock(&self.keys).insert(circuit, key);
    }

    pub fn remove(&self, circuit: &CircuitId) {
        lock(&self.keys).remove(circuit);
    }

    /// Fail the next load with `error`, whatever the circuit.
    pub fn fail_next(&self, error: KeyLoadError) {
        lock(&self.failures).push_back(error);
    }

    /// Circuits requested so far, in order.
    pub fn loads(&self) -> Vec<CircuitId> {
        lock(&self.loads).clone()
    }
}

#[async_trait]
impl KeyLoader for NullKeyLoader {
    async fn load(&self, circuit: &CircuitId) -> Result<Vec<u8>, KeyLoadError> {
        lock(&self.loads).push(circuit.clone());
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }
        lock(&self.keys)
            .get(circuit)
            .cloned()
            .ok_or_else(|| KeyLoadError::NotFound(circuit.clone()))
    }
}
