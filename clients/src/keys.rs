//! Verification keys on local disk.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use zkauth_types::CircuitId;
use zkauth_verification::backend::{KeyLoadError, KeyLoader};

pub const KEY_FILE_NAME: &str = "verification_key.json";

/// Reads `{dir}/{circuitId}/verification_key.json` on every call.
#[derive(Clone, Debug)]
pub struct FsKeyLoader {
    dir: PathBuf,
}

impl FsKeyLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the key for `circuit`, or `None` if the id could escape `dir`.
    pub fn key_path(&self, circuit: &CircuitId) -> Option<PathBuf> {
        circuit
            .is_path_safe()
            .then(|| self.dir.join(circuit.as_str()).join(KEY_FILE_NAME))
    }
}

#[async_trait]
impl KeyLoader for FsKeyLoader {
    async fn load(&self, circuit: &CircuitId) -> Result<Vec<u8>, KeyLoadError> {
        let Some(path) = self.key_path(circuit) else {
            tracing::warn!(circuit = %circuit, "refusing key lookup for unsafe circuit id");
            return Err(KeyLoadError::NotFound(circuit.clone()));
        };
        match tokio::fs::read(&path).await {
            Ok(key) => {
                tracing::trace!(circuit = %circuit, bytes = key.len(), "verification key loaded");
                Ok(key)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(KeyLoadError::NotFound(circuit.clone()))
            }
            Err(e) => Err(KeyLoadError::Unavailable(format!("{}: {e}", path.display()))),
        }
    }
}
