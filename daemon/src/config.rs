//! Server configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zkauth_clients::documents::DEFAULT_IPFS_GATEWAY;
use zkauth_clients::HttpConfig;
use zkauth_rpc::RpcConfig;
use zkauth_utils::LogFormat;
use zkauth_verification::{ReissuePolicy, SignInPolicy, VerifierConfig};

/// Path of the callback endpoint relative to `public_url`.
pub const CALLBACK_PATH: &str = "/api/callback";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("invalid config: {0}")]
    Parse(String),
    #[error("cannot serialize config: {0}")]
    Serialize(String),
}

/// One on-chain identity state contract, selected by DID network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// DID network, e.g. `polygon:amoy`.
    pub network: String,
    pub contract_address: String,
    /// Base URL of the state lookup service for this network.
    pub endpoint: String,
}

/// Configuration for a zkauth server.
///
/// Can be loaded from a TOML file via [`ServerConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Externally reachable base URL; the wallet callback is built from it.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Verifier DID placed in every challenge's `from`.
    #[serde(default = "default_audience")]
    pub audience: String,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Sessions older than this are evicted by the reaper.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// What sign-in does for a session id that already exists.
    #[serde(default)]
    pub reissue: ReissuePolicy,

    /// Explicit sign-in policy. When absent the social credential policy
    /// is built from `audience` and `public_url`.
    #[serde(default)]
    pub policy: Option<SignInPolicy>,

    /// Directory holding `{circuitId}/verification_key.json`.
    #[serde(default = "default_key_dir")]
    pub key_dir: PathBuf,

    #[serde(default = "default_ipfs_gateway")]
    pub ipfs_gateway: String,

    /// Base URL of the proof verification engine.
    #[serde(default = "default_proof_engine_url")]
    pub proof_engine_url: String,

    #[serde(default = "default_resolvers")]
    pub resolvers: Vec<ResolverConfig>,

    #[serde(default)]
    pub verifier: VerifierConfig,

    /// Outbound HTTP timeouts shared by every backend client.
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub rpc: RpcConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_audience() -> String {
    "did:iden3:polygon:amoy:x6x5sor7zpxhPBRFEZXv8dKoxpEibsDHHhFAaCbne".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_ttl_secs() -> u64 {
    3_600
}

fn default_reap_interval_secs() -> u64 {
    60
}

fn default_max_sessions() -> usize {
    zkauth_store::memory::DEFAULT_CAPACITY
}

fn default_key_dir() -> PathBuf {
    PathBuf::from("./keys")
}

fn default_ipfs_gateway() -> String {
    DEFAULT_IPFS_GATEWAY.to_string()
}

fn default_proof_engine_url() -> String {
    "http://localhost:8090".to_string()
}

fn default_resolvers() -> Vec<ResolverConfig> {
    vec![ResolverConfig {
        network: "polygon:amoy".to_string(),
        contract_address: "0x1a4cC30f2aA0377b0c3bc9848766D90cb4404124".to_string(),
        endpoint: "http://localhost:8091".to_string(),
    }]
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Full URL the wallet posts its response to (session id appended later).
    pub fn callback_url(&self) -> String {
        format!("{}{}", self.public_url.trim_end_matches('/'), CALLBACK_PATH)
    }

    /// The configured policy, or the default social credential one.
    pub fn sign_in_policy(&self) -> SignInPolicy {
        self.policy.clone().unwrap_or_else(|| {
            SignInPolicy::social_credential(self.audience.clone(), self.callback_url())
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            public_url: default_public_url(),
            audience: default_audience(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            session_ttl_secs: default_session_ttl_secs(),
            reap_interval_secs: default_reap_interval_secs(),
            max_sessions: default_max_sessions(),
            reissue: ReissuePolicy::default(),
            policy: None,
            key_dir: default_key_dir(),
            ipfs_gateway: default_ipfs_gateway(),
            proof_engine_url: default_proof_engine_url(),
            resolvers: default_resolvers(),
            verifier: VerifierConfig::default(),
            http: HttpConfig::default(),
            rpc: RpcConfig::default(),
        }
    }
}
