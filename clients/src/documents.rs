//! JSON-LD documents over HTTP(S) and IPFS.

use crate::error::ClientError;
use crate::http::{get_json, join, HttpConfig};
use async_trait::async_trait;
use serde_json::Value;
use zkauth_verification::backend::{DocumentFetcher, FetchError};

pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io";

#[derive(Clone, Debug)]
pub struct HttpDocumentFetcher {
    http_client: reqwest::Client,
    ipfs_gateway: String,
}

impl HttpDocumentFetcher {
    pub fn new(
        ipfs_gateway: impl Into<String>,
        config: &HttpConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: config.client()?,
            ipfs_gateway: ipfs_gateway.into(),
        })
    }

    /// The HTTP(S) URL to fetch `uri` from.
    pub fn locate(&self, uri: &str) -> Result<String, ClientError> {
        if let Some(path) = uri.strip_prefix("ipfs://") {
            if path.is_empty() {
                return Err(ClientError::UnsupportedUri(uri.to_string()));
            }
            Ok(join(&self.ipfs_gateway, &format!("ipfs/{path}")))
        } else if uri.starts_with("https://") || uri.starts_with("http://") {
            Ok(uri.to_string())
        } else {
            Err(ClientError::UnsupportedUri(uri.to_string()))
        }
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, uri: &str) -> Result<Value, FetchError> {
        let url = self.locate(uri)?;
        let document: Value = get_json(&self.http_client, &url).await?;
        if !document.is_object() {
            return Err(FetchError::Invalid(format!("{uri} is not a JSON object")));
        }
        tracing::debug!(uri, "schema context fetched");
        Ok(document)
    }
}
