//! Content-object metadata access.
//!
//! The [`MetadataGateway`] trait is the seam the session layer depends on.
//! [`HttpMetadataGateway`] implements it over the fabric content API:
//!
//! - `GET  /qlibs/{lib}/q/{object_or_token}/meta/{path}` read (404 = absent)
//! - `POST /qlibs/{lib}/qid/{object}` open an edit, returns a write token
//! - `POST /qlibs/{lib}/q/{token}/meta/{path}` merge
//! - `PUT  /qlibs/{lib}/q/{token}/meta/{path}` replace
//! - `POST /qlibs/{lib}/q/{token}` finalize, returns the version hash

use super::types::{FabricConfig, FabricError};
use crate::env::endpoints;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// An open edit on a content object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEdit {
    pub library_id: String,
    pub object_id: String,
    pub write_token: String,
}

/// Read/write access to content-object metadata
#[async_trait]
pub trait MetadataGateway: Send + Sync {
    /// Read the metadata subtree at `path`. `content_id` is either an object
    /// id (latest finalized version) or a write token (staged edits).
    async fn read_metadata(
        &self,
        library_id: &str,
        content_id: &str,
        path: &str,
    ) -> Result<Option<Value>, FabricError>;

    /// Open a new edit on an object and return its write token
    async fn open_edit(&self, library_id: &str, object_id: &str) -> Result<String, FabricError>;

    /// Deep-merge `value` into the subtree at `path`
    async fn merge_metadata(
        &self,
        edit: &ContentEdit,
        path: &str,
        value: &Value,
    ) -> Result<(), FabricError>;

    /// Overwrite the subtree at `path` with `value`
    async fn replace_metadata(
        &self,
        edit: &ContentEdit,
        path: &str,
        value: &Value,
    ) -> Result<(), FabricError>;

    /// Commit the edit and return the new version hash
    async fn finalize(&self, edit: &ContentEdit) -> Result<String, FabricError>;
}

/// Read a metadata subtree and deserialize it
pub async fn read_typed<T: DeserializeOwned>(
    gateway: &dyn MetadataGateway,
    library_id: &str,
    content_id: &str,
    path: &str,
) -> Result<Option<T>, FabricError> {
    match gateway.read_metadata(library_id, content_id, path).await? {
        Some(Value::Null) | None => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}

#[derive(Debug, Deserialize)]
struct EditResponse {
    write_token: String,
}

#[derive(Debug, Deserialize)]
struct FinalizeResponse {
    hash: String,
}

/// [`MetadataGateway`] over the fabric content HTTP API
#[derive(Debug, Clone)]
pub struct HttpMetadataGateway {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpMetadataGateway {
    pub fn new(config: &FabricConfig) -> Result<Self, FabricError> {
        if config.url.trim().is_empty() {
            return Err(FabricError::Config("fabric url not configured".to_string()));
        }
        let base_url = url::Url::parse(config.url.trim())
            .map_err(|e| FabricError::Config(format!("invalid fabric url: {}", e)))?
            .to_string()
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| FabricError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone(),
        })
    }

    fn content_url(&self, library_id: &str, content_id: &str) -> String {
        format!(
            "{}/{}/{}/q/{}",
            self.base_url,
            endpoints::QLIBS,
            library_id,
            content_id
        )
    }

    fn meta_url(&self, library_id: &str, content_id: &str, path: &str) -> String {
        format!(
            "{}/meta/{}",
            self.content_url(library_id, content_id),
            path.trim_matches('/')
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_checked(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<reqwest::Response, FabricError> {
        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(FabricError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl MetadataGateway for HttpMetadataGateway {
    async fn read_metadata(
        &self,
        library_id: &str,
        content_id: &str,
        path: &str,
    ) -> Result<Option<Value>, FabricError> {
        let url = self.meta_url(library_id, content_id, path);
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(FabricError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        Ok(Some(response.json().await?))
    }

    async fn open_edit(&self, library_id: &str, object_id: &str) -> Result<String, FabricError> {
        let url = format!(
            "{}/{}/{}/qid/{}",
            self.base_url,
            endpoints::QLIBS,
            library_id,
            object_id
        );
        debug!("POST {}", url);

        let response = self.send_checked(self.client.post(&url), &url).await?;
        let edit: EditResponse = response.json().await?;
        Ok(edit.write_token)
    }

    async fn merge_metadata(
        &self,
        edit: &ContentEdit,
        path: &str,
        value: &Value,
    ) -> Result<(), FabricError> {
        let url = self.meta_url(&edit.library_id, &edit.write_token, path);
        debug!("POST {} (merge)", url);

        self.send_checked(self.client.post(&url).json(value), &url)
            .await?;
        Ok(())
    }

    async fn replace_metadata(
        &self,
        edit: &ContentEdit,
        path: &str,
        value: &Value,
    ) -> Result<(), FabricError> {
        let url = self.meta_url(&edit.library_id, &edit.write_token, path);
        debug!("PUT {} (replace)", url);

        self.send_checked(self.client.put(&url).json(value), &url)
            .await?;
        Ok(())
    }

    async fn finalize(&self, edit: &ContentEdit) -> Result<String, FabricError> {
        let url = self.content_url(&edit.library_id, &edit.write_token);
        debug!("POST {} (finalize)", url);

        let response = self.send_checked(self.client.post(&url), &url).await?;
        let finalized: FinalizeResponse = response.json().await?;
        Ok(finalized.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> HttpMetadataGateway {
        HttpMetadataGateway::new(&FabricConfig {
            url: "https://fabric.example.com/".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_meta_url() {
        assert_eq!(
            gateway().meta_url("ilibY", "iq__X", "/live_recording/fabric_config"),
            "https://fabric.example.com/qlibs/ilibY/q/iq__X/meta/live_recording/fabric_config"
        );
    }

    #[test]
    fn test_missing_url_is_config_error() {
        let result = HttpMetadataGateway::new(&FabricConfig::default());
        assert!(matches!(result, Err(FabricError::Config(_))));
    }
}
