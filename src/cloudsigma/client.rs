//! CloudSigma Client
//!
//! Uniform access to the six resource collections of one region.

use super::http::CsHttpClient;
use crate::config::ClientConfig;
use crate::error::CliError;
use crate::resource::ResourceType;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use url::Url;

/// Disables server-side paging so every listing is complete
const NO_LIMIT: [(&str, &str); 1] = [("limit", "0")];

/// Main CloudSigma client
#[derive(Clone)]
pub struct CloudSigmaClient {
    pub config: ClientConfig,
    http: CsHttpClient,
    base_url: Url,
}

impl CloudSigmaClient {
    /// Create a new client for the configured region
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_endpoint)
            .with_context(|| format!("Invalid API endpoint {}", config.api_endpoint))?;
        let http = CsHttpClient::new(&config.username, &config.password)?;

        tracing::info!("Using CloudSigma API at {}", base_url);

        Ok(Self {
            config,
            http,
            base_url,
        })
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    fn url(&self, path: &str) -> Result<String> {
        self.base_url
            .join(path)
            .map(String::from)
            .with_context(|| format!("joining path `{}` to base URL", path))
    }

    /// Build a collection URL, e.g. `.../servers/`
    pub fn collection_url(&self, kind: ResourceType) -> Result<String> {
        self.url(&format!("{}/", kind.collection()))
    }

    /// Build a resource URL, e.g. `.../servers/{uuid}/`
    pub fn resource_url(&self, kind: ResourceType, uuid: &str) -> Result<String> {
        self.url(&format!("{}/{}/", kind.collection(), uuid))
    }

    fn ensure_mutable(kind: ResourceType) -> Result<()> {
        if !kind.is_mutable() {
            return Err(CliError::parameter(format!("{} are read-only", kind)).into());
        }
        Ok(())
    }

    // =========================================================================
    // Collection operations
    // =========================================================================

    /// Summary listing
    pub async fn list(&self, kind: ResourceType) -> Result<Vec<Value>> {
        let url = self.collection_url(kind)?;
        let response = self.http.get(&url, &NO_LIMIT).await?;
        Ok(extract_objects(response))
    }

    /// Detailed listing
    pub async fn list_detail(&self, kind: ResourceType) -> Result<Vec<Value>> {
        if !kind.has_detail_listing() {
            return Err(CliError::parameter(format!("{} have no detailed listing", kind)).into());
        }
        let url = self.url(&format!("{}/detail/", kind.collection()))?;
        let response = self.http.get(&url, &NO_LIMIT).await?;
        Ok(extract_objects(response))
    }

    /// Create one resource
    pub async fn create(&self, kind: ResourceType, params: Value) -> Result<Value> {
        Self::ensure_mutable(kind)?;
        tracing::info!("create {}", kind);
        let url = self.collection_url(kind)?;
        let body = json!({ "objects": [params] });
        let response = self.http.post(&url, &[], Some(&body)).await?;
        first_object(response)
    }

    /// Replace a resource definition
    pub async fn update(&self, kind: ResourceType, uuid: &str, record: &Value) -> Result<Value> {
        Self::ensure_mutable(kind)?;
        tracing::info!("update {} {}", kind, uuid);
        let url = self.resource_url(kind, uuid)?;
        self.http.put(&url, record).await
    }

    /// Delete a resource; `recurse` selects attached resources to delete too
    pub async fn delete(&self, kind: ResourceType, uuid: &str, recurse: Option<&str>) -> Result<Value> {
        Self::ensure_mutable(kind)?;
        tracing::info!("delete {} {} recurse={:?}", kind, uuid, recurse);
        let url = self.resource_url(kind, uuid)?;
        let query: Vec<(&str, &str)> = recurse.map(|r| ("recurse", r)).into_iter().collect();
        self.http.delete(&url, &query).await
    }

    /// Invoke a resource action, e.g. `start` on a server
    pub async fn action(
        &self,
        kind: ResourceType,
        uuid: &str,
        action: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        Self::ensure_mutable(kind)?;
        tracing::info!("action {} on {} {}", action, kind, uuid);
        let url = self.url(&format!("{}/{}/action/", kind.collection(), uuid))?;
        self.http.post(&url, &[("do", action)], body).await
    }

    /// Runtime data of a running server
    pub async fn server_runtime(&self, uuid: &str) -> Result<Value> {
        let url = self.url(&format!("servers/{}/runtime/", uuid))?;
        self.http.get(&url, &[]).await
    }

    /// Upload a drive image; returns the uuid of the created drive
    pub async fn upload_drive_image(&self, image: Vec<u8>) -> Result<String> {
        tracing::info!("uploading {} byte drive image", image.len());
        let uuid = self
            .http
            .post_octets(&self.config.upload_endpoint, image)
            .await?;
        if uuid.is_empty() {
            return Err(anyhow::anyhow!("Upload returned no drive uuid"));
        }
        Ok(uuid)
    }
}

/// Pull the record list out of a collection response
///
/// Collections answer `{"meta": ..., "objects": [...]}`; single-object
/// endpoints such as capabilities answer with the object itself.
fn extract_objects(response: Value) -> Vec<Value> {
    match response {
        Value::Object(mut map) => match map.remove("objects") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                map.insert("objects".to_string(), other);
                vec![Value::Object(map)]
            }
            None => vec![Value::Object(map)],
        },
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn first_object(response: Value) -> Result<Value> {
    if response.get("objects").is_none() {
        return Ok(response);
    }
    extract_objects(response)
        .into_iter()
        .next()
        .context("Create returned no objects")
}
