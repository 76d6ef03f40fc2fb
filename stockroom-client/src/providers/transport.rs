//! Authenticated JSON transport
//!
//! Thin wrapper over `reqwest`: bearer token on every call, fixed 30 second
//! timeout, JSON in and out. The token can be swapped without rebuilding the
//! client.

use crate::error::{Result, SyncError};
use reqwest::header::CONTENT_TYPE;
use reqwest::{IntoUrl, Method, RequestBuilder, Url};
use serde_json::Value;
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Per-request wall-clock timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("stockroom/", env!("CARGO_PKG_VERSION"));

/// HTTP transport bound to one base URL
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: RwLock<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: RwLock::new(api_key.into()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the bearer token used by subsequent requests
    pub fn update_api_key(&self, api_key: &str) {
        let mut key = self.api_key.write().unwrap_or_else(|e| e.into_inner());
        *key = api_key.to_string();
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let builder = self.request(Method::GET, path).query(query);
        self.send(builder, Method::GET, path).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let builder = self.request(Method::POST, path).json(body);
        self.send(builder, Method::POST, path).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        let builder = self.request(Method::PATCH, path).json(body);
        self.send(builder, Method::PATCH, path).await
    }

    pub async fn delete(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let builder = self.request(Method::DELETE, path).query(query);
        self.send(builder, Method::DELETE, path).await
    }

    /// Delete one item addressed as `path/<id>`, with `id` percent-encoded
    pub async fn delete_item(&self, path: &str, id: &str) -> Result<Value> {
        let url = self.item_url(path, id)?;
        let display = url.path().to_string();
        let builder = self.authorized(Method::DELETE, url);
        self.send(builder, Method::DELETE, &display).await
    }

    fn item_url(&self, path: &str, id: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| SyncError::Transport(format!("invalid URL for {}: {}", path, e)))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Transport(format!("cannot extend URL {}", path)))?
            .push(id);
        Ok(url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authorized(method, format!("{}{}", self.base_url, path))
    }

    fn authorized(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        let token = self
            .api_key
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        self.client
            .request(method, url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
    }

    /// Send a request and decode the body as JSON
    ///
    /// Any JSON body is returned as-is, whatever the status code: the caller
    /// judges it by its envelope. A body that is not JSON means no envelope
    /// was obtained and is reported as a transport error.
    async fn send(&self, builder: RequestBuilder, method: Method, path: &str) -> Result<Value> {
        let response = builder.send().await?;
        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "Datasheet API response");

        let bytes = response.bytes().await?;
        serde_json::from_slice::<Value>(&bytes).map_err(|_| {
            let preview: String = String::from_utf8_lossy(&bytes).chars().take(200).collect();
            SyncError::Transport(format!(
                "HTTP {} from {} {}: unexpected non-JSON body: {}",
                status.as_u16(),
                method,
                path,
                preview
            ))
        })
    }
}
