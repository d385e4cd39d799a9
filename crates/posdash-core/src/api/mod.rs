//! HTTP record gateway for the posdash API.
//!
//! One round trip per call, no retries. All failures are normalized into
//! [`ApiError`].

mod error;

use std::future::Future;
use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::config::{normalize_http_url, ClientConfig, ConfigError, ConfigResult};
use crate::models::{BackendStatus, RecordId, Resource, ResourceKind};

pub use error::{ApiError, ApiErrorKind, ApiResult};

/// CRUD operations for one resource kind.
pub trait RecordGateway<R: Resource>: Send + Sync + 'static {
    fn list_all(&self) -> impl Future<Output = ApiResult<Vec<R>>> + Send;

    fn get_one(&self, id: &RecordId) -> impl Future<Output = ApiResult<R>> + Send;

    /// Persist a record that has no identity yet; returns it with one.
    fn create(&self, record: &R) -> impl Future<Output = ApiResult<R>> + Send;

    fn update(&self, id: &RecordId, patch: &R::Patch) -> impl Future<Output = ApiResult<R>> + Send;

    fn delete(&self, id: &RecordId) -> impl Future<Output = ApiResult<()>> + Send;
}

/// Source of backend health reports.
pub trait StatusSource: Send + Sync + 'static {
    fn fetch_status(&self) -> impl Future<Output = ApiResult<BackendStatus>> + Send;
}

/// reqwest-backed client for the posdash REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Builds a client for an explicit API base URL.
    pub fn new(base_url: &str, timeout: Duration) -> ConfigResult<Self> {
        let base_url = normalize_http_url(base_url, "api_base_url")?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                ConfigError::Invalid(format!("Failed to construct HTTP client: {error}"))
            })?;
        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &ClientConfig) -> ConfigResult<Self> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list<R: Resource>(&self) -> ApiResult<Vec<R>> {
        tracing::debug!("GET /{}", R::KIND.collection());
        self.send_json(self.client.get(self.collection_url(R::KIND)))
            .await
    }

    pub async fn get<R: Resource>(&self, id: &RecordId) -> ApiResult<R> {
        self.send_json(self.client.get(self.record_url(R::KIND, id)))
            .await
    }

    pub async fn create_record<R: Resource>(&self, record: &R) -> ApiResult<R> {
        tracing::debug!("POST /{}", R::KIND.collection());
        self.send_json(self.client.post(self.collection_url(R::KIND)).json(record))
            .await
    }

    pub async fn update_record<R: Resource>(&self, id: &RecordId, patch: &R::Patch) -> ApiResult<R> {
        tracing::debug!("PUT /{}/{}", R::KIND.collection(), id);
        self.send_json(self.client.put(self.record_url(R::KIND, id)).json(patch))
            .await
    }

    pub async fn delete_record(&self, kind: ResourceKind, id: &RecordId) -> ApiResult<()> {
        tracing::debug!("DELETE /{}/{}", kind.collection(), id);
        self.send(self.client.delete(self.record_url(kind, id)))
            .await
            .map(drop)
    }

    pub async fn status(&self) -> ApiResult<BackendStatus> {
        self.send_json(self.client.get(format!("{}/status", self.base_url)))
            .await
    }

    fn collection_url(&self, kind: ResourceKind) -> String {
        format!("{}/{}", self.base_url, kind.collection())
    }

    fn record_url(&self, kind: ResourceKind, id: &RecordId) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            kind.collection(),
            urlencoding::encode(id.as_str())
        )
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<reqwest::Response> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| {
                let error = ApiError::from_transport(&error);
                tracing::warn!("API request failed: {}", error);
                error
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = ApiError::from_response(status, &body);
            tracing::warn!("API returned HTTP {}: {}", status.as_u16(), error);
            return Err(error);
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|error| ApiError::from_transport(&error))
    }
}

impl<R: Resource> RecordGateway<R> for ApiClient {
    async fn list_all(&self) -> ApiResult<Vec<R>> {
        self.list::<R>().await
    }

    async fn get_one(&self, id: &RecordId) -> ApiResult<R> {
        self.get::<R>(id).await
    }

    async fn create(&self, record: &R) -> ApiResult<R> {
        self.create_record(record).await
    }

    async fn update(&self, id: &RecordId, patch: &R::Patch) -> ApiResult<R> {
        self.update_record::<R>(id, patch).await
    }

    async fn delete(&self, id: &RecordId) -> ApiResult<()> {
        self.delete_record(R::KIND, id).await
    }
}

impl StatusSource for ApiClient {
    async fn fetch_status(&self) -> ApiResult<BackendStatus> {
        self.status().await
    }
}
