//! HTTP-backed transport.
//!
//! The engine does not pick an HTTP library; the host hands in anything
//! implementing [`HttpClient`] and [`HttpTransport`] layers the service's
//! envelope, identity parameters and auth headers on top.

use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use async_trait::async_trait;
use glowmark_protocol::{
    AckRequest, AckResponse, ApiEnvelope, ArchiveRequest, DeleteRequest, DownloadRequest,
    DownloadResponse, InitRequest, InitResponse,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

const API_INIT: &str = "/apix/openapi/sync/init";
const API_DOWNLOAD: &str = "/apix/openapi/sync/download";
const API_ACK: &str = "/apix/openapi/sync/ack";
const API_ARCHIVE: &str = "/apix/openapi/sync/archive";
const API_DELETE: &str = "/apix/openapi/sync/delete";

/// A minimal async HTTP POST seam supplied by the host.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POSTs `body` to `url` with the given headers, returning the raw
    /// response. Transport-level failures come back as a message string.
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, String>;
}

/// A raw HTTP response as the transport consumes it.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Status line text, used in error notices.
    pub status_text: String,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fixed identifiers the service expects on every call.
#[derive(Debug, Clone)]
pub struct ClientIdent {
    /// Application id, sent as the `appid` query parameter.
    pub app_id: String,
    /// Service id, sent as `serviceId` in every request body.
    pub service_id: u32,
    /// Endpoint platform name, sent as the `ep` query parameter.
    pub endpoint: String,
    /// Human-readable client version, sent as `version`.
    pub version: String,
    /// Numeric protocol version, sent as `v` in every request body.
    pub version_num: u32,
}

impl Default for ClientIdent {
    fn default() -> Self {
        Self {
            app_id: "11".to_string(),
            service_id: 3,
            endpoint: "obsidian".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            version_num: 402,
        }
    }
}

/// [`SyncTransport`] over a host-supplied [`HttpClient`].
pub struct HttpTransport<C> {
    base_url: String,
    client: C,
    ident: ClientIdent,
    client_instance_id: String,
    token: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport against `base_url` (no trailing slash).
    /// `client_instance_id` distinguishes this installation in the
    /// server's conflict detection.
    pub fn new(
        base_url: impl Into<String>,
        client: C,
        ident: ClientIdent,
        client_instance_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            ident,
            client_instance_id: client_instance_id.into(),
            token: RwLock::new(None),
        }
    }

    fn url_for(&self, path: &str) -> String {
        let reqtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        format!(
            "{}{}?appid={}&ep={}&version={}&reqtime={}",
            self.base_url, path, self.ident.app_id, self.ident.endpoint, self.ident.version,
            reqtime
        )
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Client-Id".to_string(), self.client_instance_id.clone()),
        ];
        if let Some(token) = self.token.read().as_ref() {
            headers.push(("Authorization".to_string(), format!("Token {token}")));
        }
        headers
    }

    fn encode_body<R: Serialize>(&self, request: &R) -> SyncResult<Vec<u8>> {
        let mut value = serde_json::to_value(request)
            .map_err(|e| SyncError::transport_fatal(format!("encode request: {e}")))?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("v".to_string(), self.ident.version_num.into());
            obj.insert("serviceId".to_string(), self.ident.service_id.into());
        }
        serde_json::to_vec(&value)
            .map_err(|e| SyncError::transport_fatal(format!("encode request: {e}")))
    }

    async fn post_api<R: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        request: &R,
    ) -> SyncResult<T> {
        let url = self.url_for(path);
        let body = self.encode_body(request)?;
        let response = self
            .client
            .post(&url, &self.headers(), body)
            .await
            .map_err(SyncError::transport_retryable)?;
        if !response.is_success() {
            return Err(status_error(response.status, &response.status_text));
        }
        let data = ApiEnvelope::<T>::decode(&response.body)?.into_data()?;
        Ok(data)
    }
}

/// Archive and delete responses carry no payload worth decoding; a
/// success envelope without `data` is still a success.
fn ignore_payload(result: SyncResult<serde_json::Value>) -> SyncResult<()> {
    use glowmark_protocol::ProtocolError;
    match result {
        Ok(_) => Ok(()),
        Err(SyncError::Protocol(ProtocolError::MissingData)) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Maps the conflict statuses the service uses onto actionable notices.
fn status_error(status: u16, status_text: &str) -> SyncError {
    match status {
        409 => SyncError::transport_fatal(
            "sync was initiated by a different client; wait for it to finish and retry",
        ),
        417 => SyncError::transport_retryable(
            "the export task is locked by another run; retry in a moment",
        ),
        _ => SyncError::transport_retryable(format!("http {status}: {status_text}")),
    }
}

#[async_trait]
impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    async fn init(&self, request: &InitRequest) -> SyncResult<InitResponse> {
        self.post_api(API_INIT, request).await
    }

    async fn download(&self, request: &DownloadRequest) -> SyncResult<DownloadResponse> {
        self.post_api(API_DOWNLOAD, request).await
    }

    async fn ack(&self, request: &AckRequest) -> SyncResult<AckResponse> {
        self.post_api(API_ACK, request).await
    }

    async fn archive(&self, request: &ArchiveRequest) -> SyncResult<()> {
        ignore_payload(self.post_api::<_, serde_json::Value>(API_ARCHIVE, request).await)
    }

    async fn delete(&self, request: &DeleteRequest) -> SyncResult<()> {
        ignore_payload(self.post_api::<_, serde_json::Value>(API_DELETE, request).await)
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }
}
