//! The sync transport seam and its scripted test double.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use glowmark_protocol::{
    AckRequest, AckResponse, ArchiveRequest, DeleteRequest, DownloadRequest, DownloadResponse,
    InitRequest, InitResponse,
};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// The five server operations the engine drives.
///
/// Implementations own authentication headers and wire details; the
/// engine only ever sees typed requests and responses.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Opens or polls the server-side export task.
    async fn init(&self, request: &InitRequest) -> SyncResult<InitResponse>;

    /// Fetches one batch of entries.
    async fn download(&self, request: &DownloadRequest) -> SyncResult<DownloadResponse>;

    /// Acknowledges the durably persisted cursor. Best-effort.
    async fn ack(&self, request: &AckRequest) -> SyncResult<AckResponse>;

    /// Archives one note on the server.
    async fn archive(&self, request: &ArchiveRequest) -> SyncResult<()>;

    /// Deletes one note on the server.
    async fn delete(&self, request: &DeleteRequest) -> SyncResult<()>;

    /// Replaces the auth token used for subsequent requests. `None`
    /// clears it.
    fn set_token(&self, token: Option<String>);
}

/// A scripted transport for tests: responses are queued per operation and
/// every request is recorded.
#[derive(Default)]
pub struct MockTransport {
    init_responses: Mutex<VecDeque<SyncResult<InitResponse>>>,
    download_responses: Mutex<VecDeque<SyncResult<DownloadResponse>>>,
    ack_responses: Mutex<VecDeque<SyncResult<AckResponse>>>,
    init_requests: Mutex<Vec<InitRequest>>,
    download_requests: Mutex<Vec<DownloadRequest>>,
    ack_requests: Mutex<Vec<AckRequest>>,
    archive_requests: Mutex<Vec<ArchiveRequest>>,
    delete_requests: Mutex<Vec<DeleteRequest>>,
    token: Mutex<Option<String>>,
}

impl MockTransport {
    /// Creates a transport with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next init result.
    pub fn push_init(&self, response: SyncResult<InitResponse>) {
        self.init_responses.lock().push_back(response);
    }

    /// Queues the next download result.
    pub fn push_download(&self, response: SyncResult<DownloadResponse>) {
        self.download_responses.lock().push_back(response);
    }

    /// Queues the next ack result.
    pub fn push_ack(&self, response: SyncResult<AckResponse>) {
        self.ack_responses.lock().push_back(response);
    }

    /// Init requests seen so far.
    pub fn init_requests(&self) -> Vec<InitRequest> {
        self.init_requests.lock().clone()
    }

    /// Download requests seen so far.
    pub fn download_requests(&self) -> Vec<DownloadRequest> {
        self.download_requests.lock().clone()
    }

    /// Ack requests seen so far.
    pub fn ack_requests(&self) -> Vec<AckRequest> {
        self.ack_requests.lock().clone()
    }

    /// Archive requests seen so far.
    pub fn archive_requests(&self) -> Vec<ArchiveRequest> {
        self.archive_requests.lock().clone()
    }

    /// Delete requests seen so far.
    pub fn delete_requests(&self) -> Vec<DeleteRequest> {
        self.delete_requests.lock().clone()
    }

    /// The token last set on this transport.
    pub fn token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn unscripted(op: &str) -> SyncError {
        SyncError::transport_fatal(format!("no scripted {op} response"))
    }
}

#[async_trait]
impl SyncTransport for MockTransport {
    async fn init(&self, request: &InitRequest) -> SyncResult<InitResponse> {
        self.init_requests.lock().push(request.clone());
        self.init_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted("init")))
    }

    async fn download(&self, request: &DownloadRequest) -> SyncResult<DownloadResponse> {
        self.download_requests.lock().push(request.clone());
        self.download_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted("download")))
    }

    async fn ack(&self, request: &AckRequest) -> SyncResult<AckResponse> {
        self.ack_requests.lock().push(request.clone());
        self.ack_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(AckResponse::default()))
    }

    async fn archive(&self, request: &ArchiveRequest) -> SyncResult<()> {
        self.archive_requests.lock().push(request.clone());
        Ok(())
    }

    async fn delete(&self, request: &DeleteRequest) -> SyncResult<()> {
        self.delete_requests.lock().push(request.clone());
        Ok(())
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.lock() = token;
    }
}
