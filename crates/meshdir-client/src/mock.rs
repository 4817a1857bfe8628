//! Scripted transport for deterministic testing.
//!
//! Returns pre-configured responses without making any HTTP calls.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use meshdir_core::{MeshError, Result};
use parking_lot::Mutex;

use crate::transport::{ApiRequest, ApiResponse, Transport};

/// A transport that replays queued responses in order and records every request.
///
/// # Example
/// ```
/// use meshdir_client::MockTransport;
/// let transport = MockTransport::new()
///     .with_json(200, serde_json::json!([]))
///     .with_status(404);
/// ```
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<ApiResponse>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with a raw body.
    pub fn with_response(self, status: u16, body: impl Into<Bytes>) -> Self {
        self.queue_response(ApiResponse::new(status, body));
        self
    }

    /// Queue a response with a JSON body.
    pub fn with_json(self, status: u16, body: serde_json::Value) -> Self {
        self.with_response(status, body.to_string())
    }

    /// Queue a response with an empty body.
    pub fn with_status(self, status: u16) -> Self {
        self.with_response(status, Bytes::new())
    }

    /// Queue a directory error envelope.
    pub fn with_error(self, status: u16, code: i64, message: &str) -> Self {
        self.with_json(
            status,
            serde_json::json!({ "errors": { "code": code, "message": message } }),
        )
    }

    pub fn queue_response(&self, resp: ApiResponse) {
        self.responses.lock().push_back(resp);
    }

    /// All requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let description = format!("{} {}", request.method, request.path);
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| MeshError::Transport(format!("mock: no response queued for {description}")))
    }
}
