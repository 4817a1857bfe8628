use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use meshdir_core::Result;
use reqwest::Method;
use serde::Serialize;

/// A single authenticated call to the directory.
#[derive(Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute path below the directory base URL, e.g. `/v1/meshnet/machines`.
    pub path: String,
    /// Bearer token supplied by the caller for this call only.
    pub token: String,
    /// JSON-encoded body, if any.
    pub body: Option<Bytes>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            token: token.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(Method::GET, path, token)
    }

    pub fn post(path: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(Method::POST, path, token)
    }

    pub fn patch(path: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path, token)
    }

    pub fn delete(path: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path, token)
    }

    /// Attach `body` encoded as JSON.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, Bytes::len)
    }
}

// Bodies may carry user file names and the token is a credential; neither is
// ever printed.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body_len", &self.body_len())
            .finish_non_exhaustive()
    }
}

/// Raw directory response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs authenticated requests against the directory.
///
/// Implementations own connection handling, timeouts and any retry policy.
/// Connection and authorization failures surface as errors; non-success
/// statuses are returned as responses so the caller can decode the
/// directory's error envelope.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}
