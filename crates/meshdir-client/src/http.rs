use async_trait::async_trait;
use meshdir_config::DirectoryConfig;
use meshdir_core::{MeshError, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::debug;
use url::Url;

use crate::transport::{ApiRequest, ApiResponse, Transport};

/// reqwest-backed transport for the directory API.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &DirectoryConfig) -> Result<Self> {
        let parsed = Url::parse(&config.base_url).map_err(|e| {
            MeshError::Config(format!("invalid base URL '{}': {}", config.base_url, e))
        })?;
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(|e| MeshError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, path = %request.path, body_len = request.body_len(), "directory request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .bearer_auth(&request.token)
            .header(ACCEPT, "application/json");
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| MeshError::Transport(e.without_url().to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| MeshError::Transport(e.without_url().to_string()))?;

        debug!(method = %request.method, path = %request.path, status, body_len = body.len(), "directory response");
        Ok(ApiResponse { status, body })
    }
}
