use async_trait::async_trait;
use reqwest::Client;

use super::{FetchMethod, HttpClient, HttpRequest, HttpResponse};
use crate::client::SDK_VERSION;
use crate::error::{ErrorCode, Result, SkylabError};

/// [`HttpClient`] backed by `reqwest`.
///
/// No client-level timeout is configured; the refresh engine bounds every
/// attempt through [`HttpClient::request_with_timeout`].
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("skylab-rust-client/{}", SDK_VERSION))
            .build()
            .map_err(|e| {
                SkylabError::with_source(ErrorCode::NetworkError, "Failed to create HTTP client", e)
            })?;

        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client, e.g. one with a proxy configured.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn convert_error(error: reqwest::Error) -> SkylabError {
        if error.is_timeout() {
            SkylabError::with_source(ErrorCode::NetworkTimeout, "Request timed out", error)
        } else if error.is_connect() {
            SkylabError::with_source(ErrorCode::NetworkError, "Connection failed", error)
        } else {
            SkylabError::with_source(ErrorCode::NetworkError, error.to_string(), error)
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            FetchMethod::Get => self.client.get(&request.url),
            FetchMethod::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(Self::convert_error)?;
        let status = response.status().as_u16();

        let body = response.text().await.map_err(|e| {
            SkylabError::with_source(ErrorCode::NetworkError, "Failed to read response", e)
        })?;

        Ok(HttpResponse { status, body })
    }
}
