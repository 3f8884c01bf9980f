//! Transport capability used by the refresh engine.
//!
//! The engine only needs [`HttpClient`]: issue one request, optionally under
//! a hard timeout. [`ReqwestHttpClient`] is the default implementation;
//! tests and hosts with their own networking stack plug in their own.

mod client;
mod request;

pub use client::ReqwestHttpClient;
pub use request::{
    build_fetch_request, AuthScheme, Endpoint, FetchMethod, RequestStyle, DEBUG_PARAM_LENGTH,
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{ErrorCode, Result, SkylabError};

/// One outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub method: FetchMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A raw response. Status inspection is left to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into an [`ErrorCode::HttpStatus`] error.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SkylabError::network_error(
                ErrorCode::HttpStatus,
                format!("Unexpected status {}: {}", self.status, self.body),
            ))
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(SkylabError::parse_error)
    }
}

/// Issues requests on behalf of the client. Stateless across calls.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send `request` and wait for the full response body.
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Like [`HttpClient::request`], but fails with
    /// [`ErrorCode::NetworkTimeout`] once `timeout` elapses. The in-flight
    /// request future is dropped at that point.
    async fn request_with_timeout(
        &self,
        timeout: Duration,
        request: HttpRequest,
    ) -> Result<HttpResponse> {
        match tokio::time::timeout(timeout, self.request(request)).await {
            Ok(result) => result,
            Err(_) => Err(SkylabError::timeout(timeout)),
        }
    }
}
