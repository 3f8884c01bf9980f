use serde::{Deserialize, Serialize};

use super::HttpRequest;

/// Length of the random `d=` debug parameter.
pub const DEBUG_PARAM_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    #[default]
    Get,
    /// POST with a `{"id": ...}` JSON body.
    Post,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMethod::Get => "GET",
            FetchMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    #[default]
    Vardata,
    Variants,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Vardata => "/sdk/vardata",
            Endpoint::Variants => "/sdk/variants",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `Authorization: Api-Key <key>`
    #[default]
    Authorization,
    /// `Api-Key: <key>`
    ApiKeyHeader,
}

/// How variant requests are shaped on the wire. Chosen once per client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStyle {
    pub method: FetchMethod,
    pub endpoint: Endpoint,
    pub auth: AuthScheme,
}

impl RequestStyle {
    /// `POST /sdk/variants` with an `Api-Key` header.
    pub fn legacy() -> Self {
        Self {
            method: FetchMethod::Post,
            endpoint: Endpoint::Variants,
            auth: AuthScheme::ApiKeyHeader,
        }
    }

    pub fn method(mut self, method: FetchMethod) -> Self {
        self.method = method;
        self
    }

    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }
}

/// Build the variants request for an already encoded context.
///
/// `context_id` becomes the POST body's `id`; `debug_param` is appended as
/// `?d=<value>`.
pub fn build_fetch_request(
    style: &RequestStyle,
    server_url: &str,
    api_key: &str,
    encoded_context: &str,
    context_id: Option<&str>,
    debug_param: Option<&str>,
) -> HttpRequest {
    let mut url = format!(
        "{}{}/{}",
        server_url.trim_end_matches('/'),
        style.endpoint.path(),
        encoded_context
    );
    if let Some(debug) = debug_param {
        url.push_str("?d=");
        url.push_str(debug);
    }

    let mut headers = match style.auth {
        AuthScheme::Authorization => {
            vec![("Authorization".to_string(), format!("Api-Key {}", api_key))]
        }
        AuthScheme::ApiKeyHeader => vec![("Api-Key".to_string(), api_key.to_string())],
    };

    let body = match style.method {
        FetchMethod::Get => None,
        FetchMethod::Post => {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
            Some(serde_json::json!({ "id": context_id }))
        }
    };

    HttpRequest {
        url,
        method: style.method,
        headers,
        body,
    }
}
