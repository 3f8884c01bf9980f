use thiserror::Error;

pub mod sanitizer;

pub use sanitizer::sanitize_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Configuration errors
    ConfigMissingApiKey,
    ConfigInvalid,

    // Transport errors
    NetworkTimeout,
    NetworkError,
    HttpStatus,

    // Response errors
    ResponseParseError,

    // Persistence errors
    PersistenceReadError,
    PersistenceWriteError,

    // Fetch lifecycle
    FetchSuperseded,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingApiKey => "CONFIG_MISSING_API_KEY",
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
            ErrorCode::NetworkTimeout => "NETWORK_TIMEOUT",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::HttpStatus => "HTTP_STATUS",
            ErrorCode::ResponseParseError => "RESPONSE_PARSE_ERROR",
            ErrorCode::PersistenceReadError => "PERSISTENCE_READ_ERROR",
            ErrorCode::PersistenceWriteError => "PERSISTENCE_WRITE_ERROR",
            ErrorCode::FetchSuperseded => "FETCH_SUPERSEDED",
        }
    }

    /// Whether a failed fetch with this code should be retried on the next tick.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkTimeout
                | ErrorCode::NetworkError
                | ErrorCode::HttpStatus
                | ErrorCode::ResponseParseError
                | ErrorCode::PersistenceReadError
                | ErrorCode::PersistenceWriteError
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("[{code}] {message}")]
pub struct SkylabError {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SkylabError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn missing_api_key() -> Self {
        Self::new(ErrorCode::ConfigMissingApiKey, "Skylab API key is empty")
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }

    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::new(
            ErrorCode::NetworkTimeout,
            format!("Request timeout after {} milliseconds", timeout.as_millis()),
        )
    }

    pub fn network_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    pub fn parse_error(source: serde_json::Error) -> Self {
        Self::with_source(
            ErrorCode::ResponseParseError,
            format!("Failed to parse variants response: {}", source),
            source,
        )
    }

    pub fn superseded(generation: u64) -> Self {
        Self::new(
            ErrorCode::FetchSuperseded,
            format!("Fetch generation {} was superseded by a newer fetch", generation),
        )
    }

    /// Message with API keys and personal data redacted, safe for logs.
    pub fn sanitized_message(&self) -> String {
        sanitize_message(&self.message)
    }

    pub fn is_recoverable(&self) -> bool {
        self.code.is_recoverable()
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConfigMissingApiKey | ErrorCode::ConfigInvalid
        )
    }

    pub fn is_network_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::NetworkTimeout | ErrorCode::NetworkError | ErrorCode::HttpStatus
        )
    }

    pub fn is_persistence_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::PersistenceReadError | ErrorCode::PersistenceWriteError
        )
    }
}

pub type Result<T> = std::result::Result<T, SkylabError>;
