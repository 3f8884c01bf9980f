use std::time::Duration;

use crate::error::{Result, SkylabError};
use crate::http::RequestStyle;
use crate::types::{Variant, VariantMap};

pub const DEFAULT_SERVER_URL: &str = "https://api.lab.amplitude.com";
pub const DEFAULT_INSTANCE_NAME: &str = "$default_instance";
pub const DEFAULT_STORAGE_KEY: &str = "amp-sl-meta";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_FETCH_RETRY_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_FETCH_RETRY_INTERVAL: Duration = Duration::from_millis(10_000);

/// Client configuration. Fixed for the lifetime of a client.
#[derive(Debug, Clone)]
pub struct SkylabConfig {
    /// Base URL variants are requested from.
    pub server_url: String,
    /// Fallback for every `get_variant` call when nothing else matches.
    pub fallback_variant: Option<String>,
    /// Bootstrap variants, used as a fallback and optionally seeded on start.
    pub initial_flags: VariantMap,
    /// Seed `initial_flags` into the store on start, ahead of cached values.
    pub prefer_initial_flags: bool,
    /// Timeout for fetches triggered by `start` and `set_user`.
    pub fetch_timeout: Duration,
    /// Retry failed fetches in the background.
    pub fetch_retry: bool,
    /// Timeout for each background retry. Expected to be at most
    /// `fetch_retry_interval`.
    pub fetch_retry_timeout: Duration,
    /// Interval between background retries.
    pub fetch_retry_interval: Duration,
    /// Case-insensitive name used by the instance registry.
    pub instance_name: String,
    /// Emit debug-level diagnostics for every resolution.
    pub debug: bool,
    /// Append a random `d=` parameter so requests show up in the debugger.
    pub debug_assignment_requests: bool,
    /// Storage key for client metadata such as the enrollment id.
    pub storage_key: String,
    pub request_style: RequestStyle,
}

impl Default for SkylabConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            fallback_variant: None,
            initial_flags: VariantMap::new(),
            prefer_initial_flags: false,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fetch_retry: true,
            fetch_retry_timeout: DEFAULT_FETCH_RETRY_TIMEOUT,
            fetch_retry_interval: DEFAULT_FETCH_RETRY_INTERVAL,
            instance_name: DEFAULT_INSTANCE_NAME.to_string(),
            debug: false,
            debug_assignment_requests: false,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            request_style: RequestStyle::default(),
        }
    }
}

impl SkylabConfig {
    pub fn builder() -> SkylabConfigBuilder {
        SkylabConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(SkylabError::config_error("Server URL is required"));
        }

        if self.fetch_timeout.is_zero() {
            return Err(SkylabError::config_error("Fetch timeout must be positive"));
        }

        if self.fetch_retry && self.fetch_retry_interval.is_zero() {
            return Err(SkylabError::config_error(
                "Fetch retry interval must be positive",
            ));
        }

        if self.fetch_retry && self.fetch_retry_timeout.is_zero() {
            return Err(SkylabError::config_error(
                "Fetch retry timeout must be positive",
            ));
        }

        if self.fetch_retry_timeout > self.fetch_retry_interval {
            tracing::warn!(
                "fetch_retry_timeout ({:?}) exceeds fetch_retry_interval ({:?})",
                self.fetch_retry_timeout,
                self.fetch_retry_interval
            );
        }

        Ok(())
    }

    /// Normalized form of `instance_name`.
    pub fn normalized_instance_name(&self) -> String {
        normalize_instance_name(&self.instance_name)
    }
}

/// Instance names are case-insensitive; blank names map to the default.
pub fn normalize_instance_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        DEFAULT_INSTANCE_NAME.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

#[derive(Debug, Default)]
pub struct SkylabConfigBuilder {
    config: SkylabConfig,
}

impl SkylabConfigBuilder {
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into();
        self
    }

    pub fn fallback_variant(mut self, variant: impl Into<String>) -> Self {
        self.config.fallback_variant = Some(variant.into());
        self
    }

    pub fn initial_flags(mut self, flags: VariantMap) -> Self {
        self.config.initial_flags = flags;
        self
    }

    pub fn initial_flag(mut self, key: impl Into<String>, variant: impl Into<Variant>) -> Self {
        self.config.initial_flags.insert(key.into(), variant.into());
        self
    }

    pub fn prefer_initial_flags(mut self, prefer: bool) -> Self {
        self.config.prefer_initial_flags = prefer;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = timeout;
        self
    }

    pub fn fetch_retry(mut self, enabled: bool) -> Self {
        self.config.fetch_retry = enabled;
        self
    }

    pub fn fetch_retry_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_retry_timeout = timeout;
        self
    }

    pub fn fetch_retry_interval(mut self, interval: Duration) -> Self {
        self.config.fetch_retry_interval = interval;
        self
    }

    pub fn instance_name(mut self, name: impl Into<String>) -> Self {
        self.config.instance_name = name.into();
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    pub fn debug_assignment_requests(mut self, enabled: bool) -> Self {
        self.config.debug_assignment_requests = enabled;
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.config.storage_key = key.into();
        self
    }

    pub fn request_style(mut self, style: RequestStyle) -> Self {
        self.config.request_style = style;
        self
    }

    pub fn build(self) -> SkylabConfig {
        self.config
    }
}
