//! Skylab Rust SDK
//!
//! Client SDK that resolves feature-flag variants for the current user,
//! keeps them in a local store, and refreshes them from the Skylab server.
//!
//! # Quick Start
//!
//! ```no_run
//! use skylab::{Skylab, SkylabConfig, SkylabUser, Variant};
//!
//! #[tokio::main]
//! async fn main() -> skylab::Result<()> {
//!     let config = SkylabConfig::builder().fallback_variant("off").build();
//!     let client = Skylab::init("client-api-key", config)?;
//!
//!     client.start(SkylabUser::with_user_id("user-123")).await;
//!
//!     let variant = client.get_variant("new-checkout", None);
//!     let button = client.get_variant("button-color", Some(Variant::new("blue")));
//!     println!("{:?} {:?}", variant.value(), button.value());
//!
//!     Skylab::remove(skylab::DEFAULT_INSTANCE_NAME);
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod error;
pub mod http;
pub mod storage;
pub mod core;
pub mod utils;
mod client;

pub use types::{FlagAssignment, SkylabUser, Variant, VariantMap, VariantSource};

pub use error::{ErrorCode, Result, SkylabError};

pub use self::core::{
    ContextProvider, Diagnostic, DiagnosticEvent, DiagnosticObserver, Level, NoopObserver,
    RetryState, SkylabConfig, SkylabConfigBuilder, TracingObserver, DEFAULT_INSTANCE_NAME,
    DEFAULT_SERVER_URL,
};

pub use http::{AuthScheme, Endpoint, FetchMethod, HttpClient, ReqwestHttpClient, RequestStyle};

pub use storage::{FileBackend, LocalStorage, MemoryBackend, Storage, StorageBackend};

pub use client::{SkylabClient, SkylabClientBuilder, SDK_VERSION};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;

static INSTANCES: Lazy<Mutex<HashMap<String, SkylabClient>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Process-wide registry of named clients.
///
/// Names are trimmed and lower-cased; a blank name maps to
/// [`DEFAULT_INSTANCE_NAME`].
pub struct Skylab;

impl Skylab {
    /// Create the client for `config.instance_name`, or return the one
    /// already registered under that name. A second call with a different
    /// key or config gets the existing client unchanged.
    pub fn init(api_key: impl Into<String>, config: SkylabConfig) -> Result<SkylabClient> {
        let name = config.normalized_instance_name();
        let mut instances = INSTANCES.lock();

        if let Some(client) = instances.get(&name) {
            return Ok(client.clone());
        }

        let client = SkylabClient::new(api_key, config)?;
        instances.insert(name, client.clone());
        Ok(client)
    }

    /// Register a client built elsewhere, e.g. with a custom transport.
    /// Returns the existing client if the name is taken.
    pub fn register(client: SkylabClient) -> SkylabClient {
        let name = client.config().normalized_instance_name();
        INSTANCES.lock().entry(name).or_insert(client).clone()
    }

    pub fn instance(name: &str) -> Option<SkylabClient> {
        let name = crate::core::normalize_instance_name(name);
        INSTANCES.lock().get(&name).cloned()
    }

    pub fn default_instance() -> Option<SkylabClient> {
        Self::instance(DEFAULT_INSTANCE_NAME)
    }

    /// Unregister and close the named client. Other clones keep working but
    /// no longer retry in the background.
    pub fn remove(name: &str) -> Option<SkylabClient> {
        let name = crate::core::normalize_instance_name(name);
        let client = INSTANCES.lock().remove(&name)?;
        client.close();
        Some(client)
    }
}
