//! Request context assembly.
//!
//! The context sent with every fetch is the caller's [`SkylabUser`] with
//! identity fields from an optional [`ContextProvider`] layered on top and
//! the SDK's `library` tag injected last. Anonymous contexts get a stable,
//! locally generated enrollment id.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::client::SDK_VERSION;
use crate::error::{ErrorCode, SkylabError};
use crate::storage::StorageBackend;
use crate::types::SkylabUser;

pub const LIBRARY_NAME: &str = "skylab-rust-client";

/// Context fields that identify the subject, in lookup order.
const ID_FIELDS: [&str; 3] = ["id", "user_id", "device_id"];

/// Source of identity fields merged into every request context.
///
/// Each accessor is independent; return `None` for anything the host does not
/// know. Values supplied here override the same field on the user.
pub trait ContextProvider: Send + Sync {
    fn device_id(&self) -> Option<String> {
        None
    }

    fn user_id(&self) -> Option<String> {
        None
    }

    fn version(&self) -> Option<String> {
        None
    }

    fn language(&self) -> Option<String> {
        None
    }

    fn platform(&self) -> Option<String> {
        None
    }

    fn os(&self) -> Option<String> {
        None
    }

    fn device_model(&self) -> Option<String> {
        None
    }
}

/// `skylab-rust-client/<version>`
pub fn library() -> String {
    format!("{}/{}", LIBRARY_NAME, SDK_VERSION)
}

/// Merge `user` with provider-supplied identity fields and the library tag.
///
/// Provider values win over the user's; empty provider values are ignored.
/// `library` always wins.
pub fn build_context(user: &SkylabUser, provider: Option<&dyn ContextProvider>) -> Map<String, Value> {
    let mut context = user.to_map();

    if let Some(provider) = provider {
        let fields = [
            ("device_id", provider.device_id()),
            ("user_id", provider.user_id()),
            ("version", provider.version()),
            ("language", provider.language()),
            ("platform", provider.platform()),
            ("os", provider.os()),
            ("device_model", provider.device_model()),
        ];

        for (name, value) in fields {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                context.insert(name.to_string(), Value::String(value));
            }
        }
    }

    context.insert("library".to_string(), Value::String(library()));
    context
}

/// First identifying field present in the context.
pub fn context_id(context: &Map<String, Value>) -> Option<&str> {
    ID_FIELDS.iter().find_map(|field| {
        context
            .get(*field)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    })
}

/// URL-safe base64 of the context's JSON form, without padding.
pub fn encode_context(context: &Map<String, Value>) -> String {
    let json = Value::Object(context.clone()).to_string();
    URL_SAFE_NO_PAD.encode(json.as_bytes())
}

#[derive(Debug, Serialize, Deserialize)]
struct Metadata {
    id: String,
}

/// Lazily generated, persisted anonymous id.
///
/// Stored under the metadata key of the backend, outside any variant
/// namespace, so clearing variants never resets it.
pub struct EnrollmentStore {
    backend: Arc<dyn StorageBackend>,
    key: String,
    cached: Mutex<Option<String>>,
}

impl EnrollmentStore {
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            cached: Mutex::new(None),
        }
    }

    /// Return the persisted id, generating and persisting one on first use.
    pub fn get_or_create(&self) -> String {
        let mut cached = self.cached.lock();
        if let Some(ref id) = *cached {
            return id.clone();
        }

        let id = match self.read() {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                self.write(&id);
                tracing::debug!("Generated enrollment id");
                id
            }
        };

        *cached = Some(id.clone());
        id
    }

    fn read(&self) -> Option<String> {
        match self.backend.read(&self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<Metadata>(&raw) {
                Ok(metadata) if !metadata.id.is_empty() => Some(metadata.id),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Discarding corrupt client metadata: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read client metadata: {}", e.sanitized_message());
                None
            }
        }
    }

    fn write(&self, id: &str) {
        let metadata = Metadata { id: id.to_string() };
        let result = serde_json::to_string(&metadata)
            .map_err(|e| {
                SkylabError::with_source(
                    ErrorCode::PersistenceWriteError,
                    "Failed to serialize client metadata",
                    e,
                )
            })
            .and_then(|raw| self.backend.write(&self.key, &raw));

        if let Err(e) = result {
            tracing::warn!("Failed to persist enrollment id: {}", e.sanitized_message());
        }
    }
}

/// Holds the current user and context provider and builds request contexts.
pub struct ContextManager {
    user: RwLock<SkylabUser>,
    provider: RwLock<Option<Arc<dyn ContextProvider>>>,
    enrollment: EnrollmentStore,
}

impl ContextManager {
    pub fn new(enrollment: EnrollmentStore) -> Self {
        Self {
            user: RwLock::new(SkylabUser::default()),
            provider: RwLock::new(None),
            enrollment,
        }
    }

    pub fn set_user(&self, user: SkylabUser) {
        *self.user.write() = user;
        tracing::debug!("Current user set");
    }

    /// The most recently set user.
    pub fn user(&self) -> SkylabUser {
        self.user.read().clone()
    }

    pub fn set_provider(&self, provider: Arc<dyn ContextProvider>) {
        *self.provider.write() = Some(provider);
    }

    pub fn has_provider(&self) -> bool {
        self.provider.read().is_some()
    }

    /// Full request context for `user`, with an enrollment id filled in when
    /// nothing else identifies the subject.
    pub fn build(&self, user: &SkylabUser) -> Map<String, Value> {
        let provider = self.provider.read().clone();
        let mut context = build_context(user, provider.as_deref());

        if context_id(&context).is_none() {
            context.insert(
                "id".to_string(),
                Value::String(self.enrollment.get_or_create()),
            );
        }

        context
    }
}
