//! Persisted variant store.
//!
//! [`Storage`] is the capability the refresh engine writes fetched variants
//! into and the resolver reads from. Loading and saving are explicit so that
//! a full replacement can be expressed as `clear`, `put` for every entry, then
//! `save`, without any read observing a partial state in between.
//!
//! [`LocalStorage`] is the default implementation. It keeps the mapping in
//! memory and serializes it as one JSON document under a namespaced key of a
//! [`StorageBackend`].

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use std::sync::Arc;

use crate::error::{ErrorCode, Result, SkylabError};
use crate::types::{Variant, VariantMap};

/// Prefix of every storage namespace derived from an API key.
pub const NAMESPACE_PREFIX: &str = "amp-sl-";

/// Number of trailing API key characters kept in the namespace.
const NAMESPACE_KEY_CHARS: usize = 6;

/// Namespace for an API key: `amp-sl-` followed by the last six characters.
///
/// Only a suffix is kept so the full key is never persisted.
pub fn storage_namespace(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    let start = chars.len().saturating_sub(NAMESPACE_KEY_CHARS);
    let suffix: String = chars[start..].iter().collect();
    format!("{}{}", NAMESPACE_PREFIX, suffix)
}

/// Raw key-value persistence medium.
pub trait StorageBackend: Send + Sync {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>>;

    fn write(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Variant store capability.
///
/// `get`, `put`, `clear`, `replace` and `get_all` touch memory only.
/// `read_persisted`, `load` and `save` are the only operations that reach the
/// persistence medium.
pub trait Storage: Send + Sync {
    /// Read and parse the persisted mapping without touching memory.
    fn read_persisted(&self) -> Result<VariantMap>;

    /// Persist the in-memory mapping.
    fn save(&self) -> Result<()>;

    fn get(&self, key: &str) -> Option<Variant>;

    fn put(&mut self, key: String, variant: Variant);

    fn clear(&mut self);

    /// Swap the whole in-memory mapping.
    fn replace(&mut self, variants: VariantMap);

    fn get_all(&self) -> VariantMap;

    /// Replace the in-memory mapping with the persisted one.
    ///
    /// On failure the mapping is left empty and the error is returned for
    /// reporting only.
    fn load(&mut self) -> Result<()> {
        match self.read_persisted() {
            Ok(variants) => {
                self.replace(variants);
                Ok(())
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }
}

/// [`Storage`] over a [`StorageBackend`], keyed by namespace.
pub struct LocalStorage {
    namespace: String,
    backend: Arc<dyn StorageBackend>,
    variants: VariantMap,
}

impl LocalStorage {
    pub fn new(namespace: impl Into<String>, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            namespace: namespace.into(),
            backend,
            variants: VariantMap::new(),
        }
    }

    /// Store namespaced by the suffix of `api_key`.
    pub fn for_api_key(api_key: &str, backend: Arc<dyn StorageBackend>) -> Self {
        Self::new(storage_namespace(api_key), backend)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

impl Storage for LocalStorage {
    fn read_persisted(&self) -> Result<VariantMap> {
        let Some(raw) = self.backend.read(&self.namespace)? else {
            return Ok(VariantMap::new());
        };

        let variants: VariantMap = serde_json::from_str(&raw).map_err(|e| {
            SkylabError::with_source(
                ErrorCode::PersistenceReadError,
                format!("Stored variants under {} are corrupt", self.namespace),
                e,
            )
        })?;

        tracing::debug!("Read {} variants from {}", variants.len(), self.namespace);
        Ok(variants)
    }

    fn save(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.variants).map_err(|e| {
            SkylabError::with_source(
                ErrorCode::PersistenceWriteError,
                "Failed to serialize variants",
                e,
            )
        })?;
        self.backend.write(&self.namespace, &raw)
    }

    fn get(&self, key: &str) -> Option<Variant> {
        self.variants.get(key).cloned()
    }

    fn put(&mut self, key: String, variant: Variant) {
        self.variants.insert(key, variant);
    }

    fn clear(&mut self) {
        self.variants.clear();
    }

    fn replace(&mut self, variants: VariantMap) {
        self.variants = variants;
    }

    fn get_all(&self) -> VariantMap {
        self.variants.clone()
    }
}
