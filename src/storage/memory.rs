use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::StorageBackend;
use crate::error::Result;

/// In-process storage backend.
///
/// Clones share the same entries, so two clients built over clones of one
/// backend see each other's writes, the way two page loads share browser
/// storage.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read() {
        let backend = MemoryBackend::new();
        backend.write("key", "value").unwrap();

        assert_eq!(backend.read("key").unwrap(), Some("value".to_string()));
        assert!(backend.read("missing").unwrap().is_none());
    }

    #[test]
    fn test_clones_share_entries() {
        let backend = MemoryBackend::new();
        let other = backend.clone();

        backend.write("key", "value").unwrap();
        assert_eq!(other.read("key").unwrap(), Some("value".to_string()));

        other.remove("key").unwrap();
        assert!(backend.is_empty());
    }
}
