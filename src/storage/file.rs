use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::StorageBackend;
use crate::error::{ErrorCode, Result, SkylabError};

const LOCK_FILE_NAME: &str = ".skylab.lock";

/// Directory-backed storage: one `<key>.json` file per key.
///
/// Writes go to a temporary file that is renamed over the target while an
/// exclusive lock on the directory's lock file is held, so concurrent
/// processes never observe a half-written document.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open a backend rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            SkylabError::with_source(
                ErrorCode::PersistenceWriteError,
                format!("Failed to create storage directory: {}", dir.display()),
                e,
            )
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }

    fn acquire_lock(&self) -> Result<File> {
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.dir.join(LOCK_FILE_NAME))
            .map_err(|e| {
                SkylabError::with_source(
                    ErrorCode::PersistenceWriteError,
                    "Failed to open lock file",
                    e,
                )
            })?;

        lock_file.lock_exclusive().map_err(|e| {
            SkylabError::with_source(
                ErrorCode::PersistenceWriteError,
                "Failed to acquire file lock",
                e,
            )
        })?;

        Ok(lock_file)
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SkylabError::with_source(
                ErrorCode::PersistenceReadError,
                format!("Failed to read stored key {}", key),
                e,
            )),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        let write_error = |e: std::io::Error| {
            SkylabError::with_source(
                ErrorCode::PersistenceWriteError,
                format!("Failed to write stored key {}", key),
                e,
            )
        };

        let lock_file = self.acquire_lock()?;

        let mut file = File::create(&tmp_path).map_err(write_error)?;
        file.write_all(value.as_bytes()).map_err(write_error)?;
        file.sync_all().map_err(write_error)?;
        fs::rename(&tmp_path, &path).map_err(write_error)?;

        drop(lock_file);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let lock_file = self.acquire_lock()?;
        let result = match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SkylabError::with_source(
                ErrorCode::PersistenceWriteError,
                format!("Failed to remove stored key {}", key),
                e,
            )),
        };
        drop(lock_file);
        result
    }
}
