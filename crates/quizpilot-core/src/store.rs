//! Snapshot persistence.
//!
//! Memory, the credential ring and the run state are each persisted as one
//! blob. Every mutation is a full read-modify-write of that blob; there is no
//! locking, so exactly one execution context may touch a given store at a
//! time.

use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{QuizError, Result};

/// Load/save contract for a persisted snapshot.
pub trait SnapshotStore<T>: Send + Sync {
    /// Load the current snapshot. A missing blob yields `T::default()`.
    fn load(&self) -> Result<T>;

    /// Replace the persisted snapshot.
    fn save(&self, snapshot: &T) -> Result<()>;

    /// Remove the persisted snapshot entirely.
    fn clear(&self) -> Result<()>;
}

/// What to do when a persisted blob cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptPolicy {
    /// Surface a [`QuizError::Storage`].
    Fail,
    /// Copy the blob aside to `<file>.corrupt`, log a warning and start
    /// from `T::default()`.
    Reset,
}

/// A snapshot stored as a JSON file.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target.
pub struct JsonFileStore<T> {
    path: PathBuf,
    on_corrupt: CorruptPolicy,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            on_corrupt: CorruptPolicy::Fail,
            _marker: PhantomData,
        }
    }

    /// Set the policy for unparseable blobs.
    pub fn with_corrupt_policy(mut self, policy: CorruptPolicy) -> Self {
        self.on_corrupt = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Where an unparseable blob is preserved before it is reset.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }
}

impl<T> SnapshotStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> Result<T> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => {
                return Err(QuizError::Storage(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        match serde_json::from_str(&content) {
            Ok(v) => Ok(v),
            Err(e) => match self.on_corrupt {
                CorruptPolicy::Fail => Err(QuizError::Storage(format!(
                    "failed to parse {}: {e}",
                    self.path.display()
                ))),
                CorruptPolicy::Reset => {
                    let backup = self.backup_path();
                    fs::copy(&self.path, &backup).map_err(|copy_err| {
                        QuizError::Storage(format!(
                            "failed to back up unparseable {}: {copy_err}",
                            self.path.display()
                        ))
                    })?;
                    warn!(
                        path = %self.path.display(),
                        backup = %backup.display(),
                        "unparseable snapshot, starting empty: {e}"
                    );
                    Ok(T::default())
                }
            },
        }
    }

    fn save(&self, snapshot: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| {
            QuizError::Storage(format!("failed to write {}: {}", self.path.display(), e.error))
        })?;
        debug!(path = %self.path.display(), bytes = json.len(), "snapshot saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A snapshot held in process memory.
pub struct InMemoryStore<T> {
    value: Mutex<Option<T>>,
}

impl<T> InMemoryStore<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    /// Start from an existing snapshot.
    pub fn with_value(value: T) -> Self {
        Self {
            value: Mutex::new(Some(value)),
        }
    }
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotStore<T> for InMemoryStore<T>
where
    T: Clone + Default + Send,
{
    fn load(&self) -> Result<T> {
        let guard = self
            .value
            .lock()
            .map_err(|_| QuizError::Storage("in-memory store poisoned".into()))?;
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, snapshot: &T) -> Result<()> {
        let mut guard = self
            .value
            .lock()
            .map_err(|_| QuizError::Storage("in-memory store poisoned".into()))?;
        *guard = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .value
            .lock()
            .map_err(|_| QuizError::Storage("in-memory store poisoned".into()))?;
        *guard = None;
        Ok(())
    }
}
