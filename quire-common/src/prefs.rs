//! Persisted preferences
//!
//! A small key/value interface the site consumes for anything that must
//! survive a restart (the session token, favorite poem ids). The storage
//! medium is up to the implementation: [`FilePreferences`] keeps a JSON
//! object on disk, [`MemoryPreferences`] keeps nothing beyond the process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result};

/// Key/value preference storage
pub trait Preferences: Send {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, persisting it immediately
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing an absent key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Process-local preferences
#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    values: BTreeMap<String, String>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Preferences stored as a flat JSON object in a file
///
/// The whole file is rewritten on every change, via a temporary file and a
/// rename so a crash never leaves half a file behind.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FilePreferences {
    /// Open (or lazily create) the preference file at `path`
    ///
    /// A missing file is an empty store. A file that is not a JSON object of
    /// strings is treated as empty with a warning; it is replaced on the next
    /// write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(values) => values,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable preferences file");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::Io(e)),
        };

        debug!(path = %path.display(), keys = values.len(), "Loaded preferences");
        Ok(Self { path, values })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let text = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text)?;

        // Owner-only: the session file holds the bearer token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Preferences for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}
