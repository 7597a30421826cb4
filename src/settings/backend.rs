//! Persistence backends for the settings store.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::SettingsError;

/// Directory name under the platform configuration directory.
pub const APP_DIR_NAME: &str = "codeshot";

/// File name of the JSON settings file.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Per-key durable storage.
///
/// `store` must not return until the value is durable (or the backend is
/// explicitly ephemeral, like [`MemoryBackend`]).
pub trait SettingsBackend {
    fn load(&self, key: &str) -> Option<&Value>;

    fn store(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;

    fn remove(&mut self, key: &str) -> Result<(), SettingsError>;
}

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-process storage that does not survive a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, Value>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SettingsBackend for MemoryBackend {
    fn load(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    fn store(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ============================================================================
// FileBackend
// ============================================================================

/// A single JSON object file holding one entry per key.
///
/// The file is read once when opened. Every write rewrites the whole object
/// through a temporary file and a rename, so a crash never leaves a
/// half-written settings file behind.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl FileBackend {
    /// Opens (or prepares to create) the settings file at `path`.
    ///
    /// A missing file is an empty store, not an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(SettingsError::Read { path, source }),
        };
        log::debug!("loaded {} setting(s) from {}", entries.len(), path.display());
        Ok(Self { path, entries })
    }

    /// Opens the settings file in the platform configuration directory.
    pub fn open_default() -> Result<Self, SettingsError> {
        Self::open(Self::default_path()?)
    }

    /// `<config dir>/codeshot/settings.json`
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
            .ok_or(SettingsError::DirectoryUnavailable)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path).map_err(write_err)?;
        file.write_all(json.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(write_err)?;
        Ok(())
    }
}

impl SettingsBackend for FileBackend {
    fn load(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// On a failed write the previous entry is restored, so reads keep
    /// matching what is on disk.
    fn store(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        let previous = self.entries.insert(key.to_string(), value);
        self.flush().inspect_err(|_| self.restore(key, previous))
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        let Some(previous) = self.entries.remove(key) else {
            return Ok(());
        };
        self.flush().inspect_err(|_| self.restore(key, Some(previous)))
    }
}

impl FileBackend {
    fn restore(&mut self, key: &str, previous: Option<Value>) {
        match previous {
            Some(value) => self.entries.insert(key.to_string(), value),
            None => self.entries.remove(key),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_backend_store_and_remove() {
        let mut backend = MemoryBackend::new();
        backend.store("layout", json!(3)).unwrap();
        assert_eq!(backend.load("layout"), Some(&json!(3)));
        backend.remove("layout").unwrap();
        assert!(backend.load("layout").is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn file_backend_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("settings.json")).unwrap();
        assert!(backend.load("code").is_none());
    }

    #[test]
    fn file_backend_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.store("title", json!("hello")).unwrap();
        backend.store("opacity", json!(0.5)).unwrap();
        drop(backend);

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.load("title"), Some(&json!("hello")));
        assert_eq!(reopened.load("opacity"), Some(&json!(0.5)));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn failed_write_rolls_back_store_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut backend = FileBackend::open(&path).unwrap();
        backend.store("title", json!("saved")).unwrap();

        // A directory where the temp file should go makes every flush fail
        fs::create_dir(path.with_extension("json.tmp")).unwrap();

        assert!(matches!(
            backend.store("title", json!("lost")),
            Err(SettingsError::Write { .. })
        ));
        assert_eq!(backend.load("title"), Some(&json!("saved")));

        assert!(backend.store("blur", json!(4)).is_err());
        assert!(backend.load("blur").is_none());

        assert!(backend.remove("title").is_err());
        assert_eq!(backend.load("title"), Some(&json!("saved")));
    }

    #[test]
    fn file_backend_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(FileBackend::open(&path), Err(SettingsError::Format(_))));
    }
}
