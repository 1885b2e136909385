//! JSON-file settings store
//!
//! Keeps the flat key/value settings in a single JSON object on disk. The
//! daemon and the CLI open the same file, so the store holds no copy of its
//! own:
//!
//! - **Reads** parse the file on every call. Writers only ever rename a
//!   complete document into place, so a read sees either the old or the new
//!   document.
//! - **Updates** take an exclusive advisory lock on `<file>.lock`, re-read
//!   the file, apply the change and rename a fresh temporary sibling over
//!   it. Writers in other processes are serialized by the lock and never
//!   drop each other's keys.
//!
//! Every call does blocking file I/O on a small local file.

use std::{
    collections::BTreeMap,
    fs::OpenOptions,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use bdaykeeper_core::ports::{ISettingsStore, SettingsError};
use fs2::FileExt;
use tracing::debug;

type Values = BTreeMap<String, String>;

/// [`ISettingsStore`] persisted as a JSON object
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    lock_path: PathBuf,
    // Serializes writers sharing this handle; the file lock covers the rest
    writer: Mutex<()>,
}

impl JsonFileSettingsStore {
    /// Opens the store at `path`; a missing file reads as empty
    ///
    /// Fails with [`SettingsError::Corrupt`] when the file exists but is not
    /// a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = load(&path)?;
        debug!(path = %path.display(), keys = values.len(), "Opened settings store");

        let mut lock_path = path.as_os_str().to_owned();
        lock_path.push(".lock");
        Ok(Self {
            path,
            lock_path: PathBuf::from(lock_path),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every stored key and value
    pub fn entries(&self) -> Result<Values, SettingsError> {
        load(&self.path)
    }

    /// Applies `change` to the current on-disk values under the file lock
    ///
    /// `change` returns false when it left the values untouched, in which
    /// case nothing is written.
    fn update(&self, change: impl FnOnce(&mut Values) -> bool) -> Result<(), SettingsError> {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| SettingsError::Corrupt("settings lock poisoned".to_string()))?;

        let parent = self.parent_dir();
        std::fs::create_dir_all(&parent)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        FileExt::lock_exclusive(&lock_file)?;

        let mut values = load(&self.path)?;
        if change(&mut values) {
            self.persist(&parent, &values)?;
        }

        FileExt::unlock(&lock_file)?;
        Ok(())
    }

    /// Writes `values` to a unique temporary sibling and renames it into place
    fn persist(&self, parent: &Path, values: &Values) -> Result<(), SettingsError> {
        let json = serde_json::to_vec_pretty(values)
            .map_err(|e| SettingsError::Corrupt(e.to_string()))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".settings.")
            .suffix(".tmp")
            .tempfile_in(parent)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| SettingsError::Io(e.error))?;

        debug!(path = %self.path.display(), keys = values.len(), "Settings written");
        Ok(())
    }

    fn parent_dir(&self) -> PathBuf {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf()
    }
}

/// Reads the document at `path`; missing or blank files are empty
fn load(path: &Path) -> Result<Values, SettingsError> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Values::new()),
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| SettingsError::Corrupt(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Values::new()),
        Err(e) => Err(e.into()),
    }
}

impl ISettingsStore for JsonFileSettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(load(&self.path)?.remove(key))
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), SettingsError> {
        self.update(|values| {
            for (key, value) in entries {
                values.insert((*key).to_string(), value.clone());
            }
            true
        })
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), SettingsError> {
        self.update(|values| {
            let mut removed = false;
            for key in keys {
                removed |= values.remove(*key).is_some();
            }
            removed
        })
    }
}
