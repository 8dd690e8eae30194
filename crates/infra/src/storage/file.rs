//! File-backed secret storage
//!
//! Keeps every entry in one JSON object on disk. Writes go to a sibling
//! temporary file that is then renamed over the original, so a crash never
//! leaves a half-written map behind.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use mentorhub_common::auth::{SecretBackend, StoreError};
use parking_lot::Mutex;
use tracing::{debug, warn};

type Entries = BTreeMap<String, String>;

/// Secret backend over a single JSON file
///
/// Used where the OS keychain is unavailable (headless hosts, CI). When
/// `secure` is set the file is created readable by its owner only.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
    secure: bool,
    lock: Mutex<()>,
}

impl FileSecretStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, secure: bool) -> Self {
        Self { path: path.into(), secure, lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Entries::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(access(&self.path, &e)),
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| access(parent, &e))?;
        }
        let body = serde_json::to_vec_pretty(entries)?;

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp).map_err(|e| access(&tmp, &e))?;
            self.restrict(&tmp)?;
            file.write_all(&body).map_err(|e| access(&tmp, &e))?;
            file.sync_all().map_err(|e| access(&tmp, &e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to replace secret file");
            access(&self.path, &e)
        })
    }

    #[cfg(unix)]
    fn restrict(&self, path: &Path) -> Result<(), StoreError> {
        use std::os::unix::fs::PermissionsExt;

        if self.secure {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .map_err(|e| access(path, &e))?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn restrict(&self, _path: &Path) -> Result<(), StoreError> {
        Ok(())
    }
}

fn access(path: &Path, err: &std::io::Error) -> StoreError {
    StoreError::Access(format!("{}: {err}", path.display()))
}

impl SecretBackend for FileSecretStore {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)?;
        debug!(key, "Secret written");
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_entries()?.remove(key))
    }

    fn delete_secret(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}
