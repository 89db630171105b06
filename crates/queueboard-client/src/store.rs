//! File-backed credential store.
//!
//! Holds the two keys a logged-in console needs across restarts, `token`
//! (the bearer string) and `user` (the serialized user record), in a single
//! JSON document. Both are written on login and both are removed on logout.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ClientError;

/// Key holding the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Key holding the serialized [`User`](queueboard_types::User).
pub const USER_KEY: &str = "user";

/// String key/value store persisted as one JSON file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// A store backed by the file at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read one key.
    pub fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.read_all()?.remove(key))
    }

    /// Write one key, keeping the others.
    pub fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write_all(&entries)
    }

    /// Write several keys in one file update.
    pub fn set_many(&self, pairs: &[(&str, &str)]) -> Result<(), ClientError> {
        let mut entries = self.read_all()?;
        for (key, value) in pairs {
            entries.insert((*key).to_owned(), (*value).to_owned());
        }
        self.write_all(&entries)
    }

    /// Remove keys. Missing keys are ignored.
    pub fn remove(&self, keys: &[&str]) -> Result<(), ClientError> {
        let mut entries = self.read_all()?;
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() == before {
            return Ok(());
        }
        self.write_all(&entries)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, ClientError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(ClientError::Storage(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            ClientError::Storage(format!("corrupt credential file {}: {e}", self.path.display()))
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClientError::Storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| ClientError::Storage(format!("failed to serialize credentials: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| ClientError::Storage(format!("failed to write {}: {e}", tmp.display())))?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            ClientError::Storage(format!("failed to replace {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), keys = entries.len(), "credential store written");
        Ok(())
    }
}

/// Credentials are readable by the owner only.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), ClientError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| ClientError::Storage(format!("failed to chmod {}: {e}", path.display())))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn restrict_permissions(_path: &Path) -> Result<(), ClientError> {
    Ok(())
}
