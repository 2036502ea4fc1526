//! Durable credential scope backed by a JSON file.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use portal_sdk::KeyValueStore;
use tracing::{debug, warn};

const APP_DIR: &str = "portal-cli";
const CREDENTIALS_FILE: &str = "credentials.json";

/// Default location of the credentials file, creating its directory if
/// needed.
pub fn default_path() -> Option<PathBuf> {
    let dir = dirs::config_dir()?.join(APP_DIR);
    if !dir.exists() {
        fs::create_dir_all(&dir).ok()?;
    }
    Some(dir.join(CREDENTIALS_FILE))
}

/// Key-value map mirrored to a JSON object on disk.
///
/// Every write rewrites the whole file; failures are logged and the
/// in-memory copy stays authoritative for the rest of the process.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open `path`, starting empty when it is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, entries: &HashMap<String, String>) {
        let json = match serde_json::to_string_pretty(entries) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize credentials");
                return;
            }
        };
        if let Err(e) = write_private(&self.path, json.as_bytes()) {
            warn!(path = %self.path.display(), error = %e, "failed to write credentials");
        }
    }
}

/// Replace the file's contents, readable by the owner only.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    fs::File::create(path)?.write_all(contents)
}

fn load(path: &Path) -> HashMap<String, String> {
    if !path.exists() {
        return HashMap::new();
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(entries) => {
                debug!(path = %path.display(), "credentials loaded");
                entries
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse credentials");
                HashMap::new()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read credentials");
            HashMap::new()
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        self.write(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.write(&entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> PathBuf {
        std::env::temp_dir().join(format!("portal-cli-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn values_survive_reopen() {
        let path = scratch();
        let store = FileStore::open(&path);
        store.set("refreshToken", "rt-1");
        store.set("accessToken", "at-1");
        store.remove("accessToken");

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("refreshToken").as_deref(), Some("rt-1"));
        assert_eq!(reopened.get("accessToken"), None);

        fs::remove_file(path).ok();
    }

    #[cfg(unix)]
    #[test]
    fn credentials_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = scratch();
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileStore::open(&path);
        store.set("refreshToken", "rt-1");

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        fs::remove_file(path).ok();
    }

    #[cfg(unix)]
    #[test]
    fn new_credentials_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = scratch();
        FileStore::open(&path).set("accessToken", "at-1");

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        fs::remove_file(path).ok();
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let path = scratch();
        fs::write(&path, "not json").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get("refreshToken"), None);

        fs::remove_file(path).ok();
    }
}
