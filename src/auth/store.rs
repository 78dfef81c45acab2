use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::AuthError;

use super::record::TokenRecord;

const RECORD_FILE_VERSION: u32 = 1;

/// Storage abstraction for persisted per-user grants.
///
/// The store owns durability and nothing else; validation and refresh live
/// elsewhere. Writes are visible to subsequent reads within the process.
pub trait CredentialStore: Send + Sync {
    fn get(&self, user_id: &str) -> Result<Option<TokenRecord>, AuthError>;
    /// Upsert.
    fn put(&self, user_id: &str, record: &TokenRecord) -> Result<(), AuthError>;
    /// Returns `false` when no record existed.
    fn delete(&self, user_id: &str) -> Result<bool, AuthError>;
    fn list_users(&self) -> Result<Vec<String>, AuthError>;
}

/// File-backed credential store: one TOML file per user under a
/// configuration directory, written atomically with mode 0o600.
///
/// # Example
/// ```no_run
/// use tunebridge::auth::{CredentialStore, FileCredentialStore};
///
/// let store = FileCredentialStore::new_default();
/// let users = store.list_users()?;
/// # Ok::<(), tunebridge::error::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    base_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: crate::config::default_store_dir(),
        }
    }

    /// The slug keeps filenames readable; the digest suffix keeps distinct
    /// raw ids that share a slug ("Bob Smith" vs "bob-smith") in separate
    /// files.
    fn record_path(&self, user_id: &str) -> PathBuf {
        let digest = Sha256::digest(user_id.as_bytes());
        let tag: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
        self.base_dir
            .join(format!("{}-{tag}.toml", normalize_user_id(user_id)))
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, user_id: &str) -> Result<Option<TokenRecord>, AuthError> {
        let path = self.record_path(user_id);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Storage(err.to_string())),
        };
        let file: RecordFile = toml::from_str(&raw)?;
        // the envelope is authoritative; a digest collision must not leak
        // another user's grant
        if file.record.user_id != user_id {
            return Ok(None);
        }
        Ok(Some(file.record))
    }

    fn put(&self, user_id: &str, record: &TokenRecord) -> Result<(), AuthError> {
        let path = self.record_path(user_id);
        let file = RecordFile {
            version: RECORD_FILE_VERSION,
            saved_at: Utc::now(),
            record: record.clone(),
        };
        let serialized = toml::to_string(&file)?;
        atomic_write(&path, serialized.as_bytes())?;
        debug!(user_id, path = %path.display(), "grant persisted");
        Ok(())
    }

    fn delete(&self, user_id: &str) -> Result<bool, AuthError> {
        let path = self.record_path(user_id);
        match fs::read_to_string(&path) {
            Ok(raw) => {
                let file: RecordFile = toml::from_str(&raw)?;
                if file.record.user_id != user_id {
                    return Ok(false);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(AuthError::Storage(err.to_string())),
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(user_id, "grant deleted");
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(AuthError::Storage(err.to_string())),
        }
    }

    fn list_users(&self) -> Result<Vec<String>, AuthError> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(AuthError::Storage(err.to_string())),
        };
        let mut users = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| AuthError::Storage(err.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            let raw =
                fs::read_to_string(&path).map_err(|err| AuthError::Storage(err.to_string()))?;
            let file: RecordFile = toml::from_str(&raw)?;
            // the envelope keeps the original id; filenames are normalized
            users.push(file.record.user_id);
        }
        users.sort();
        Ok(users)
    }
}

/// Versioned on-disk envelope around a [`TokenRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordFile {
    version: u32,
    saved_at: DateTime<Utc>,
    record: TokenRecord,
}

/// Write via a create-new temp file and rename so readers never observe a
/// partial record; permissions are restricted before any secret hits disk.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| AuthError::Storage(format!("path {} has no file name", path.display())))?;
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let temp_name = format!(
        ".{}.tmp-{}-{nonce}",
        file_name.to_string_lossy(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(AuthError::Storage(err.to_string()));
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(AuthError::Storage(err.to_string()));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

fn normalize_user_id(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() || lower == '-' {
            out.push(lower);
        } else {
            out.push('-');
        }
    }
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::secret::SecretString;
    use chrono::Duration;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileCredentialStore) {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path());
        (dir, store)
    }

    fn sample_record(user_id: &str) -> TokenRecord {
        TokenRecord {
            user_id: user_id.to_string(),
            access_token: SecretString::new("access"),
            refresh_token: Some(SecretString::new("refresh")),
            access_expires_at: Utc::now() + Duration::hours(1),
            issued_at: Utc::now(),
            scope: vec!["music:access".to_string()],
        }
    }

    #[test]
    fn record_round_trip_works() {
        let (_dir, store) = temp_store();
        store.put("alice", &sample_record("alice")).unwrap();
        let loaded = store.get("alice").unwrap().unwrap();
        assert_eq!(loaded.user_id, "alice");
        assert_eq!(loaded.access_token.expose(), "access");
        assert_eq!(
            loaded.refresh_token.as_ref().map(|t| t.expose()),
            Some("refresh")
        );
        assert_eq!(loaded.scope, vec!["music:access".to_string()]);
    }

    #[test]
    fn get_missing_user_returns_none() {
        let (_dir, store) = temp_store();
        assert!(store.get("nobody").unwrap().is_none());
    }

    #[test]
    fn put_is_an_upsert() {
        let (_dir, store) = temp_store();
        store.put("alice", &sample_record("alice")).unwrap();
        let mut updated = sample_record("alice");
        updated.access_token = SecretString::new("rotated");
        store.put("alice", &updated).unwrap();
        let loaded = store.get("alice").unwrap().unwrap();
        assert_eq!(loaded.access_token.expose(), "rotated");
    }

    #[test]
    fn delete_removes_record_and_reports_missing() {
        let (_dir, store) = temp_store();
        store.put("alice", &sample_record("alice")).unwrap();
        assert!(store.delete("alice").unwrap());
        assert!(store.get("alice").unwrap().is_none());
        assert!(!store.delete("alice").unwrap());
    }

    #[test]
    fn list_users_returns_original_ids_sorted() {
        let (_dir, store) = temp_store();
        store.put("Bob Smith", &sample_record("Bob Smith")).unwrap();
        store.put("alice", &sample_record("alice")).unwrap();
        assert_eq!(
            store.list_users().unwrap(),
            vec!["Bob Smith".to_string(), "alice".to_string()]
        );
    }

    #[test]
    fn list_users_on_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("never-created"));
        assert!(store.list_users().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn record_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let (dir, store) = temp_store();
        store.put("alice", &sample_record("alice")).unwrap();
        let path = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .find(|p| p.extension().and_then(|e| e.to_str()) == Some("toml"))
            .expect("record file");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn user_ids_sharing_a_slug_keep_isolated_records() {
        let (_dir, store) = temp_store();
        let mut spaced = sample_record("Bob Smith");
        spaced.access_token = SecretString::new("access-spaced");
        store.put("Bob Smith", &spaced).unwrap();
        let mut dashed = sample_record("bob-smith");
        dashed.access_token = SecretString::new("access-dashed");
        store.put("bob-smith", &dashed).unwrap();

        let loaded = store.get("Bob Smith").unwrap().unwrap();
        assert_eq!(loaded.user_id, "Bob Smith");
        assert_eq!(loaded.access_token.expose(), "access-spaced");
        let loaded = store.get("bob-smith").unwrap().unwrap();
        assert_eq!(loaded.user_id, "bob-smith");
        assert_eq!(loaded.access_token.expose(), "access-dashed");

        // same slug, different raw id: nothing to delete, nothing clobbered
        assert!(!store.delete("BOB SMITH").unwrap());
        assert!(store.get("Bob Smith").unwrap().is_some());
        assert!(store.get("bob-smith").unwrap().is_some());
        assert_eq!(
            store.list_users().unwrap(),
            vec!["Bob Smith".to_string(), "bob-smith".to_string()]
        );
    }

    #[test]
    fn normalize_user_id_sanitizes_filenames() {
        assert_eq!(normalize_user_id("Alice"), "alice");
        assert_eq!(normalize_user_id("bob smith"), "bob-smith");
        assert_eq!(normalize_user_id("  "), "default");
        assert_eq!(normalize_user_id("../../etc/passwd"), "------etc-passwd");
    }
}
