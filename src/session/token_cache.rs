//! On-disk cache for the mirrored auth session.
//!
//! The cache lives in the data directory as JSON files whose names carry an
//! auth-related marker. Forced cleanup does not assume a fixed file list; it
//! sweeps anything whose name matches the auth patterns, so stale files from
//! older versions are cleared too.

use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::auth::AuthSession;

const SESSION_FILE: &str = "filo-auth-session.json";

/// Name fragments that mark a file as auth-related for the cleanup sweep.
const SWEEP_PATTERNS: &[&str] = &["auth", "token", "session"];

pub struct TokenCache {
    dir: PathBuf,
}

impl TokenCache {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("cache"),
        }
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Persist the current session.
    pub fn store(&self, session: &AuthSession) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(session)?;
        fs::write(self.session_path(), json)?;
        Ok(())
    }

    /// Load the cached session, if any. A missing or unreadable file is
    /// treated as "no cached session".
    pub fn load(&self) -> Option<AuthSession> {
        let content = fs::read_to_string(self.session_path()).ok()?;
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable cached session");
                None
            }
        }
    }

    /// Remove just the cached session file.
    pub fn clear(&self) {
        if let Err(err) = fs::remove_file(self.session_path()) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(error = %err, "could not remove cached session");
            }
        }
    }

    /// Forced cleanup: remove every cached file whose name looks
    /// auth-related. Returns the number of files removed.
    pub fn sweep_auth_keys(&self) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if SWEEP_PATTERNS.iter().any(|p| name.contains(p)) {
                match fs::remove_file(entry.path()) {
                    Ok(()) => {
                        tracing::info!(file = %name, "removed cached auth data");
                        removed += 1;
                    }
                    Err(err) => {
                        tracing::warn!(file = %name, error = %err, "could not remove cached file");
                    }
                }
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProfileMetadata, RemoteUser};

    fn session() -> AuthSession {
        AuthSession {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at: 2_000_000_000,
            user: RemoteUser {
                id: "u-1".into(),
                email: Some("a@example.com".into()),
                user_metadata: ProfileMetadata::default(),
                created_at: None,
            },
        }
    }

    #[test]
    fn store_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(tmp.path());

        cache.store(&session()).unwrap();
        let loaded = cache.load().unwrap();
        assert_eq!(loaded.access_token, "at");
        assert_eq!(loaded.user.id, "u-1");
    }

    #[test]
    fn load_returns_none_when_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(tmp.path());
        assert!(cache.load().is_none());
    }

    #[test]
    fn load_returns_none_for_corrupt_file() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(tmp.path());
        cache.store(&session()).unwrap();
        std::fs::write(tmp.path().join("cache").join(SESSION_FILE), "not json").unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn sweep_removes_auth_named_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(tmp.path());
        cache.store(&session()).unwrap();

        let dir = tmp.path().join("cache");
        std::fs::write(dir.join("legacy-token.json"), "{}").unwrap();
        std::fs::write(dir.join("feed-snapshot.json"), "{}").unwrap();

        let removed = cache.sweep_auth_keys();
        assert_eq!(removed, 2);
        assert!(cache.load().is_none());
        assert!(dir.join("feed-snapshot.json").exists());
    }

    #[test]
    fn clear_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(tmp.path());
        cache.clear();
        cache.store(&session()).unwrap();
        cache.clear();
        cache.clear();
        assert!(cache.load().is_none());
    }
}
