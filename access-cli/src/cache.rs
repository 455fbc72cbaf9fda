//! Local credential cache with expiry-aware reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::config::{ensure_private_dir, set_owner_only, store_dir};
use crate::error::CliError;
use crate::provider::RoleCredentials;

/// Everything one successful login produced, including the SSO parameters it
/// was obtained with, so `status` can report them without the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedCredentials {
    pub credentials: RoleCredentials,
    pub access_token: String,
    pub cached_at: DateTime<Utc>,
    pub sso_start_url: String,
    pub sso_region: String,
    pub account_id: String,
    pub role_name: String,
}

impl CachedCredentials {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.credentials.expiration
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.credentials.expiration)
    }
}

/// Reads and writes `credentials.json` in the store directory. The file is
/// written owner-only; a second invocation overwrites it wholesale
/// (last writer wins is fine at human pace).
pub struct CredentialCache {
    dir: PathBuf,
}

impl CredentialCache {
    pub fn default_location() -> Result<Self, CliError> {
        Ok(Self::at(store_dir()?))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("credentials.json")
    }

    pub fn save(&self, credentials: &CachedCredentials) -> Result<(), CliError> {
        ensure_private_dir(&self.dir)?;
        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(credentials)?)?;
        set_owner_only(&path)?;
        Ok(())
    }

    /// Load the cached bundle, treating anything expired at or before now as
    /// absent. Callers getting `None` must re-authenticate.
    pub fn load(&self) -> Result<Option<CachedCredentials>, CliError> {
        let Some(cached) = self.load_unchecked()? else {
            return Ok(None);
        };
        if cached.is_expired_at(Utc::now()) {
            tracing::debug!("cached credentials expired");
            return Ok(None);
        }
        Ok(Some(cached))
    }

    /// Load without the expiry check; `status` uses this to report on an
    /// expired bundle instead of pretending it does not exist.
    pub fn load_unchecked(&self) -> Result<Option<CachedCredentials>, CliError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        match serde_json::from_str(&raw) {
            Ok(cached) => Ok(Some(cached)),
            Err(e) => {
                tracing::warn!(error = %e, "credential cache unreadable, treating as absent");
                Ok(None)
            }
        }
    }

    pub fn clear(&self) -> Result<(), CliError> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cached(expiration: DateTime<Utc>) -> CachedCredentials {
        CachedCredentials {
            credentials: RoleCredentials {
                access_key_id: "AKIAEXAMPLE".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: "session".to_string(),
                expiration: expiration.timestamp_millis(),
            },
            access_token: "access-token".to_string(),
            cached_at: Utc::now(),
            sso_start_url: "https://example.awsapps.com/start".to_string(),
            sso_region: "us-east-1".to_string(),
            account_id: "123456789012".to_string(),
            role_name: "CloudCliAccess".to_string(),
        }
    }

    #[test]
    fn load_returns_none_when_nothing_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CredentialCache::at(dir.path().join("cca"));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_roundtrips_while_valid() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CredentialCache::at(dir.path().join("cca"));

        cache.save(&cached(Utc::now() + Duration::hours(1))).unwrap();
        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.credentials.access_key_id, "AKIAEXAMPLE");
    }

    #[test]
    fn expired_credentials_read_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CredentialCache::at(dir.path().join("cca"));

        cache.save(&cached(Utc::now() - Duration::seconds(1))).unwrap();
        assert!(cache.load().unwrap().is_none());
        // But status can still see them.
        assert!(cache.load_unchecked().unwrap().is_some());
    }

    #[test]
    fn credentials_expiring_exactly_now_read_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CredentialCache::at(dir.path().join("cca"));

        let bundle = cached(Utc::now());
        cache.save(&bundle).unwrap();
        assert!(bundle.is_expired_at(bundle.expires_at().unwrap()));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn clear_removes_the_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CredentialCache::at(dir.path().join("cca"));

        cache.save(&cached(Utc::now() + Duration::hours(1))).unwrap();
        cache.clear().unwrap();
        assert!(cache.load_unchecked().unwrap().is_none());

        // No-op when nothing is stored.
        cache.clear().unwrap();
    }

    #[test]
    fn unreadable_cache_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("cca");
        std::fs::create_dir_all(&store).unwrap();
        std::fs::write(store.join("credentials.json"), "not json").unwrap();

        let cache = CredentialCache::at(store);
        assert!(cache.load().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn cache_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("cca");
        let cache = CredentialCache::at(&store);
        cache.save(&cached(Utc::now() + Duration::hours(1))).unwrap();

        let mode = fs::metadata(store.join("credentials.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);

        let dir_mode = fs::metadata(&store).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }
}
