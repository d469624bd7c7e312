//! catalog::cache
//!
//! On-disk role cache at `~/.ssoenv/cache.json`.
//!
//! # Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "sso": {
//!     "Default": {
//!       "expires_at": "2026-01-01T00:00:00Z",
//!       "accounts": {
//!         "000000000042": { "name": "prod", "roles": { "admin": { "...": "RoleRecord" } } }
//!       }
//!     }
//!   },
//!   "history": ["arn:aws:iam::000000000042:role/admin"]
//! }
//! ```
//!
//! # Design
//!
//! The cache holds nothing secret and can always be rebuilt, so an
//! unreadable or corrupt file loads as empty. Writes are atomic (temp file +
//! rename) and are performed while holding the [`CacheLock`](super::CacheLock).

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::CatalogError;
use super::record::RoleRecord;
use super::roles::RoleCatalog;

/// Cache file format version.
pub const CACHE_VERSION: u32 = 1;

/// Cached roles of one account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roles: BTreeMap<String, RoleRecord>,
}

/// Cached catalog of one SSO instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsoEntry {
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountEntry>,
    pub expires_at: DateTime<Utc>,
}

impl SsoEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// The whole cache document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub sso: BTreeMap<String, SsoEntry>,
    /// Recently used role ARNs, most recent first.
    #[serde(default)]
    pub history: Vec<String>,
}

fn default_version() -> u32 {
    CACHE_VERSION
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            sso: BTreeMap::new(),
            history: Vec::new(),
        }
    }
}

impl CacheFile {
    /// Load the cache, treating a missing, unreadable, or corrupt file as
    /// empty.
    pub fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str::<CacheFile>(&contents) {
            Ok(cache) if cache.version == CACHE_VERSION => cache,
            Ok(cache) => {
                tracing::warn!(version = cache.version, "ignoring role cache with unknown version");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt role cache");
                Self::default()
            }
        }
    }

    /// Write the cache atomically.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let write_error = |message: String| CatalogError::CacheWrite {
            path: path.to_path_buf(),
            message,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| write_error(format!("cannot create directory: {}", e)))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| write_error(format!("cannot serialize: {}", e)))?;

        let temp_path: PathBuf = path.with_extension("json.tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| write_error(format!("cannot create temp file: {}", e)))?;
            file.write_all(json.as_bytes())
                .map_err(|e| write_error(format!("cannot write: {}", e)))?;
            file.sync_all()
                .map_err(|e| write_error(format!("cannot sync: {}", e)))?;
        }
        fs::rename(&temp_path, path).map_err(|e| write_error(format!("cannot rename: {}", e)))
    }

    /// Whether the named instance needs a refresh at `now`.
    pub fn is_stale(&self, sso_name: &str, now: DateTime<Utc>) -> bool {
        self.sso
            .get(sso_name)
            .map_or(true, |entry| entry.is_expired_at(now))
    }

    /// The cached catalog of an instance, if present.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Conflict` if the cached records collide.
    pub fn catalog(&self, sso_name: &str) -> Option<Result<RoleCatalog, CatalogError>> {
        let entry = self.sso.get(sso_name)?;
        let records = entry
            .accounts
            .values()
            .flat_map(|account| account.roles.values().cloned());
        Some(RoleCatalog::from_records(sso_name, records))
    }

    /// Replace the cached catalog of an instance.
    pub fn set_catalog(&mut self, catalog: &RoleCatalog, expires_at: DateTime<Utc>) {
        let mut accounts: BTreeMap<String, AccountEntry> = BTreeMap::new();
        for record in catalog.records() {
            let account = accounts.entry(record.account_id.padded()).or_default();
            account.name = record.account_name.clone();
            account
                .roles
                .insert(record.role_name.clone(), record.clone());
        }
        self.sso.insert(
            catalog.sso_name().to_string(),
            SsoEntry {
                accounts,
                expires_at,
            },
        );
    }

    /// Record a use of `arn`: move it to the front, drop duplicates, and
    /// keep at most `limit` entries.
    pub fn add_history(&mut self, arn: &str, limit: usize) {
        self.history.retain(|existing| existing != arn);
        self.history.insert(0, arn.to_string());
        self.history.truncate(limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AccountId, RoleArn};
    use chrono::Duration;
    use tempfile::TempDir;

    fn record(id: u64, role: &str) -> RoleRecord {
        let account_id = AccountId::new(id).unwrap();
        RoleRecord {
            account_id,
            account_name: format!("acct-{}", id),
            role_name: role.into(),
            arn: RoleArn::new(account_id, role).unwrap(),
            tags: BTreeMap::new(),
            profile: format!("{}:{}", account_id, role),
            env_tags: BTreeMap::new(),
            default_region: None,
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = CacheFile::load(&dir.path().join("cache.json"));
        assert_eq!(cache, CacheFile::default());
        assert!(cache.is_stale("Default", Utc::now()));
    }

    #[test]
    fn corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(CacheFile::load(&path), CacheFile::default());
    }

    #[test]
    fn catalog_survives_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let catalog =
            RoleCatalog::from_records("Default", vec![record(42, "admin"), record(42, "ro")])
                .unwrap();

        let mut cache = CacheFile::default();
        cache.set_catalog(&catalog, Utc::now() + Duration::hours(1));
        cache.save(&path).unwrap();

        let loaded = CacheFile::load(&path);
        assert!(!loaded.is_stale("Default", Utc::now()));
        assert_eq!(loaded.catalog("Default").unwrap().unwrap(), catalog);
        assert!(loaded.catalog("Other").is_none());

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            json["sso"]["Default"]["accounts"]["000000000042"]["roles"]["admin"]["profile"],
            "000000000042:admin"
        );
    }

    #[test]
    fn expiry_makes_entry_stale() {
        let catalog = RoleCatalog::from_records("Default", vec![record(1, "a")]).unwrap();
        let mut cache = CacheFile::default();
        let expires = Utc::now();
        cache.set_catalog(&catalog, expires);
        assert!(cache.is_stale("Default", expires));
        assert!(!cache.is_stale("Default", expires - Duration::seconds(1)));
    }

    #[test]
    fn history_is_bounded_deduplicated_and_recent_first() {
        let mut cache = CacheFile::default();
        cache.add_history("a", 3);
        cache.add_history("b", 3);
        cache.add_history("c", 3);
        cache.add_history("a", 3);
        assert_eq!(cache.history, vec!["a", "c", "b"]);
        cache.add_history("d", 3);
        assert_eq!(cache.history, vec!["d", "a", "c"]);
    }
}
