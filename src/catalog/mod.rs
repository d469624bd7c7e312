//! catalog - accounts and roles the principal may assume
//!
//! # Architecture
//!
//! - [`RoleRecord`]: one role with its ARN, tags, rendered profile name,
//!   tag-derived environment variables and default region
//! - [`ProfileTemplate`]: `{{ .Var }}` profile name templates
//! - [`RoleCatalog`]: records of one SSO instance with lookup by ARN, by
//!   (account, role), and by profile
//! - [`CacheFile`]: JSON cache of every instance's catalog plus the usage
//!   history
//! - [`CacheLock`]: file lock serializing refreshes across processes
//! - [`CatalogManager`]: cache-or-refresh entry point, walking the identity
//!   provider with [`RetryConfig`] backoff
//!
//! # Example
//!
//! ```
//! use ssoenv::catalog::{RoleCatalog, RoleRecord};
//! use ssoenv::core::types::{AccountId, RoleArn};
//!
//! let account = AccountId::new(42).unwrap();
//! let record = RoleRecord {
//!     account_id: account,
//!     account_name: "prod".into(),
//!     role_name: "admin".into(),
//!     arn: RoleArn::new(account, "admin").unwrap(),
//!     tags: Default::default(),
//!     profile: "prod-admin".into(),
//!     env_tags: Default::default(),
//!     default_region: None,
//! };
//! let catalog = RoleCatalog::from_records("Default", vec![record]).unwrap();
//! assert_eq!(catalog.by_profile("prod-admin").unwrap().role_name, "admin");
//! ```

mod cache;
mod errors;
mod lock;
mod manager;
mod record;
mod retry;
mod roles;
mod template;

pub use cache::{AccountEntry, CacheFile, SsoEntry, CACHE_VERSION};
pub use errors::CatalogError;
pub use lock::{CacheLock, DEFAULT_LOCK_TIMEOUT};
pub use manager::CatalogManager;
pub use record::{env_tag_name, RoleRecord, ENV_TAG_PREFIX};
pub use retry::{retry_remote, RetryConfig};
pub use roles::{AccountRoles, RoleCatalog};
pub use template::ProfileTemplate;
