//! inject - run a command with role credentials
//!
//! # Pipeline
//!
//! 1. Refuse to run if the parent environment already carries
//!    `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, or `AWS_PROFILE`
//! 2. Resolve the selection (profile, ARN, or account + role) against the
//!    role catalog
//! 3. Read role credentials from the secure store, fetching fresh ones on a
//!    miss or near expiry
//! 4. Record the role in the usage history
//! 5. Build the child environment from a copy of the parent's
//! 6. Spawn the child and wait; its exit status is the result

mod credentials;
mod env;
mod errors;
mod exec;
mod resolver;

pub use credentials::CredentialSource;
pub use env::{build_environment, check_environment, parent_environment, Injection, CONFLICTING_VARS};
pub use errors::InjectError;
pub use exec::{default_command, run_child};
pub use resolver::{resolve, RoleQuery, RoleSelector};

use std::collections::BTreeMap;

use crate::auth::{AuthMachine, BrowserLauncher};
use crate::catalog::{CatalogManager, RoleRecord};
use crate::core::config::SsoInstance;
use crate::core::records::RoleCredentials;
use crate::identity::IdentityClient;
use crate::secrets::SecureStore;

/// A resolved role ready to run a command.
///
/// Not `Debug`: `env` holds the secret keys in clear.
#[derive(Clone)]
pub struct Prepared {
    pub record: RoleRecord,
    pub credentials: RoleCredentials,
    pub env: BTreeMap<String, String>,
}

/// Everything the pipeline needs for one SSO instance.
pub struct Injector<'a> {
    pub client: &'a dyn IdentityClient,
    pub store: &'a SecureStore,
    pub auth: &'a AuthMachine<'a>,
    pub launcher: &'a BrowserLauncher,
    pub catalogs: &'a CatalogManager<'a>,
    pub sso_name: &'a str,
    pub instance: &'a SsoInstance,
}

impl Injector<'_> {
    /// Resolve the role, obtain credentials and build the child environment.
    pub async fn prepare(
        &self,
        selector: &RoleSelector,
        parent: &BTreeMap<String, String>,
        suppress_region: bool,
    ) -> Result<Prepared, InjectError> {
        check_environment(parent)?;
        let query = selector.query()?;

        let catalog = self
            .catalogs
            .catalog(self.sso_name, self.instance, self.auth, self.launcher)
            .await?;
        let record = resolve(&catalog, &query)?.clone();

        let source = CredentialSource {
            client: self.client,
            store: self.store,
            auth: self.auth,
            launcher: self.launcher,
        };
        let credentials = source.credentials(&record.arn).await?;

        if let Err(e) = self.catalogs.add_history(&record.arn.to_string()).await {
            tracing::warn!(error = %e, "failed to record history");
        }

        let env = build_environment(
            parent,
            &Injection {
                sso_name: self.sso_name,
                record: &record,
                credentials: &credentials,
                suppress_region,
            },
        );
        Ok(Prepared {
            record,
            credentials,
            env,
        })
    }

    /// Run `command` under the selected role and return its exit code.
    pub async fn run(
        &self,
        selector: &RoleSelector,
        command: &[String],
        parent: &BTreeMap<String, String>,
        suppress_region: bool,
    ) -> Result<i32, InjectError> {
        let prepared = self.prepare(selector, parent, suppress_region).await?;
        tracing::info!(arn = %prepared.record.arn, profile = %prepared.record.profile, "running command");
        run_child(command, &prepared.env).await
    }
}
