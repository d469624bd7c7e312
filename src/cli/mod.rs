//! cli
//!
//! Command-line interface layer for ssoenv.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and apply flag overrides
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers open a [`context::Session`] for the
//! selected SSO instance and drive the `auth`, `catalog`, and `inject`
//! layers on a single-threaded tokio runtime.

pub mod args;
pub mod commands;
pub mod context;

pub use args::{Cli, Command, FlushKind};
pub use context::{Context, Session};

use anyhow::Result;

use crate::auth::{AuthError, LauncherError};
use crate::catalog::CatalogError;
use crate::core::config::ConfigError;
use crate::core::errors::ErrorKind;
use crate::identity::IdentityError;
use crate::inject::InjectError;
use crate::secrets::SecretError;

/// Run the CLI application with already-parsed arguments.
///
/// Returns the process exit code on success: the child's code for `exec`,
/// zero otherwise.
pub fn run(cli: Cli) -> Result<i32> {
    let ctx = Context::from_cli(&cli)?;
    commands::dispatch(cli.command, &ctx)
}

/// Classify a failure by the first typed error in its chain.
///
/// Errors outside the taxonomy (plain I/O, runtime setup) are `Internal`.
pub fn error_kind(err: &anyhow::Error) -> ErrorKind {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<InjectError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<CatalogError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<AuthError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<LauncherError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<IdentityError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<SecretError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<ConfigError>() {
            return e.kind();
        }
    }
    ErrorKind::Internal
}

/// One-line description of a failure: each cause in the chain, joined by
/// `": "`, skipping causes already quoted by the message before them.
pub fn report(err: &anyhow::Error) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let message = cause.to_string();
        if parts.last().is_some_and(|prev| prev.ends_with(&message)) {
            continue;
        }
        parts.push(message);
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;

    #[test]
    fn kind_found_behind_context() {
        let err = Err::<(), _>(InjectError::EnvironmentConflict("AWS_PROFILE".into()))
            .context("exec failed")
            .unwrap_err();
        assert_eq!(error_kind(&err), ErrorKind::EnvironmentConflict);
        assert_eq!(error_kind(&err).exit_code(), 9);
    }

    #[test]
    fn nested_kinds_delegate() {
        let err = anyhow::Error::from(CatalogError::Auth(AuthError::AccessDenied));
        assert_eq!(error_kind(&err), ErrorKind::AccessDenied);

        let err = anyhow::Error::from(ConfigError::NoSsoInstance);
        assert_eq!(error_kind(&err).exit_code(), 2);
    }

    #[test]
    fn untyped_errors_are_internal() {
        let err = anyhow::anyhow!("runtime setup failed");
        assert_eq!(error_kind(&err), ErrorKind::Internal);
    }

    #[test]
    fn report_skips_repeated_causes() {
        let inner = IdentityError::Api {
            status: 500,
            message: "boom".into(),
        };
        let err = Err::<(), _>(AuthError::Remote(inner))
            .context("login failed")
            .unwrap_err();
        assert_eq!(
            report(&err),
            "login failed: identity provider error: API error: 500 - boom"
        );
    }
}
