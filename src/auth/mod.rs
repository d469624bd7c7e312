//! auth - SSO device authorization
//!
//! Obtains access tokens through the OAuth 2.0 device authorization grant.
//!
//! # Architecture
//!
//! - [`AuthMachine`] composes the [`SecureStore`](crate::secrets::SecureStore)
//!   and an [`IdentityClient`](crate::identity::IdentityClient) to return a
//!   valid token, running the device flow only on a cache miss
//! - [`BrowserLauncher`] delivers the verification URI (`print`, `open`,
//!   `exec`, `clip`)
//!
//! # Security
//!
//! Tokens and client secrets never appear in logs or error messages.
//!
//! # Example
//!
//! ```no_run
//! use ssoenv::auth::{AuthMachine, BrowserLauncher, UrlAction};
//! use ssoenv::identity::HttpIdentityClient;
//! use ssoenv::secrets::{MemoryBackend, SecureStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SecureStore::new(Box::new(MemoryBackend::new()))?;
//! let client = HttpIdentityClient::new("us-east-1")?;
//! let machine = AuthMachine::new(&client, &store, "us-east-1", "https://example.awsapps.com/start");
//! let token = machine.authenticate(&BrowserLauncher::new(UrlAction::Print)).await?;
//! # let _ = token;
//! # Ok(())
//! # }
//! ```

mod browser;
mod errors;
mod machine;

pub use browser::{render_exec_template, BrowserLauncher, LauncherError, UrlAction};
pub use errors::AuthError;
pub use machine::{AuthMachine, AuthState, CLIENT_NAME, MAX_FLOW_RESTARTS};
