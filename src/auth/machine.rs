//! auth::machine
//!
//! Device authorization state machine.
//!
//! # States
//!
//! `Init -> HaveRegistration -> HaveDeviceCode -> Polling -> HaveToken`
//!
//! - `Init`: load a non-expired client registration for the SSO region, or
//!   register a new client and persist it
//! - `HaveRegistration`: start device authorization; on failure the
//!   registration is rotated (deleted, re-registered) and the call retried
//!   once
//! - `HaveDeviceCode`: hand the verification URI to the [`BrowserLauncher`]
//! - `Polling`: exchange the device code every `poll_interval` seconds,
//!   doubling the interval on `SlowDown`, until the `expires_in` envelope
//!   closes; `ExpiredToken` restarts from `Init`
//! - `HaveToken`: persist the token under the store key
//!
//! # Invariants
//!
//! - A cached token is returned without any remote call while it is outside
//!   the safety margin
//! - An interrupt while polling aborts with `UserAbort` and keeps the
//!   persisted registration

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use super::browser::BrowserLauncher;
use super::errors::AuthError;
use crate::core::records::{AccessToken, ClientRegistration, DeviceAuthorization};
use crate::identity::{IdentityClient, IdentityError};
use crate::secrets::{store_key, SecretError, SecureStore};

/// Client name sent when registering with the OIDC service.
pub const CLIENT_NAME: &str = "ssoenv";

/// How many times an expired device code may restart the flow.
pub const MAX_FLOW_RESTARTS: u32 = 3;

type InterruptFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Interrupt = Box<dyn Fn() -> InterruptFuture + Send + Sync>;

/// Machine states, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Init,
    HaveRegistration,
    HaveDeviceCode,
    Polling,
    HaveToken,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Result of a polling session that did not yield a token.
enum PollOutcome {
    Restart,
    Failed(AuthError),
}

/// Drives the device flow for one (region, start URL) pair.
pub struct AuthMachine<'a> {
    client: &'a dyn IdentityClient,
    store: &'a SecureStore,
    sso_region: String,
    start_url: String,
    interactive: bool,
    interrupt: Interrupt,
}

impl<'a> AuthMachine<'a> {
    pub fn new(
        client: &'a dyn IdentityClient,
        store: &'a SecureStore,
        sso_region: impl Into<String>,
        start_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            store,
            sso_region: sso_region.into(),
            start_url: start_url.into(),
            interactive: true,
            interrupt: Box::new(|| -> InterruptFuture { Box::pin(ctrl_c()) }),
        }
    }

    /// Replace the source of interrupts while polling (Ctrl-C by default).
    /// `interrupt` is called once per polling session; the session aborts
    /// with `UserAbort` when the returned future resolves.
    pub fn with_interrupt<F, Fut>(mut self, interrupt: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.interrupt = Box::new(move || -> InterruptFuture { Box::pin(interrupt()) });
        self
    }

    /// Whether the device flow may run. When false, a missing or expired
    /// token fails with `AuthRequired`.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Key of the access token in the secure store.
    pub fn store_key(&self) -> String {
        store_key(&self.sso_region, &self.start_url)
    }

    /// The stored token if it is still valid.
    pub fn cached_token(&self) -> Result<Option<AccessToken>, AuthError> {
        match self.store.get_token(&self.store_key()) {
            Ok(token) if !token.is_expired() => Ok(Some(token)),
            Ok(_) => {
                tracing::debug!(key = %self.store_key(), "cached token expired");
                Ok(None)
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Return a valid access token, running the device flow on a miss.
    ///
    /// # Errors
    ///
    /// - [`AuthError::AuthRequired`] when non-interactive and no token is cached
    /// - [`AuthError::VerificationExpired`] when the device code envelope closes
    /// - [`AuthError::AccessDenied`] when the user rejects the request
    /// - [`AuthError::UserAbort`] on interrupt
    /// - [`AuthError::Remote`] / [`AuthError::Store`] / [`AuthError::Launcher`]
    pub async fn authenticate(&self, launcher: &BrowserLauncher) -> Result<AccessToken, AuthError> {
        if let Some(token) = self.cached_token()? {
            tracing::debug!(key = %self.store_key(), "using cached token");
            return Ok(token);
        }
        if !self.interactive {
            return Err(AuthError::AuthRequired(self.store_key()));
        }

        let mut restarts = 0;
        loop {
            self.transition(AuthState::Init);
            let registration = self.registration().await?;

            self.transition(AuthState::HaveRegistration);
            let (registration, device) = self.start_device_authorization(registration).await?;

            self.transition(AuthState::HaveDeviceCode);
            launcher.launch(&device)?;

            self.transition(AuthState::Polling);
            match self.poll(&registration, &device).await {
                Ok(token) => {
                    self.transition(AuthState::HaveToken);
                    self.store.save_token(&self.store_key(), &token)?;
                    return Ok(token);
                }
                Err(PollOutcome::Restart) => {
                    restarts += 1;
                    if restarts > MAX_FLOW_RESTARTS {
                        return Err(AuthError::VerificationExpired);
                    }
                    tracing::info!(restarts, "device code expired, restarting authorization");
                }
                Err(PollOutcome::Failed(e)) => return Err(e),
            }
        }
    }

    fn transition(&self, state: AuthState) {
        tracing::debug!(region = %self.sso_region, %state, "auth state");
    }

    /// Load a usable registration or register a new client.
    async fn registration(&self) -> Result<ClientRegistration, AuthError> {
        match self.store.get_registration(&self.sso_region) {
            Ok(registration) if !registration.is_expired() => return Ok(registration),
            Ok(_) => tracing::debug!(region = %self.sso_region, "client registration expired"),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        self.register().await
    }

    async fn register(&self) -> Result<ClientRegistration, AuthError> {
        let registration = self.client.register_client(CLIENT_NAME).await?;
        self.store
            .save_registration(&self.sso_region, &registration)?;
        tracing::debug!(region = %self.sso_region, "registered new client");
        Ok(registration)
    }

    /// Remove the stored registration; a missing one is not an error.
    fn forget_registration(&self) -> Result<(), SecretError> {
        match self.store.delete_registration(&self.sso_region) {
            Err(e) if !e.is_not_found() => Err(e),
            _ => Ok(()),
        }
    }

    async fn start_device_authorization(
        &self,
        registration: ClientRegistration,
    ) -> Result<(ClientRegistration, DeviceAuthorization), AuthError> {
        match self
            .client
            .start_device_authorization(&registration, &self.start_url)
            .await
        {
            Ok(device) => Ok((registration, device)),
            Err(e) => {
                tracing::warn!(error = %e, "device authorization failed, rotating client registration");
                self.forget_registration()?;
                let registration = self.register().await?;
                let device = self
                    .client
                    .start_device_authorization(&registration, &self.start_url)
                    .await?;
                Ok((registration, device))
            }
        }
    }

    async fn poll(
        &self,
        registration: &ClientRegistration,
        device: &DeviceAuthorization,
    ) -> Result<AccessToken, PollOutcome> {
        let deadline = Instant::now() + Duration::from_secs(device.expires_in);
        let mut interval = Duration::from_secs(device.poll_interval.max(1));

        let mut interrupted = (self.interrupt)();

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(PollOutcome::Failed(AuthError::VerificationExpired));
            }

            tokio::select! {
                _ = &mut interrupted => {
                    tracing::debug!("interrupted while polling");
                    return Err(PollOutcome::Failed(AuthError::UserAbort(
                        "interrupted while waiting for authorization".into(),
                    )));
                }
                _ = sleep(interval.min(deadline - now)) => {}
            }

            // No exchange once the envelope has closed.
            if Instant::now() >= deadline {
                return Err(PollOutcome::Failed(AuthError::VerificationExpired));
            }

            match self
                .client
                .create_token(registration, &device.device_code)
                .await
            {
                Ok(token) => return Ok(token),
                Err(IdentityError::AuthorizationPending) => {}
                Err(IdentityError::SlowDown) => {
                    interval *= 2;
                    tracing::debug!(interval_secs = interval.as_secs(), "slowing down");
                }
                Err(IdentityError::ExpiredToken) => return Err(PollOutcome::Restart),
                Err(IdentityError::AccessDenied) => {
                    return Err(PollOutcome::Failed(AuthError::AccessDenied))
                }
                Err(e @ IdentityError::InvalidClient(_)) => {
                    tracing::warn!("client registration rejected, discarding it");
                    if let Err(store_err) = self.forget_registration() {
                        return Err(PollOutcome::Failed(store_err.into()));
                    }
                    return Err(PollOutcome::Failed(e.into()));
                }
                Err(e) => return Err(PollOutcome::Failed(e.into())),
            }
        }
    }
}

/// Resolves on the first Ctrl-C. Never resolves if the handler cannot be
/// installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
