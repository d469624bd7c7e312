//! core::records
//!
//! Record types persisted in the secure store or handed between the
//! authentication state machine and the injector.
//!
//! # Expiry
//!
//! Every time-limited record is treated as expired once the current time
//! reaches `expires_at - SAFETY_MARGIN_SECS`. The boundary itself counts as
//! expired.
//!
//! # Security
//!
//! Records holding secrets implement `Debug` by hand and redact them. They
//! must never be logged or included in error messages.

use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::types::{AccountId, RoleArn, TypeError};

/// Minimum remaining lifetime (seconds) below which a cached record is stale.
pub const SAFETY_MARGIN_SECS: i64 = 60;

fn expired_at(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= expires_at - Duration::seconds(SAFETY_MARGIN_SECS)
}

/// OAuth client registration, one per SSO region.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ClientRegistration {
    /// Check expiry against a given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        expired_at(self.expires_at, now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for ClientRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistration")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Result of starting a device authorization. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAuthorization {
    /// Back-channel code used when polling for the token.
    pub device_code: String,
    /// Code the user confirms in the browser.
    pub user_code: String,
    pub verification_uri: String,
    /// Verification URI with the user code embedded.
    pub verification_uri_complete: String,
    /// Lifetime of the device code in seconds.
    pub expires_in: u64,
    /// Minimum polling interval in seconds.
    pub poll_interval: u64,
}

/// Access token issued by the device flow, one per (region, start URL).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Check expiry against a given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        expired_at(self.expires_at, now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Temporary credentials for a single role, keyed by canonical ARN.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCredentials {
    pub account_id: AccountId,
    pub role_name: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

impl RoleCredentials {
    /// Canonical ARN of the role these credentials belong to.
    pub fn arn(&self) -> Result<RoleArn, TypeError> {
        RoleArn::new(self.account_id, self.role_name.clone())
    }

    /// Expiration as RFC-3339 with second precision, e.g. `2024-01-01T00:00:00Z`.
    pub fn expires_rfc3339(&self) -> String {
        self.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        expired_at(self.expires_at, now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for RoleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleCredentials")
            .field("account_id", &self.account_id)
            .field("role_name", &self.role_name)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
