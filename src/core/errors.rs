//! core::errors
//!
//! Stable, machine-readable failure classification.
//!
//! Every module error type maps onto one [`ErrorKind`]. The kind decides the
//! process exit code, and both the names and the numbers are stable across
//! versions.

use std::fmt;

/// Stable failure kinds surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed configuration or duplicate profile names.
    Config,
    /// Contradictory or incomplete user input.
    Input,
    /// No valid token and the device flow could not run (non-interactive).
    AuthRequired,
    /// Upstream API failure.
    Remote,
    /// The device code expired before the user approved it.
    VerificationExpired,
    /// The user denied the authorization request.
    AccessDenied,
    /// Secure store failure.
    Store,
    /// The parent environment already carries AWS credentials.
    EnvironmentConflict,
    /// The verification URI could not be opened.
    Launcher,
    /// Interactive cancellation.
    UserAbort,
    /// Local I/O or other failures outside the taxonomy.
    Internal,
}

impl ErrorKind {
    /// Process exit code for this kind.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::Config => 2,
            ErrorKind::Input => 3,
            ErrorKind::AuthRequired => 4,
            ErrorKind::Remote => 5,
            ErrorKind::VerificationExpired => 6,
            ErrorKind::AccessDenied => 7,
            ErrorKind::Store => 8,
            ErrorKind::EnvironmentConflict => 9,
            ErrorKind::Launcher => 10,
            ErrorKind::UserAbort => 130,
        }
    }

    /// Machine-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "ConfigError",
            ErrorKind::Input => "InputError",
            ErrorKind::AuthRequired => "AuthRequired",
            ErrorKind::Remote => "RemoteError",
            ErrorKind::VerificationExpired => "VerificationExpired",
            ErrorKind::AccessDenied => "AccessDenied",
            ErrorKind::Store => "StoreError",
            ErrorKind::EnvironmentConflict => "EnvironmentConflict",
            ErrorKind::Launcher => "LauncherError",
            ErrorKind::UserAbort => "UserAbort",
            ErrorKind::Internal => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
