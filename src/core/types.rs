//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`AccountId`] - AWS account identifier, always rendered as 12 digits
//! - [`RoleArn`] - Canonical IAM role ARN
//!
//! # Validation
//!
//! These types enforce validity at construction time. An account identifier
//! that does not fit in 12 digits cannot be represented, and every rendering
//! of it is zero-padded.
//!
//! # Examples
//!
//! ```
//! use ssoenv::core::types::{AccountId, RoleArn};
//!
//! let account = AccountId::new(42).unwrap();
//! assert_eq!(account.to_string(), "000000000042");
//!
//! let arn = RoleArn::new(account, "admin").unwrap();
//! assert_eq!(arn.to_string(), "arn:aws:iam::000000000042:role/admin");
//!
//! let parsed: RoleArn = "arn:aws:iam::000000000042:role/admin".parse().unwrap();
//! assert_eq!(parsed, arn);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest account identifier that fits in 12 decimal digits.
pub const MAX_ACCOUNT_ID: u64 = 999_999_999_999;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("invalid role ARN: {0}")]
    InvalidArn(String),

    #[error("invalid role name: {0}")]
    InvalidRoleName(String),
}

/// An AWS account identifier.
///
/// Stored as an integer, rendered as exactly 12 zero-padded digits. Serializes
/// as the padded string and deserializes from either a string or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "AccountIdRepr", into = "String")]
pub struct AccountId(u64);

#[derive(Deserialize)]
#[serde(untagged)]
enum AccountIdRepr {
    Number(u64),
    Text(String),
}

impl AccountId {
    /// Create an account identifier.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidAccountId` if the value has more than 12 digits.
    pub fn new(id: u64) -> Result<Self, TypeError> {
        if id > MAX_ACCOUNT_ID {
            return Err(TypeError::InvalidAccountId(format!(
                "{} does not fit in 12 digits",
                id
            )));
        }
        Ok(Self(id))
    }

    /// The numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The 12-digit padded form.
    pub fn padded(&self) -> String {
        format!("{:012}", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:012}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.len() > 12 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypeError::InvalidAccountId(format!(
                "'{}' must be 1 to 12 digits",
                s
            )));
        }
        let id = s
            .parse::<u64>()
            .map_err(|e| TypeError::InvalidAccountId(e.to_string()))?;
        Self::new(id)
    }
}

impl TryFrom<AccountIdRepr> for AccountId {
    type Error = TypeError;

    fn try_from(repr: AccountIdRepr) -> Result<Self, Self::Error> {
        match repr {
            AccountIdRepr::Number(n) => Self::new(n),
            AccountIdRepr::Text(s) => s.parse(),
        }
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.padded()
    }
}

/// A canonical IAM role ARN: `arn:aws:iam::<12-digit account>:role/<role_name>`.
///
/// Parsing accepts unpadded account digits and normalizes them, so a parsed
/// ARN always renders in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleArn {
    account: AccountId,
    role_name: String,
}

impl RoleArn {
    /// Build an ARN from its parts.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRoleName` if the role name is empty or
    /// contains whitespace or `:`.
    pub fn new(account: AccountId, role_name: impl Into<String>) -> Result<Self, TypeError> {
        let role_name = role_name.into();
        validate_role_name(&role_name)?;
        Ok(Self { account, role_name })
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }
}

fn validate_role_name(name: &str) -> Result<(), TypeError> {
    if name.is_empty() {
        return Err(TypeError::InvalidRoleName("role name cannot be empty".into()));
    }
    if name.contains(':') || name.chars().any(char::is_whitespace) {
        return Err(TypeError::InvalidRoleName(format!(
            "'{}' contains ':' or whitespace",
            name
        )));
    }
    Ok(())
}

impl fmt::Display for RoleArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arn:aws:iam::{}:role/{}", self.account, self.role_name)
    }
}

impl FromStr for RoleArn {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("arn:aws:iam::")
            .ok_or_else(|| TypeError::InvalidArn(format!("'{}' is not an IAM ARN", s)))?;
        let (account, resource) = rest
            .split_once(':')
            .ok_or_else(|| TypeError::InvalidArn(format!("'{}' has no resource part", s)))?;
        let role_name = resource
            .strip_prefix("role/")
            .ok_or_else(|| TypeError::InvalidArn(format!("'{}' is not a role ARN", s)))?;
        let account: AccountId = account
            .parse()
            .map_err(|e: TypeError| TypeError::InvalidArn(e.to_string()))?;
        Self::new(account, role_name)
    }
}

impl TryFrom<String> for RoleArn {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RoleArn> for String {
    fn from(arn: RoleArn) -> Self {
        arn.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod account_id {
        use super::*;

        #[test]
        fn pads_to_twelve_digits() {
            assert_eq!(AccountId::new(42).unwrap().to_string(), "000000000042");
            assert_eq!(AccountId::new(0).unwrap().to_string(), "000000000000");
            assert_eq!(
                AccountId::new(MAX_ACCOUNT_ID).unwrap().to_string(),
                "999999999999"
            );
        }

        #[test]
        fn rejects_thirteen_digits() {
            assert!(AccountId::new(MAX_ACCOUNT_ID + 1).is_err());
            assert!("1000000000000".parse::<AccountId>().is_err());
        }

        #[test]
        fn parses_padded_and_unpadded() {
            let a: AccountId = "000000000042".parse().unwrap();
            let b: AccountId = "42".parse().unwrap();
            assert_eq!(a, b);
            assert_eq!(a.value(), 42);
        }

        #[test]
        fn rejects_non_digits() {
            assert!("".parse::<AccountId>().is_err());
            assert!("12ab".parse::<AccountId>().is_err());
            assert!("-42".parse::<AccountId>().is_err());
        }

        #[test]
        fn serde_uses_padded_string() {
            let id = AccountId::new(42).unwrap();
            assert_eq!(serde_json::to_string(&id).unwrap(), "\"000000000042\"");

            let from_str: AccountId = serde_json::from_str("\"42\"").unwrap();
            let from_num: AccountId = serde_json::from_str("42").unwrap();
            assert_eq!(from_str, id);
            assert_eq!(from_num, id);
        }
    }

    mod role_arn {
        use super::*;

        #[test]
        fn renders_canonical_form() {
            let arn = RoleArn::new(AccountId::new(42).unwrap(), "admin").unwrap();
            assert_eq!(arn.to_string(), "arn:aws:iam::000000000042:role/admin");
        }

        #[test]
        fn parse_normalizes_account() {
            let arn: RoleArn = "arn:aws:iam::42:role/admin".parse().unwrap();
            assert_eq!(arn.to_string(), "arn:aws:iam::000000000042:role/admin");
            assert_eq!(arn.account().value(), 42);
            assert_eq!(arn.role_name(), "admin");
        }

        #[test]
        fn rejects_malformed() {
            assert!("".parse::<RoleArn>().is_err());
            assert!("arn:aws:s3:::bucket".parse::<RoleArn>().is_err());
            assert!("arn:aws:iam::000000000042:user/bob".parse::<RoleArn>().is_err());
            assert!("arn:aws:iam::000000000042:role/".parse::<RoleArn>().is_err());
            assert!("arn:aws:iam::abc:role/admin".parse::<RoleArn>().is_err());
        }

        #[test]
        fn rejects_bad_role_names() {
            let account = AccountId::new(1).unwrap();
            assert!(RoleArn::new(account, "").is_err());
            assert!(RoleArn::new(account, "has space").is_err());
            assert!(RoleArn::new(account, "a:b").is_err());
        }
    }
}
