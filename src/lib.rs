//! ssoenv - run commands with short-lived AWS role credentials
//!
//! ssoenv authenticates to an AWS IAM Identity Center (SSO) instance with the
//! OAuth 2.0 device authorization flow, discovers the accounts and roles the
//! user can assume, and runs a child process with temporary credentials for
//! one of them injected into its environment.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to the
//!   layers below)
//! - [`inject`] - Role resolution, credential acquisition, child environment
//! - [`catalog`] - Role catalog, profile templates, on-disk cache
//! - [`auth`] - Device authorization state machine and browser launcher
//! - [`identity`] - Identity provider client (HTTP and scripted mock)
//! - [`secrets`] - Secure store over keychains or an encrypted file
//! - [`core`] - Domain types, records, config, paths, error kinds
//!
//! # Invariants
//!
//! 1. Secret material never appears in logs, error messages, or `Debug`
//!    output
//! 2. Credentials handed to a child expire later than now plus the safety
//!    margin
//! 3. The parent process environment is never modified
//! 4. Every failure maps to a stable [`core::errors::ErrorKind`] and exit code

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod core;
pub mod identity;
pub mod inject;
pub mod secrets;
