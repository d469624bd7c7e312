//! identity
//!
//! Remote identity provider boundary.
//!
//! # Architecture
//!
//! - [`IdentityClient`]: async trait covering client registration, device
//!   authorization, token exchange, account/role listing, and role
//!   credentials
//! - [`HttpIdentityClient`]: implementation over the AWS SSO REST APIs
//! - [`mock::MockIdentityClient`]: scripted implementation for tests

pub mod http;
pub mod mock;
mod traits;

pub use http::HttpIdentityClient;
pub use traits::{Account, IdentityClient, IdentityError, Role};
