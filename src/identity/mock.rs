//! identity::mock
//!
//! Scripted identity client for deterministic testing.
//!
//! # Design
//!
//! Tests queue the responses they expect, in order. Each call pops the next
//! scripted response; a call whose kind does not match the head of the
//! queue, or a call on an empty queue, fails with an `Api` error naming the
//! mismatch. Every call is recorded for later verification.
//!
//! # Example
//!
//! ```
//! use ssoenv::identity::mock::{MockCall, MockIdentityClient};
//! use ssoenv::identity::{IdentityClient, IdentityError};
//!
//! # tokio_test::block_on(async {
//! let client = MockIdentityClient::new()
//!     .expect_register_client(Err(IdentityError::Network("down".into())));
//!
//! assert!(client.register_client("ssoenv").await.is_err());
//! assert_eq!(
//!     client.calls(),
//!     vec![MockCall::RegisterClient { client_name: "ssoenv".into() }]
//! );
//! assert_eq!(client.remaining(), 0);
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{Account, IdentityClient, IdentityError, Role};
use crate::core::records::{AccessToken, ClientRegistration, DeviceAuthorization, RoleCredentials};
use crate::core::types::AccountId;

/// A scripted response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    RegisterClient(Result<ClientRegistration, IdentityError>),
    StartDeviceAuthorization(Result<DeviceAuthorization, IdentityError>),
    CreateToken(Result<AccessToken, IdentityError>),
    ListAccounts(Result<Vec<Account>, IdentityError>),
    ListAccountRoles(Result<Vec<Role>, IdentityError>),
    GetRoleCredentials(Result<RoleCredentials, IdentityError>),
}

impl MockResponse {
    fn name(&self) -> &'static str {
        match self {
            MockResponse::RegisterClient(_) => "register_client",
            MockResponse::StartDeviceAuthorization(_) => "start_device_authorization",
            MockResponse::CreateToken(_) => "create_token",
            MockResponse::ListAccounts(_) => "list_accounts",
            MockResponse::ListAccountRoles(_) => "list_account_roles",
            MockResponse::GetRoleCredentials(_) => "get_role_credentials",
        }
    }
}

/// Recorded call for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    RegisterClient {
        client_name: String,
    },
    StartDeviceAuthorization {
        client_id: String,
        start_url: String,
    },
    CreateToken {
        client_id: String,
        device_code: String,
    },
    ListAccounts,
    ListAccountRoles {
        account: AccountId,
    },
    GetRoleCredentials {
        account: AccountId,
        role_name: String,
    },
}

impl MockCall {
    pub fn name(&self) -> &'static str {
        match self {
            MockCall::RegisterClient { .. } => "register_client",
            MockCall::StartDeviceAuthorization { .. } => "start_device_authorization",
            MockCall::CreateToken { .. } => "create_token",
            MockCall::ListAccounts => "list_accounts",
            MockCall::ListAccountRoles { .. } => "list_account_roles",
            MockCall::GetRoleCredentials { .. } => "get_role_credentials",
        }
    }
}

/// Mock identity client for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share the
/// script and the call log.
#[derive(Debug, Clone, Default)]
pub struct MockIdentityClient {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug, Default)]
struct MockInner {
    script: VecDeque<MockResponse>,
    calls: Vec<MockCall>,
}

impl MockIdentityClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a response to the script.
    pub fn push(&self, response: MockResponse) {
        self.inner.lock().unwrap().script.push_back(response);
    }

    pub fn expect_register_client(self, result: Result<ClientRegistration, IdentityError>) -> Self {
        self.push(MockResponse::RegisterClient(result));
        self
    }

    pub fn expect_start_device_authorization(
        self,
        result: Result<DeviceAuthorization, IdentityError>,
    ) -> Self {
        self.push(MockResponse::StartDeviceAuthorization(result));
        self
    }

    pub fn expect_create_token(self, result: Result<AccessToken, IdentityError>) -> Self {
        self.push(MockResponse::CreateToken(result));
        self
    }

    pub fn expect_list_accounts(self, result: Result<Vec<Account>, IdentityError>) -> Self {
        self.push(MockResponse::ListAccounts(result));
        self
    }

    pub fn expect_list_account_roles(self, result: Result<Vec<Role>, IdentityError>) -> Self {
        self.push(MockResponse::ListAccountRoles(result));
        self
    }

    pub fn expect_get_role_credentials(self, result: Result<RoleCredentials, IdentityError>) -> Self {
        self.push(MockResponse::GetRoleCredentials(result));
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Names of the recorded calls, in order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(MockCall::name).collect()
    }

    /// Number of scripted responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.inner.lock().unwrap().script.len()
    }

    /// Record a call and pop the next scripted response.
    fn next(&self, call: MockCall) -> Result<MockResponse, IdentityError> {
        let mut inner = self.inner.lock().unwrap();
        let expected = call.name();
        inner.calls.push(call);
        match inner.script.pop_front() {
            Some(response) if response.name() == expected => Ok(response),
            Some(response) => Err(unscripted(format!(
                "called {} but the script expected {}",
                expected,
                response.name()
            ))),
            None => Err(unscripted(format!("called {} with an empty script", expected))),
        }
    }
}

fn unscripted(message: String) -> IdentityError {
    IdentityError::Api {
        status: 0,
        message: format!("mock: {}", message),
    }
}

#[async_trait]
impl IdentityClient for MockIdentityClient {
    async fn register_client(
        &self,
        client_name: &str,
    ) -> Result<ClientRegistration, IdentityError> {
        match self.next(MockCall::RegisterClient {
            client_name: client_name.to_string(),
        })? {
            MockResponse::RegisterClient(result) => result,
            other => Err(unscripted(format!("wrong response {}", other.name()))),
        }
    }

    async fn start_device_authorization(
        &self,
        registration: &ClientRegistration,
        start_url: &str,
    ) -> Result<DeviceAuthorization, IdentityError> {
        match self.next(MockCall::StartDeviceAuthorization {
            client_id: registration.client_id.clone(),
            start_url: start_url.to_string(),
        })? {
            MockResponse::StartDeviceAuthorization(result) => result,
            other => Err(unscripted(format!("wrong response {}", other.name()))),
        }
    }

    async fn create_token(
        &self,
        registration: &ClientRegistration,
        device_code: &str,
    ) -> Result<AccessToken, IdentityError> {
        match self.next(MockCall::CreateToken {
            client_id: registration.client_id.clone(),
            device_code: device_code.to_string(),
        })? {
            MockResponse::CreateToken(result) => result,
            other => Err(unscripted(format!("wrong response {}", other.name()))),
        }
    }

    async fn list_accounts(&self, _token: &AccessToken) -> Result<Vec<Account>, IdentityError> {
        match self.next(MockCall::ListAccounts)? {
            MockResponse::ListAccounts(result) => result,
            other => Err(unscripted(format!("wrong response {}", other.name()))),
        }
    }

    async fn list_account_roles(
        &self,
        _token: &AccessToken,
        account: AccountId,
    ) -> Result<Vec<Role>, IdentityError> {
        match self.next(MockCall::ListAccountRoles { account })? {
            MockResponse::ListAccountRoles(result) => result,
            other => Err(unscripted(format!("wrong response {}", other.name()))),
        }
    }

    async fn get_role_credentials(
        &self,
        _token: &AccessToken,
        account: AccountId,
        role_name: &str,
    ) -> Result<RoleCredentials, IdentityError> {
        match self.next(MockCall::GetRoleCredentials {
            account,
            role_name: role_name.to_string(),
        })? {
            MockResponse::GetRoleCredentials(result) => result,
            other => Err(unscripted(format!("wrong response {}", other.name()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn registration() -> ClientRegistration {
        ClientRegistration {
            client_id: "cid".into(),
            client_secret: "sec".into(),
            issued_at: Utc::now(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn responses_are_consumed_in_order() {
        let client = MockIdentityClient::new()
            .expect_register_client(Ok(registration()))
            .expect_list_accounts(Ok(vec![]));

        assert_eq!(client.register_client("x").await.unwrap().client_id, "cid");
        assert_eq!(client.remaining(), 1);
        let token = AccessToken {
            access_token: "at".into(),
            refresh_token: None,
            token_type: "Bearer".into(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert!(client.list_accounts(&token).await.unwrap().is_empty());
        assert_eq!(client.call_names(), vec!["register_client", "list_accounts"]);
    }

    #[tokio::test]
    async fn out_of_order_call_fails() {
        let client = MockIdentityClient::new().expect_register_client(Ok(registration()));
        let err = client
            .start_device_authorization(&registration(), "https://x")
            .await
            .unwrap_err();
        match err {
            IdentityError::Api { message, .. } => {
                assert!(message.contains("start_device_authorization"));
                assert!(message.contains("register_client"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_script_fails() {
        let client = MockIdentityClient::new();
        assert!(client.register_client("x").await.is_err());
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let client = MockIdentityClient::new().expect_register_client(Ok(registration()));
        let observer = client.clone();
        client.register_client("x").await.unwrap();
        assert_eq!(observer.remaining(), 0);
        assert_eq!(observer.calls().len(), 1);
    }
}
