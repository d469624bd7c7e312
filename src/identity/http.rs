//! identity::http
//!
//! `IdentityClient` over the AWS SSO OIDC and portal REST APIs.
//!
//! # Endpoints
//!
//! OIDC (`https://oidc.<region>.amazonaws.com`):
//! - `POST /client/register`
//! - `POST /device_authorization`
//! - `POST /token`
//!
//! Portal (`https://portal.sso.<region>.amazonaws.com`), bearer token in the
//! `x-amz-sso_bearer_token` header:
//! - `GET /assignment/accounts`
//! - `GET /assignment/roles`
//! - `GET /federation/credentials`
//!
//! # Token Errors
//!
//! The token endpoint reports polling state as an error. The code is taken
//! from the JSON `error` field, falling back to the `x-amzn-ErrorType`
//! header (e.g. `AuthorizationPendingException:...`).

use std::time::Duration;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::{Account, IdentityClient, IdentityError, Role};
use crate::core::records::{AccessToken, ClientRegistration, DeviceAuthorization, RoleCredentials};
use crate::core::types::AccountId;

/// Transport timeout for every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Page size requested from listing endpoints.
const PAGE_SIZE: u32 = 100;

/// User-Agent header for every request.
const USER_AGENT: &str = concat!("ssoenv/", env!("CARGO_PKG_VERSION"));

const BEARER_HEADER: &str = "x-amz-sso_bearer_token";
const ERROR_TYPE_HEADER: &str = "x-amzn-ErrorType";
const DEVICE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterClientRequest<'a> {
    client_name: &'a str,
    client_type: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterClientResponse {
    client_id: String,
    client_secret: String,
    client_id_issued_at: i64,
    client_secret_expires_at: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartDeviceAuthorizationRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    start_url: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartDeviceAuthorizationResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    verification_uri_complete: String,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    device_code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: i64,
}

#[derive(Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAccountsResponse {
    #[serde(default)]
    next_token: Option<String>,
    #[serde(default)]
    account_list: Vec<AccountInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    account_id: String,
    #[serde(default)]
    account_name: String,
    #[serde(default)]
    email_address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAccountRolesResponse {
    #[serde(default)]
    next_token: Option<String>,
    #[serde(default)]
    role_list: Vec<RoleInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleInfo {
    role_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetRoleCredentialsResponse {
    role_credentials: RoleCredentialsInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleCredentialsInfo {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    /// Milliseconds since the epoch
    expiration: i64,
}

/// HTTP client for one SSO region.
#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    client: Client,
    oidc_url: String,
    portal_url: String,
}

impl HttpIdentityClient {
    /// Create a client for the AWS endpoints of `region`.
    pub fn new(region: &str) -> Result<Self, IdentityError> {
        Self::with_endpoints(
            format!("https://oidc.{}.amazonaws.com", region),
            format!("https://portal.sso.{}.amazonaws.com", region),
        )
    }

    /// Create a client against explicit base URLs.
    pub fn with_endpoints(
        oidc_url: impl Into<String>,
        portal_url: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IdentityError::Network(e.to_string()))?;
        Ok(Self {
            client,
            oidc_url: oidc_url.into().trim_end_matches('/').to_string(),
            portal_url: portal_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn oidc_post<B: Serialize>(&self, path: &str, body: &B) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.oidc_url, path))
            .headers(Self::json_headers())
            .json(body)
    }

    fn portal_get(&self, path: &str, token: &AccessToken) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.portal_url, path))
            .header(ACCEPT, "application/json")
            .header(BEARER_HEADER, token.access_token.as_str())
    }

    /// Send a request and decode a successful JSON body.
    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, IdentityError> {
        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        if status.is_success() {
            let body = response.text().await.map_err(network_error)?;
            return serde_json::from_str(&body).map_err(|e| IdentityError::Api {
                status: status.as_u16(),
                message: format!("failed to parse response: {}", e),
            });
        }
        Err(classify_error(response).await)
    }
}

fn network_error(e: reqwest::Error) -> IdentityError {
    IdentityError::Network(e.to_string())
}

/// Map an error response to the matching `IdentityError`.
async fn classify_error(response: Response) -> IdentityError {
    let status = response.status().as_u16();
    let header_code = response
        .headers()
        .get(ERROR_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(':').next().unwrap_or(v).to_string());
    let body = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<OAuthError>(&body).ok();

    let code = parsed
        .as_ref()
        .map(|e| e.error.clone())
        .or(header_code)
        .unwrap_or_default();
    let description = parsed
        .and_then(|e| e.error_description)
        .unwrap_or_else(|| body.clone());

    match code.as_str() {
        "authorization_pending" | "AuthorizationPendingException" => {
            IdentityError::AuthorizationPending
        }
        "slow_down" | "SlowDownException" => IdentityError::SlowDown,
        "expired_token" | "ExpiredTokenException" => IdentityError::ExpiredToken,
        "access_denied" | "AccessDeniedException" => IdentityError::AccessDenied,
        "invalid_client" | "InvalidClientException" => IdentityError::InvalidClient(description),
        "UnauthorizedException" => IdentityError::Unauthorized(description),
        _ if status == 401 => IdentityError::Unauthorized(description),
        _ => IdentityError::Api {
            status,
            message: if code.is_empty() {
                description
            } else {
                format!("{}: {}", code, description)
            },
        },
    }
}

fn timestamp(secs: i64) -> Result<chrono::DateTime<Utc>, IdentityError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| IdentityError::Api {
            status: 200,
            message: format!("invalid timestamp {}", secs),
        })
}

#[async_trait::async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn register_client(
        &self,
        client_name: &str,
    ) -> Result<ClientRegistration, IdentityError> {
        let request = RegisterClientRequest {
            client_name,
            client_type: "public",
        };
        let response: RegisterClientResponse =
            Self::send(self.oidc_post("/client/register", &request)).await?;

        tracing::debug!(client_id = %response.client_id, "registered client");
        Ok(ClientRegistration {
            client_id: response.client_id,
            client_secret: response.client_secret,
            issued_at: timestamp(response.client_id_issued_at)?,
            expires_at: timestamp(response.client_secret_expires_at)?,
        })
    }

    async fn start_device_authorization(
        &self,
        registration: &ClientRegistration,
        start_url: &str,
    ) -> Result<DeviceAuthorization, IdentityError> {
        let request = StartDeviceAuthorizationRequest {
            client_id: &registration.client_id,
            client_secret: &registration.client_secret,
            start_url,
        };
        let response: StartDeviceAuthorizationResponse =
            Self::send(self.oidc_post("/device_authorization", &request)).await?;

        Ok(DeviceAuthorization {
            device_code: response.device_code,
            user_code: response.user_code,
            verification_uri: response.verification_uri,
            verification_uri_complete: response.verification_uri_complete,
            expires_in: response.expires_in,
            poll_interval: response.interval.unwrap_or(5).max(1),
        })
    }

    async fn create_token(
        &self,
        registration: &ClientRegistration,
        device_code: &str,
    ) -> Result<AccessToken, IdentityError> {
        let request = CreateTokenRequest {
            client_id: &registration.client_id,
            client_secret: &registration.client_secret,
            grant_type: DEVICE_GRANT,
            device_code,
        };
        let response: CreateTokenResponse =
            Self::send(self.oidc_post("/token", &request)).await?;

        Ok(AccessToken {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at: Utc::now() + ChronoDuration::seconds(response.expires_in),
        })
    }

    async fn list_accounts(&self, token: &AccessToken) -> Result<Vec<Account>, IdentityError> {
        let mut accounts = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut query = vec![("max_result", PAGE_SIZE.to_string())];
            if let Some(next) = &next_token {
                query.push(("next_token", next.clone()));
            }
            let page: ListAccountsResponse =
                Self::send(self.portal_get("/assignment/accounts", token).query(&query)).await?;

            for info in page.account_list {
                let account_id = info.account_id.parse().map_err(|e| IdentityError::Api {
                    status: 200,
                    message: format!("bad account id from portal: {}", e),
                })?;
                accounts.push(Account {
                    account_id,
                    account_name: info.account_name,
                    email_address: info.email_address,
                });
            }

            match page.next_token.filter(|t| !t.is_empty()) {
                Some(next) => next_token = Some(next),
                None => break,
            }
        }

        tracing::debug!(count = accounts.len(), "listed accounts");
        Ok(accounts)
    }

    async fn list_account_roles(
        &self,
        token: &AccessToken,
        account: AccountId,
    ) -> Result<Vec<Role>, IdentityError> {
        let mut roles = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("account_id", account.to_string()),
                ("max_result", PAGE_SIZE.to_string()),
            ];
            if let Some(next) = &next_token {
                query.push(("next_token", next.clone()));
            }
            let page: ListAccountRolesResponse =
                Self::send(self.portal_get("/assignment/roles", token).query(&query)).await?;

            roles.extend(page.role_list.into_iter().map(|info| Role {
                account_id: account,
                role_name: info.role_name,
            }));

            match page.next_token.filter(|t| !t.is_empty()) {
                Some(next) => next_token = Some(next),
                None => break,
            }
        }

        tracing::debug!(%account, count = roles.len(), "listed roles");
        Ok(roles)
    }

    async fn get_role_credentials(
        &self,
        token: &AccessToken,
        account: AccountId,
        role_name: &str,
    ) -> Result<RoleCredentials, IdentityError> {
        let query = [
            ("account_id", account.to_string()),
            ("role_name", role_name.to_string()),
        ];
        let response: GetRoleCredentialsResponse =
            Self::send(self.portal_get("/federation/credentials", token).query(&query)).await?;

        let creds = response.role_credentials;
        let expires_at = Utc
            .timestamp_millis_opt(creds.expiration)
            .single()
            .ok_or_else(|| IdentityError::Api {
                status: 200,
                message: format!("invalid expiration {}", creds.expiration),
            })?;

        Ok(RoleCredentials {
            account_id: account,
            role_name: role_name.to_string(),
            access_key_id: creds.access_key_id,
            secret_access_key: creds.secret_access_key,
            session_token: creds.session_token,
            expires_at,
        })
    }
}
