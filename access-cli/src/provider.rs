//! Identity-provider collaborator for the device authorization grant.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CliError;

const CLIENT_NAME: &str = "cca-cli";
const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
}

/// One device-authorization session. Lives only in process memory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Seconds to wait between polls.
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Total validity window of this session, in seconds.
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_interval() -> u64 {
    5
}

fn default_expires_in() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    /// Expiry as epoch milliseconds.
    pub expiration: i64,
}

/// One poll of the token endpoint. Pending and SlowDown are protocol signals
/// consumed inside the flow, never surfaced as errors.
#[derive(Debug)]
pub enum TokenPoll {
    Ready(String),
    Pending,
    SlowDown,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn register_client(&self) -> Result<ClientRegistration, CliError>;

    async fn start_device_authorization(
        &self,
        registration: &ClientRegistration,
        start_url: &str,
    ) -> Result<DeviceAuthorization, CliError>;

    /// Attempt to exchange the device code for an access token. A session the
    /// provider reports as expired comes back as
    /// [`CliError::AuthorizationTimeout`].
    async fn create_token(
        &self,
        registration: &ClientRegistration,
        device_code: &str,
    ) -> Result<TokenPoll, CliError>;

    async fn get_role_credentials(
        &self,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentials, CliError>;
}

/// IAM Identity Center OIDC + access-portal client. The OIDC endpoints are
/// unsigned; the portal call authenticates with the bearer token alone.
pub struct SsoOidc {
    client: reqwest::Client,
    oidc_url: String,
    portal_url: String,
}

impl SsoOidc {
    pub fn new(region: &str) -> Result<Self, CliError> {
        Self::with_endpoints(
            format!("https://oidc.{}.amazonaws.com", region),
            format!("https://portal.sso.{}.amazonaws.com", region),
        )
    }

    pub fn with_endpoints(oidc_url: String, portal_url: String) -> Result<Self, CliError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            oidc_url: oidc_url.trim_end_matches('/').to_string(),
            portal_url: portal_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default, rename = "__type")]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ProviderErrorBody {
    fn code(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.error_type.clone())
            .unwrap_or_else(|| "unknown_error".to_string())
    }

    fn detail(&self) -> Option<String> {
        self.error_description.clone().or_else(|| self.message.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleCredentialsResponse {
    role_credentials: RoleCredentials,
}

async fn provider_error(response: reqwest::Response) -> CliError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ProviderErrorBody>(&body) {
        Ok(parsed) => CliError::Provider {
            code: parsed.code(),
            message: parsed
                .detail()
                .unwrap_or_else(|| format!("HTTP {}", status)),
        },
        Err(_) => CliError::Provider {
            code: format!("http_{}", status.as_u16()),
            message: body,
        },
    }
}

#[async_trait]
impl IdentityProvider for SsoOidc {
    async fn register_client(&self) -> Result<ClientRegistration, CliError> {
        let response = self
            .client
            .post(format!("{}/client/register", self.oidc_url))
            .json(&serde_json::json!({
                "clientName": CLIENT_NAME,
                "clientType": "public",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        Ok(response.json().await?)
    }

    async fn start_device_authorization(
        &self,
        registration: &ClientRegistration,
        start_url: &str,
    ) -> Result<DeviceAuthorization, CliError> {
        let response = self
            .client
            .post(format!("{}/device_authorization", self.oidc_url))
            .json(&serde_json::json!({
                "clientId": registration.client_id,
                "clientSecret": registration.client_secret,
                "startUrl": start_url,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        Ok(response.json().await?)
    }

    async fn create_token(
        &self,
        registration: &ClientRegistration,
        device_code: &str,
    ) -> Result<TokenPoll, CliError> {
        let response = self
            .client
            .post(format!("{}/token", self.oidc_url))
            .json(&serde_json::json!({
                "clientId": registration.client_id,
                "clientSecret": registration.client_secret,
                "grantType": DEVICE_GRANT_TYPE,
                "deviceCode": device_code,
            }))
            .send()
            .await?;

        if response.status().is_success() {
            let token: CreateTokenResponse = response.json().await?;
            return Ok(TokenPoll::Ready(token.access_token));
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: ProviderErrorBody = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) => {
                return Err(CliError::Provider {
                    code: format!("http_{}", status.as_u16()),
                    message: body,
                })
            }
        };

        match parsed.code().as_str() {
            "authorization_pending" | "AuthorizationPendingException" => Ok(TokenPoll::Pending),
            "slow_down" | "SlowDownException" => Ok(TokenPoll::SlowDown),
            "expired_token" | "ExpiredTokenException" => Err(CliError::AuthorizationTimeout),
            code => Err(CliError::Provider {
                code: code.to_string(),
                message: parsed
                    .detail()
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            }),
        }
    }

    async fn get_role_credentials(
        &self,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentials, CliError> {
        let response = self
            .client
            .get(format!("{}/federation/credentials", self.portal_url))
            .query(&[("account_id", account_id), ("role_name", role_name)])
            .header("x-amz-sso_bearer_token", access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        let credentials: RoleCredentialsResponse = response.json().await?;
        Ok(credentials.role_credentials)
    }
}
