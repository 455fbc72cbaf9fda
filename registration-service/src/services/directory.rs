use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::DirectoryConfig;
use crate::token::RegistrationPayload;
use service_core::error::AppError;

/// A user as reported by the external identity directory.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryUser {
    pub user_id: String,
    pub username: String,
}

/// External system of record for users and group membership.
///
/// The contract deliberately mirrors what the directory actually offers:
/// lookup and create are separate calls, so two concurrent approvals of the
/// same registration can race between them. The second create fails
/// downstream and is reported to the operator; no conditional-create is
/// invented here.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn lookup_user(&self, username: &str) -> Result<Option<DirectoryUser>, anyhow::Error>;

    /// Create the user and return its directory id.
    async fn create_user(&self, payload: &RegistrationPayload) -> Result<String, anyhow::Error>;

    async fn add_to_group(&self, user_id: &str, group_id: &str) -> Result<(), anyhow::Error>;
}

/// Directory backed by a JSON HTTP API with bearer-token auth.
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl HttpDirectory {
    pub fn new(config: &DirectoryConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    users: Vec<DirectoryUser>,
}

#[derive(Debug, Deserialize)]
struct CreateUserResponse {
    user_id: String,
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn lookup_user(&self, username: &str) -> Result<Option<DirectoryUser>, anyhow::Error> {
        let response = self
            .client
            .get(format!("{}/users", self.base_url))
            .query(&[("username", username)])
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Directory lookup failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Directory lookup returned {}: {}", status, body);
        }

        let found: LookupResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Directory lookup response invalid: {}", e))?;

        Ok(found.users.into_iter().next())
    }

    async fn create_user(&self, payload: &RegistrationPayload) -> Result<String, anyhow::Error> {
        let response = self
            .client
            .post(format!("{}/users", self.base_url))
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({
                "username": payload.username,
                "display_name": payload.display_name(),
                "given_name": payload.first_name,
                "family_name": payload.last_name,
                "email": payload.email,
            }))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Directory create failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Directory create returned {}: {}", status, body);
        }

        let created: CreateUserResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Directory create response invalid: {}", e))?;

        Ok(created.user_id)
    }

    async fn add_to_group(&self, user_id: &str, group_id: &str) -> Result<(), anyhow::Error> {
        let response = self
            .client
            .post(format!("{}/groups/{}/memberships", self.base_url, group_id))
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({ "user_id": user_id }))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Group membership failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Group membership returned {}: {}", status, body);
        }

        Ok(())
    }
}

/// In-memory directory for tests.
#[derive(Default)]
pub struct MockDirectory {
    users: Mutex<HashMap<String, String>>,
    memberships: Mutex<Vec<(String, String)>>,
    next_id: AtomicU64,
    fail_lookup: AtomicBool,
    fail_create: AtomicBool,
    fail_group_add: AtomicBool,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_lookup(&self, fail: bool) {
        self.fail_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_group_add(&self, fail: bool) {
        self.fail_group_add.store(fail, Ordering::SeqCst);
    }

    pub fn has_user(&self, username: &str) -> bool {
        self.users.lock().unwrap().contains_key(username)
    }

    pub fn memberships(&self) -> Vec<(String, String)> {
        self.memberships.lock().unwrap().clone()
    }
}

#[async_trait]
impl Directory for MockDirectory {
    async fn lookup_user(&self, username: &str) -> Result<Option<DirectoryUser>, anyhow::Error> {
        if self.fail_lookup.load(Ordering::SeqCst) {
            anyhow::bail!("Directory lookup unavailable");
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .get(username)
            .map(|user_id| DirectoryUser {
                user_id: user_id.clone(),
                username: username.to_string(),
            }))
    }

    async fn create_user(&self, payload: &RegistrationPayload) -> Result<String, anyhow::Error> {
        if self.fail_create.load(Ordering::SeqCst) {
            anyhow::bail!("Directory create unavailable");
        }
        let user_id = format!("usr-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.users
            .lock()
            .unwrap()
            .insert(payload.username.clone(), user_id.clone());
        Ok(user_id)
    }

    async fn add_to_group(&self, user_id: &str, group_id: &str) -> Result<(), anyhow::Error> {
        if self.fail_group_add.load(Ordering::SeqCst) {
            anyhow::bail!("Group membership unavailable");
        }
        self.memberships
            .lock()
            .unwrap()
            .push((user_id.to_string(), group_id.to_string()));
        Ok(())
    }
}
