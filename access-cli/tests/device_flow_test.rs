//! Device-flow cadence tests against a scripted provider, using paused
//! tokio time so the sleep/poll contract can be asserted exactly.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use access_cli::provider::{
    ClientRegistration, DeviceAuthorization, IdentityProvider, RoleCredentials, TokenPoll,
};
use access_cli::{CliError, CredentialCache, LoginFlow, SsoConfig};

enum Step {
    Pending,
    SlowDown,
    Ready(&'static str),
    Expired,
    Fail(&'static str, &'static str),
}

/// Provider whose token endpoint replays a fixed script; anything past the
/// end of the script reads as pending.
struct ScriptedProvider {
    interval: u64,
    expires_in: u64,
    steps: Mutex<VecDeque<Step>>,
    token_calls: AtomicUsize,
    fail_role_credentials: AtomicBool,
}

impl ScriptedProvider {
    fn new(interval: u64, expires_in: u64, steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            interval,
            expires_in,
            steps: Mutex::new(steps.into()),
            token_calls: AtomicUsize::new(0),
            fail_role_credentials: AtomicBool::new(false),
        })
    }

    fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    fn set_fail_role_credentials(&self) {
        self.fail_role_credentials.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn register_client(&self) -> Result<ClientRegistration, CliError> {
        Ok(ClientRegistration {
            client_id: "client-1".to_string(),
            client_secret: "client-secret".to_string(),
        })
    }

    async fn start_device_authorization(
        &self,
        _registration: &ClientRegistration,
        _start_url: &str,
    ) -> Result<DeviceAuthorization, CliError> {
        Ok(DeviceAuthorization {
            device_code: "device-123".to_string(),
            user_code: "ABCD-EFGH".to_string(),
            verification_uri: "https://device.example.com/activate".to_string(),
            verification_uri_complete: None,
            interval: self.interval,
            expires_in: self.expires_in,
        })
    }

    async fn create_token(
        &self,
        _registration: &ClientRegistration,
        _device_code: &str,
    ) -> Result<TokenPoll, CliError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        match self.steps.lock().unwrap().pop_front() {
            None | Some(Step::Pending) => Ok(TokenPoll::Pending),
            Some(Step::SlowDown) => Ok(TokenPoll::SlowDown),
            Some(Step::Ready(token)) => Ok(TokenPoll::Ready(token.to_string())),
            Some(Step::Expired) => Err(CliError::AuthorizationTimeout),
            Some(Step::Fail(code, message)) => Err(CliError::Provider {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }

    async fn get_role_credentials(
        &self,
        access_token: &str,
        _account_id: &str,
        _role_name: &str,
    ) -> Result<RoleCredentials, CliError> {
        if self.fail_role_credentials.load(Ordering::SeqCst) {
            return Err(CliError::Provider {
                code: "ForbiddenException".to_string(),
                message: "no such role".to_string(),
            });
        }
        assert!(!access_token.is_empty());
        Ok(RoleCredentials {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: "session".to_string(),
            expiration: (Utc::now() + ChronoDuration::hours(1)).timestamp_millis(),
        })
    }
}

fn test_config() -> SsoConfig {
    SsoConfig {
        sso_start_url: "https://example.awsapps.com/start".to_string(),
        sso_region: "us-east-1".to_string(),
        account_id: "123456789012".to_string(),
        role_name: "CloudCliAccess".to_string(),
    }
}

fn flow(provider: Arc<ScriptedProvider>, dir: &std::path::Path) -> LoginFlow {
    LoginFlow::new(provider, CredentialCache::at(dir), test_config()).with_browser(false)
}

#[tokio::test(start_paused = true)]
async fn pending_polls_wait_a_full_interval_before_every_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(
        5,
        600,
        vec![Step::Pending, Step::Pending, Step::Pending, Step::Ready("tok")],
    );

    let started = tokio::time::Instant::now();
    let credentials = flow(provider.clone(), dir.path()).login().await.unwrap();

    // Three pending polls plus the successful one, each preceded by a sleep.
    assert_eq!(provider.token_calls(), 4);
    assert!(started.elapsed() >= Duration::from_secs(15));
    assert_eq!(credentials.access_key_id, "AKIAEXAMPLE");

    let cached = CredentialCache::at(dir.path()).load().unwrap().unwrap();
    assert_eq!(cached.access_token, "tok");
    assert_eq!(cached.sso_start_url, "https://example.awsapps.com/start");
}

#[tokio::test(start_paused = true)]
async fn slow_down_adds_five_seconds_to_every_later_interval() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(
        5,
        600,
        vec![Step::SlowDown, Step::Pending, Step::Ready("tok")],
    );

    let started = tokio::time::Instant::now();
    flow(provider.clone(), dir.path()).login().await.unwrap();

    // 5s before the slow_down, then 10s before each of the two that follow.
    assert_eq!(provider.token_calls(), 3);
    assert!(started.elapsed() >= Duration::from_secs(25));
    assert!(started.elapsed() < Duration::from_secs(26));
}

#[tokio::test(start_paused = true)]
async fn polling_is_bounded_by_the_session_validity_window() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(5, 12, Vec::new());

    let result = flow(provider.clone(), dir.path()).login().await;

    assert!(matches!(result, Err(CliError::AuthorizationTimeout)));
    // Attempts at t=5s and t=10s fit inside the 12s window; t=15s does not.
    assert_eq!(provider.token_calls(), 3);
    assert!(CredentialCache::at(dir.path()).load_unchecked().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn provider_reported_expiry_ends_the_login_as_a_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(5, 600, vec![Step::Expired]);

    let result = flow(provider, dir.path()).login().await;

    assert!(matches!(result, Err(CliError::AuthorizationTimeout)));
    assert!(CredentialCache::at(dir.path()).load_unchecked().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn unexpected_provider_errors_are_fatal_and_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(5, 600, vec![Step::Fail("access_denied", "Denied")]);

    let result = flow(provider.clone(), dir.path()).login().await;

    match result {
        Err(CliError::Provider { code, message }) => {
            assert_eq!(code, "access_denied");
            assert_eq!(message, "Denied");
        }
        other => panic!("expected a provider error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(provider.token_calls(), 1);
    assert!(CredentialCache::at(dir.path()).load_unchecked().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn nothing_is_cached_when_the_credential_exchange_fails() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(5, 600, vec![Step::Ready("tok")]);
    provider.set_fail_role_credentials();

    let result = flow(provider, dir.path()).login().await;

    assert!(matches!(result, Err(CliError::Provider { .. })));
    assert!(CredentialCache::at(dir.path()).load_unchecked().unwrap().is_none());
}
