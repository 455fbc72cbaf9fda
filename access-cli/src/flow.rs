//! The device-authorization login flow.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CachedCredentials, CredentialCache};
use crate::config::SsoConfig;
use crate::error::CliError;
use crate::provider::{
    ClientRegistration, DeviceAuthorization, IdentityProvider, RoleCredentials, TokenPoll,
};

/// Drives one login end to end: register → authorize → poll → exchange →
/// cache. Single cooperative task; the operator completes the browser login
/// in real time while we sleep between polls.
pub struct LoginFlow {
    provider: Arc<dyn IdentityProvider>,
    cache: CredentialCache,
    config: SsoConfig,
    open_browser: bool,
}

impl LoginFlow {
    pub fn new(provider: Arc<dyn IdentityProvider>, cache: CredentialCache, config: SsoConfig) -> Self {
        Self {
            provider,
            cache,
            config,
            open_browser: true,
        }
    }

    /// Disable the browser handoff; the operator copies the URL by hand.
    pub fn with_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    pub async fn login(&self) -> Result<RoleCredentials, CliError> {
        println!("Initiating cloud CLI access authentication...\n");

        println!("Registering client...");
        let registration = self.provider.register_client().await?;

        println!("Starting device authorization...");
        let authorization = self
            .provider
            .start_device_authorization(&registration, &self.config.sso_start_url)
            .await?;

        self.present_instructions(&authorization);

        println!("\nWaiting for authentication...");
        let access_token = self.poll_for_token(&registration, &authorization).await?;
        println!("Authentication successful!\n");

        println!("Fetching role credentials...");
        let credentials = self
            .provider
            .get_role_credentials(
                &access_token,
                &self.config.account_id,
                &self.config.role_name,
            )
            .await?;

        let cached = CachedCredentials {
            credentials: credentials.clone(),
            access_token,
            cached_at: Utc::now(),
            sso_start_url: self.config.sso_start_url.clone(),
            sso_region: self.config.sso_region.clone(),
            account_id: self.config.account_id.clone(),
            role_name: self.config.role_name.clone(),
        };
        self.cache.save(&cached)?;

        println!("Credentials cached successfully");
        if let Some(expires) = cached.expires_at() {
            println!("Valid until: {}", expires.to_rfc3339());
        }

        Ok(credentials)
    }

    fn present_instructions(&self, authorization: &DeviceAuthorization) {
        println!("\n{}", "=".repeat(60));
        println!("If the browser does not open automatically, visit:");
        println!("{}", authorization.verification_uri);
        println!("\nAnd enter code: {}", authorization.user_code);
        println!("{}", "=".repeat(60));

        if self.open_browser {
            let target = authorization
                .verification_uri_complete
                .as_deref()
                .unwrap_or(&authorization.verification_uri);
            // Best effort only; a headless terminal just degrades to copying
            // the URL by hand.
            match webbrowser::open(target) {
                Ok(_) => println!("\nBrowser opened"),
                Err(e) => println!("\nCould not open browser automatically: {}", e),
            }
        }
    }

    /// Poll until the operator finishes logging in. Sleeps the provider's
    /// interval before every attempt; `slow_down` grows the interval by 5s
    /// permanently; the whole loop is bounded by the session's validity
    /// window. Ctrl-C aborts between polls with nothing written.
    async fn poll_for_token(
        &self,
        registration: &ClientRegistration,
        authorization: &DeviceAuthorization,
    ) -> Result<String, CliError> {
        let started = tokio::time::Instant::now();
        let window = Duration::from_secs(authorization.expires_in);
        let mut interval = Duration::from_secs(authorization.interval.max(1));

        loop {
            if started.elapsed() >= window {
                return Err(CliError::AuthorizationTimeout);
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => return Err(CliError::Cancelled),
            }

            match self
                .provider
                .create_token(registration, &authorization.device_code)
                .await?
            {
                TokenPoll::Ready(token) => return Ok(token),
                TokenPoll::Pending => {}
                TokenPoll::SlowDown => {
                    interval += Duration::from_secs(5);
                    tracing::debug!(
                        interval_secs = interval.as_secs(),
                        "provider asked to slow down"
                    );
                }
            }
        }
    }
}
