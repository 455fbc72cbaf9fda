//! Test helpers for the registration-service integration tests.

#![allow(dead_code)]

use registration_service::{
    build_router,
    config::{
        DirectoryConfig, Environment, LinkConfig, RegistrationConfig, SecurityConfig,
        SigningConfig, SmtpConfig,
    },
    services::{ApprovalService, MockDirectory, MockNotifier, RegistrationService},
    token::TokenCodec,
    AppState,
};
use std::sync::Arc;
use tokio::net::TcpListener;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const TEST_GROUP_ID: &str = "grp-cli-users";

/// Test application with a running HTTP server and mock collaborators.
pub struct TestApp {
    pub address: String,
    pub directory: Arc<MockDirectory>,
    pub notifier: Arc<MockNotifier>,
    pub codec: TokenCodec,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_secret(TEST_SECRET).await
    }

    pub async fn spawn_with_secret(secret: &str) -> Self {
        let config = test_config();
        let codec = TokenCodec::new(secret);
        let directory = Arc::new(MockDirectory::new());
        let notifier = Arc::new(MockNotifier::new());

        let registration = RegistrationService::new(
            codec.clone(),
            notifier.clone(),
            config.links.public_base_url.clone(),
        );
        let approval = ApprovalService::new(
            codec.clone(),
            directory.clone(),
            notifier.clone(),
            TEST_GROUP_ID.to_string(),
        );

        let state = AppState {
            config,
            registration,
            approval,
        };

        let app = build_router(state).await.expect("Failed to build router");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            directory,
            notifier,
            codec,
        }
    }
}

fn test_config() -> RegistrationConfig {
    RegistrationConfig {
        common: service_core::config::Config {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        environment: Environment::Dev,
        service_name: "registration-service".to_string(),
        service_version: "test".to_string(),
        log_level: "warn".to_string(),
        signing: SigningConfig {
            secret_key: TEST_SECRET.to_string(),
        },
        links: LinkConfig {
            public_base_url: "http://localhost:8080".to_string(),
        },
        directory: DirectoryConfig {
            base_url: "http://localhost:9100".to_string(),
            api_token: "test-token".to_string(),
            group_id: TEST_GROUP_ID.to_string(),
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            user: "test@example.com".to_string(),
            password: "password".to_string(),
            from_email: "noreply@example.com".to_string(),
            admin_email: "admin@example.com".to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

/// Pull the token out of a generated approve/deny link.
pub fn extract_token(url: &str) -> String {
    url.split("token=")
        .nth(1)
        .expect("URL has no token parameter")
        .to_string()
}
