use registration_service::{
    build_router,
    config::RegistrationConfig,
    services::{ApprovalService, EmailNotifier, HttpDirectory, RegistrationService},
    token::TokenCodec,
    AppState,
};
use service_core::observability::logging::init_tracing;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = RegistrationConfig::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting registration service"
    );

    // The signing secret is read exactly once, here, and injected.
    let codec = TokenCodec::new(config.signing.secret_key.clone());

    let notifier: Arc<dyn registration_service::services::Notifier> =
        Arc::new(EmailNotifier::new(&config.smtp)?);
    let directory: Arc<dyn registration_service::services::Directory> =
        Arc::new(HttpDirectory::new(&config.directory)?);

    let registration = RegistrationService::new(
        codec.clone(),
        notifier.clone(),
        config.links.public_base_url.clone(),
    );
    let approval = ApprovalService::new(
        codec,
        directory,
        notifier,
        config.directory.group_id.clone(),
    );

    let state = AppState {
        config: config.clone(),
        registration,
        approval,
    };

    let app = build_router(state).await?;

    let addr = config.common.bind_address();
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
