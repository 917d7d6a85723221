use playschool_ai::OpenAiCompatibleBackend;
use playschool_server::app::{self, AppState};
use playschool_server::config::ServerConfig;
use playschool_server::error::StartupError;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            tracing::error!("{report}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> playschool_core::Result<(), StartupError> {
    let config = ServerConfig::from_env()?;
    tracing::info!(
        model = %config.completion.model,
        base_url = %config.completion.base_url,
        "Loaded configuration"
    );

    let backend = OpenAiCompatibleBackend::new(config.backend_config()).map_err(|e| {
        StartupError::BackendInit {
            details: e.to_string(),
        }
    })?;

    let state = Arc::new(AppState::new(
        Arc::new(backend),
        config.completion.model.as_str(),
        config.session.clone(),
    ));

    if let Some(idle_timeout) = config.session.idle_timeout() {
        tracing::info!(
            idle_timeout_secs = idle_timeout.as_secs(),
            "Idle session eviction enabled"
        );
        app::spawn_idle_sweeper(
            state.store.clone(),
            idle_timeout,
            config.session.cleanup_interval(),
        );
    }

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| StartupError::BindFailed {
            addr: config.bind_addr.clone(),
            details: e.to_string(),
        })?;

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::ServeFailed {
            details: e.to_string(),
        })?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
