use iag_server::{
    app::build_router,
    auth::{AppState, OAuthClient},
    config::ServerConfig,
    error::StartupError,
};
use rootcause::prelude::Report;
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

async fn run() -> Result<(), Report<StartupError>> {
    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(StartupError::from)?;
    let oauth = config.resolve().map_err(StartupError::from)?;
    let codec = config.token.codec().map_err(StartupError::from)?;
    let addr = config.bind_addr().map_err(StartupError::from)?;

    tracing::info!(
        provider = %oauth.provider(),
        rbac_enabled = config.enable_rbac,
        "Starting Identity and Authorization Gateway"
    );

    let provider = OAuthClient::new(&oauth).map_err(StartupError::from)?;
    let app_state = Arc::new(
        AppState::new(Arc::new(provider), codec)
            .with_secure_cookies(config.secure_cookies)
            .with_rbac(config.enable_rbac),
    );

    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| StartupError::Bind {
            addr: addr.to_string(),
            details: e.to_string(),
        })?;

    tracing::info!("listening on http://{}", addr);
    tracing::info!("OAuth login URL: http://{}/auth/login", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Serve {
            details: e.to_string(),
        })?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
