use hearth_api::{
    config::{ConfigError, get_env},
    server::{self, ServerState},
};
use hearth_common::model::auth::TokenKeys;
use hearth_db::client::DbClient;
use sqlx::{migrate::MigrateError, postgres::PgPoolOptions};
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Error connecting to database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Error running migrations: {0}")]
    Migrate(#[from] MigrateError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hearth_api=debug,\
                hearth_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves once `signal` fires. A listener that cannot be installed never resolves.
async fn wait_for(signal: impl Future<Output = std::io::Result<()>>, name: &str) {
    if let Err(err) = signal.await {
        warn!(error = %err, signal = name, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate() -> std::io::Result<()> {
    std::future::pending().await
}

fn shutdown_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            () = wait_for(tokio::signal::ctrl_c(), "ctrl-c") => {}
            () = wait_for(terminate(), "sigterm") => {}
        }
        info!("Shutdown signal received");
        token.cancel();
    });
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(env.database_max_connections)
        .connect(&env.database_url)
        .await?;
    let db_client = DbClient::new(pool);
    db_client.migrate().await?;

    let state = ServerState::new(
        Arc::new(db_client),
        TokenKeys::from_secret(env.jwt_secret_key.as_bytes()),
    );
    let app = server::app(state);

    let shutdown = CancellationToken::new();
    shutdown_on_signal(shutdown.clone());

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
