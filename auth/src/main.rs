//! Token authority binary.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use staykey_auth::config::Config;
use staykey_auth::service::AuthService;
use staykey_auth::stores::PostgresUserStore;
use staykey_auth::token::TokenAuthority;
use staykey_proto::v1::auth_service_server::AuthServiceServer;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in development; absent file is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env().context("loading configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("connecting to postgres")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running migrations")?;

    let store = Arc::new(PostgresUserStore::new(pool));
    let tokens = Arc::new(TokenAuthority::new(&config.jwt_secret, config.token_ttl_secs));
    let service = AuthService::new(store, tokens);

    info!(addr = %config.listen_addr, "auth service listening");

    tonic::transport::Server::builder()
        .add_service(AuthServiceServer::new(service))
        .serve_with_shutdown(config.listen_addr, shutdown_signal())
        .await
        .context("serving gRPC")?;

    info!("auth service stopped");
    Ok(())
}
