//! Key provisioner binary.
//!
//! Runs two halves side by side: the reservation event consumer and the
//! gRPC server. Either one ending (or a shutdown signal) takes the whole
//! process down, so an orchestrator sees a dead consumer as a dead service
//! and restarts it.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use staykey_core::event_bus::EventBus;
use staykey_key::config::Config;
use staykey_key::consumer;
use staykey_key::reservation_lookup::{GrpcReservationLookup, ReservationLookup};
use staykey_key::service::KeyService;
use staykey_key::stores::PostgresKeyStore;
use staykey_proto::v1::key_service_server::KeyServiceServer;
use staykey_redpanda::RedpandaEventBus;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
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

    let bus = RedpandaEventBus::builder()
        .brokers(&config.brokers)
        .consumer_group(&config.consumer_group)
        .build()
        .context("connecting to event channel")?;
    let bus = Arc::new(bus) as Arc<dyn EventBus>;

    let lookup = Arc::new(
        GrpcReservationLookup::connect(&config.reservation_url)
            .context("connecting to reservation ledger")?,
    ) as Arc<dyn ReservationLookup>;

    let store = Arc::new(PostgresKeyStore::new(pool));
    let service = Arc::new(KeyService::new(
        Arc::clone(&store),
        Arc::clone(&lookup),
        config.device_id.clone(),
    ));

    let consumer_task = tokio::spawn(consumer::run(Arc::clone(&bus), Arc::clone(&service)));

    let server = tonic::transport::Server::builder()
        .add_service(KeyServiceServer::new(KeyService::new(
            store,
            lookup,
            config.device_id,
        )))
        .serve_with_shutdown(config.listen_addr, shutdown_signal());

    info!(addr = %config.listen_addr, "key service listening");

    tokio::select! {
        result = server => result.context("serving gRPC")?,
        result = consumer_task => {
            match result {
                Ok(Ok(())) => error!("event consumer ended unexpectedly"),
                Ok(Err(e)) => error!(error = %e, "event consumer failed"),
                Err(e) => error!(error = %e, "event consumer task panicked"),
            }
            anyhow::bail!("event consumer stopped");
        },
    }

    info!("key service stopped");
    Ok(())
}
