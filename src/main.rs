//! Service entry point.
//!
//! Wires configuration, the database pool, the Stripe gateway, the
//! notification worker, and the HTTP router, then serves until SIGTERM.

use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use roamvet_payments::adapters::http::{payments_router, PaymentsAppState};
use roamvet_payments::adapters::notify::{
    notification_queue, LogDelivery, NotificationQueueConfig,
};
use roamvet_payments::adapters::postgres::{
    PostgresAppointmentDirectory, PostgresPaymentLedger, PostgresPaymentReader,
    PostgresProviderAccountStore, PostgresUserDirectory,
};
use roamvet_payments::adapters::stripe::{StripeConfig, StripeGatewayAdapter};
use roamvet_payments::config::AppConfig;
use roamvet_payments::domain::foundation::FeePercentage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.server.log_level)
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        test_mode = config.payment.is_test_mode(),
        "Starting payment service"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let stripe_config = StripeConfig::new(
        config.payment.stripe_api_key.clone(),
        config.payment.stripe_webhook_secret.clone(),
    )
    .with_require_livemode(config.payment.require_livemode && config.is_production());

    let gateway = Arc::new(StripeGatewayAdapter::new(stripe_config));

    let fee_percentage = FeePercentage::new(config.payment.fee_percentage)
        .map_err(|e| format!("Invalid fee percentage: {}", e))?;

    let (notifier, worker) = notification_queue(
        Arc::new(LogDelivery),
        NotificationQueueConfig {
            capacity: config.notifications.queue_capacity,
            max_attempts: config.notifications.max_attempts,
            retry_delay: config.notifications.retry_delay(),
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = tokio::spawn(worker.run(shutdown_rx));

    let state = PaymentsAppState {
        ledger: Arc::new(PostgresPaymentLedger::new(pool.clone())),
        reader: Arc::new(PostgresPaymentReader::new(pool.clone())),
        appointments: Arc::new(PostgresAppointmentDirectory::new(pool.clone())),
        users: Arc::new(PostgresUserDirectory::new(pool.clone())),
        accounts: Arc::new(PostgresProviderAccountStore::new(pool.clone())),
        gateway,
        notifier: Arc::new(notifier),
        fee_percentage,
    };

    let app = Router::new()
        .nest("/api", payments_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain buffered notifications before exiting.
    let _ = shutdown_tx.send(true);
    let _ = worker_handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
