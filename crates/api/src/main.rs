//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use gateway::HttpGatewayClient;
use payments::{Collaborators, InMemoryNotifier, Notifier};
use sqlx::postgres::PgPoolOptions;
use store::{InMemoryProfileCache, InMemoryStore, PostgresStore, ProfileCache, RedisProfileCache};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn describe_metrics() {
    metrics::describe_counter!(
        "payment_intents_created_total",
        "Payment intents charged and recorded, by bank"
    );
    metrics::describe_counter!("orders_finalized_total", "Orders written after settlement");
    metrics::describe_counter!(
        "notifications_failed_total",
        "Order notifications that could not be published"
    );
    metrics::describe_histogram!(
        "gateway_request_duration_seconds",
        metrics::Unit::Seconds,
        "Payment gateway round-trip latency"
    );
}

async fn profile_cache(config: &Config) -> Arc<dyn ProfileCache> {
    match &config.redis_url {
        Some(url) => {
            let cache = RedisProfileCache::new(url)
                .await
                .expect("failed to connect to Redis");
            tracing::info!("using Redis profile cache");
            Arc::new(cache)
        }
        None => {
            tracing::warn!("REDIS_URL not set, using empty in-memory profile cache");
            Arc::new(InMemoryProfileCache::new())
        }
    }
}

fn notifier(config: &Config) -> Arc<dyn Notifier> {
    match &config.kafka_brokers {
        #[cfg(feature = "kafka")]
        Some(brokers) => {
            let producer =
                payments::KafkaNotifier::new(brokers).expect("failed to create Kafka producer");
            Arc::new(producer)
        }
        #[cfg(not(feature = "kafka"))]
        Some(_) => {
            tracing::warn!("KAFKA_BROKERS set but the kafka feature is disabled, notifications are kept in memory");
            Arc::new(InMemoryNotifier::new())
        }
        None => {
            tracing::warn!("KAFKA_BROKERS not set, notifications are kept in memory");
            Arc::new(InMemoryNotifier::new())
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    describe_metrics();

    // 3. Connect collaborators
    let profiles = profile_cache(&config).await;
    let gateway = Arc::new(HttpGatewayClient::new(config.gateway_config()));
    let notifier = notifier(&config);

    let deps = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL store");
            Collaborators::from_store(store, profiles, gateway, notifier)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Collaborators::from_store(InMemoryStore::new(), profiles, gateway, notifier)
        }
    };

    // 4. Build the application
    let state = Arc::new(api::AppState::new(
        deps,
        config.notify_topic.clone(),
        config.display_offset(),
    ));
    let app = api::create_app(state, metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
