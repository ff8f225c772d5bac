use anyhow::{Context, Result};
use sensord::config::{Config, StorageBackend};
use sensord::engine::AggregationEngine;
use sensord::routes;
use sensord::state::AppState;
use sensord::store::{schema, BucketStore, MemoryBucketStore, PgBucketStore};
use std::sync::Arc;
use tokio::net::TcpListener;

fn init_tracing(config: &Config) -> Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime::Tokio, trace::Config as OTelTraceConfig, Resource};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,sensord=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    if let Some(endpoint) = &config.otlp_endpoint {
        let endpoint = normalize_otlp_http_endpoint(endpoint);
        let exporter = opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(endpoint);
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(OTelTraceConfig::default().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "sensord"),
            ])))
            .install_batch(Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

fn normalize_otlp_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.ends_with("/v1/traces") {
        return trimmed.to_string();
    }
    format!("{trimmed}/v1/traces")
}

async fn bind_listener(role: &str, addr: &str, env_key: &str) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Failed to bind sensord {role} listener on {addr}: port already in use. Stop the other service using this port or set {env_key} to another address.",
            );
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed to bind sensord {role} listener on {addr}"))
        }
    }
}

async fn open_store(config: &Config) -> Result<Arc<dyn BucketStore>> {
    match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("database URL missing for postgres backend")?;
            let store = PgBucketStore::connect(url, &config.pool_settings()).await?;
            schema::ensure_schema(store.pool()).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory bucket store; aggregates are lost on exit");
            Ok(Arc::new(MemoryBucketStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config)?;

    let store = open_store(&config).await?;
    let engine = AggregationEngine::new(store.clone(), config.store_deadline());
    let state = AppState {
        engine,
        report_window_days: config.report_window_days,
    };

    let sensor_listener =
        bind_listener("sensor", &config.sensor_listen_http, "SENSOR_LISTEN_HTTP").await?;
    let admin_listener =
        bind_listener("admin", &config.admin_listen_http, "ADMIN_LISTEN_HTTP").await?;
    tracing::info!(
        sensor = %config.sensor_listen_http,
        admin = %config.admin_listen_http,
        storage = ?config.storage,
        "sensord listening"
    );

    let sensor_app = routes::sensor_router(state.clone());
    let admin_app = routes::admin_router(state);
    let sensor_handle =
        tokio::spawn(async move { axum::serve(sensor_listener, sensor_app).await });
    let admin_handle = tokio::spawn(async move { axum::serve(admin_listener, admin_app).await });
    let sensor_abort = sensor_handle.abort_handle();
    let admin_abort = admin_handle.abort_handle();

    tokio::select! {
        res = sensor_handle => {
            tracing::error!(result = ?res, "sensor listener exited");
        }
        res = admin_handle => {
            tracing::error!(result = ?res, "admin listener exited");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    sensor_abort.abort();
    admin_abort.abort();
    store.close().await;

    Ok(())
}
