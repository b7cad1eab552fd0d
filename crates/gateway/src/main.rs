//! LeadForge API Gateway
//!
//! The main entry point for dashboard API requests.
//! Handles:
//! - Authentication (session JWT)
//! - Rate limiting
//! - Enrichment runs, email tools, results download
//! - Observability (logging, metrics)

mod handlers;
mod middleware;
mod state;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use leadforge_common::{
    auth::AuthVerifier,
    config::AppConfig,
    metrics,
    oracle::create_oracle,
    orchestrator::RunLocks,
    presenter::MemoryResultStore,
    quota::create_session_provider,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config);
    info!("Starting LeadForge API Gateway v{}", leadforge_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.observability.metrics_port))
            .set_buckets_for_metric(
                Matcher::Suffix("request_duration_seconds".to_string()),
                metrics::LATENCY_BUCKETS,
            )?
            .set_buckets_for_metric(
                Matcher::Suffix("oracle_duration_seconds".to_string()),
                metrics::ORACLE_BUCKETS,
            )?
            .install()?;
        info!(port = config.observability.metrics_port, "Prometheus exporter listening");
    }
    metrics::register_metrics();

    // Initialize oracle
    let oracle = create_oracle(&config.oracle)?;
    info!(
        model = %oracle.model_name(),
        configured = oracle.is_configured(),
        "Oracle initialized"
    );

    // Initialize session store
    info!(store = %config.quota.store, "Connecting to session store...");
    let sessions = create_session_provider(&config.quota).await?;

    let state = AppState {
        config: config.clone(),
        oracle,
        sessions,
        results: Arc::new(MemoryResultStore::new()),
        run_locks: Arc::new(RunLocks::new()),
        auth: Arc::new(AuthVerifier::new(&config.auth)),
    };

    let app = create_router(state);

    let host: IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::new(host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // JSON framing adds overhead on top of the raw file
    let body_limit = DefaultBodyLimit::max(state.config.server.max_upload_bytes * 2 + 4096);

    let request_timeout = TimeoutLayer::new(state.config.request_timeout());

    // Runs last as long as their chunks take, each call bounded by the batch call timeout
    let run_routes = Router::new()
        .route("/enrich/upload", post(handlers::enrich::upload))
        .route("/enrich/sample", post(handlers::enrich::sample))
        .route("/enrich/external", post(handlers::enrich::external));

    let api_routes = Router::new()
        // Oracle and quota status
        .route("/oracle/status", get(handlers::health::oracle_status))
        .route("/quota", get(handlers::quota::get_quota))
        // Email tools
        .route("/emails/regenerate", post(handlers::emails::regenerate))
        .route("/emails/compose", post(handlers::emails::compose))
        // Results
        .route("/results", get(handlers::results::latest))
        .route("/results/download", get(handlers::results::download))
        .layer(request_timeout.clone())
        .merge(run_routes)
        .layer(body_limit);

    let mut app = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .layer(request_timeout)
        .nest("/v1", api_routes);

    if state.config.rate_limit.enabled {
        let limit = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        app = app.layer(from_fn_with_state(
            limit,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    app.layer(from_fn(middleware::metrics::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
