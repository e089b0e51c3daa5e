//! AgentKern Gateway: the composed HTTP surface over the Policy Engine,
//! Connector Registry, LLM Router, and Execution Replay Store.

mod auth;
mod connector_factory;
mod routes;
mod state;

use agentkern_connectors::{ConnectorRegistry, NullConnectorStorage, PostgresConnectorStorage};
use agentkern_gate::defaults::seeded_engine;
use agentkern_kernel::{cors, GatewayConfig, StaticLicenseValidator};
use agentkern_nexus::{CachingRouter, PriorityRouter, Router as RouterTrait};
use agentkern_replay::{ExecutionReplayStore, NullRepository, PostgresRepository};
use axum::routing::{delete, get, post};
use axum::Router;
use connector_factory::DefaultConnectorFactory;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agentkern_kernel::logging::init();

    let config = GatewayConfig::from_env();

    let connector_storage = match PostgresConnectorStorage::connect(&config.database_url).await {
        Ok(storage) => Arc::new(storage) as Arc<dyn agentkern_connectors::ConnectorStorage>,
        Err(e) => {
            tracing::warn!(error = %e, "connector storage unavailable, falling back to in-memory");
            Arc::new(NullConnectorStorage::default())
        }
    };
    let connector_factory = Arc::new(DefaultConnectorFactory);
    let connector_registry =
        Arc::new(ConnectorRegistry::new(connector_storage).with_factory(connector_factory.clone()));

    let cancel = tokio_util::sync::CancellationToken::new();
    connector_registry.clone().spawn_reload_task(config.reload_interval, cancel.clone());

    let replay_repository = match PostgresRepository::connect(&config.database_url).await {
        Ok(repo) => Arc::new(repo) as Arc<dyn agentkern_replay::Repository>,
        Err(e) => {
            tracing::warn!(error = %e, "replay storage unavailable, falling back to in-memory");
            Arc::new(NullRepository)
        }
    };
    let replay_store = Arc::new(ExecutionReplayStore::new(replay_repository));

    let priority_router = Arc::new(PriorityRouter::new());
    let router: Arc<dyn RouterTrait> = Arc::new(CachingRouter::new(priority_router, Duration::from_secs(60)));

    let policy_engine = Arc::new(seeded_engine().expect("built-in policy rules failed to compile"));

    let license_validator = Arc::new(StaticLicenseValidator::new());

    let state = Arc::new(AppState {
        config: config.clone(),
        policy_engine,
        connector_registry,
        connector_factory,
        router,
        replay_store,
        license_validator,
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/v1/executions", get(routes::executions::list_executions))
        .route(
            "/api/v1/executions/{id}",
            get(routes::executions::get_execution).delete(routes::executions::delete_execution),
        )
        .route("/api/v1/executions/{id}/steps", get(routes::executions::list_steps))
        .route("/api/v1/executions/{id}/steps/{step_index}", get(routes::executions::get_step))
        .route("/api/v1/executions/{id}/timeline", get(routes::executions::get_timeline))
        .route("/api/v1/executions/{id}/export", get(routes::executions::export_execution))
        .route("/connectors", get(routes::connectors::list_connectors))
        .route("/connectors/{id}", delete(routes::connectors::uninstall_connector))
        .route("/connectors/{id}/install", post(routes::connectors::install_connector))
        .route("/connectors/{id}/health", get(routes::connectors::connector_health))
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth::resolve_identity))
        .layer(cors::layer(config.cors_allowed_origins.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, "agentkern gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(cancel)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn shutdown_signal(cancel: tokio_util::sync::CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    cancel.cancel();
}
