//! Connector Registry HTTP surface: catalog, install, uninstall, health.

use crate::auth::Identity;
use crate::state::AppState;
use agentkern_connectors::ConnectorConfig;
use agentkern_kernel::ApiError;
use axum::extract::{Extension, Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub async fn list_connectors(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Json<Vec<ConnectorConfig>> {
    Json(state.connector_registry.get_connectors_by_tenant(&identity.tenant_id))
}

#[derive(Debug, Deserialize)]
pub struct InstallRequest {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub options: HashMap<String, agentkern_connectors::Value>,
    #[serde(default)]
    pub credentials: HashMap<String, String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

pub async fn install_connector(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(req): Json<InstallRequest>,
) -> Result<Response, ApiError> {
    let mut config = ConnectorConfig::new(id, req.name, req.kind.clone(), identity.tenant_id);
    config.options = req.options;
    config.credentials = req.credentials;
    if let Some(secs) = req.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }

    let connector = state
        .connector_factory
        .create(&req.kind)
        .ok_or_else(|| ApiError::validation(format!("unknown connector type '{}'", req.kind)))?
        .into();

    state
        .connector_registry
        .register(connector, config)
        .await
        .map_err(to_api_error)?;

    Ok(axum::http::StatusCode::CREATED.into_response())
}

pub async fn uninstall_connector(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    state.connector_registry.validate_tenant_access(&id, &identity.tenant_id).map_err(to_api_error)?;
    state.connector_registry.unregister(&id).await.map_err(to_api_error)?;
    Ok(axum::http::StatusCode::NO_CONTENT.into_response())
}

pub async fn connector_health(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<agentkern_connectors::ConnectorHealth>, ApiError> {
    state.connector_registry.validate_tenant_access(&id, &identity.tenant_id).map_err(to_api_error)?;
    state
        .connector_registry
        .health_check_single(&id)
        .await
        .map(Json)
        .map_err(to_api_error)
}

fn to_api_error(e: agentkern_connectors::RegistryError) -> ApiError {
    use agentkern_connectors::RegistryError;
    match e {
        RegistryError::NotFound(_) => ApiError::not_found(e.to_string()),
        RegistryError::TenantAccessDenied { .. } => ApiError::policy_denied(e.to_string()),
        RegistryError::AlreadyExists(_) | RegistryError::NoFactory(_) => ApiError::validation(e.to_string()),
        RegistryError::Connector(_) | RegistryError::Storage(_) => ApiError::internal(e.to_string()),
    }
}
