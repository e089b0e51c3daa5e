//! Execution Replay Store HTTP surface

use crate::auth::Identity;
use crate::state::AppState;
use agentkern_kernel::ApiError;
use agentkern_replay::{ExecutionFilter, ExecutionStatus, ExportOptions, Pagination};
use axum::extract::{Extension, Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    limit: Option<u32>,
    offset: Option<u32>,
    status: Option<String>,
    workflow_id: Option<String>,
    start_time: Option<chrono::DateTime<chrono::Utc>>,
    end_time: Option<chrono::DateTime<chrono::Utc>>,
}

fn parse_status(s: &str) -> Result<ExecutionStatus, ApiError> {
    match s {
        "pending" => Ok(ExecutionStatus::Pending),
        "running" => Ok(ExecutionStatus::Running),
        "completed" => Ok(ExecutionStatus::Completed),
        "failed" => Ok(ExecutionStatus::Failed),
        other => Err(ApiError::validation(format!("unknown status '{other}'"))),
    }
}

pub async fn list_executions(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filter = ExecutionFilter {
        status: query.status.as_deref().map(parse_status).transpose()?,
        org_id: None,
        tenant_id: Some(identity.tenant_id),
        workflow_name: query.workflow_id,
        start_time: query.start_time,
        end_time: query.end_time,
    };
    let pagination = Pagination {
        limit: query.limit.unwrap_or(50),
        offset: query.offset.unwrap_or(0),
    };

    let (executions, total) = state
        .replay_store
        .list_executions(&filter, pagination)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(serde_json::json!({ "executions": executions, "total": total })))
}

pub async fn get_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<agentkern_replay::ExecutionSummary>, ApiError> {
    state
        .replay_store
        .get_execution(&id)
        .await
        .map(Json)
        .map_err(|e| ApiError::not_found(e.to_string()))
}

pub async fn delete_execution(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Response, ApiError> {
    state
        .replay_store
        .delete_execution(&id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(axum::http::StatusCode::NO_CONTENT.into_response())
}

pub async fn list_steps(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<agentkern_replay::ExecutionSnapshot>>, ApiError> {
    state
        .replay_store
        .get_steps(&id)
        .await
        .map(Json)
        .map_err(|e| ApiError::internal(e.to_string()))
}

pub async fn get_step(
    State(state): State<Arc<AppState>>,
    Path((id, step_index)): Path<(String, String)>,
) -> Result<Json<agentkern_replay::ExecutionSnapshot>, ApiError> {
    let step_index: u32 = step_index
        .parse()
        .map_err(|_| ApiError::validation(format!("'{step_index}' is not a valid step index")))?;
    state
        .replay_store
        .get_step(&id, step_index)
        .await
        .map(Json)
        .map_err(|e| ApiError::not_found(e.to_string()))
}

pub async fn get_timeline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<agentkern_replay::TimelineEntry>>, ApiError> {
    state
        .replay_store
        .get_timeline(&id)
        .await
        .map(Json)
        .map_err(|e| ApiError::internal(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    format: Option<String>,
    #[serde(default = "default_true")]
    include_input: bool,
    #[serde(default = "default_true")]
    include_output: bool,
    #[serde(default = "default_true")]
    include_policies: bool,
}

fn default_true() -> bool {
    true
}

pub async fn export_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let options = ExportOptions {
        format: query.format.unwrap_or_else(|| "json".to_string()),
        include_input: query.include_input,
        include_output: query.include_output,
        include_policies: query.include_policies,
        compliance_tags: Vec::new(),
    };

    let export = state
        .replay_store
        .export_execution(&id, &options)
        .await
        .map_err(|e| ApiError::not_found(e.to_string()))?;

    let body = serde_json::to_vec(&export).map_err(|e| ApiError::internal(e.to_string()))?;
    Ok((
        [
            ("content-type", "application/json".to_string()),
            ("content-disposition", format!("attachment; filename=\"execution-{id}.json\"")),
        ],
        body,
    )
        .into_response())
}
