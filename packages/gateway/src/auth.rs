//! Request auth middleware: resolves tenant/org identity from either the
//! explicit `X-Tenant-ID`/`X-Org-ID` headers or by verifying a license key
//! carried in the `Authorization: Bearer <license-key>` header.

use crate::state::AppState;
use agentkern_kernel::ApiError;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// The tenant/org identity every tenancy-scoped handler reads from request
/// extensions, populated by [`resolve_identity`] regardless of which path
/// (headers or license key) supplied it.
#[derive(Debug, Clone)]
pub struct Identity {
    pub tenant_id: String,
    pub org_id: String,
}

pub async fn resolve_identity(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let headers = req.headers();
    let tenant_header = headers.get("X-Tenant-ID").and_then(|v| v.to_str().ok()).map(str::to_string);
    let org_header = headers.get("X-Org-ID").and_then(|v| v.to_str().ok()).map(str::to_string);

    let identity = if let (Some(tenant_id), Some(org_id)) = (tenant_header, org_header) {
        Identity { tenant_id, org_id }
    } else if let Some(bearer) = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        let (tenant_id, org_id) = state
            .license_validator
            .validate(bearer)
            .map_err(|_| ApiError::missing_tenant())?;
        Identity { tenant_id, org_id }
    } else {
        return Err(ApiError::missing_tenant());
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
