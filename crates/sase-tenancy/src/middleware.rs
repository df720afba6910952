//! Request middleware binding the tenant scope

use crate::guard::RequestScopeGuard;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Tenant scope middleware.
///
/// Install with `axum::middleware::from_fn_with_state(guard, tenant_scope)`.
/// Everything further down the stack runs inside the request's tenant scope.
pub async fn tenant_scope(
    State(guard): State<Arc<RequestScopeGuard>>,
    request: Request,
    next: Next,
) -> Response {
    let tenant_id = match guard.admit(&request) {
        Ok(tenant_id) => tenant_id,
        Err(err) => {
            tracing::warn!(uri = %request.uri(), error = %err, "tenant admission failed");
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    RequestScopeGuard::with_tenant_async(tenant_id, next.run(request)).await
}
