//! HTTP surface of an auth-gated component.
//!
//! Every gated route takes one of the access extractors below as its first
//! argument. The extractor runs the gate before the handler body, so a
//! rejected request never reaches handler logic.
//!
//! Status mapping:
//! - `401 Unauthorized`: missing or invalid credential
//! - `403 Forbidden`: valid credential, insufficient scope

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State, rejection::PathRejection},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

use crate::error::AuthError;
use crate::gate::{Access, AuthGate};
use crate::ids::{TenantId, TenantTimelineId, TimelineId};
use crate::scope::Resource;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthGate>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    msg: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = if self.is_credential_failure() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::FORBIDDEN
        };
        tracing::info!("rejected request: {self}");
        (
            status,
            Json(ErrorBody {
                msg: self.to_string(),
            }),
        )
            .into_response()
    }
}

fn authorization(parts: &Parts) -> Option<&str> {
    // a non-ASCII header can never be a bearer token
    parts
        .headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default())
}

/// Run the gate for `resource` using the request's `Authorization` header.
fn check_request(gate: &AuthGate, parts: &Parts, resource: &Resource) -> Result<Access, AuthError> {
    gate.check_authorization_header(authorization(parts), resource)
}

/// Reject a request whose path did not parse. The credential is judged
/// first, so an enforcing gate never answers an unauthenticated caller
/// with anything but `401`.
fn reject_path(gate: &AuthGate, parts: &Parts, rejection: PathRejection) -> Response {
    match gate.authenticate_authorization_header(authorization(parts)) {
        Ok(()) => rejection.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Access to one timeline's data.
#[derive(Debug)]
pub struct TenantDataAccess {
    pub ttid: TenantTimelineId,
    pub access: Access,
}

impl FromRequestParts<AppState> for TenantDataAccess {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path((tenant_id, timeline_id)) =
            match Path::<(TenantId, TimelineId)>::from_request_parts(parts, state).await {
                Ok(path) => path,
                Err(rejection) => return Err(reject_path(&state.gate, parts, rejection)),
            };
        let ttid = TenantTimelineId::new(tenant_id, timeline_id);
        let access = check_request(&state.gate, parts, &Resource::TenantData(ttid))
            .map_err(IntoResponse::into_response)?;
        Ok(Self { ttid, access })
    }
}

/// Access to one tenant's management API.
#[derive(Debug)]
pub struct TenantApiAccess {
    pub tenant_id: TenantId,
    pub access: Access,
}

impl FromRequestParts<AppState> for TenantApiAccess {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(tenant_id) = match Path::<TenantId>::from_request_parts(parts, state).await {
            Ok(path) => path,
            Err(rejection) => return Err(reject_path(&state.gate, parts, rejection)),
        };
        let access = check_request(&state.gate, parts, &Resource::TenantApi(tenant_id))
            .map_err(IntoResponse::into_response)?;
        Ok(Self { tenant_id, access })
    }
}

/// Access to the component-wide management API.
#[derive(Debug)]
pub struct AdminApiAccess {
    pub access: Access,
}

impl FromRequestParts<AppState> for AdminApiAccess {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let access = check_request(&state.gate, parts, &Resource::AdminApi)
            .map_err(IntoResponse::into_response)?;
        Ok(Self { access })
    }
}

#[derive(Debug, Serialize)]
struct StatusBody {
    component: String,
    auth: String,
}

#[derive(Debug, Serialize)]
struct AccessBody {
    resource: String,
    /// `None` when the gate does not enforce.
    scope: Option<String>,
}

impl AccessBody {
    fn new(resource: &Resource, access: &Access) -> Self {
        Self {
            resource: resource.to_string(),
            scope: match access {
                Access::Unchecked => None,
                Access::Granted(scope) => Some(scope.to_string()),
            },
        }
    }
}

/// Build the router of a component.
#[must_use]
pub fn router(gate: Arc<AuthGate>) -> Router {
    Router::new()
        .route("/v1/status", get(status_handler))
        .route("/v1/tenant", get(list_tenants_handler))
        .route("/v1/tenant/{tenant_id}", get(tenant_handler))
        .route(
            "/v1/tenant/{tenant_id}/timeline/{timeline_id}/wal",
            get(timeline_wal_handler),
        )
        .with_state(AppState { gate })
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusBody {
        component: state.gate.component().to_string(),
        auth: state.gate.posture().to_string(),
    })
}

async fn list_tenants_handler(admin: AdminApiAccess) -> impl IntoResponse {
    Json(AccessBody::new(&Resource::AdminApi, &admin.access))
}

async fn tenant_handler(tenant: TenantApiAccess) -> impl IntoResponse {
    Json(AccessBody::new(
        &Resource::TenantApi(tenant.tenant_id),
        &tenant.access,
    ))
}

async fn timeline_wal_handler(timeline: TenantDataAccess) -> impl IntoResponse {
    tracing::debug!(ttid = %timeline.ttid, "serving timeline data");
    Json(AccessBody::new(
        &Resource::TenantData(timeline.ttid),
        &timeline.access,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;

    #[test]
    fn test_invalid_token_is_401() {
        let response = AuthError::InvalidToken("malformed JWT".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_missing_credential_is_401() {
        let response = AuthError::MissingCredential.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_unauthorized_scope_is_403() {
        let response = AuthError::UnauthorizedScope {
            scope: Scope::SafekeeperData,
            resource: Resource::AdminApi,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
