//! Common helpers for end-to-end tests.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header::AUTHORIZATION};
use tower::ServiceExt;

use crate::gate::{AuthGate, AuthPosture};
use crate::http::router;
use crate::ids::{TenantId, TenantTimelineId, TimelineId};
use crate::keys::{SigningKey, VerificationKey, generate};
use crate::scope::{Component, Scope};
use crate::token::{Token, issue};

/// One installation: the issuing authority's key and the public key every
/// component receives.
pub struct Installation {
    pub private_key: SigningKey,
    pub public_key: VerificationKey,
}

impl Installation {
    /// Create a new installation with a fresh key pair.
    #[must_use]
    pub fn new() -> Self {
        #[allow(clippy::expect_used)]
        let (private_key, public_key) = generate().expect("Failed to generate keys").into_parts();
        Self {
            private_key,
            public_key,
        }
    }

    /// Mint a token for `scope`.
    #[must_use]
    pub fn token(&self, scope: &Scope) -> Token {
        #[allow(clippy::expect_used)]
        issue(&self.private_key, scope).expect("Failed to issue token")
    }

    /// An enforcing gate for `component`.
    #[must_use]
    pub fn gate(&self, component: Component) -> AuthGate {
        AuthGate::new(
            component,
            AuthPosture::from_public_key(Some(self.public_key.clone())),
        )
    }

    /// The HTTP router of an enforcing `component`.
    #[must_use]
    pub fn router(&self, component: Component) -> Router {
        router(Arc::new(self.gate(component)))
    }
}

/// A fresh timeline of `tenant_id`.
#[must_use]
pub fn timeline_of(tenant_id: TenantId) -> TenantTimelineId {
    TenantTimelineId::new(tenant_id, TimelineId::generate())
}

/// URI of the timeline data endpoint.
#[must_use]
pub fn wal_uri(ttid: TenantTimelineId) -> String {
    format!(
        "/v1/tenant/{}/timeline/{}/wal",
        ttid.tenant_id, ttid.timeline_id
    )
}

/// Send a GET request with an optional raw `Authorization` header value.
pub async fn get(router: Router, uri: &str, authorization: Option<&str>) -> (StatusCode, String) {
    let mut request = Request::builder().method("GET").uri(uri);
    if let Some(value) = authorization {
        request = request.header(AUTHORIZATION, value);
    }
    #[allow(clippy::expect_used)]
    let request = request.body(Body::empty()).expect("Failed to build request");

    #[allow(clippy::expect_used)]
    let response = router.oneshot(request).await.expect("Router is infallible");
    let status = response.status();

    #[allow(clippy::expect_used)]
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    (status, String::from_utf8_lossy(&body).into_owned())
}

/// Send a GET request presenting `token` as a bearer credential.
pub async fn get_with_token(router: Router, uri: &str, token: &Token) -> (StatusCode, String) {
    let header = format!("Bearer {}", token.expose());
    get(router, uri, Some(&header)).await
}
