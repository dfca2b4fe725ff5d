//! One-time installation init, then components loading the public key from
//! their configuration.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;

use crate::config::{AuthType, ServerConfig};
use crate::e2e_tests::helpers::*;
use crate::gate::{AuthGate, AuthPosture};
use crate::http::router;
use crate::ids::TenantId;
use crate::keys::{SigningKey, VerificationKey};
use crate::scope::Scope;
use crate::token::{init_installation, issue_all};

#[tokio::test]
async fn test_init_then_serve() {
    let dir = tempfile::tempdir().expect("temp dir");
    let outcome = init_installation(dir.path()).expect("init");

    let mut vars = HashMap::new();
    vars.insert("AUTHGATE_COMPONENT".to_string(), "safekeeper".to_string());
    vars.insert(
        "AUTHGATE_AUTH_PUBLIC_KEY_PATH".to_string(),
        outcome.public_key_path.display().to_string(),
    );
    let config = ServerConfig::from_vars(&vars).expect("config");
    assert_eq!(config.auth_type, AuthType::EdDSAJwt);

    let public_key_path = config.auth_public_key_path.as_deref().expect("key path");
    let public_key = VerificationKey::from_pem_file(public_key_path).expect("public key");
    let gate = AuthGate::new(config.component, AuthPosture::from_public_key(Some(public_key)));
    let app = router(Arc::new(gate));

    let (status, body) = get_with_token(app.clone(), "/v1/tenant", &outcome.token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("full_access"));

    // later issuance from the persisted private key
    let private_key = SigningKey::from_pem_file(&outcome.private_key_path).expect("private key");
    let tenant = TenantId::generate();
    let issued = issue_all(
        &private_key,
        &[
            ("compute".to_string(), Scope::Tenant(tenant)),
            ("pageserver".to_string(), Scope::SafekeeperData),
        ],
    )
    .expect("issue plan");

    for entry in &issued {
        let (status, _) =
            get_with_token(app.clone(), &wal_uri(timeline_of(tenant)), &entry.token).await;
        assert_eq!(status, StatusCode::OK, "{}", entry.component);
    }
}
