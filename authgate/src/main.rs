#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code so a bad key or config exits cleanly.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use authgate::{
    AuthGate, AuthPosture, VerificationKey,
    config::{AuthType, ServerConfig},
    credential::resolve_connection_string,
    http::router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authgate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: component={}, auth_type={}, listen_port={}",
        config.component,
        config.auth_type,
        config.listen_port
    );

    // The posture is fixed here for the lifetime of the process.
    let posture = match (config.auth_type, &config.auth_public_key_path) {
        (AuthType::EdDSAJwt, Some(path)) => match VerificationKey::from_pem_file(path) {
            Ok(key) => {
                tracing::info!("auth enforcing with public key {}", path.display());
                AuthPosture::from_public_key(Some(key))
            }
            Err(e) => {
                tracing::error!("Failed to load auth public key: {e}");
                std::process::exit(1);
            }
        },
        (AuthType::EdDSAJwt, None) => {
            tracing::error!("EdDSAJwt auth requires a public key path");
            std::process::exit(1);
        }
        (AuthType::Trust, _) => {
            tracing::warn!("auth is Trust: every request is authorized");
            AuthPosture::Trusting
        }
        (AuthType::Disabled, _) => {
            tracing::warn!("auth is Disabled: every request is authorized");
            AuthPosture::Disabled
        }
    };

    if let Some(template) = &config.upstream_connstr {
        let vars: HashMap<String, String> = std::env::vars().collect();
        match resolve_connection_string(template, &vars) {
            // Display masks the password and substituted values
            Ok(upstream) => tracing::info!(
                "upstream connection: {upstream} (authenticated={})",
                upstream.is_authenticated()
            ),
            Err(e) => {
                tracing::error!("Failed to resolve upstream connection string: {e}");
                std::process::exit(1);
            }
        }
    }

    let gate = Arc::new(AuthGate::new(config.component, posture));
    let app = router(gate);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}
