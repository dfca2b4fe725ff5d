//! Component configuration.
//!
//! This module loads the configuration of an auth-gated component from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `AUTHGATE_COMPONENT`: `pageserver`, `safekeeper`, or `broker` (default: `pageserver`)
//! - `AUTHGATE_AUTH_TYPE`: `Disabled`, `Trust`, or `EdDSAJwt` (default: derived from the key path)
//! - `AUTHGATE_AUTH_PUBLIC_KEY_PATH`: public key used to validate tokens
//! - `AUTHGATE_LISTEN_PORT`: port to listen on (default: `9898`)
//! - `AUTHGATE_UPSTREAM_CONNSTR`: optional outbound connection string template
//!
//! # Invariants
//!
//! - `auth_type` is `EdDSAJwt` if and only if `auth_public_key_path` is set.
//! - No configuration value is ever a token; tokens only enter through
//!   placeholder substitution at connection time.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::scope::Component;

const COMPONENT_VAR: &str = "AUTHGATE_COMPONENT";
const AUTH_TYPE_VAR: &str = "AUTHGATE_AUTH_TYPE";
const PUBLIC_KEY_PATH_VAR: &str = "AUTHGATE_AUTH_PUBLIC_KEY_PATH";
const LISTEN_PORT_VAR: &str = "AUTHGATE_LISTEN_PORT";
const UPSTREAM_CONNSTR_VAR: &str = "AUTHGATE_UPSTREAM_CONNSTR";

/// The configured authentication type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// No authentication.
    Disabled,
    /// Legacy name for `Disabled`.
    Trust,
    /// EdDSA-signed JWTs, validated with the configured public key.
    EdDSAJwt,
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Disabled" => Ok(Self::Disabled),
            "Trust" => Ok(Self::Trust),
            "EdDSAJwt" | "NeonJWT" => Ok(Self::EdDSAJwt),
            other => Err(format!(
                "'{other}' is not one of Disabled, Trust, EdDSAJwt"
            )),
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Trust => f.write_str("Trust"),
            Self::EdDSAJwt => f.write_str("EdDSAJwt"),
        }
    }
}

/// Server configuration.
///
/// # Post-conditions
///
/// - `listen_port` is always in the valid range (1-65535)
/// - `auth_public_key_path` is `Some` exactly when `auth_type` is `EdDSAJwt`
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Which component this process is.
    pub component: Component,
    pub auth_type: AuthType,
    /// Public key used when `auth_type` is `EdDSAJwt`.
    pub auth_public_key_path: Option<PathBuf>,
    /// Port to listen on for HTTP requests.
    pub listen_port: u16,
    /// Outbound connection string template. May reference a token variable,
    /// never a literal token.
    pub upstream_connstr: Option<String>,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 9898;
    /// Default component.
    pub const DEFAULT_COMPONENT: Component = Component::Pageserver;

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from an explicit variable map.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - any variable is set but cannot be parsed
    /// - `AUTHGATE_AUTH_TYPE` is `EdDSAJwt` but no public key path is set
    /// - `AUTHGATE_AUTH_TYPE` is `Disabled` or `Trust` but a public key path is set
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let component = Self::load_component(vars)?;
        let auth_public_key_path = non_empty(vars, PUBLIC_KEY_PATH_VAR).map(PathBuf::from);
        let auth_type = Self::load_auth_type(vars, auth_public_key_path.is_some())?;
        let listen_port = Self::load_listen_port(vars)?;
        let upstream_connstr = non_empty(vars, UPSTREAM_CONNSTR_VAR).map(str::to_string);

        Ok(Self {
            component,
            auth_type,
            auth_public_key_path,
            listen_port,
            upstream_connstr,
        })
    }

    fn load_component(vars: &HashMap<String, String>) -> Result<Component, ConfigError> {
        non_empty(vars, COMPONENT_VAR).map_or(Ok(Self::DEFAULT_COMPONENT), |value| {
            value.parse().map_err(|message| ConfigError::InvalidValue {
                name: COMPONENT_VAR.to_string(),
                message,
            })
        })
    }

    /// Resolve the auth type against the presence of a public key path.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit auth type contradicts the key path.
    fn load_auth_type(
        vars: &HashMap<String, String>,
        has_public_key: bool,
    ) -> Result<AuthType, ConfigError> {
        let explicit = non_empty(vars, AUTH_TYPE_VAR)
            .map(|value| {
                value.parse::<AuthType>().map_err(|message| ConfigError::InvalidValue {
                    name: AUTH_TYPE_VAR.to_string(),
                    message,
                })
            })
            .transpose()?;

        match (explicit, has_public_key) {
            (None, true) | (Some(AuthType::EdDSAJwt), true) => Ok(AuthType::EdDSAJwt),
            (None, false) => Ok(AuthType::Disabled),
            (Some(AuthType::EdDSAJwt), false) => {
                Err(ConfigError::MissingEnvVar(PUBLIC_KEY_PATH_VAR.to_string()))
            }
            (Some(auth_type), true) => Err(ConfigError::InvalidValue {
                name: AUTH_TYPE_VAR.to_string(),
                message: format!("{auth_type} conflicts with {PUBLIC_KEY_PATH_VAR}"),
            }),
            (Some(auth_type), false) => Ok(auth_type),
        }
    }

    /// Load the listen port.
    ///
    /// Returns the default if not set.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is set but not a valid port number.
    fn load_listen_port(vars: &HashMap<String, String>) -> Result<u16, ConfigError> {
        match non_empty(vars, LISTEN_PORT_VAR) {
            Some(value) => match value.parse::<u16>() {
                Ok(port) if port > 0 => Ok(port),
                _ => Err(ConfigError::InvalidValue {
                    name: LISTEN_PORT_VAR.to_string(),
                    message: format!("'{value}' is not a valid port number (must be 1-65535)"),
                }),
            },
            None => Ok(Self::DEFAULT_PORT),
        }
    }
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_default_values() {
        let config = ServerConfig::from_vars(&HashMap::new()).expect("defaults");
        assert_eq!(config.component, Component::Pageserver);
        assert_eq!(config.auth_type, AuthType::Disabled);
        assert_eq!(config.listen_port, 9898);
        assert!(config.auth_public_key_path.is_none());
        assert!(config.upstream_connstr.is_none());
    }

    #[test]
    fn test_key_path_implies_jwt() {
        let config = ServerConfig::from_vars(&vars(&[(
            PUBLIC_KEY_PATH_VAR,
            "/etc/neon/auth_public_key.pem",
        )]))
        .expect("config");
        assert_eq!(config.auth_type, AuthType::EdDSAJwt);
        assert_eq!(
            config.auth_public_key_path,
            Some(PathBuf::from("/etc/neon/auth_public_key.pem"))
        );
    }

    #[test]
    fn test_jwt_without_key_fails() {
        let result = ServerConfig::from_vars(&vars(&[(AUTH_TYPE_VAR, "EdDSAJwt")]));
        assert_eq!(
            result.map(|c| c.auth_type),
            Err(ConfigError::MissingEnvVar(PUBLIC_KEY_PATH_VAR.to_string()))
        );
    }

    #[test]
    fn test_disabled_with_key_is_ambiguous() {
        let result = ServerConfig::from_vars(&vars(&[
            (AUTH_TYPE_VAR, "Trust"),
            (PUBLIC_KEY_PATH_VAR, "/keys/pub.pem"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_explicit_trust() {
        let config =
            ServerConfig::from_vars(&vars(&[(AUTH_TYPE_VAR, "Trust")])).expect("config");
        assert_eq!(config.auth_type, AuthType::Trust);
    }

    #[test]
    fn test_legacy_jwt_name() {
        assert_eq!("NeonJWT".parse::<AuthType>(), Ok(AuthType::EdDSAJwt));
        assert!("jwt".parse::<AuthType>().is_err());
    }

    #[test]
    fn test_component_and_port() {
        let config = ServerConfig::from_vars(&vars(&[
            (COMPONENT_VAR, "safekeeper"),
            (LISTEN_PORT_VAR, "7676"),
        ]))
        .expect("config");
        assert_eq!(config.component, Component::Safekeeper);
        assert_eq!(config.listen_port, 7676);
    }

    #[test]
    fn test_invalid_port() {
        for bad in ["0", "70000", "http"] {
            let result = ServerConfig::from_vars(&vars(&[(LISTEN_PORT_VAR, bad)]));
            assert!(matches!(result, Err(ConfigError::InvalidValue { .. })), "{bad}");
        }
    }

    #[test]
    fn test_invalid_component() {
        let result = ServerConfig::from_vars(&vars(&[(COMPONENT_VAR, "compute")]));
        assert_eq!(
            result.map(|c| c.component),
            Err(ConfigError::InvalidValue {
                name: COMPONENT_VAR.to_string(),
                message: "unknown component 'compute'".to_string(),
            })
        );
    }

    #[test]
    fn test_config_error_display_missing() {
        let error = ConfigError::MissingEnvVar("TEST_VAR".to_string());
        assert_eq!(
            error.to_string(),
            "missing required environment variable: TEST_VAR"
        );
    }

    #[test]
    fn test_config_error_display_invalid() {
        let error = ConfigError::InvalidValue {
            name: "TEST_VAR".to_string(),
            message: "bad value".to_string(),
        };
        assert_eq!(error.to_string(), "invalid value for TEST_VAR: bad value");
    }
}
