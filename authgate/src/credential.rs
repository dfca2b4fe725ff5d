//! Credential channel.
//!
//! Moves a token to a remote component, either as an HTTP bearer header, as
//! a PostgreSQL password, or through an environment-style placeholder in a
//! connection string.
//!
//! Placeholder substitution is a pure string operation over an explicit
//! variable map. Nothing in this module reads the process environment.
//!
//! # Invariants
//! - A token never appears in `Debug` or `Display` output of any type here.
//! - An unset placeholder yields "no credential", never an error.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;

use axum::http::HeaderValue;
use url::Url;

use crate::token::Token;

/// Variables available for placeholder substitution.
pub type EnvVars = HashMap<String, String>;

/// Default placeholder that carries the auth token in connection strings.
pub const DEFAULT_TOKEN_VAR: &str = "NEON_AUTH_TOKEN";

const BEARER: &str = "Bearer";
const REDACTED: &str = "********";
const URI_SCHEMES: [&str; 2] = ["postgres://", "postgresql://"];

/// Error returned when a credential cannot be presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The token contains bytes that are not legal in an HTTP header.
    InvalidHeaderValue,
    /// The connection string template is neither keyword/value nor a
    /// `postgres://` URI.
    MalformedConnectionString(String),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeaderValue => write!(f, "token is not a valid header value"),
            Self::MalformedConnectionString(reason) => {
                write!(f, "malformed connection string: {reason}")
            }
        }
    }
}

impl std::error::Error for CredentialError {}

/// How a token travels to the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// `Authorization: Bearer <token>`.
    HttpBearer,
    /// The password field of a PostgreSQL startup/auth exchange.
    PostgresPassword,
    /// A connection string whose placeholder named `var` receives the token.
    ConnectionString { template: String, var: String },
}

/// A token ready to be handed to a transport.
pub enum Presentation {
    /// No token was bound; connect without credentials.
    Anonymous,
    /// Value for the `Authorization` header. Marked sensitive.
    Header(HeaderValue),
    Password(Token),
    ConnectionString(ConnectionString),
}

impl fmt::Debug for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Header(_) => write!(f, "Header({BEARER} {REDACTED})"),
            Self::Password(_) => write!(f, "Password({REDACTED})"),
            Self::ConnectionString(conn) => write!(f, "ConnectionString({conn})"),
        }
    }
}

/// A token bound to a transport, not yet presented.
#[derive(Debug, Clone)]
pub struct CredentialBinding {
    token: Option<Token>,
    transport: Transport,
}

/// Bind `token` (or no token) to `transport`.
#[must_use]
pub fn bind(token: Option<Token>, transport: Transport) -> CredentialBinding {
    CredentialBinding { token, transport }
}

impl CredentialBinding {
    /// Produce the form the transport consumes.
    ///
    /// For connection strings, the other placeholders of the template are
    /// resolved from `vars`. The bound token always wins over an entry of
    /// the same name in `vars`, and a binding without a token leaves that
    /// placeholder unset.
    ///
    /// # Errors
    /// - `InvalidHeaderValue` if an HTTP transport is given a token that
    ///   cannot be a header value.
    /// - `MalformedConnectionString` if the template cannot be parsed.
    pub fn present(&self, vars: &EnvVars) -> Result<Presentation, CredentialError> {
        match (&self.transport, &self.token) {
            (Transport::ConnectionString { template, var }, token) => {
                let mut vars = vars.clone();
                match token {
                    Some(token) => vars.insert(var.clone(), token.expose().to_string()),
                    None => vars.remove(var),
                };
                resolve_connection_string(template, &vars).map(Presentation::ConnectionString)
            }
            (_, None) => Ok(Presentation::Anonymous),
            (Transport::HttpBearer, Some(token)) => {
                let mut value = HeaderValue::try_from(format!("{BEARER} {}", token.expose()))
                    .map_err(|_| CredentialError::InvalidHeaderValue)?;
                value.set_sensitive(true);
                Ok(Presentation::Header(value))
            }
            (Transport::PostgresPassword, Some(token)) => Ok(Presentation::Password(token.clone())),
        }
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively. Returns `None` for any other
/// scheme or an empty token.
#[must_use]
pub fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case(BEARER) || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Result of expanding one template.
struct Expansion {
    value: String,
    /// Non-empty values taken from the variable map.
    substituted: Vec<String>,
    /// Whether any referenced variable was unset.
    missing: bool,
}

fn expand(template: &str, vars: &EnvVars) -> Expansion {
    let mut substituted = Vec::new();
    let mut missing = false;
    let expanded = shellexpand::env_with_context(template, |name| {
        let value = match vars.get(name) {
            Some(value) => {
                if !value.is_empty() {
                    substituted.push(value.clone());
                }
                value.clone()
            }
            None => {
                missing = true;
                String::new()
            }
        };
        Ok::<_, Infallible>(Some(value))
    });
    let value = match expanded {
        Ok(value) => value.into_owned(),
        Err(error) => match error.cause {},
    };
    Expansion {
        value,
        substituted,
        missing,
    }
}

/// Replace `$NAME` and `${NAME}` placeholders with values from `vars`.
///
/// Unset variables expand to the empty string.
#[must_use]
pub fn substitute(template: &str, vars: &EnvVars) -> String {
    expand(template, vars).value
}

#[derive(Clone, PartialEq, Eq)]
enum Form {
    KeyValue(Vec<(String, String)>),
    Uri(Url),
}

/// A resolved connection string, either keyword/value or URI.
///
/// `Display` and `Debug` mask the password and every value that came from
/// a placeholder. Use [`ConnectionString::expose`] only when handing the
/// string to a connector.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    form: Form,
    secrets: Vec<String>,
}

impl ConnectionString {
    /// Look up a parameter by its keyword. URIs answer for `host`, `user`,
    /// `password`, and `dbname`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        match &self.form {
            Form::KeyValue(params) => params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            Form::Uri(url) => match key {
                "host" => url.host_str(),
                "user" => Some(url.username()).filter(|user| !user.is_empty()),
                "password" => url.password(),
                "dbname" => url.path().strip_prefix('/').filter(|db| !db.is_empty()),
                _ => None,
            },
        }
    }

    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.get("password")
    }

    /// Whether the connection will carry a credential.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.password().is_some_and(|p| !p.is_empty())
    }

    /// The full connection string, password included.
    #[must_use]
    pub fn expose(&self) -> String {
        self.render(false)
    }

    fn is_secret(&self, value: &str) -> bool {
        self.secrets.iter().any(|secret| value.contains(secret.as_str()))
    }

    fn render(&self, redact: bool) -> String {
        match &self.form {
            Form::KeyValue(params) => params
                .iter()
                .map(|(k, v)| {
                    if redact && (k == "password" || self.is_secret(v)) {
                        format!("{k}={REDACTED}")
                    } else {
                        format!("{k}={v}")
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
            Form::Uri(url) if !redact => url.to_string(),
            Form::Uri(url) => {
                let mut url = url.clone();
                if url.password().is_some() {
                    // only fails for URLs without a host
                    let _ = url.set_password(Some(REDACTED));
                }
                self.secrets
                    .iter()
                    .fold(url.to_string(), |shown, secret| shown.replace(secret.as_str(), REDACTED))
            }
        }
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionString({self})")
    }
}

/// Resolve placeholders in a connection string.
///
/// Two forms are understood:
/// - keyword/value, such as `host=sk-0 port=5454 password=$NEON_AUTH_TOKEN`.
///   A parameter that expands to nothing because its variables are unset is
///   dropped, so an unset token variable yields a connection without a
///   password.
/// - `postgres://` or `postgresql://` URIs, expanded as a whole. An unset
///   token variable leaves the password empty.
///
/// # Errors
/// Returns `MalformedConnectionString` for a keyword/value segment without
/// `=`, or a URI that does not parse after expansion.
pub fn resolve_connection_string(
    template: &str,
    vars: &EnvVars,
) -> Result<ConnectionString, CredentialError> {
    let template = template.trim();
    if URI_SCHEMES.iter().any(|scheme| template.starts_with(scheme)) {
        return resolve_uri(template, vars);
    }

    let mut params = Vec::new();
    let mut secrets = Vec::new();
    for pair in template.split_whitespace() {
        let Some((key, raw)) = pair.split_once('=') else {
            return Err(CredentialError::MalformedConnectionString(format!(
                "'{pair}' is not a key=value pair"
            )));
        };
        let expansion = expand(raw, vars);
        if expansion.missing && expansion.value.is_empty() {
            tracing::debug!("connection string parameter '{key}' references an unset variable, dropping it");
            continue;
        }
        secrets.extend(expansion.substituted);
        params.push((key.to_string(), expansion.value));
    }
    Ok(ConnectionString {
        form: Form::KeyValue(params),
        secrets,
    })
}

fn resolve_uri(template: &str, vars: &EnvVars) -> Result<ConnectionString, CredentialError> {
    let expansion = expand(template, vars);
    let url = Url::parse(&expansion.value)
        .map_err(|e| CredentialError::MalformedConnectionString(e.to_string()))?;
    Ok(ConnectionString {
        form: Form::Uri(url),
        secrets: expansion.substituted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> EnvVars {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_forms() {
        let env = vars(&[("TOKEN", "abc"), ("HOST", "sk-1")]);
        assert_eq!(substitute("$TOKEN", &env), "abc");
        assert_eq!(substitute("${TOKEN}", &env), "abc");
        assert_eq!(substitute("x${HOST}y", &env), "xsk-1y");
        assert_eq!(substitute("$HOST:$TOKEN", &env), "sk-1:abc");
    }

    #[test]
    fn test_substitute_unset_is_empty() {
        assert_eq!(substitute("a$MISSING-b", &EnvVars::new()), "a-b");
        assert_eq!(substitute("${MISSING}", &EnvVars::new()), "");
    }

    #[test]
    fn test_substitute_keeps_lone_dollar() {
        let env = vars(&[("A", "1")]);
        assert_eq!(substitute("cost $ 5", &env), "cost $ 5");
        assert_eq!(substitute("end$", &env), "end$");
    }

    #[test]
    fn test_resolve_connection_string_with_token() {
        let env = vars(&[("NEON_AUTH_TOKEN", "secret-token")]);
        let conn = resolve_connection_string("host=sk-0 port=5454 password=$NEON_AUTH_TOKEN", &env)
            .expect("resolve");

        assert_eq!(conn.get("host"), Some("sk-0"));
        assert_eq!(conn.password(), Some("secret-token"));
        assert!(conn.is_authenticated());
        assert_eq!(conn.expose(), "host=sk-0 port=5454 password=secret-token");
    }

    #[test]
    fn test_resolve_connection_string_unset_token() {
        let conn = resolve_connection_string(
            "host=sk-0 port=5454 password=$NEON_AUTH_TOKEN",
            &EnvVars::new(),
        )
        .expect("resolve");

        assert_eq!(conn.password(), None);
        assert!(!conn.is_authenticated());
        assert_eq!(conn.expose(), "host=sk-0 port=5454");
    }

    #[test]
    fn test_connection_string_display_is_redacted() {
        let env = vars(&[("T", "secret-token")]);
        let conn = resolve_connection_string("host=a password=${T}", &env).expect("resolve");

        let shown = format!("{conn} {conn:?}");
        assert!(!shown.contains("secret-token"));
        assert!(shown.contains("password=********"));
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("bearer  abc "), Some("abc"));
        assert_eq!(parse_bearer("Basic abc"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Bearer"), None);
    }

    #[test]
    fn test_bind_http_bearer() {
        let presentation = bind(Some(Token::new("abc.def.ghi")), Transport::HttpBearer)
            .present(&EnvVars::new())
            .expect("present");

        match presentation {
            Presentation::Header(value) => {
                assert!(value.is_sensitive());
                assert_eq!(value.to_str().expect("ascii"), "Bearer abc.def.ghi");
            }
            other => panic!("expected header, got {other:?}"),
        }
    }

    #[test]
    fn test_bind_rejects_unprintable_token() {
        let result = bind(Some(Token::new("bad\ntoken")), Transport::HttpBearer).present(&EnvVars::new());
        assert!(matches!(result, Err(CredentialError::InvalidHeaderValue)));
    }

    #[test]
    fn test_bind_password() {
        let presentation = bind(Some(Token::new("abc")), Transport::PostgresPassword)
            .present(&EnvVars::new())
            .expect("present");
        assert!(matches!(presentation, Presentation::Password(ref t) if t.expose() == "abc"));
        assert_eq!(format!("{presentation:?}"), "Password(********)");
    }

    #[test]
    fn test_bind_without_token_is_anonymous() {
        for transport in [Transport::HttpBearer, Transport::PostgresPassword] {
            let presentation = bind(None, transport).present(&EnvVars::new()).expect("present");
            assert!(matches!(presentation, Presentation::Anonymous));
        }
    }

    #[test]
    fn test_bind_connection_string() {
        let transport = Transport::ConnectionString {
            template: "host=ps port=6400 password=$NEON_AUTH_TOKEN".to_string(),
            var: DEFAULT_TOKEN_VAR.to_string(),
        };

        let with_token = bind(Some(Token::new("tok")), transport.clone())
            .present(&EnvVars::new())
            .expect("present");
        let Presentation::ConnectionString(conn) = with_token else {
            panic!("expected connection string");
        };
        assert_eq!(conn.password(), Some("tok"));

        let without = bind(None, transport).present(&EnvVars::new()).expect("present");
        let Presentation::ConnectionString(conn) = without else {
            panic!("expected connection string");
        };
        assert!(!conn.is_authenticated());
    }

    #[test]
    fn test_substituted_values_are_redacted_under_any_key() {
        let env = vars(&[("NEON_AUTH_TOKEN", "secret.token.value")]);
        let conn = resolve_connection_string(
            "host=sk-0 options=-cneon.auth_token=$NEON_AUTH_TOKEN",
            &env,
        )
        .expect("resolve");

        let shown = format!("{conn} {conn:?}");
        assert!(!shown.contains("secret.token.value"));
        assert!(shown.contains("host=sk-0"));
        assert!(shown.contains("options=********"));
        assert_eq!(
            conn.expose(),
            "host=sk-0 options=-cneon.auth_token=secret.token.value"
        );
    }

    #[test]
    fn test_bind_connection_string_uses_caller_vars() {
        let transport = Transport::ConnectionString {
            template: "host=$SK_HOST port=5454 password=$NEON_AUTH_TOKEN".to_string(),
            var: DEFAULT_TOKEN_VAR.to_string(),
        };
        let env = vars(&[("SK_HOST", "sk-1"), (DEFAULT_TOKEN_VAR, "stale")]);

        let Presentation::ConnectionString(conn) = bind(Some(Token::new("tok")), transport.clone())
            .present(&env)
            .expect("present")
        else {
            panic!("expected connection string");
        };
        assert_eq!(conn.expose(), "host=sk-1 port=5454 password=tok");

        // an unbound token is not taken from the caller's map
        let Presentation::ConnectionString(conn) =
            bind(None, transport).present(&env).expect("present")
        else {
            panic!("expected connection string");
        };
        assert_eq!(conn.expose(), "host=sk-1 port=5454");
    }

    #[test]
    fn test_resolve_uri_connection_string() {
        let env = vars(&[("T", "tok")]);
        let conn = resolve_connection_string("postgresql://u:$T@sk:5454/db", &env).expect("resolve");

        assert_eq!(conn.password(), Some("tok"));
        assert_eq!(conn.get("host"), Some("sk"));
        assert_eq!(conn.get("user"), Some("u"));
        assert_eq!(conn.get("dbname"), Some("db"));
        assert_eq!(conn.expose(), "postgresql://u:tok@sk:5454/db");
        assert!(!conn.to_string().contains("tok"));

        let unset =
            resolve_connection_string("postgresql://u:$T@sk:5454/db", &EnvVars::new()).expect("resolve");
        assert!(!unset.is_authenticated());
    }

    #[test]
    fn test_resolve_rejects_bare_segment() {
        let result = resolve_connection_string("host=sk-0 garbage", &EnvVars::new());
        assert_eq!(
            result,
            Err(CredentialError::MalformedConnectionString(
                "'garbage' is not a key=value pair".to_string()
            ))
        );

        let result = resolve_connection_string("postgres://[bad", &EnvVars::new());
        assert!(matches!(result, Err(CredentialError::MalformedConnectionString(_))));
    }
}
