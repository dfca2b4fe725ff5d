//! Token issuance and validation.
//!
//! Tokens are compact EdDSA-signed JWTs whose payload is a [`Claims`]
//! value. They carry no expiry and are never rotated; a new key pair means
//! restarting every component.
//!
//! [`Claims`]: crate::scope::Claims

use std::fmt;

pub mod issuer;
pub mod validator;

pub use issuer::{AuthorityToken, InitOutcome, IssuedToken, init_installation, issue, issue_all};
pub use validator::validate;

/// A signed token as presented on the wire.
///
/// The value is a secret: `Debug` never prints it and there is no `Display`
/// impl. Use [`Token::expose`] at the exact point the value must leave the
/// process.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a token received from configuration or the network.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token text.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(********)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::new("eyJhbGciOiJFZERTQSJ9.e30.c2ln");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("eyJ"));
        assert_eq!(rendered, "Token(********)");
    }

    #[test]
    fn test_token_expose() {
        let token = Token::new("abc.def.ghi");
        assert_eq!(token.expose(), "abc.def.ghi");
    }
}
