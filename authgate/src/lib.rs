// Life of a request:
// 1. Request comes in over HTTP or a PostgreSQL-style connection
// 2. The route's access extractor names the resource it touches
// 3. The gate:
//     - Disabled/Trusting: lets it through
//     - Enforcing: validates the token, then checks its scope against the
//       resource and the component
// 4. Handler runs only if the gate said yes
//
// System components:
//  - Key material, held by the issuing authority (private) and every
//    component (public)
//  - Token issuer and validator
//  - Scope registry
//  - Credential channel for outbound connections

pub mod config;
pub mod credential;
pub mod error;
pub mod gate;
pub mod http;
pub mod ids;
pub mod keys;
pub mod scope;
pub mod token;

mod e2e_tests;

pub use error::AuthError;
pub use gate::{Access, AuthGate, AuthPosture};
pub use keys::{KeyMaterial, SigningKey, VerificationKey, generate};
pub use scope::{Component, Resource, Scope, authorize};
pub use token::{Token, issue, validate};
