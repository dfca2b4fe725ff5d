//! End-to-end tests at the installation level.
//!
//! Each test file covers a specific scenario: an installation generates its
//! keys, mints tokens, and components check them through the gate or the
//! HTTP router.

#![cfg(test)]

mod helpers;

mod test_credential_propagation;
mod test_cross_installation;
mod test_disabled_gate;
mod test_installation_init;
mod test_tenant_isolation;
