//! # chatrelay_core
//!
//! Forwards a single user message to a hosted chat-completion API and
//! extracts the reply text.
//!
//! The configured endpoint is either a resource root (the deployment name is
//! placed in the request path) or a generic models/completions route (the
//! deployment name is sent as `model` in the body). Authentication is either a
//! static `api-key` header or a bearer token from a client-credentials grant.

pub mod auth;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod payload;
pub mod service;

pub use auth::{AuthMode, TokenCredential};
pub use config::ChatConfig;
pub use endpoint::{EndpointKind, classify_endpoint};
pub use error::{ChatError, ChatResult};
pub use service::ChatService;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
