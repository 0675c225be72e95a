//! API server configuration.

use chatrelay_core::ChatConfig;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:5080").
    pub bind_addr: String,
    /// Settings for the upstream chat-completion API.
    pub chat: ChatConfig,
}
