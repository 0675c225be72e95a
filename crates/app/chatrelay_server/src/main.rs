//! chatrelay server binary.
//!
//! Serves the chat page and forwards `POST /chat/send` messages to the
//! configured chat-completion API.

use chatrelay_api::config::ApiConfig;
use chatrelay_core::config::{
    DEFAULT_API_VERSION, DEFAULT_AUTHORITY_HOST, DEFAULT_TOKEN_SCOPE, IdentitySettings,
    ManagedIdentitySettings,
};
use chatrelay_core::{ChatConfig, ChatResult, ChatService};
use clap::Parser;
use tracing::{info, warn};

/// CLI arguments for the chat relay.
#[derive(Parser, Debug)]
#[command(name = "chatrelay_server", about = "Chat relay server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:5080")]
    bind_addr: String,

    /// Chat endpoint: a resource root or a models/chat/completions URL.
    #[arg(long, env = "CHAT_ENDPOINT", default_value = "")]
    endpoint: String,

    /// Deployment (or model) name.
    #[arg(long, env = "CHAT_DEPLOYMENT_NAME", default_value = "")]
    deployment_name: String,

    #[arg(long, env = "CHAT_API_VERSION", default_value = DEFAULT_API_VERSION)]
    api_version: String,

    /// Static API key. When set, bearer-token auth is not used.
    #[arg(long, env = "CHAT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "AZURE_TENANT_ID")]
    tenant_id: Option<String>,

    /// Client id for client credentials, or of a user-assigned managed
    /// identity when no tenant or secret is set.
    #[arg(long, env = "AZURE_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    #[arg(long, env = "AZURE_AUTHORITY_HOST", default_value = DEFAULT_AUTHORITY_HOST)]
    authority_host: String,

    /// Scope requested for bearer tokens.
    #[arg(long, env = "CHAT_TOKEN_SCOPE", default_value = DEFAULT_TOKEN_SCOPE)]
    token_scope: String,

    /// Managed identity endpoint advertised by the host.
    #[arg(long, env = "IDENTITY_ENDPOINT")]
    identity_endpoint: Option<String>,

    #[arg(long, env = "IDENTITY_HEADER", hide_env_values = true)]
    identity_header: Option<String>,
}

impl Args {
    fn into_config(self) -> ChatResult<ApiConfig> {
        let identity = IdentitySettings::from_parts(
            self.tenant_id,
            self.client_id.clone(),
            self.client_secret,
            Some(self.authority_host),
            Some(self.token_scope.clone()),
        )?;
        let managed_identity = ManagedIdentitySettings::from_parts(
            self.identity_endpoint,
            self.identity_header,
            self.client_id,
            Some(self.token_scope),
        );

        Ok(ApiConfig {
            bind_addr: self.bind_addr,
            chat: ChatConfig {
                endpoint: self.endpoint,
                deployment_name: self.deployment_name,
                api_version: self.api_version,
                api_key: self.api_key,
                identity,
                managed_identity,
            },
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatrelay_api=debug,chatrelay_core=debug".into()),
        )
        .init();

    let config = Args::parse().into_config()?;

    // Missing or invalid chat settings are fatal at startup.
    let endpoint = config.chat.validate()?;
    let service = ChatService::from_config(config.chat.clone())?;

    info!(
        endpoint = %endpoint,
        deployment = %config.chat.deployment_name,
        api_version = config.chat.api_version(),
        endpoint_kind = ?chatrelay_core::classify_endpoint(&endpoint),
        auth = service.auth_mode().name(),
        "starting chatrelay_server"
    );

    let app = chatrelay_api::router(chatrelay_api::AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "chat relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("chat relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_build_static_key_config() {
        let args = Args::try_parse_from([
            "chatrelay_server",
            "--endpoint",
            "https://x.example/resource",
            "--deployment-name",
            "gpt-4o",
            "--api-key",
            "k",
            "--api-version",
            "2024-10-21",
        ])
        .unwrap();
        let config = args.into_config().unwrap();
        assert_eq!(config.chat.endpoint, "https://x.example/resource");
        assert_eq!(config.chat.deployment_name, "gpt-4o");
        assert_eq!(config.chat.api_version(), "2024-10-21");
        assert_eq!(config.chat.api_key.as_deref(), Some("k"));
        assert!(config.chat.validate().is_ok());
    }

    #[test]
    fn client_credentials_build_identity() {
        let args = Args::try_parse_from([
            "chatrelay_server",
            "--endpoint",
            "https://x.example/resource",
            "--deployment-name",
            "gpt-4o",
            "--tenant-id",
            "t",
            "--client-id",
            "c",
            "--client-secret",
            "s",
        ])
        .unwrap();
        let config = args.into_config().unwrap();
        let identity = config.chat.identity.expect("identity");
        assert_eq!(identity.tenant_id, "t");
        assert!(!identity.scope.is_empty());
    }

    #[test]
    fn incomplete_client_credentials_are_rejected() {
        let args = Args::try_parse_from([
            "chatrelay_server",
            "--endpoint",
            "https://x.example/resource",
            "--deployment-name",
            "gpt-4o",
            "--tenant-id",
            "t",
            "--client-id",
            "c",
        ])
        .unwrap();
        let err = args.into_config().unwrap_err();
        assert!(err.to_string().contains("AZURE_CLIENT_SECRET"), "{err}");
    }

    #[test]
    fn identity_endpoint_builds_managed_identity() {
        let args = Args::try_parse_from([
            "chatrelay_server",
            "--endpoint",
            "https://x.example/resource",
            "--deployment-name",
            "gpt-4o",
            "--client-id",
            "user-mi",
            "--identity-endpoint",
            "http://localhost:8081/msi/token",
            "--identity-header",
            "h",
        ])
        .unwrap();
        let config = args.into_config().unwrap();
        assert!(config.chat.identity.is_none());
        let managed = config.chat.managed_identity;
        assert_eq!(
            managed.endpoint.as_deref(),
            Some("http://localhost:8081/msi/token")
        );
        assert_eq!(managed.client_id.as_deref(), Some("user-mi"));
    }
}
