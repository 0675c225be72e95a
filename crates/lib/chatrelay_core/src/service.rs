//! Chat forwarding service.

use reqwest::header::CONTENT_TYPE;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::auth::AuthMode;
use crate::config::ChatConfig;
use crate::endpoint::{EndpointKind, build_request_url, classify_endpoint};
use crate::error::{ChatError, ChatResult};
use crate::payload::{build_payload, parse_reply};

/// Forwards single messages to the configured chat-completion API.
///
/// Holds only read-only state; one instance is shared by all requests.
pub struct ChatService {
    config: ChatConfig,
    auth: AuthMode,
    http: reqwest::Client,
}

impl ChatService {
    pub fn new(config: ChatConfig, auth: AuthMode, http: reqwest::Client) -> Self {
        Self { config, auth, http }
    }

    /// Builds a service with a fresh HTTP client and the auth mode implied
    /// by `config`.
    pub fn from_config(config: ChatConfig) -> ChatResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;
        let auth = AuthMode::from_config(&config, http.clone())?;
        Ok(Self::new(config, auth, http))
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn auth_mode(&self) -> &AuthMode {
        &self.auth
    }

    /// Resolves the endpoint kind and request URL for the current config.
    pub fn resolve_target(&self) -> ChatResult<(EndpointKind, Url)> {
        let endpoint = self.config.validate()?;
        let kind = classify_endpoint(&endpoint);
        let url = build_request_url(
            &endpoint,
            kind,
            &self.config.deployment_name,
            self.config.api_version(),
        )?;
        Ok((kind, url))
    }

    /// Sends `message` and returns the model's reply text.
    ///
    /// Returns [`ChatError::Cancelled`] as soon as `cancel` fires, dropping
    /// any in-flight token or chat request.
    pub async fn send(&self, message: &str, cancel: &CancellationToken) -> ChatResult<String> {
        let (kind, url) = self.resolve_target()?;
        if cancel.is_cancelled() {
            return Err(ChatError::Cancelled);
        }

        debug!(url = %url, endpoint_kind = ?kind, auth = self.auth.name(), "forwarding chat message");

        let payload = build_payload(kind, &self.config.deployment_name, message);
        let request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload);
        let request = self.auth.authorize(request, cancel).await?;

        let exchange = async {
            let resp = request.send().await?;
            let status = resp.status();
            let body = resp.text().await?;
            Ok::<_, ChatError>((status, body))
        };

        let (status, body) = tokio::select! {
            result = exchange => result?,
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
        };

        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::auth::{AccessToken, TokenCredential};

    struct PendingToken;

    #[async_trait]
    impl TokenCredential for PendingToken {
        async fn get_token(
            &self,
            _scope: &str,
            cancel: &CancellationToken,
        ) -> ChatResult<AccessToken> {
            cancel.cancelled().await;
            Err(ChatError::Cancelled)
        }
    }

    struct FailingToken;

    #[async_trait]
    impl TokenCredential for FailingToken {
        async fn get_token(
            &self,
            _scope: &str,
            _cancel: &CancellationToken,
        ) -> ChatResult<AccessToken> {
            Err(ChatError::Auth("identity provider unavailable".into()))
        }
    }

    fn service(config: ChatConfig, auth: AuthMode) -> ChatService {
        ChatService::new(config, auth, reqwest::Client::new())
    }

    #[test]
    fn resolves_deployment_target() {
        let svc = service(
            ChatConfig::new("https://x.example/resource/", "gpt-4o"),
            AuthMode::StaticKey("k".into()),
        );
        let (kind, url) = svc.resolve_target().unwrap();
        assert_eq!(kind, EndpointKind::DeploymentScoped);
        assert_eq!(
            url.as_str(),
            "https://x.example/resource/openai/deployments/gpt-4o/chat/completions?api-version=2024-05-01-preview"
        );
    }

    #[test]
    fn resolves_generic_target_with_custom_version() {
        let svc = service(
            ChatConfig::new("https://x.example/models/chat/completions", "gpt-4o")
                .with_api_version("2025-01-01"),
            AuthMode::StaticKey("k".into()),
        );
        let (kind, url) = svc.resolve_target().unwrap();
        assert_eq!(kind, EndpointKind::Generic);
        assert_eq!(
            url.as_str(),
            "https://x.example/models/chat/completions?api-version=2025-01-01"
        );
    }

    #[tokio::test]
    async fn invalid_config_fails_before_auth() {
        let svc = service(
            ChatConfig::new("not a url", "gpt-4o"),
            AuthMode::BearerToken {
                credential: Arc::new(FailingToken),
                scope: "s".into(),
            },
        );
        let err = svc.send("hi", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[tokio::test]
    async fn token_failure_is_auth_error() {
        let svc = service(
            ChatConfig::new("https://x.example/resource", "gpt-4o"),
            AuthMode::BearerToken {
                credential: Arc::new(FailingToken),
                scope: "s".into(),
            },
        );
        let err = svc.send("hi", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ChatError::Auth(_)));
    }

    #[tokio::test]
    async fn cancellation_during_token_acquisition() {
        let svc = service(
            ChatConfig::new("https://x.example/resource", "gpt-4o"),
            AuthMode::BearerToken {
                credential: Arc::new(PendingToken),
                scope: "s".into(),
            },
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(Duration::from_secs(5), svc.send("hi", &cancel))
            .await
            .expect("cancellation should finish promptly");
        assert!(matches!(result, Err(ChatError::Cancelled)));
    }

    #[tokio::test]
    async fn cancellation_aborts_pending_chat_call() {
        // Fires when the stub's handler future is dropped, which happens once
        // the client side of the connection goes away.
        struct Released(Option<oneshot::Sender<()>>);

        impl Drop for Released {
            fn drop(&mut self) {
                if let Some(tx) = self.0.take() {
                    let _ = tx.send(());
                }
            }
        }

        let (released_tx, released_rx) = oneshot::channel();
        let released_tx = Arc::new(Mutex::new(Some(released_tx)));
        let stub = axum::Router::new().fallback(move || {
            let released_tx = released_tx.clone();
            async move {
                let _released = Released(released_tx.lock().unwrap().take());
                std::future::pending::<()>().await;
                "never"
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });

        let svc = service(
            ChatConfig::new(format!("http://{addr}/resource"), "gpt-4o"),
            AuthMode::StaticKey("k".into()),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(Duration::from_secs(5), svc.send("hi", &cancel))
            .await
            .expect("cancellation should finish promptly");
        assert!(matches!(result, Err(ChatError::Cancelled)));

        tokio::time::timeout(Duration::from_secs(5), released_rx)
            .await
            .expect("upstream request should be aborted")
            .expect("upstream handler should have started");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let svc = service(
            ChatConfig::new(format!("http://{addr}/resource"), "gpt-4o"),
            AuthMode::StaticKey("k".into()),
        );
        let err = svc.send("hi", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ChatError::Transport(_)));
    }

    #[tokio::test]
    async fn already_cancelled_does_not_send() {
        let svc = service(
            ChatConfig::new("https://x.example/resource", "gpt-4o"),
            AuthMode::StaticKey("k".into()),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = svc.send("hi", &cancel).await;
        assert!(matches!(result, Err(ChatError::Cancelled)));
    }
}
