//! OAuth2 client-credentials token acquisition.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{AccessToken, TokenCredential, read_token_response};
use crate::config::IdentitySettings;
use crate::error::{ChatError, ChatResult};

/// Acquires tokens with the client-credentials grant at
/// `<authority_host>/<tenant_id>/oauth2/v2.0/token`.
pub struct ClientSecretCredential {
    identity: IdentitySettings,
    http: reqwest::Client,
}

impl ClientSecretCredential {
    pub fn new(identity: IdentitySettings, http: reqwest::Client) -> Self {
        Self { identity, http }
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.identity.authority_host.trim_end_matches('/'),
            self.identity.tenant_id
        )
    }

    async fn request_token(&self, scope: &str) -> ChatResult<AccessToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.identity.client_id.as_str()),
            ("client_secret", self.identity.client_secret.as_str()),
            ("scope", scope),
        ];

        let resp = self
            .http
            .post(self.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| ChatError::Auth(format!("token request failed: {e}")))?;

        read_token_response(resp).await
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scope: &str, cancel: &CancellationToken) -> ChatResult<AccessToken> {
        tokio::select! {
            result = self.request_token(scope) => result,
            _ = cancel.cancelled() => Err(ChatError::Cancelled),
        }
    }
}
