//! Authentication against the chat-completion API.
//!
//! Exactly one mode is active per process, chosen from the configured
//! credential material:
//!
//! - [`AuthMode::StaticKey`] — the configured secret goes verbatim in an
//!   `api-key` header.
//! - [`AuthMode::BearerToken`] — a short-lived token is acquired from an
//!   identity provider on every call and sent as `Authorization: Bearer`.
//!   Client credentials are used when configured, otherwise the host's
//!   managed identity.

pub mod client_secret;
pub mod managed_identity;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use reqwest::header::AUTHORIZATION;
use tokio_util::sync::CancellationToken;

use crate::config::ChatConfig;
use crate::error::{ChatError, ChatResult};

pub use client_secret::ClientSecretCredential;
pub use managed_identity::ManagedIdentityCredential;

/// Header carrying the static key.
pub const API_KEY_HEADER: &str = "api-key";

/// An access token issued by an identity provider.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    /// Lifetime reported by the provider, in seconds.
    pub expires_in: Option<u64>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Token endpoint response shared by the client-credentials grant and the
/// managed identity endpoints.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<Lifetime>,
}

/// Managed identity endpoints report `expires_in` as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Lifetime {
    Seconds(u64),
    Text(String),
}

impl Lifetime {
    fn seconds(&self) -> Option<u64> {
        match self {
            Lifetime::Seconds(secs) => Some(*secs),
            Lifetime::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// Reads a token response, rejecting non-success statuses, empty tokens and
/// non-bearer token types. The response body never ends up in the error.
async fn read_token_response(resp: reqwest::Response) -> ChatResult<AccessToken> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ChatError::Auth(format!("token endpoint returned HTTP {status}")));
    }

    let token = resp
        .json::<TokenResponse>()
        .await
        .map_err(|e| ChatError::Auth(format!("token response parse error: {e}")))?;

    if token.access_token.trim().is_empty() {
        return Err(ChatError::Auth("token endpoint returned an empty token".into()));
    }
    if let Some(kind) = token.token_type.as_deref()
        && !kind.eq_ignore_ascii_case("bearer")
    {
        return Err(ChatError::Auth(format!("unexpected token type: {kind}")));
    }

    Ok(AccessToken {
        expires_in: token.expires_in.as_ref().and_then(Lifetime::seconds),
        token: token.access_token,
    })
}

/// Source of bearer tokens.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Acquires a token for `scope`. Must return [`ChatError::Cancelled`]
    /// promptly once `cancel` fires.
    async fn get_token(&self, scope: &str, cancel: &CancellationToken) -> ChatResult<AccessToken>;
}

/// Authentication strategy for outbound chat requests.
#[derive(Clone)]
pub enum AuthMode {
    StaticKey(String),
    BearerToken {
        credential: Arc<dyn TokenCredential>,
        scope: String,
    },
}

impl AuthMode {
    /// Selects the mode from configuration: a non-blank API key wins, then
    /// client credentials, then the managed identity.
    pub fn from_config(config: &ChatConfig, http: reqwest::Client) -> ChatResult<Self> {
        if let Some(key) = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
        {
            return Ok(AuthMode::StaticKey(key.to_string()));
        }

        match &config.identity {
            Some(identity) => Ok(AuthMode::BearerToken {
                credential: Arc::new(ClientSecretCredential::new(identity.clone(), http)),
                scope: identity.scope.clone(),
            }),
            None => {
                let managed = config.managed_identity.clone();
                let scope = managed.scope.clone();
                Ok(AuthMode::BearerToken {
                    credential: Arc::new(ManagedIdentityCredential::new(managed, http)),
                    scope,
                })
            }
        }
    }

    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            AuthMode::StaticKey(_) => "static-key",
            AuthMode::BearerToken { .. } => "bearer-token",
        }
    }

    /// Attaches the credential header to `request`, acquiring a token first
    /// in bearer mode.
    pub async fn authorize(
        &self,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> ChatResult<RequestBuilder> {
        match self {
            AuthMode::StaticKey(key) => Ok(request.header(API_KEY_HEADER, key)),
            AuthMode::BearerToken { credential, scope } => {
                let token = credential.get_token(scope, cancel).await?;
                Ok(request.header(AUTHORIZATION, format!("Bearer {}", token.token)))
            }
        }
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::StaticKey(_) => f.write_str("StaticKey(<redacted>)"),
            AuthMode::BearerToken { scope, .. } => f
                .debug_struct("BearerToken")
                .field("scope", scope)
                .finish_non_exhaustive(),
        }
    }
}
