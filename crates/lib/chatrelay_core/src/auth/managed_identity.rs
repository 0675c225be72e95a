//! Managed identity token acquisition.
//!
//! When the host advertises an identity endpoint (`IDENTITY_ENDPOINT` plus
//! `IDENTITY_HEADER`, as on App Service and Functions) tokens come from
//! there. Otherwise the instance metadata service is asked.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{AccessToken, TokenCredential, read_token_response};
use crate::config::ManagedIdentitySettings;
use crate::error::{ChatError, ChatResult};

/// API version of the hosting identity endpoint.
pub const IDENTITY_ENDPOINT_API_VERSION: &str = "2019-08-01";

/// API version of the instance metadata token endpoint.
pub const IMDS_API_VERSION: &str = "2018-02-01";

pub const IDENTITY_HEADER: &str = "X-IDENTITY-HEADER";

/// Acquires tokens for the identity assigned to the host.
pub struct ManagedIdentityCredential {
    settings: ManagedIdentitySettings,
    http: reqwest::Client,
}

impl ManagedIdentityCredential {
    pub fn new(settings: ManagedIdentitySettings, http: reqwest::Client) -> Self {
        Self { settings, http }
    }

    /// Name of the source tokens are requested from.
    pub fn source(&self) -> &'static str {
        match self.hosting_endpoint() {
            Some(_) => "identity-endpoint",
            None => "imds",
        }
    }

    fn hosting_endpoint(&self) -> Option<(&str, &str)> {
        match (&self.settings.endpoint, &self.settings.header) {
            (Some(endpoint), Some(header)) => Some((endpoint.as_str(), header.as_str())),
            _ => None,
        }
    }

    async fn request_token(&self, scope: &str) -> ChatResult<AccessToken> {
        let resource = scope.trim_end_matches("/.default");

        let request = match self.hosting_endpoint() {
            Some((endpoint, header)) => {
                let mut query = vec![
                    ("resource", resource),
                    ("api-version", IDENTITY_ENDPOINT_API_VERSION),
                ];
                if let Some(client_id) = self.settings.client_id.as_deref() {
                    query.push(("client_id", client_id));
                }
                self.http
                    .get(endpoint)
                    .query(&query)
                    .header(IDENTITY_HEADER, header)
            }
            None => {
                let mut query = vec![("api-version", IMDS_API_VERSION), ("resource", resource)];
                if let Some(client_id) = self.settings.client_id.as_deref() {
                    query.push(("client_id", client_id));
                }
                self.http
                    .get(&self.settings.imds_endpoint)
                    .query(&query)
                    .header("Metadata", "true")
            }
        };

        let resp = request
            .send()
            .await
            .map_err(|e| ChatError::Auth(format!("managed identity request failed: {e}")))?;

        read_token_response(resp).await
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    async fn get_token(&self, scope: &str, cancel: &CancellationToken) -> ChatResult<AccessToken> {
        tokio::select! {
            result = self.request_token(scope) => result,
            _ = cancel.cancelled() => Err(ChatError::Cancelled),
        }
    }
}
