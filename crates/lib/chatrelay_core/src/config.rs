//! Forwarding configuration.

use std::fmt;

use url::Url;

use crate::error::{ChatError, ChatResult};

/// API version sent when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-05-01-preview";

/// Resource audience requested for bearer tokens.
pub const DEFAULT_TOKEN_SCOPE: &str = "https://cognitiveservices.azure.com/.default";

/// Identity provider host used for the client-credentials grant.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Instance metadata token endpoint used when no hosting identity endpoint
/// is advertised.
pub const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Client-credentials material for bearer-token authentication.
#[derive(Clone)]
pub struct IdentitySettings {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// e.g. `https://login.microsoftonline.com`
    pub authority_host: String,
    pub scope: String,
}

impl IdentitySettings {
    /// Assembles client credentials.
    ///
    /// Returns `Ok(None)` when neither tenant nor secret is set; a client id
    /// on its own names a user-assigned managed identity instead. Once tenant
    /// or secret is given, all three parts are required and the error names
    /// the missing ones.
    pub fn from_parts(
        tenant_id: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
        authority_host: Option<String>,
        scope: Option<String>,
    ) -> ChatResult<Option<Self>> {
        let tenant_id = non_blank(tenant_id);
        let client_id = non_blank(client_id);
        let client_secret = non_blank(client_secret);

        if tenant_id.is_none() && client_secret.is_none() {
            return Ok(None);
        }

        let missing: Vec<&str> = [
            ("AZURE_TENANT_ID", tenant_id.is_none()),
            ("AZURE_CLIENT_ID", client_id.is_none()),
            ("AZURE_CLIENT_SECRET", client_secret.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        match (tenant_id, client_id, client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Ok(Some(Self {
                tenant_id,
                client_id,
                client_secret,
                authority_host: non_blank(authority_host)
                    .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
                scope: non_blank(scope).unwrap_or_else(|| DEFAULT_TOKEN_SCOPE.to_string()),
            })),
            _ => Err(ChatError::Config(format!(
                "client credentials are incomplete, missing: {}",
                missing.join(", ")
            ))),
        }
    }
}

impl fmt::Debug for IdentitySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySettings")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authority_host", &self.authority_host)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Managed identity lookup, used for bearer tokens when neither an API key
/// nor client credentials are configured.
#[derive(Clone)]
pub struct ManagedIdentitySettings {
    /// Hosting identity endpoint (`IDENTITY_ENDPOINT`), e.g. on App Service.
    pub endpoint: Option<String>,
    /// Secret sent as `X-IDENTITY-HEADER` (`IDENTITY_HEADER`).
    pub header: Option<String>,
    /// Client id of a user-assigned identity. System-assigned when unset.
    pub client_id: Option<String>,
    pub imds_endpoint: String,
    pub scope: String,
}

impl ManagedIdentitySettings {
    pub fn from_parts(
        endpoint: Option<String>,
        header: Option<String>,
        client_id: Option<String>,
        scope: Option<String>,
    ) -> Self {
        Self {
            endpoint: non_blank(endpoint),
            header: non_blank(header),
            client_id: non_blank(client_id),
            imds_endpoint: DEFAULT_IMDS_ENDPOINT.to_string(),
            scope: non_blank(scope).unwrap_or_else(|| DEFAULT_TOKEN_SCOPE.to_string()),
        }
    }

    pub fn with_imds_endpoint(mut self, imds_endpoint: impl Into<String>) -> Self {
        self.imds_endpoint = imds_endpoint.into();
        self
    }
}

impl Default for ManagedIdentitySettings {
    fn default() -> Self {
        Self::from_parts(None, None, None, None)
    }
}

impl fmt::Debug for ManagedIdentitySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedIdentitySettings")
            .field("endpoint", &self.endpoint)
            .field("header", &self.header.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("imds_endpoint", &self.imds_endpoint)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Process-wide chat configuration.
///
/// Built once at startup and moved into [`crate::ChatService`]. Nothing
/// mutates it afterwards.
#[derive(Clone)]
pub struct ChatConfig {
    /// Absolute URL of either a resource root or a models/completions route.
    pub endpoint: String,
    /// Deployment (or model) identifier.
    pub deployment_name: String,
    pub api_version: String,
    /// Static key sent in the `api-key` header. Selects static-key auth.
    pub api_key: Option<String>,
    /// Client credentials. Used for bearer-token auth when no key is set.
    pub identity: Option<IdentitySettings>,
    /// Bearer-token fallback when neither key nor client credentials exist.
    pub managed_identity: ManagedIdentitySettings,
}

impl ChatConfig {
    pub fn new(endpoint: impl Into<String>, deployment_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            deployment_name: deployment_name.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_key: None,
            identity: None,
            managed_identity: ManagedIdentitySettings::default(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_identity(mut self, identity: IdentitySettings) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_managed_identity(mut self, managed_identity: ManagedIdentitySettings) -> Self {
        self.managed_identity = managed_identity;
        self
    }

    /// Checks the settings required before any forwarding attempt and
    /// returns the parsed endpoint.
    pub fn validate(&self) -> ChatResult<Url> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() || self.deployment_name.trim().is_empty() {
            return Err(ChatError::Config(
                "chat endpoint and deployment name are required".into(),
            ));
        }

        // `Url::parse` only accepts absolute URLs.
        Url::parse(endpoint)
            .map_err(|e| ChatError::Config(format!("chat endpoint is invalid: {e}")))
    }

    /// The API version, falling back to the default when blank.
    pub fn api_version(&self) -> &str {
        let version = self.api_version.trim();
        if version.is_empty() {
            DEFAULT_API_VERSION
        } else {
            version
        }
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("endpoint", &self.endpoint)
            .field("deployment_name", &self.deployment_name)
            .field("api_version", &self.api_version)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("identity", &self.identity)
            .field("managed_identity", &self.managed_identity)
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
