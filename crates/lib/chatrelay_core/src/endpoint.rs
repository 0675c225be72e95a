//! Endpoint classification and request URL construction.

use url::Url;

use crate::error::{ChatError, ChatResult};

/// Shape of the configured chat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Already points at a models/completions route. The model goes in the body.
    Generic,
    /// A resource root. The deployment name goes in the path.
    DeploymentScoped,
}

/// Classifies an endpoint by its path (case-insensitive).
pub fn classify_endpoint(endpoint: &Url) -> EndpointKind {
    let path = endpoint.path().to_ascii_lowercase();
    if path.contains("/models/") || path.ends_with("/chat/completions") {
        EndpointKind::Generic
    } else {
        EndpointKind::DeploymentScoped
    }
}

/// Builds the outbound request URL for the given endpoint kind.
///
/// - `Generic`: the endpoint as-is, with `api-version` appended when it has no
///   query string.
/// - `DeploymentScoped`:
///   `<endpoint path>/openai/deployments/<deployment>/chat/completions?api-version=<v>`.
///   Any query or fragment on the endpoint is dropped.
pub fn build_request_url(
    endpoint: &Url,
    kind: EndpointKind,
    deployment_name: &str,
    api_version: &str,
) -> ChatResult<Url> {
    match kind {
        EndpointKind::Generic => {
            let has_query = endpoint.query().is_some_and(|q| !q.trim().is_empty());
            let mut url = endpoint.clone();
            if !has_query {
                url.set_query(None);
                url.query_pairs_mut().append_pair("api-version", api_version);
            }
            Ok(url)
        }
        EndpointKind::DeploymentScoped => {
            let mut url = endpoint.clone();
            url.set_query(None);
            url.set_fragment(None);
            url.path_segments_mut()
                .map_err(|_| ChatError::Config("endpoint cannot carry a path".into()))?
                .pop_if_empty()
                .extend([
                    "openai",
                    "deployments",
                    deployment_name.trim(),
                    "chat",
                    "completions",
                ]);
            url.query_pairs_mut().append_pair("api-version", api_version);
            Ok(url)
        }
    }
}
