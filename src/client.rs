//! Decision-maker side of the resolution protocol.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{
    ApplyConditionsRequest, ApplyConditionsResponse, ConditionalDecision, ErrorResponse,
    PolicyDecision, ResolveFiltersRequest, APPLY_CONDITIONS_PATH, RESOLVE_FILTERS_PATH,
};
use crate::Criteria;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}: {message}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        /// Error code from the response envelope, when there was one.
        code: Option<String>,
        message: String,
    },

    #[error("invalid response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Sends conditional decisions to the integration that owns the resource.
#[derive(Debug, Clone)]
pub struct ResolutionClient {
    http: reqwest::Client,
    base_url: String,
}

impl ResolutionClient {
    /// `base_url` is the integration's root, e.g. `http://catalog:7007`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    #[must_use]
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http, base_url }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask whether the referenced resource satisfies `decision`.
    ///
    /// # Errors
    ///
    /// Any transport failure, non-2xx answer or undecodable body.
    pub async fn apply_conditions(
        &self,
        resource_ref: &str,
        decision: &ConditionalDecision,
    ) -> Result<bool, ClientError> {
        let request = ApplyConditionsRequest {
            resource_ref: resource_ref.to_owned(),
            resource_type: decision.resource_type.clone(),
            conditions: decision.conditions.clone(),
        };
        let response: ApplyConditionsResponse = self.post(APPLY_CONDITIONS_PATH, &request).await?;
        Ok(response.allowed)
    }

    /// Ask the owner to lower `decision` into its query type.
    ///
    /// # Errors
    ///
    /// Any transport failure, non-2xx answer or undecodable body.
    pub async fn resolve_filters<Q: DeserializeOwned>(
        &self,
        decision: &ConditionalDecision,
    ) -> Result<Criteria<Q>, ClientError> {
        let request = ResolveFiltersRequest {
            resource_ref: None,
            resource_type: decision.resource_type.clone(),
            filters: decision.conditions.clone(),
        };
        self.post(RESOLVE_FILTERS_PATH, &request).await
    }

    /// Settle `decision` for one resource, denying on any failure.
    pub async fn is_allowed(&self, resource_ref: &str, decision: &PolicyDecision) -> bool {
        match decision {
            PolicyDecision::Allow => true,
            PolicyDecision::Deny => false,
            PolicyDecision::Conditional(conditional) => {
                match self.apply_conditions(resource_ref, conditional).await {
                    Ok(allowed) => allowed,
                    Err(err) => {
                        warn!(
                            resource_ref,
                            plugin_id = %conditional.plugin_id,
                            error = %err,
                            "conditional decision failed, denying"
                        );
                        false
                    }
                }
            }
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let transport = |source| ClientError::Transport {
            url: url.clone(),
            source,
        };

        let response = self.http.post(&url).json(body).send().await.map_err(transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport)?;
        debug!(%url, status = status.as_u16(), "resolution response");

        if !status.is_success() {
            let (code, message) = match serde_json::from_slice::<ErrorResponse>(&bytes) {
                Ok(envelope) => (Some(envelope.error.code), envelope.error.message),
                Err(_) => (None, String::from_utf8_lossy(&bytes).into_owned()),
            };
            return Err(ClientError::UnexpectedStatus {
                url,
                status: status.as_u16(),
                code,
                message,
            });
        }

        serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode { url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed() {
        assert_eq!(ResolutionClient::new("http://catalog:7007//").base_url(), "http://catalog:7007");
    }

    #[tokio::test]
    async fn plain_decisions_skip_the_network() {
        let client = ResolutionClient::new("http://127.0.0.1:1");
        assert!(client.is_allowed("component:default/a", &PolicyDecision::Allow).await);
        assert!(!client.is_allowed("component:default/a", &PolicyDecision::Deny).await);
    }

    #[tokio::test]
    async fn unreachable_owner_denies() {
        let client = ResolutionClient::new("http://127.0.0.1:1");
        let decision = PolicyDecision::Conditional(ConditionalDecision {
            plugin_id: "catalog".into(),
            resource_type: "catalog-entity".into(),
            conditions: Criteria::All(vec![]),
        });
        assert!(!client.is_allowed("component:default/a", &decision).await);
    }
}
