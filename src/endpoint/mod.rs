//! Resource-owner side of the resolution protocol.
//!
//! A [`PermissionIntegration`] answers criteria handed over by a policy: it
//! either evaluates them against one fetched resource or lowers them into the
//! owner's query type.

mod error;
mod fetch;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

pub use error::ResolutionError;
pub use fetch::ResourceFetcher;

use crate::settings::IntegrationSettings;
use crate::types::{
    ApplyConditionsRequest, ApplyConditionsResponse, ConditionalDecision, ResolveFiltersRequest,
    APPLY_CONDITIONS_PATH, RESOLVE_FILTERS_PATH,
};
use crate::{Condition, Criteria, RuleRegistry};

/// Serves the apply-conditions and resolve-filters operations for one
/// resource type.
pub struct PermissionIntegration<R, Q> {
    plugin_id: String,
    resource_type: String,
    registry: Arc<RuleRegistry<R, Q>>,
    fetcher: Arc<dyn ResourceFetcher<R>>,
}

impl<R, Q> PermissionIntegration<R, Q>
where
    R: Send + Sync + 'static,
    Q: Serialize + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(
        plugin_id: impl Into<String>,
        resource_type: impl Into<String>,
        registry: Arc<RuleRegistry<R, Q>>,
        fetcher: Arc<dyn ResourceFetcher<R>>,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            resource_type: resource_type.into(),
            registry,
            fetcher,
        }
    }

    #[must_use]
    pub fn from_settings(
        settings: &IntegrationSettings,
        registry: Arc<RuleRegistry<R, Q>>,
        fetcher: Arc<dyn ResourceFetcher<R>>,
    ) -> Self {
        Self::new(
            settings.plugin_id.clone(),
            settings.resource_type.clone(),
            registry,
            fetcher,
        )
    }

    #[must_use]
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    #[must_use]
    pub fn registry(&self) -> &RuleRegistry<R, Q> {
        &self.registry
    }

    /// Wrap criteria into a decision addressed to this integration.
    #[must_use]
    pub fn create_conditions(&self, conditions: Criteria<Condition>) -> ConditionalDecision {
        ConditionalDecision {
            plugin_id: self.plugin_id.clone(),
            resource_type: self.resource_type.clone(),
            conditions,
        }
    }

    fn check_resource_type(&self, actual: &str) -> Result<(), ResolutionError> {
        if actual == self.resource_type {
            Ok(())
        } else {
            Err(ResolutionError::ResourceTypeMismatch {
                expected: self.resource_type.clone(),
                actual: actual.to_owned(),
            })
        }
    }

    async fn fetch(&self, resource_ref: &str) -> Result<R, ResolutionError> {
        self.fetcher
            .fetch(resource_ref)
            .await
            .map_err(ResolutionError::FetchFailed)?
            .ok_or_else(|| ResolutionError::ResourceNotFound {
                resource_ref: resource_ref.to_owned(),
            })
    }

    /// Evaluate the request's criteria against the referenced resource.
    ///
    /// Criteria are validated before the resource is fetched, so an unknown
    /// rule or bad params are reported even for resources that do not exist.
    ///
    /// # Errors
    ///
    /// See [`ResolutionError`]; no error is ever reported as `allowed`.
    #[instrument(
        skip_all,
        fields(plugin_id = %self.plugin_id, resource_ref = %request.resource_ref)
    )]
    pub async fn apply_conditions(
        &self,
        request: &ApplyConditionsRequest,
    ) -> Result<ApplyConditionsResponse, ResolutionError> {
        self.check_resource_type(&request.resource_type)?;
        self.registry.validate(&request.conditions)?;
        let resource = self.fetch(&request.resource_ref).await?;
        let allowed = self.registry.apply(&request.conditions, &resource)?;
        debug!(allowed, "applied conditions");
        Ok(ApplyConditionsResponse { allowed })
    }

    /// Lower the request's filters into query fragments.
    ///
    /// # Errors
    ///
    /// See [`ResolutionError`].
    #[instrument(
        skip_all,
        fields(plugin_id = %self.plugin_id, resource_ref = ?request.resource_ref)
    )]
    pub async fn resolve_filters(
        &self,
        request: &ResolveFiltersRequest,
    ) -> Result<Criteria<Q>, ResolutionError> {
        self.check_resource_type(&request.resource_type)?;
        self.registry.validate(&request.filters)?;
        if let Some(resource_ref) = &request.resource_ref {
            self.fetch(resource_ref).await?;
        }
        let lowered = self.registry.to_query(&request.filters)?;
        debug!(leaves = lowered.leaves().len(), "resolved filters");
        Ok(lowered)
    }

    /// Routes for both operations, sharing this integration.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route(APPLY_CONDITIONS_PATH, post(apply_conditions_handler::<R, Q>))
            .route(RESOLVE_FILTERS_PATH, post(resolve_filters_handler::<R, Q>))
            .with_state(self)
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ResolutionError> {
    serde_json::from_slice(body).map_err(|err| ResolutionError::MalformedCriteria(err.to_string()))
}

async fn apply_conditions_handler<R, Q>(
    State(integration): State<Arc<PermissionIntegration<R, Q>>>,
    body: Bytes,
) -> Result<Json<ApplyConditionsResponse>, ResolutionError>
where
    R: Send + Sync + 'static,
    Q: Serialize + Send + Sync + 'static,
{
    let request: ApplyConditionsRequest = parse_body(&body)?;
    integration.apply_conditions(&request).await.map(Json)
}

async fn resolve_filters_handler<R, Q>(
    State(integration): State<Arc<PermissionIntegration<R, Q>>>,
    body: Bytes,
) -> Result<Json<Criteria<Q>>, ResolutionError>
where
    R: Send + Sync + 'static,
    Q: Serialize + Send + Sync + 'static,
{
    let request: ResolveFiltersRequest = parse_body(&body)?;
    integration.resolve_filters(&request).await.map(Json)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{ConditionFactory, PermissionRule, RuleError};

    struct IsKind;

    impl PermissionRule for IsKind {
        type Resource = String;
        type Query = String;
        type Params = (Vec<String>,);

        fn name(&self) -> &str {
            "IS_KIND"
        }

        fn description(&self) -> &str {
            "Allow resources of the given kinds"
        }

        fn apply(&self, kind: &String, (kinds,): &(Vec<String>,)) -> bool {
            kinds.contains(kind)
        }

        fn to_query(&self, (kinds,): &(Vec<String>,)) -> String {
            format!("kind IN {kinds:?}")
        }
    }

    fn integration() -> (PermissionIntegration<String, String>, ConditionFactory<IsKind>) {
        let mut builder = RuleRegistry::builder();
        let is_kind = builder.register(IsKind).unwrap();
        let resources = HashMap::from([("template:default/a".to_owned(), "template".to_owned())]);
        let integration = PermissionIntegration::new(
            "catalog",
            "catalog-entity",
            Arc::new(builder.build()),
            Arc::new(resources),
        );
        (integration, is_kind)
    }

    fn apply_request(resource_ref: &str, conditions: Criteria<Condition>) -> ApplyConditionsRequest {
        ApplyConditionsRequest {
            resource_ref: resource_ref.into(),
            resource_type: "catalog-entity".into(),
            conditions,
        }
    }

    #[tokio::test]
    async fn apply_existing_resource() {
        let (integration, is_kind) = integration();
        let allow = Criteria::leaf(is_kind.bind((vec!["template".into()],)));
        let response = integration
            .apply_conditions(&apply_request("template:default/a", allow))
            .await
            .unwrap();
        assert!(response.allowed);
    }

    #[tokio::test]
    async fn apply_missing_resource_is_not_found() {
        let (integration, is_kind) = integration();
        let allow = Criteria::leaf(is_kind.bind((vec!["template".into()],)));
        let err = integration
            .apply_conditions(&apply_request("template:default/missing", allow))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn apply_wrong_resource_type() {
        let (integration, is_kind) = integration();
        let mut request = apply_request(
            "template:default/a",
            Criteria::leaf(is_kind.bind((vec!["template".into()],))),
        );
        request.resource_type = "scaffolder-template".into();
        let err = integration.apply_conditions(&request).await.unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::ResourceTypeMismatch { ref actual, .. } if actual == "scaffolder-template"
        ));
    }

    #[tokio::test]
    async fn apply_unknown_rule_is_rule_error() {
        let (integration, _) = integration();
        let conditions = Criteria::<Condition>::from_dsl("NOPE()").unwrap();
        let err = integration
            .apply_conditions(&apply_request("template:default/a", conditions))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Rule(RuleError::UnknownRule { .. })));
    }

    #[tokio::test]
    async fn resolve_without_ref_skips_fetch() {
        let (integration, is_kind) = integration();
        let request = ResolveFiltersRequest {
            resource_ref: None,
            resource_type: "catalog-entity".into(),
            filters: Criteria::leaf(is_kind.bind((vec!["api".into()],))),
        };
        let lowered = integration.resolve_filters(&request).await.unwrap();
        assert_eq!(lowered, Criteria::Leaf(r#"kind IN ["api"]"#.to_owned()));
    }

    #[tokio::test]
    async fn resolve_with_missing_ref_is_not_found() {
        let (integration, is_kind) = integration();
        let request = ResolveFiltersRequest {
            resource_ref: Some("template:default/missing".into()),
            resource_type: "catalog-entity".into(),
            filters: Criteria::leaf(is_kind.bind((vec!["api".into()],))),
        };
        let err = integration.resolve_filters(&request).await.unwrap_err();
        assert!(matches!(err, ResolutionError::ResourceNotFound { .. }));
    }

    #[test]
    fn create_conditions_envelope() {
        let (integration, is_kind) = integration();
        let decision = integration.create_conditions(Criteria::leaf(is_kind.bind((vec![],))));
        assert_eq!(decision.plugin_id, "catalog");
        assert_eq!(decision.resource_type, "catalog-entity");
        assert_eq!(decision.conditions.leaves().len(), 1);
    }
}
