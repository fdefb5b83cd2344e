//! Serves a tiny in-memory catalog over the resolution protocol.
//!
//! ```text
//! cargo run --example catalog_server -- [settings.toml]
//! curl -s localhost:7007/permissions/apply-conditions -H 'content-type: application/json' -d '{
//!   "resourceRef": "template:default/create-service",
//!   "resourceType": "catalog-entity",
//!   "conditions": { "anyOf": [ { "allOf": [ { "rule": "IS_ENTITY_KIND", "params": [["template"]] } ] } ] }
//! }'
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ruleward::{server, telemetry, PermissionIntegration, PermissionRule, RuleRegistry, Settings};
use serde_json::{json, Value};
use tracing::info;

struct IsEntityKind;

impl PermissionRule for IsEntityKind {
    type Resource = Value;
    type Query = Value;
    type Params = (Vec<String>,);

    fn name(&self) -> &str {
        "IS_ENTITY_KIND"
    }

    fn description(&self) -> &str {
        "Allow entities of one of the given kinds"
    }

    fn apply(&self, entity: &Value, (kinds,): &(Vec<String>,)) -> bool {
        entity["kind"]
            .as_str()
            .is_some_and(|kind| kinds.iter().any(|k| k.eq_ignore_ascii_case(kind)))
    }

    fn to_query(&self, (kinds,): &(Vec<String>,)) -> Value {
        json!({ "key": "kind", "values": kinds })
    }
}

fn entities() -> HashMap<String, Value> {
    [
        ("component:default/service-a", json!({ "kind": "component", "name": "service-a" })),
        ("template:default/create-service", json!({ "kind": "template", "name": "create-service" })),
        ("api:default/orders-api", json!({ "kind": "api", "name": "orders-api" })),
    ]
    .into_iter()
    .map(|(entity_ref, entity)| (entity_ref.to_owned(), entity))
    .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(path.as_deref())?;
    telemetry::init(&settings.log)?;

    let registry = RuleRegistry::builder().with_rule(IsEntityKind)?.build();
    info!(rules = ?registry.rule_names(), "rules registered");

    let integration = PermissionIntegration::from_settings(
        &settings.integration,
        Arc::new(registry),
        Arc::new(entities()),
    );
    server::serve(Arc::new(integration).router(), &settings.server).await
}
