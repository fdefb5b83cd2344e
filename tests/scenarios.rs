
use fixtures::{
    catalog_registry, kinds, render, Entity, Filter, HasAnnotation, IsEntityKind, PLUGIN_ID,
    RESOURCE_TYPE,
};
use ruleward::{
    AuthorizeQuery, Condition, ConditionFactory, ConditionalDecision, Criteria, PermissionPolicy,
    PolicyDecision, RuleError, RuleRegistry,
};
use serde_json::json;

#[test]
fn or_of_kinds_allows_components_and_templates() {
    let (registry, rules) = catalog_registry();
    let criteria = Criteria::any([
        Criteria::all([rules.is_entity_kind.bind(kinds(&["component"]))]),
        Criteria::all([rules.is_entity_kind.bind(kinds(&["template"]))]),
    ]);

    let template = Entity::new("template", "create-service");
    let component = Entity::new("component", "service-a");
    let api = Entity::new("api", "orders-api");
    assert!(registry.apply(&criteria, &template).unwrap());
    assert!(registry.apply(&criteria, &component).unwrap());
    assert!(!registry.apply(&criteria, &api).unwrap());
}

#[test]
fn lowering_or_of_kinds() {
    let (registry, rules) = catalog_registry();
    let criteria = Criteria::any([
        Criteria::all([rules.is_entity_kind.bind(kinds(&["component"]))]),
        Criteria::all([rules.is_entity_kind.bind(kinds(&["template"]))]),
    ]);

    let lowered = registry.to_query(&criteria).unwrap();
    assert_eq!(render(&lowered), r#"kind IN ("component") OR kind IN ("template")"#);
}

#[test]
fn lowering_keeps_nested_structure() {
    let (registry, rules) = catalog_registry();
    let criteria = Criteria::leaf(rules.is_entity_kind.bind(kinds(&["component"]))).and(
        Criteria::leaf(rules.is_component_type.bind(kinds(&["service"])))
            .or(rules.is_owner.bind(kinds(&["group:default/team-a"]))),
    );

    let lowered = registry.to_query(&criteria).unwrap();
    assert_eq!(
        render(&lowered),
        r#"kind IN ("component") AND (spec.type IN ("service") OR relations.ownedBy IN ("group:default/team-a"))"#
    );
}

#[test]
fn apply_and_lowering_agree_on_sample_entities() {
    let (registry, rules) = catalog_registry();
    let criteria = Criteria::any([
        Criteria::all([
            rules.is_entity_kind.bind(kinds(&["component"])),
            rules.is_component_type.bind(kinds(&["service"])),
        ]),
        Criteria::all([rules.is_owner.bind(kinds(&["group:default/platform"]))]),
    ]);
    let lowered = registry.to_query(&criteria).unwrap();

    for entity in fixtures::sample_entities().values() {
        let by_query = lowered.evaluate(|filter| match filter {
            Filter::In { key, values } => {
                let field = match key.as_str() {
                    "kind" => Some(entity.kind.clone()),
                    "spec.type" => entity.component_type.clone(),
                    "relations.ownedBy" => entity.owner.clone(),
                    other => panic!("unexpected key {other}"),
                };
                field.is_some_and(|field| values.contains(&field))
            }
            Filter::Exists { .. } => panic!("no annotation filters here"),
        });
        assert_eq!(
            registry.apply(&criteria, entity).unwrap(),
            by_query,
            "{}",
            entity.entity_ref()
        );
    }
}

#[test]
fn unknown_rule_is_an_error_in_both_interpretations() {
    let (registry, _) = catalog_registry();
    let criteria: Criteria<Condition> = serde_json::from_value(json!({
        "anyOf": [ { "allOf": [ { "rule": "NOPE", "params": [] } ] } ]
    }))
    .unwrap();

    let entity = Entity::new("component", "service-a");
    assert!(matches!(
        registry.apply(&criteria, &entity),
        Err(RuleError::UnknownRule { ref name }) if name == "NOPE"
    ));
    assert!(matches!(
        registry.to_query(&criteria),
        Err(RuleError::UnknownRule { ref name }) if name == "NOPE"
    ));
}

#[test]
fn wrong_param_type_is_invalid_params() {
    let (registry, _) = catalog_registry();
    let criteria: Criteria<Condition> = serde_json::from_value(json!({
        "anyOf": [ { "allOf": [ { "rule": "IS_ENTITY_KIND", "params": [42] } ] } ]
    }))
    .unwrap();

    let err = registry
        .apply(&criteria, &Entity::new("component", "a"))
        .unwrap_err();
    assert!(matches!(err, RuleError::InvalidParams { ref rule, .. } if rule == "IS_ENTITY_KIND"));
}

#[test]
fn extend_adds_rules_without_touching_base() {
    let (base, _) = catalog_registry();
    let (extended, has_annotation) = base.extend(|b| b.register(HasAnnotation)).unwrap();

    assert!(extended.contains("HAS_ANNOTATION"));
    assert!(!base.contains("HAS_ANNOTATION"));
    assert_eq!(extended.len(), base.len() + 1);

    let criteria = Criteria::leaf(has_annotation.bind(("backstage.io/techdocs-ref".to_owned(),)));
    let documented =
        Entity::new("component", "a").with_annotation("backstage.io/techdocs-ref", "dir:.");
    assert!(extended.apply(&criteria, &documented).unwrap());
    assert!(matches!(
        base.apply(&criteria, &documented),
        Err(RuleError::UnknownRule { .. })
    ));
}

#[test]
fn extend_rejects_name_clash() {
    let (base, _) = catalog_registry();
    let result = base.extend(|b| b.register(IsEntityKind));
    assert!(matches!(
        result,
        Err(RuleError::DuplicateRule { ref name }) if name == "IS_ENTITY_KIND"
    ));
}

#[test]
fn bound_condition_round_trips_through_json() {
    let factory = ConditionFactory::of(&IsEntityKind);
    let condition = factory.bind(kinds(&["component", "api"]));

    let wire = serde_json::to_value(&condition).unwrap();
    assert_eq!(wire, json!({ "rule": "IS_ENTITY_KIND", "params": [["component", "api"]] }));

    let back: Condition = serde_json::from_value(wire).unwrap();
    assert_eq!(back, condition);
    assert_eq!(back.rule(), "IS_ENTITY_KIND");
}

#[test]
fn descriptions_list_every_rule() {
    let (registry, _) = catalog_registry();
    let names: Vec<String> = registry.descriptions().into_iter().map(|d| d.name).collect();
    assert_eq!(names, ["IS_COMPONENT_TYPE", "IS_ENTITY_KIND", "IS_OWNER"]);
}

/// Anyone may read templates; owners may read their own components.
struct CatalogPolicy {
    registry: RuleRegistry<Entity, Filter>,
    is_entity_kind: ConditionFactory<IsEntityKind>,
    is_owner: ConditionFactory<fixtures::IsOwner>,
}

impl PermissionPolicy for CatalogPolicy {
    fn handle(&self, query: &AuthorizeQuery) -> PolicyDecision {
        if query.resource_type.as_deref() != Some(RESOURCE_TYPE) {
            return PolicyDecision::Deny;
        }
        if !query.is_read {
            return PolicyDecision::Deny;
        }
        let mut conditions = Criteria::leaf(self.is_entity_kind.bind(kinds(&["template"])));
        if let Some(principal) = &query.principal {
            conditions = conditions.or(self.is_owner.bind((vec![principal.clone()],)));
        }
        PolicyDecision::Conditional(ConditionalDecision {
            plugin_id: PLUGIN_ID.to_owned(),
            resource_type: RESOURCE_TYPE.to_owned(),
            conditions,
        })
    }
}

#[test]
fn policy_decisions_resolve_locally() {
    let (registry, rules) = catalog_registry();
    let policy = CatalogPolicy {
        registry: registry.clone(),
        is_entity_kind: rules.is_entity_kind,
        is_owner: rules.is_owner,
    };
    let query = AuthorizeQuery {
        permission: "catalog.entity.read".to_owned(),
        resource_type: Some(RESOURCE_TYPE.to_owned()),
        is_read: true,
        principal: Some("group:default/team-b".to_owned()),
    };

    let decision = policy.handle(&query);
    let entities = fixtures::sample_entities();
    let allowed = |entity_ref: &str| {
        decision.resolve_fail_closed(&policy.registry, &entities[entity_ref])
    };
    assert!(allowed("template:default/create-service"));
    assert!(allowed("component:default/website"));
    assert!(!allowed("component:default/service-a"));
    assert!(!allowed("api:default/orders-api"));

    let delete = AuthorizeQuery {
        is_read: false,
        ..query
    };
    assert_eq!(policy.handle(&delete), PolicyDecision::Deny);
}
