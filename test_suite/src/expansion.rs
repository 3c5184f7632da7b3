#![cfg(test)]

use filterset::entity::{EntityDef, FieldType};
use filterset::filters::{AutoFilter, FilterDef, RelatedFilter};
use filterset::lookups::Lookup;
use filterset::schema::{SchemaBuilder, SchemaError, SchemaRegistry};

use crate::fixtures;

#[test]
fn auto_filter_expands_one_filter_per_lookup() {
    let registry = fixtures::registry();
    let schema = registry.schema("UserFilter").unwrap();

    // email declares three lookups
    assert!(schema.get("email").is_some());
    assert!(schema.get("email__contains").is_some());
    assert!(schema.get("email__endswith").is_some());
    assert!(schema.get("email__startswith").is_none());

    let f = schema.get("email__endswith").unwrap();
    assert_eq!(f.field_path(), "email");
    assert_eq!(f.lookup(), Lookup::EndsWith);
    assert!(!f.is_exclude());
}

#[test]
fn auto_filter_without_lookups_expands_all_supported() {
    let registry = fixtures::registry();
    let schema = registry.schema("UserFilter").unwrap();

    let age_filters: Vec<&str> = schema
        .filters()
        .map(|f| f.name())
        .filter(|n| *n == "age" || n.starts_with("age__"))
        .collect();
    let supported = Lookup::supported_for(FieldType::Integer);
    assert_eq!(age_filters.len(), supported.len());
    for lookup in supported {
        assert!(schema.get(&lookup.param_name("age")).is_some());
    }
}

#[test]
fn generated_names_substitute_the_declared_name() {
    let mut registry = SchemaRegistry::new();
    registry
        .add_entity(
            EntityDef::new("user")
                .field("id", FieldType::Integer)
                .field("email", FieldType::Text),
        )
        .unwrap();
    registry
        .add_entity(
            EntityDef::new("note")
                .field("id", FieldType::Integer)
                .relation("author", "user"),
        )
        .unwrap();
    registry
        .register(
            SchemaBuilder::new("NoteFilter", "note").auto(
                AutoFilter::new("author_email", "author__email")
                    .lookups([Lookup::Exact, Lookup::Contains]),
            ),
        )
        .unwrap();

    let schema = registry.schema("NoteFilter").unwrap();
    let f = schema.get("author_email").unwrap();
    assert_eq!(f.field_path(), "author__email");
    assert_eq!(f.lookup(), Lookup::Exact);
    let f = schema.get("author_email__contains").unwrap();
    assert_eq!(f.field_path(), "author__email");
    // nothing is exposed under the raw field path
    assert!(schema.get("author__email").is_none());
}

#[test]
fn auto_filter_itself_does_not_survive_expansion() {
    let mut registry = SchemaRegistry::new();
    registry
        .add_entity(
            EntityDef::new("user")
                .field("id", FieldType::Integer)
                .field("username", FieldType::Text),
        )
        .unwrap();
    registry
        .register(
            SchemaBuilder::new("UserFilter", "user")
                .auto(AutoFilter::new("username", "username").lookups([Lookup::Contains])),
        )
        .unwrap();

    let schema = registry.schema("UserFilter").unwrap();
    // no exact lookup was declared, so no bare `username` filter
    assert!(schema.get("username").is_none());
    assert!(schema.get("username__contains").is_some());
    assert_eq!(schema.len(), 1);
}

#[test]
fn related_filter_is_retained_and_expands_its_lookups() {
    let registry = fixtures::registry();
    let schema = registry.schema("NoteFilter").unwrap();

    assert!(schema.is_related("author"));
    let f = schema.get("author").unwrap();
    assert_eq!(f.field_path(), "author");
    assert_eq!(f.lookup(), Lookup::Exact);

    let f = schema.get("author__in").unwrap();
    assert_eq!(f.lookup(), Lookup::In);
    assert!(!schema.is_related("author__in"));

    let link = schema.related_link("author").unwrap();
    assert_eq!(link.field_path, "author");
    assert_eq!(link.target_schema, "UserFilter");
}

#[test]
fn related_entry_is_never_overwritten_by_generated_filters() {
    let mut registry = SchemaRegistry::new();
    registry
        .add_entity(EntityDef::new("user").field("id", FieldType::Integer))
        .unwrap();
    registry
        .add_entity(
            EntityDef::new("note")
                .field("id", FieldType::Integer)
                .relation("author", "user"),
        )
        .unwrap();
    // the auto filter would generate a filter named `author`; the
    // related entry declared first must win
    registry
        .register(
            SchemaBuilder::new("NoteFilter", "note")
                .related(RelatedFilter::new("author", "author", "UserFilter"))
                .auto(AutoFilter::new("author", "author").lookups([Lookup::Exact, Lookup::In])),
        )
        .unwrap();

    let schema = registry.schema("NoteFilter").unwrap();
    assert!(schema.is_related("author"));
    assert!(schema.get("author__in").is_some());
}

#[test]
fn expansion_is_order_independent_across_auto_filters() {
    let entities = || {
        let mut registry = SchemaRegistry::new();
        registry
            .add_entity(
                EntityDef::new("user")
                    .field("id", FieldType::Integer)
                    .field("username", FieldType::Text)
                    .field("email", FieldType::Text),
            )
            .unwrap();
        registry
    };

    let mut forward = entities();
    forward
        .register(
            SchemaBuilder::new("UserFilter", "user")
                .auto(AutoFilter::new("username", "username").lookups([Lookup::Exact]))
                .auto(AutoFilter::new("email", "email").lookups([Lookup::Exact])),
        )
        .unwrap();
    let mut reverse = entities();
    reverse
        .register(
            SchemaBuilder::new("UserFilter", "user")
                .auto(AutoFilter::new("email", "email").lookups([Lookup::Exact]))
                .auto(AutoFilter::new("username", "username").lookups([Lookup::Exact])),
        )
        .unwrap();

    let mut a: Vec<String> = forward
        .schema("UserFilter")
        .unwrap()
        .filters()
        .map(|f| f.name().to_string())
        .collect();
    let mut b: Vec<String> = reverse
        .schema("UserFilter")
        .unwrap()
        .filters()
        .map(|f| f.name().to_string())
        .collect();
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn unresolvable_field_path_is_a_definition_error() {
    let mut registry = SchemaRegistry::new();
    registry
        .add_entity(EntityDef::new("user").field("id", FieldType::Integer))
        .unwrap();
    let err = registry
        .register(
            SchemaBuilder::new("UserFilter", "user")
                .filter(FilterDef::new("nope", "nope", Lookup::Exact)),
        )
        .unwrap_err();
    assert!(matches!(err, SchemaError::NoField { .. }));
}

#[test]
fn unsupported_lookup_is_a_definition_error() {
    let mut registry = SchemaRegistry::new();
    registry
        .add_entity(
            EntityDef::new("user")
                .field("id", FieldType::Integer)
                .field("age", FieldType::Integer),
        )
        .unwrap();
    let err = registry
        .register(
            SchemaBuilder::new("UserFilter", "user")
                .auto(AutoFilter::new("age", "age").lookups([Lookup::Contains])),
        )
        .unwrap_err();
    assert!(matches!(err, SchemaError::UnsupportedLookup { .. }));
}

#[test]
fn related_filter_must_point_at_a_relation() {
    let mut registry = SchemaRegistry::new();
    registry
        .add_entity(
            EntityDef::new("user")
                .field("id", FieldType::Integer)
                .field("email", FieldType::Text),
        )
        .unwrap();
    let err = registry
        .register(
            SchemaBuilder::new("UserFilter", "user")
                .related(RelatedFilter::new("email", "email", "EmailFilter")),
        )
        .unwrap_err();
    assert!(matches!(err, SchemaError::NotARelation { .. }));
}

#[test]
fn duplicate_registrations_are_rejected() {
    let mut registry = SchemaRegistry::new();
    registry
        .add_entity(EntityDef::new("user").field("id", FieldType::Integer))
        .unwrap();
    let err = registry
        .add_entity(EntityDef::new("user"))
        .unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateEntity(_)));

    registry
        .register(SchemaBuilder::new("UserFilter", "user"))
        .unwrap();
    let err = registry
        .register(SchemaBuilder::new("UserFilter", "user"))
        .unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateSchema(_)));
}

#[test]
fn verify_reports_dangling_schema_references() {
    let mut registry = SchemaRegistry::new();
    registry
        .add_entity(EntityDef::new("user").field("id", FieldType::Integer))
        .unwrap();
    registry
        .add_entity(
            EntityDef::new("note")
                .field("id", FieldType::Integer)
                .relation("author", "user"),
        )
        .unwrap();
    registry
        .register(
            SchemaBuilder::new("NoteFilter", "note")
                .related(RelatedFilter::new("author", "author", "UserFilter")),
        )
        .unwrap();

    // forward reference: registration succeeds, verify flags it
    let err = registry.verify().unwrap_err();
    assert!(matches!(err, SchemaError::UnknownSchemaRef { .. }));

    registry
        .register(SchemaBuilder::new("UserFilter", "user"))
        .unwrap();
    registry.verify().unwrap();
}
