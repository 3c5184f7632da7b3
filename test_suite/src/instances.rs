#![cfg(test)]

use filterset::entity::{EntityDef, FieldType};
use filterset::filters::{AutoFilter, RelatedFilter};
use filterset::instance::{parse_query, FilterSet, InstanceError, InstanceOptions, SubsetMode};
use filterset::lookups::Lookup;
use filterset::mock::MemoryStore;
use filterset::schema::{SchemaBuilder, SchemaRegistry};
use serde_json::json;

use crate::fixtures::{self, ids};

#[test]
fn full_mode_materializes_every_filter() {
    let (registry, store) = fixtures::env();
    let schema = registry.schema("UserFilter").unwrap();

    let set = FilterSet::with_options(
        &registry,
        "UserFilter",
        parse_query(""),
        store.collection("user").unwrap(),
        InstanceOptions {
            subset: SubsetMode::Full { depth: 0 },
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(set.request_filters().count(), schema.len());
    // no parameters carry values, so nothing is filtered
    assert_eq!(ids(&set.apply()), vec![1, 2, 3]);
}

#[test]
fn full_mode_descends_to_the_requested_depth() {
    let (registry, store) = fixtures::env();

    let set = FilterSet::with_options(
        &registry,
        "PostFilter",
        parse_query(""),
        store.collection("post").unwrap(),
        InstanceOptions {
            subset: SubsetMode::Full { depth: 1 },
            ..Default::default()
        },
    )
    .unwrap();

    let (name, note_set) = set.related_filtersets().next().unwrap();
    assert_eq!(name, "note");
    let note_schema = registry.schema("NoteFilter").unwrap();
    assert_eq!(note_set.request_filters().count(), note_schema.len());

    // beyond the requested depth, nested instances subset normally
    let (name, author_set) = note_set.related_filtersets().next().unwrap();
    assert_eq!(name, "author");
    assert_eq!(author_set.request_filters().count(), 0);
}

#[test]
fn full_mode_still_compiles_from_parameters_only() {
    let (registry, store) = fixtures::env();
    let subsetted = FilterSet::new(
        &registry,
        "NoteFilter",
        parse_query("author__email__endswith=example.com"),
        store.collection("note").unwrap(),
    )
    .unwrap();
    let full = FilterSet::with_options(
        &registry,
        "NoteFilter",
        parse_query("author__email__endswith=example.com"),
        store.collection("note").unwrap(),
        InstanceOptions {
            subset: SubsetMode::Full { depth: 1 },
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(ids(&subsetted.apply()), ids(&full.apply()));
}

#[test]
fn circular_schema_references_resolve_lazily() {
    let mut registry = SchemaRegistry::new();
    registry
        .add_entity(
            EntityDef::new("alpha")
                .field("id", FieldType::Integer)
                .field("name", FieldType::Text)
                .relation("beta", "beta"),
        )
        .unwrap();
    registry
        .add_entity(
            EntityDef::new("beta")
                .field("id", FieldType::Integer)
                .field("title", FieldType::Text)
                .relation("alpha", "alpha"),
        )
        .unwrap();
    // AlphaFilter references BetaFilter before it exists, and the two
    // reference each other once both are registered
    registry
        .register(
            SchemaBuilder::new("AlphaFilter", "alpha")
                .auto(AutoFilter::new("name", "name").lookups([Lookup::Exact]))
                .related(RelatedFilter::new("beta", "beta", "BetaFilter")),
        )
        .unwrap();
    registry
        .register(
            SchemaBuilder::new("BetaFilter", "beta")
                .auto(AutoFilter::new("title", "title").lookups([Lookup::Exact]))
                .related(RelatedFilter::new("alpha", "alpha", "AlphaFilter")),
        )
        .unwrap();
    registry.verify().unwrap();

    let store = MemoryStore::builder()
        .entities_from(&registry)
        .rows(
            "alpha",
            vec![
                json!({"id": 1, "name": "x", "beta": 2}),
                json!({"id": 2, "name": "y", "beta": 3}),
            ],
        )
        .rows(
            "beta",
            vec![
                json!({"id": 2, "title": "t", "alpha": 1}),
                json!({"id": 3, "title": "u", "alpha": 2}),
            ],
        )
        .build();

    let set = FilterSet::new(
        &registry,
        "AlphaFilter",
        parse_query("beta__alpha__name=x"),
        store.collection("alpha").unwrap(),
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![1]);
}

#[test]
fn unknown_schema_identifiers_error_at_construction() {
    let (registry, store) = fixtures::env();
    let err = FilterSet::new(
        &registry,
        "MissingFilter",
        parse_query(""),
        store.collection("user").unwrap(),
    )
    .unwrap_err();
    assert!(matches!(err, InstanceError::UnknownSchema(_)));

    // a dangling related target surfaces the same way, lazily
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
    let store = MemoryStore::builder()
        .entities_from(&registry)
        .rows("note", vec![json!({"id": 1, "author": 1})])
        .build();

    // nothing references `author`: the dangling target is never touched
    let set = FilterSet::new(
        &registry,
        "NoteFilter",
        parse_query(""),
        store.collection("note").unwrap(),
    )
    .unwrap();
    assert_eq!(set.related_filtersets().count(), 0);

    let err = FilterSet::new(
        &registry,
        "NoteFilter",
        parse_query("author__email=x"),
        store.collection("note").unwrap(),
    )
    .unwrap_err();
    assert!(matches!(err, InstanceError::UnknownSchema(name) if name == "UserFilter"));
}

#[test]
fn naming_prefix_wraps_rendered_names() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::with_options(
        &registry,
        "UserFilter",
        parse_query(""),
        store.collection("user").unwrap(),
        InstanceOptions {
            form_prefix: Some("f".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(set.prefixed_name("email"), "f-email");
}
