#![cfg(test)]

//! Shared fixtures: a registry of users, notes, posts and pages, and a
//! memory store populated with a small dataset.

use filterset::entity::{EntityDef, FieldType};
use filterset::filters::{AutoFilter, FilterDef, RelatedFilter};
use filterset::lookups::Lookup;
use filterset::mock::MemoryStore;
use filterset::schema::{SchemaBuilder, SchemaRegistry};
use serde_json::json;

pub fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();

    registry
        .add_entity(
            EntityDef::new("user")
                .field("id", FieldType::Integer)
                .field("username", FieldType::Text)
                .field("email", FieldType::Text)
                .field("age", FieldType::Integer)
                .field("active", FieldType::Boolean)
                .field("joined", FieldType::DateTime),
        )
        .unwrap();
    registry
        .add_entity(
            EntityDef::new("note")
                .field("id", FieldType::Integer)
                .field("title", FieldType::Text)
                .field("content", FieldType::Text)
                .relation("author", "user"),
        )
        .unwrap();
    registry
        .add_entity(
            EntityDef::new("post")
                .field("id", FieldType::Integer)
                .field("published", FieldType::DateTime)
                .relation("note", "note"),
        )
        .unwrap();
    registry
        .add_entity(
            EntityDef::new("page")
                .field("id", FieldType::Integer)
                .field("title", FieldType::Text)
                .relation("note", "note")
                .relation("note_author", "user"),
        )
        .unwrap();

    registry
        .register(
            SchemaBuilder::new("UserFilter", "user")
                .auto(
                    AutoFilter::new("username", "username")
                        .lookups([Lookup::Exact, Lookup::Contains, Lookup::In, Lookup::Regex]),
                )
                .auto(
                    AutoFilter::new("email", "email")
                        .lookups([Lookup::Exact, Lookup::Contains, Lookup::EndsWith]),
                )
                .auto(AutoFilter::new("age", "age"))
                .filter(FilterDef::new("active", "active", Lookup::Exact))
                .auto(AutoFilter::new("joined", "joined").lookups([Lookup::Exact, Lookup::Lt])),
        )
        .unwrap();
    registry
        .register(
            SchemaBuilder::new("NoteFilter", "note")
                .auto(
                    AutoFilter::new("title", "title")
                        .lookups([Lookup::Exact, Lookup::Contains, Lookup::StartsWith]),
                )
                .related(
                    RelatedFilter::new("author", "author", "UserFilter")
                        .lookups([Lookup::In, Lookup::IsNull]),
                ),
        )
        .unwrap();
    registry
        .register(
            SchemaBuilder::new("PostFilter", "post")
                .auto(
                    AutoFilter::new("published", "published")
                        .lookups([Lookup::Exact, Lookup::Lt, Lookup::Gt]),
                )
                .related(RelatedFilter::new("note", "note", "NoteFilter")),
        )
        .unwrap();
    registry
        .register(
            SchemaBuilder::new("PageFilter", "page")
                .auto(AutoFilter::new("title", "title").lookups([Lookup::Exact]))
                .related(RelatedFilter::new("note", "note", "NoteFilter"))
                .related(RelatedFilter::new("note_author", "note_author", "UserFilter")),
        )
        .unwrap();

    registry.verify().unwrap();
    registry
}

pub fn store(registry: &SchemaRegistry) -> MemoryStore {
    MemoryStore::builder()
        .entities_from(registry)
        .rows(
            "user",
            vec![
                json!({
                    "id": 1, "username": "alice", "email": "alice@example.com",
                    "age": 30, "active": true, "joined": "2020-01-01T00:00:00Z"
                }),
                json!({
                    "id": 2, "username": "bob", "email": "bob@example.com",
                    "age": 25, "active": true, "joined": "2021-06-15T12:00:00Z"
                }),
                json!({
                    "id": 3, "username": "carol", "email": "carol@other.org",
                    "age": 35, "active": false, "joined": "2019-03-10T08:30:00Z"
                }),
            ],
        )
        .rows(
            "note",
            vec![
                json!({"id": 10, "title": "meeting notes", "content": "alpha", "author": 1}),
                json!({"id": 11, "title": "todo list", "content": "beta", "author": 2}),
                json!({"id": 12, "title": "scratch", "content": "gamma", "author": null}),
            ],
        )
        .rows(
            "post",
            vec![
                json!({"id": 100, "note": 10, "published": "2022-01-01T00:00:00Z"}),
                json!({"id": 101, "note": 11, "published": "2023-01-01T00:00:00Z"}),
                json!({"id": 102, "note": 12, "published": "2024-01-01T00:00:00Z"}),
            ],
        )
        .rows(
            "page",
            vec![
                json!({"id": 200, "title": "home", "note": 10, "note_author": 3}),
                json!({"id": 201, "title": "about", "note": 11, "note_author": 1}),
            ],
        )
        .build()
}

pub fn env() -> (SchemaRegistry, MemoryStore) {
    let registry = registry();
    let store = store(&registry);
    (registry, store)
}

/// Row ids of a filtered collection, for easy assertions.
pub fn ids(collection: &filterset::mock::MemoryCollection) -> Vec<i64> {
    collection
        .rows()
        .iter()
        .filter_map(|r| r.get("id").and_then(|v| v.as_i64()))
        .collect()
}
