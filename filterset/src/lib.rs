//! # Declarative request-driven filtering over relational collections
//!
//! This crate turns a flat set of request parameters into a composable
//! predicate tree over a relational data store, including traversal
//! across entity relationships and negation of individual conditions.
//!
//! The request parameter grammar is the Django one. The simplest form
//! is `name=value`, meaning: apply the filter declared under `name`
//! with its implied lookup operator. A lookup can be chosen explicitly
//! with `name__lookup=value`, as in `email__endswith=example.com`. A
//! trailing `!` on the name requests the negated counterpart
//! (`email__endswith!=example.com` excludes instead of includes), and
//! both forms may coexist in one request. Finally, a parameter may
//! traverse into a related entity's own filter schema:
//! `author__email__endswith=example.com` filters the base collection
//! to rows whose `author` is contained in the related collection
//! filtered by `email__endswith`. Relation paths nest arbitrarily
//! deep using the same `__` separator.
//!
//! ## Overview
//!
//! Schemas are declared with a [`SchemaBuilder`](schema::SchemaBuilder)
//! and registered in a [`SchemaRegistry`](schema::SchemaRegistry),
//! which expands declarations (notably [`AutoFilter`](filters::AutoFilter),
//! which becomes one concrete filter per lookup) exactly once into an
//! immutable [`FilterSchema`](schema::FilterSchema). All configuration
//! mistakes — unresolvable field paths, unsupported lookups — surface
//! at registration, before any request is served.
//!
//! Per request, a [`FilterSet`](instance::FilterSet) materializes just
//! the filters the parameters reference, synthesizes negated copies
//! for `!`-marked parameters, recursively instantiates nested sets for
//! related filters, and compiles the tree against anything
//! implementing [`Queryable`](queryable::Queryable): direct predicates
//! for local filters, correlated sub-selections for related ones.
//!
//! ```rust
//! use filterset::entity::{EntityDef, FieldType};
//! use filterset::filters::{AutoFilter, RelatedFilter};
//! use filterset::instance::{parse_query, FilterSet};
//! use filterset::lookups::Lookup;
//! use filterset::mock::MemoryStore;
//! use filterset::schema::{SchemaBuilder, SchemaRegistry};
//! use serde_json::json;
//!
//! let mut registry = SchemaRegistry::new();
//! registry
//!     .add_entity(
//!         EntityDef::new("user")
//!             .field("id", FieldType::Integer)
//!             .field("email", FieldType::Text),
//!     )
//!     .unwrap();
//! registry
//!     .add_entity(
//!         EntityDef::new("note")
//!             .field("id", FieldType::Integer)
//!             .field("title", FieldType::Text)
//!             .relation("author", "user"),
//!     )
//!     .unwrap();
//! registry
//!     .register(
//!         SchemaBuilder::new("UserFilter", "user")
//!             .auto(AutoFilter::new("email", "email").lookups([Lookup::Exact, Lookup::EndsWith])),
//!     )
//!     .unwrap();
//! registry
//!     .register(
//!         SchemaBuilder::new("NoteFilter", "note")
//!             .auto(AutoFilter::new("title", "title").lookups([Lookup::Exact, Lookup::Contains]))
//!             .related(RelatedFilter::new("author", "author", "UserFilter")),
//!     )
//!     .unwrap();
//!
//! let store = MemoryStore::builder()
//!     .entities_from(&registry)
//!     .rows("user", vec![
//!         json!({"id": 1, "email": "alice@example.com"}),
//!         json!({"id": 2, "email": "bob@elsewhere.net"}),
//!     ])
//!     .rows("note", vec![
//!         json!({"id": 10, "title": "meeting notes", "author": 1}),
//!         json!({"id": 11, "title": "shopping list", "author": 2}),
//!     ])
//!     .build();
//!
//! let params = parse_query("author__email__endswith=example.com");
//! let set = FilterSet::new(&registry, "NoteFilter", params, store.collection("note").unwrap())
//!     .unwrap();
//! let result = set.apply();
//! assert_eq!(result.len(), 1);
//! assert_eq!(result.rows()[0]["id"], 10);
//! ```
//!
//! Unknown parameters never error; they are simply ignored, which is
//! what lets one query string address several collaborating schemas.
//! Value validation is separate from compilation — see
//! [`FilterSet::validate`](instance::FilterSet::validate) — so a
//! deployment can choose between strict input checking and best-effort
//! filtering.

pub mod complex;
pub mod entity;
pub mod filters;
pub mod instance;
pub mod lookups;
pub mod mock;
pub mod queryable;
pub mod schema;
pub mod validation;

pub use crate::entity::{EntityDef, FieldType};
pub use crate::filters::{AutoFilter, FilterDef, RelatedFilter};
pub use crate::instance::{
    parse_query, FilterSet, InstanceError, InstanceOptions, Params, SubsetMode,
};
pub use crate::lookups::Lookup;
pub use crate::queryable::{Predicate, Queryable, SetCombinable};
pub use crate::schema::{FilterSchema, SchemaBuilder, SchemaError, SchemaRegistry};
pub use crate::validation::ValidationErrors;
