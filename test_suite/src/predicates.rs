#![cfg(test)]

//! Low-level checks of predicate evaluation against the in-memory
//! backend, below the filter-set machinery.

use filterset::lookups::Lookup;
use filterset::queryable::{Predicate, Queryable, SetCombinable};

use crate::fixtures::{self, ids};

fn predicate(field_path: &str, lookup: Lookup, value: &str) -> Predicate {
    Predicate {
        field_path: field_path.to_string(),
        lookup,
        value: value.to_string(),
        exclude: false,
    }
}

#[test]
fn direct_predicates() {
    let (_, store) = fixtures::env();
    let users = store.collection("user").unwrap();

    assert_eq!(
        ids(&users.filter(&predicate("username", Lookup::Exact, "bob"))),
        vec![2]
    );
    assert_eq!(
        ids(&users.filter(&predicate("username", Lookup::IContains, "ALI"))),
        vec![1]
    );
    assert_eq!(
        ids(&users.filter(&predicate("age", Lookup::Lte, "30"))),
        vec![1, 2]
    );
    assert_eq!(
        ids(&users.filter(&predicate("joined", Lookup::Lt, "2020-06-01T00:00:00Z"))),
        vec![1, 3]
    );
}

#[test]
fn exclusion_inverts_the_predicate() {
    let (_, store) = fixtures::env();
    let users = store.collection("user").unwrap();

    let mut p = predicate("username", Lookup::Exact, "bob");
    p.exclude = true;
    assert_eq!(ids(&users.filter(&p)), vec![1, 3]);
}

#[test]
fn predicates_traverse_relations() {
    let (_, store) = fixtures::env();
    let notes = store.collection("note").unwrap();

    assert_eq!(
        ids(&notes.filter(&predicate("author__username", Lookup::Exact, "alice"))),
        vec![10]
    );
    // a null relation never matches a value predicate
    assert_eq!(
        ids(&notes.filter(&predicate("author__age", Lookup::Gte, "0"))),
        vec![10, 11]
    );
}

#[test]
fn unevaluable_rows_are_dropped() {
    let (_, store) = fixtures::env();
    let users = store.collection("user").unwrap();
    // an unparseable right-hand side matches nothing rather than
    // erroring; proper rejection is validation's job
    assert!(users.filter(&predicate("age", Lookup::Lt, "abc")).is_empty());
}

#[test]
fn projection_and_containment() {
    let (_, store) = fixtures::env();
    let users = store.collection("user").unwrap();
    let notes = store.collection("note").unwrap();

    let selection = users
        .filter(&predicate("email", Lookup::EndsWith, "example.com"))
        .value_projection("id");
    assert_eq!(ids(&notes.containment("author", selection)), vec![10, 11]);
}

#[test]
fn related_collections_come_from_the_store() {
    let (_, store) = fixtures::env();
    let posts = store.collection("post").unwrap();

    let notes = posts.related_collection("note");
    assert_eq!(notes.entity().name(), "note");
    assert_eq!(notes.len(), 3);

    let authors = posts.related_collection("note__author");
    assert_eq!(authors.entity().name(), "user");
    assert_eq!(authors.len(), 3);
}

#[test]
fn set_combination() {
    let (_, store) = fixtures::env();
    let users = store.collection("user").unwrap();

    let a = users.filter(&predicate("age", Lookup::Gte, "30"));
    let b = users.filter(&predicate("email", Lookup::EndsWith, "example.com"));

    assert_eq!(ids(&a.clone().and(b.clone())), vec![1]);
    let mut union = ids(&a.clone().or(b));
    union.sort();
    assert_eq!(union, vec![1, 2, 3]);
    assert_eq!(ids(&a.negate()), vec![2]);
}
