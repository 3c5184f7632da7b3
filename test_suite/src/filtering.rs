#![cfg(test)]

use filterset::instance::{parse_query, FilterSet};

use crate::fixtures::{self, ids};

#[test_log::test]
fn exact_match_with_the_implied_lookup() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("username=alice"),
        store.collection("user").unwrap(),
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![1]);
}

#[test]
fn explicit_lookups_apply() {
    let (registry, store) = fixtures::env();
    let users = store.collection("user").unwrap();

    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("email__contains=example"),
        users.clone(),
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![1, 2]);

    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("username__in=alice,carol"),
        users.clone(),
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![1, 3]);

    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("username__regex=^a"),
        users.clone(),
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![1]);

    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("age__gte=30"),
        users.clone(),
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![1, 3]);

    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("active=false"),
        users,
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![3]);
}

#[test]
fn datetime_comparisons() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "PostFilter",
        parse_query("published__gt=2022-06-01T00:00:00Z"),
        store.collection("post").unwrap(),
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![101, 102]);
}

#[test]
fn positive_and_negated_conditions_coexist() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("email__contains=@&email__endswith!=example.com"),
        store.collection("user").unwrap(),
    )
    .unwrap();

    // both entries are active, keyed independently
    let names: Vec<&str> = set.request_filters().map(|(n, _)| n).collect();
    assert!(names.contains(&"email__endswith"));
    assert!(names.contains(&"email__endswith!"));
    assert!(names.contains(&"email__contains"));

    assert_eq!(ids(&set.apply()), vec![3]);

    // the shared declaration is untouched
    let schema = registry.schema("UserFilter").unwrap();
    assert!(!schema.get("email__endswith").unwrap().is_exclude());
}

#[test]
fn negation_alone_excludes() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("username=alice&username!=alice"),
        store.collection("user").unwrap(),
    )
    .unwrap();
    // a=alice and not a=alice is unsatisfiable
    assert!(set.apply().is_empty());
}

#[test_log::test]
fn related_parameters_compile_to_a_containment_subquery() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "NoteFilter",
        parse_query("author__email__endswith=example.com"),
        store.collection("note").unwrap(),
    )
    .unwrap();

    // the nested instance sees the parameter with its prefix stripped
    let (name, nested) = set.related_filtersets().next().unwrap();
    assert_eq!(name, "author");
    let nested_names: Vec<&str> = nested.request_filters().map(|(n, _)| n).collect();
    assert_eq!(nested_names, vec!["email__endswith"]);

    assert_eq!(ids(&set.apply()), vec![10, 11]);
}

#[test]
fn doubly_nested_relations() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "PostFilter",
        parse_query("note__author__username=alice"),
        store.collection("post").unwrap(),
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![100]);
}

#[test]
fn related_filter_without_scoped_parameters_is_inert() {
    let (registry, store) = fixtures::env();
    let notes = store.collection("note").unwrap();

    // nothing references `author`: no nested instance at all
    let set = FilterSet::new(
        &registry,
        "NoteFilter",
        parse_query("title__contains=meeting"),
        notes.clone(),
    )
    .unwrap();
    assert_eq!(set.related_filtersets().count(), 0);
    assert_eq!(ids(&set.apply()), vec![10]);

    // a direct key value activates the related filter but not the
    // subquery; the nested instance stays empty
    let set = FilterSet::new(&registry, "NoteFilter", parse_query("author=1"), notes).unwrap();
    let (_, nested) = set.related_filtersets().next().unwrap();
    assert_eq!(nested.request_filters().count(), 0);
    assert_eq!(ids(&set.apply()), vec![10]);
}

#[test]
fn related_key_filters_and_their_negation() {
    let (registry, store) = fixtures::env();
    let notes = store.collection("note").unwrap();

    let set = FilterSet::new(
        &registry,
        "NoteFilter",
        parse_query("author__in=1,2"),
        notes.clone(),
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![10, 11]);

    // rows with a null relation pass the exclusion
    let set = FilterSet::new(&registry, "NoteFilter", parse_query("author!=1"), notes).unwrap();
    assert_eq!(ids(&set.apply()), vec![11, 12]);
}

#[test]
fn isnull_on_a_relation() {
    let (registry, store) = fixtures::env();
    let notes = store.collection("note").unwrap();

    let set = FilterSet::new(
        &registry,
        "NoteFilter",
        parse_query("author__isnull=true"),
        notes.clone(),
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![12]);

    let set = FilterSet::new(
        &registry,
        "NoteFilter",
        parse_query("author__isnull=false"),
        notes,
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![10, 11]);
}

#[test]
fn negated_parameters_inside_a_relation() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "NoteFilter",
        parse_query("author__email__endswith!=example.com&author__age__gte=20"),
        store.collection("note").unwrap(),
    )
    .unwrap();
    // only carol survives the nested exclusion, and she owns no note
    assert!(set.apply().is_empty());
}

#[test]
fn unknown_parameters_are_ignored() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("wat=1&username=alice"),
        store.collection("user").unwrap(),
    )
    .unwrap();
    assert_eq!(set.request_filters().count(), 1);
    assert_eq!(ids(&set.apply()), vec![1]);
}

#[test]
fn empty_values_are_skipped() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("username="),
        store.collection("user").unwrap(),
    )
    .unwrap();
    assert_eq!(ids(&set.apply()), vec![1, 2, 3]);
}
