#![cfg(test)]

use filterset::instance::{parse_query, FilterSet, InstanceOptions};

use crate::fixtures;

#[test]
fn malformed_values_are_collected_per_filter() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("age__lt=abc&username=alice"),
        store.collection("user").unwrap(),
    )
    .unwrap();

    let errors = set.validate().unwrap_err();
    assert_eq!(errors.len(), 1);
    let messages = errors.get("age__lt").unwrap();
    assert!(messages[0].contains("expected an integer"));
}

#[test]
fn sibling_filters_are_validated_independently() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("age__lt=abc&joined__lt=also-not-a-date&username=alice"),
        store.collection("user").unwrap(),
    )
    .unwrap();

    let errors = set.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors.get("age__lt").is_some());
    assert!(errors.get("joined__lt").is_some());
}

#[test]
fn well_formed_values_validate() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("age__lt=40&joined__lt=2021-01-01T00:00:00Z&username__in=alice,bob"),
        store.collection("user").unwrap(),
    )
    .unwrap();
    set.validate().unwrap();
}

#[test]
fn invalid_regular_expressions_fail_validation() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("username__regex=("),
        store.collection("user").unwrap(),
    )
    .unwrap();
    let errors = set.validate().unwrap_err();
    assert!(errors.get("username__regex").unwrap()[0].contains("regular expression"));
}

#[test]
fn nested_errors_carry_the_full_path_at_the_root() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "PostFilter",
        parse_query("note__author__age__lt=abc"),
        store.collection("post").unwrap(),
    )
    .unwrap();

    let errors = set.validate().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors.get("note__author__age__lt").is_some());
}

#[test]
fn nested_errors_are_scoped_to_the_intermediate_instance() {
    let (registry, store) = fixtures::env();
    // the same parameters, validated from the `note` instance's point
    // of view: keys are relative to it, not to the root
    let set = FilterSet::with_options(
        &registry,
        "NoteFilter",
        parse_query("note__author__age__lt=abc"),
        store.collection("note").unwrap(),
        InstanceOptions {
            relationship: Some("note".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    let errors = set.validate().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors.get("author__age__lt").is_some());
    assert!(errors.get("note__author__age__lt").is_none());
}

#[test]
fn in_lookups_validate_each_element() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "UserFilter",
        parse_query("age__in=30,oops,35"),
        store.collection("user").unwrap(),
    )
    .unwrap();
    let errors = set.validate().unwrap_err();
    assert!(errors.get("age__in").is_some());
}

#[test]
fn isnull_wants_a_boolean() {
    let (registry, store) = fixtures::env();
    let set = FilterSet::new(
        &registry,
        "NoteFilter",
        parse_query("author__isnull=maybe"),
        store.collection("note").unwrap(),
    )
    .unwrap();
    let errors = set.validate().unwrap_err();
    assert!(errors.get("author__isnull").unwrap()[0].contains("boolean"));
}
