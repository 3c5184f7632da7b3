#![cfg(test)]

use crate::fixtures;

#[test]
fn exact_names_resolve_first() {
    let registry = fixtures::registry();
    let schema = registry.schema("UserFilter").unwrap();

    assert_eq!(schema.param_filter_name("email", None), Some("email"));
    assert_eq!(
        schema.param_filter_name("email__endswith", None),
        Some("email__endswith")
    );
}

#[test]
fn exclusion_marker_resolves_to_the_positive_filter() {
    let registry = fixtures::registry();
    let schema = registry.schema("UserFilter").unwrap();

    assert_eq!(schema.param_filter_name("email!", None), Some("email"));
    assert_eq!(
        schema.param_filter_name("email__endswith!", None),
        Some("email__endswith")
    );
}

#[test]
fn relationship_prefix_is_stripped() {
    let registry = fixtures::registry();
    let schema = registry.schema("UserFilter").unwrap();

    assert_eq!(
        schema.param_filter_name("author__email", Some("author")),
        Some("email")
    );
    assert_eq!(
        schema.param_filter_name("author__email__endswith!", Some("author")),
        Some("email__endswith")
    );
}

#[test]
fn relational_prefixes_claim_nested_parameters() {
    let registry = fixtures::registry();
    let schema = registry.schema("NoteFilter").unwrap();

    assert_eq!(
        schema.param_filter_name("author__email", None),
        Some("author")
    );
    assert_eq!(
        schema.param_filter_name("author__email__endswith", None),
        Some("author")
    );
    // lookup-suffixed names generated from the related filter match
    // exactly, before prefix matching kicks in
    assert_eq!(
        schema.param_filter_name("author__in", None),
        Some("author__in")
    );
}

#[test]
fn more_specific_relational_names_win() {
    let registry = fixtures::registry();
    let schema = registry.schema("PageFilter").unwrap();

    assert_eq!(
        schema.param_filter_name("note_author__username", None),
        Some("note_author")
    );
    assert_eq!(schema.param_filter_name("note__title", None), Some("note"));
}

#[test]
fn relational_matching_requires_the_separator() {
    let registry = fixtures::registry();
    let schema = registry.schema("PageFilter").unwrap();

    // `note` must not claim look-alike names
    assert_eq!(schema.param_filter_name("note2__title", None), None);
    assert_eq!(schema.param_filter_name("notes", None), None);
}

#[test]
fn unknown_parameters_resolve_to_none() {
    let registry = fixtures::registry();
    let schema = registry.schema("UserFilter").unwrap();

    assert_eq!(schema.param_filter_name("unknown", None), None);
    assert_eq!(schema.param_filter_name("email__betwixt", None), None);
}

#[test]
fn interior_exclusion_markers_never_match() {
    let registry = fixtures::registry();
    let schema = registry.schema("NoteFilter").unwrap();

    assert_eq!(schema.param_filter_name("author!__email", None), None);
    assert_eq!(schema.param_filter_name("au!thor", None), None);
}

#[test]
fn subset_selects_exactly_the_resolved_names_in_declaration_order() {
    let registry = fixtures::registry();
    let schema = registry.schema("UserFilter").unwrap();

    let params = ["age__lt", "unknown", "email__contains", "active"];
    let subset = schema.filter_subset(params, None);
    let names: Vec<&str> = subset.iter().map(|f| f.name()).collect();
    // declaration order: email precedes age precedes active
    assert_eq!(names, vec!["email__contains", "age__lt", "active"]);
}

#[test]
fn subset_never_mutates_the_shared_schema() {
    let registry = fixtures::registry();
    let schema = registry.schema("UserFilter").unwrap();
    let before = schema.len();

    let _ = schema.filter_subset(["email", "email!", "age__lt"], None);
    assert_eq!(schema.len(), before);
    assert!(!schema.get("email").unwrap().is_exclude());
}
