#![cfg(test)]

use filterset::complex::{
    apply_complex, decode_complex_ops, ComplexFilterError, ComplexOpError, SetOp,
};

use crate::fixtures::{self, ids};

#[test]
fn decode_groups_and_operators() {
    let ops = decode_complex_ops("(a=1) & (b=2) | ~(c=3)", true).unwrap();
    assert_eq!(ops.len(), 3);

    assert_eq!(ops[0].querystring, "a=1");
    assert!(!ops[0].negate);
    assert_eq!(ops[0].op, Some(SetOp::And));

    assert_eq!(ops[1].querystring, "b=2");
    assert_eq!(ops[1].op, Some(SetOp::Or));

    assert_eq!(ops[2].querystring, "c=3");
    assert!(ops[2].negate);
    assert_eq!(ops[2].op, None);
}

#[test]
fn decode_single_group() {
    let ops = decode_complex_ops("(username=alice)", true).unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].op, None);
}

#[test]
fn decode_requires_parenthesized_groups() {
    let err = decode_complex_ops("username=alice", true).unwrap_err();
    assert!(matches!(err, ComplexOpError::Unparseable(_)));

    // negation disabled: a leading `~` is not recognized
    let err = decode_complex_ops("~(username=alice)", false).unwrap_err();
    assert!(matches!(err, ComplexOpError::Unparseable(_)));
}

#[test]
fn decode_rejects_unknown_operators() {
    let err = decode_complex_ops("(a=1) ^ (b=2)", true).unwrap_err();
    match err {
        ComplexOpError::Invalid(messages) => {
            assert!(messages[0].contains("invalid set operator"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn decode_rejects_trailing_content() {
    let err = decode_complex_ops("(a=1) junk", true).unwrap_err();
    match err {
        ComplexOpError::Invalid(messages) => {
            assert!(messages[0].contains("trailing characters"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test_log::test]
fn union_and_intersection_of_filtered_collections() {
    let (registry, store) = fixtures::env();
    let users = store.collection("user").unwrap();

    let result = apply_complex(
        &registry,
        "UserFilter",
        "(username=alice) | (username=bob)",
        users.clone(),
    )
    .unwrap();
    assert_eq!(ids(&result), vec![1, 2]);

    let result = apply_complex(
        &registry,
        "UserFilter",
        "(email__contains=example) & (age__gte=28)",
        users,
    )
    .unwrap();
    assert_eq!(ids(&result), vec![1]);
}

#[test]
fn negated_groups_complement_against_the_full_collection() {
    let (registry, store) = fixtures::env();
    let result = apply_complex(
        &registry,
        "UserFilter",
        "~(username=alice)",
        store.collection("user").unwrap(),
    )
    .unwrap();
    assert_eq!(ids(&result), vec![2, 3]);
}

#[test]
fn group_validation_failures_are_keyed_by_querystring() {
    let (registry, store) = fixtures::env();
    let err = apply_complex(
        &registry,
        "UserFilter",
        "(username=alice) & (age__lt=abc)",
        store.collection("user").unwrap(),
    )
    .unwrap_err();
    match err {
        ComplexFilterError::Validation(errors) => {
            let messages = errors.get("age__lt=abc").unwrap();
            assert!(messages[0].contains("age__lt"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
