//! Complex operations: combining several filtered collections with set
//! operators.
//!
//! A complex expression is a sequence of parenthesized querystrings
//! joined by `&` (intersection) and `|` (union), with `~` negating a
//! single group:
//!
//! ```text
//! (a=1) & (b=2) | ~(c=3)
//! ```
//!
//! Each inner querystring runs as its own [`FilterSet`] against the
//! shared base collection, and the results are folded left-to-right.
//! The expression is expected to be percent-decoded already; transport
//! decoding belongs to the HTTP layer.

use thiserror::Error;

use crate::instance::{parse_query, FilterSet, InstanceError};
use crate::queryable::{Queryable, SetCombinable};
use crate::schema::SchemaRegistry;
use crate::validation::ValidationErrors;

/// A set operator joining two adjacent groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    And,
    Or,
}

/// One decoded group: the inner querystring, whether the group is
/// negated, and the operator joining it to the *next* group (`None`
/// on the final group).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexOp {
    pub querystring: String,
    pub negate: bool,
    pub op: Option<SetOp>,
}

/// Errors raised while decoding or applying a complex expression.
#[derive(Debug, Error)]
pub enum ComplexOpError {
    /// The expression does not start with a parenthesized group.
    #[error("unable to parse complex expression `{0}`")]
    Unparseable(String),
    /// One or more problems in an otherwise recognizable expression;
    /// every problem found is reported.
    #[error("invalid complex expression: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Errors raised by [`apply_complex`].
#[derive(Debug, Error)]
pub enum ComplexFilterError {
    #[error(transparent)]
    Decode(#[from] ComplexOpError),
    #[error(transparent)]
    Instance(#[from] InstanceError),
    /// Validation failures, keyed by the offending querystring.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
}

/// Decode a complex expression into its groups.
///
/// With `negation` disabled, `~` is not recognized and a leading `~`
/// makes the group malformed. Problems (an operator other than `&`
/// or `|`, an unterminated group, trailing content after the final
/// group) are all collected before reporting.
pub fn decode_complex_ops(expr: &str, negation: bool) -> Result<Vec<ComplexOp>, ComplexOpError> {
    let mut results = Vec::new();
    let mut errors = Vec::new();
    let mut rest = expr.trim();

    if rest.is_empty() {
        return Err(ComplexOpError::Unparseable(expr.to_string()));
    }

    loop {
        let negate = negation && rest.starts_with('~');
        if negate {
            rest = rest[1..].trim_start();
        }
        if !rest.starts_with('(') {
            if results.is_empty() {
                return Err(ComplexOpError::Unparseable(expr.to_string()));
            }
            errors.push(format!("trailing characters `{}`", rest));
            break;
        }
        let Some(close) = rest.find(')') else {
            errors.push(format!("unterminated group `{}`", rest));
            break;
        };
        let querystring = rest[1..close].to_string();
        rest = rest[close + 1..].trim_start();

        if rest.is_empty() {
            results.push(ComplexOp {
                querystring,
                negate,
                op: None,
            });
            break;
        }

        let op_end = rest
            .find(|c| c == '(' || c == '~')
            .unwrap_or(rest.len());
        if op_end == rest.len() {
            // an operator with no group after it is trailing content
            errors.push(format!("trailing characters `{}`", rest));
            results.push(ComplexOp {
                querystring,
                negate,
                op: None,
            });
            break;
        }

        let op_text = rest[..op_end].trim();
        let op = match op_text {
            "&" => Some(SetOp::And),
            "|" => Some(SetOp::Or),
            other => {
                errors.push(format!("invalid set operator `{}`", other));
                None
            }
        };
        results.push(ComplexOp {
            querystring,
            negate,
            op,
        });
        rest = &rest[op_end..];
    }

    if errors.is_empty() {
        Ok(results)
    } else {
        Err(ComplexOpError::Invalid(errors))
    }
}

/// Negate the flagged collections and fold them left-to-right with the
/// decoded operators. `None` when `collections` is empty.
pub fn combine<C: SetCombinable>(collections: Vec<C>, ops: &[ComplexOp]) -> Option<C> {
    let mut negated = collections
        .into_iter()
        .zip(ops.iter())
        .map(|(c, op)| if op.negate { c.negate() } else { c });
    let first = negated.next()?;
    // ops[i].op joins group i with group i + 1
    Some(
        ops.iter()
            .zip(negated)
            .fold(first, |acc, (op, next)| match op.op {
                Some(SetOp::Or) => acc.or(next),
                _ => acc.and(next),
            }),
    )
}

/// Decode `expr`, run one [`FilterSet`] of `schema_id` per group
/// against `base`, and combine the results.
///
/// Every group is validated before anything is combined; failures are
/// collected across all groups, keyed by the group's querystring, so a
/// caller sees the full picture at once.
pub fn apply_complex<C>(
    registry: &SchemaRegistry,
    schema_id: &str,
    expr: &str,
    base: C,
) -> Result<C, ComplexFilterError>
where
    C: Queryable + SetCombinable,
{
    let ops = decode_complex_ops(expr, true)?;

    let mut collections = Vec::with_capacity(ops.len());
    let mut errors = ValidationErrors::new();
    for op in &ops {
        let params = parse_query(&op.querystring);
        let set = FilterSet::new(registry, schema_id, params, base.clone())?;
        match set.validate() {
            Ok(()) => collections.push(set.apply()),
            Err(nested) => {
                for (key, messages) in nested.iter() {
                    for message in messages {
                        errors.push(op.querystring.clone(), format!("{}: {}", key, message));
                    }
                }
            }
        }
    }
    if !errors.is_empty() {
        return Err(ComplexFilterError::Validation(errors));
    }

    combine(collections, &ops)
        .ok_or_else(|| ComplexOpError::Unparseable(expr.to_string()).into())
}
