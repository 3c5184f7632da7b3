//! The abstract collection capability the engine compiles into.
//!
//! The engine never talks to a storage backend directly. Compilation
//! produces [`Predicate`] descriptions and correlated sub-selections,
//! and hands them to whatever implements [`Queryable`]. The `mock`
//! feature ships an in-memory implementation; a real deployment binds
//! these operations to its query layer.

use crate::lookups::Lookup;

/// A single compiled condition: apply `lookup` to the value at
/// `field_path` with the raw request-supplied `value`, inverting the
/// result when `exclude` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field_path: String,
    pub lookup: Lookup,
    pub value: String,
    pub exclude: bool,
}

/// A filterable collection of one entity type.
///
/// All four operations are pure with respect to the receiver: each
/// returns a derived collection and leaves the original untouched,
/// which is what lets one request-scoped instance tree compile without
/// observing another's state.
pub trait Queryable: Clone {
    /// The result of projecting a single field's values, used as the
    /// right-hand side of [`containment`](Queryable::containment).
    type Selection;

    /// Restrict to rows satisfying `predicate`.
    fn filter(&self, predicate: &Predicate) -> Self;

    /// Project the values of `field` across the collection.
    fn value_projection(&self, field: &str) -> Self::Selection;

    /// Restrict to rows whose value reached through `field_path` is
    /// contained in `selection`.
    fn containment(&self, field_path: &str, selection: Self::Selection) -> Self;

    /// The base collection of the entity reached through the relation
    /// `relation_path`, used to seed nested instances.
    fn related_collection(&self, relation_path: &str) -> Self;
}

/// Set combination of collections, required only by complex
/// operations (`(a=1) | ~(b=2)` expressions).
pub trait SetCombinable: Sized {
    fn and(self, other: Self) -> Self;
    fn or(self, other: Self) -> Self;
    fn negate(self) -> Self;
}
