//! Filter declarations.
//!
//! A schema is declared as a list of entries of three kinds: a plain
//! [`FilterDef`] (one concrete predicate), an [`AutoFilter`] (expanded
//! at definition time into one `FilterDef` per lookup), and a
//! [`RelatedFilter`] (a reference to another schema over a related
//! entity). The latter two exist only at declaration time; after
//! expansion the schema holds nothing but named `FilterDef`s plus a
//! table of related links.
//!
//! `FilterDef` is an immutable value object. Request-time variants
//! (negated copies, renamed expansions) are produced with the
//! copy-with-modified-field constructors, never by mutating a shared
//! declaration.

use crate::lookups::Lookup;

/// The marker appended to a parameter name to request the negated
/// counterpart of a filter, as in `email__contains!=spam`.
pub const EXCLUSION_MARKER: char = '!';

/// A single named predicate declaration: target field path, lookup
/// operator, and exclusion flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDef {
    name: String,
    field_path: String,
    lookup: Lookup,
    exclude: bool,
}

impl FilterDef {
    pub fn new(name: impl Into<String>, field_path: impl Into<String>, lookup: Lookup) -> Self {
        Self {
            name: name.into(),
            field_path: field_path.into(),
            lookup,
            exclude: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_path(&self) -> &str {
        &self.field_path
    }

    pub fn lookup(&self) -> Lookup {
        self.lookup
    }

    pub fn is_exclude(&self) -> bool {
        self.exclude
    }

    /// A copy of this filter with the exclusion flag flipped.
    pub fn negated(&self) -> Self {
        Self {
            exclude: !self.exclude,
            ..self.clone()
        }
    }
}

/// Declaration-time shorthand naming a field and an optional lookup
/// set; expands into one [`FilterDef`] per lookup. An empty lookup set
/// means every lookup supported for the field's type.
#[derive(Debug, Clone)]
pub struct AutoFilter {
    pub(crate) name: String,
    pub(crate) field_path: String,
    pub(crate) lookups: Vec<Lookup>,
}

impl AutoFilter {
    pub fn new(name: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_path: field_path.into(),
            lookups: Vec::new(),
        }
    }

    pub fn lookups<I: IntoIterator<Item = Lookup>>(mut self, lookups: I) -> Self {
        self.lookups = lookups.into_iter().collect();
        self
    }
}

/// A filter that delegates to another schema over a related entity.
///
/// `field_path` is the relation to traverse; `target_schema` names the
/// schema governing the related entity, resolved through the registry
/// on first use so schemas may reference each other freely. The entry
/// itself matches the relation's key (`author=3`); an explicit lookup
/// set additionally expands per-lookup filters (`author__in=...`) the
/// way an [`AutoFilter`] does.
#[derive(Debug, Clone)]
pub struct RelatedFilter {
    pub(crate) name: String,
    pub(crate) field_path: String,
    pub(crate) target_schema: String,
    pub(crate) lookups: Vec<Lookup>,
}

impl RelatedFilter {
    pub fn new(
        name: impl Into<String>,
        field_path: impl Into<String>,
        target_schema: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_path: field_path.into(),
            target_schema: target_schema.into(),
            lookups: Vec::new(),
        }
    }

    pub fn lookups<I: IntoIterator<Item = Lookup>>(mut self, lookups: I) -> Self {
        self.lookups = lookups.into_iter().collect();
        self
    }
}

/// One declared schema entry.
#[derive(Debug, Clone)]
pub enum FilterDecl {
    Plain(FilterDef),
    Auto(AutoFilter),
    Related(RelatedFilter),
}
