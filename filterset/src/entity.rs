//! Runtime descriptions of entity types.
//!
//! Filter schemas validate their field paths at definition time, which
//! requires a minimal picture of the underlying storage model: which
//! scalar fields an entity has, which relations lead to other entities,
//! and which field identifies a row. An [`EntityDef`] carries exactly
//! that and nothing more; it is configuration, not a storage binding.

use crate::lookups::LOOKUP_SEP;

/// The scalar storage type of an entity field.
///
/// This determines which lookup operators a field supports and how
/// request-supplied values are parsed during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
}

/// A named entity type: ordered scalar fields, named relations to other
/// entities, and a key (identifier) field, `"id"` unless overridden.
#[derive(Debug, Clone)]
pub struct EntityDef {
    name: String,
    fields: Vec<(String, FieldType)>,
    relations: Vec<(String, String)>,
    key_field: String,
}

impl EntityDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            relations: Vec::new(),
            key_field: "id".to_string(),
        }
    }

    /// Add a scalar field.
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push((name.into(), ty));
        self
    }

    /// Add a relation to another entity type, by entity name.
    pub fn relation(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations.push((name.into(), target.into()));
        self
    }

    /// Override the key field (defaults to `"id"`).
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.key_field = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }

    pub fn relation_target(&self, name: &str) -> Option<&str> {
        self.relations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.fields.iter().map(|(n, ty)| (n.as_str(), *ty))
    }

    pub fn relations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.relations.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }
}

/// What a relationship-qualified field path resolves to: a scalar field,
/// or a relation (in which case predicates match the target's key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTarget {
    Scalar(FieldType),
    Relation { entity: String },
}

/// Split a field path into its `__`-separated segments.
pub(crate) fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(LOOKUP_SEP)
}
