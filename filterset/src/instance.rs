//! Request-scoped filter set instances.
//!
//! A [`FilterSet`] is the per-request activation of a shared
//! [`FilterSchema`](crate::schema::FilterSchema). Construction does
//! four things, in order: select the subset of filters the request's
//! parameters actually reference, synthesize negated counterparts for
//! exclusion parameters, recursively build nested instances for the
//! related filters in the subset, and hold the base collection ready
//! for compilation. The shared schema is read-only throughout; every
//! filter held here is a request-scoped copy.
//!
//! Instances are cheap precisely because of subsetting: a schema with
//! deep related references only pays for the branches a request names.
//! [`SubsetMode::Full`] disables that on a derived instance for
//! callers that need the complete declarative surface, e.g. to render
//! an exhaustive input form.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::trace;
use thiserror::Error;

use crate::filters::{FilterDef, EXCLUSION_MARKER};
use crate::lookups::LOOKUP_SEP;
use crate::queryable::{Predicate, Queryable};
use crate::schema::{FilterSchema, RelatedLink, SchemaRegistry};
use crate::validation::{parse_value, ValidationErrors};

/// The raw request parameter mapping. Keys are request-visible
/// parameter names (`email__endswith`, `author__email`, `email!`),
/// values are the unparsed right-hand sides.
pub type Params = BTreeMap<String, String>;

/// Split a `lhs=rhs&lhs=rhs` fragment into a [`Params`] mapping.
///
/// This is a convenience for tests and for complex operations; the
/// engine itself never touches raw HTTP input. Segments without an
/// `=` are ignored, and a repeated key keeps the last value.
pub fn parse_query(qs: &str) -> Params {
    let mut params = Params::new();
    for pair in qs.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut parts = pair.splitn(2, '=');
        if let (Some(lhs), Some(rhs)) = (parts.next(), parts.next()) {
            params.insert(lhs.to_string(), rhs.to_string());
        }
    }
    params
}

/// Errors raised when building an instance.
#[derive(Debug, Error)]
pub enum InstanceError {
    /// A schema identifier (the root's, or a related filter's lazily
    /// resolved target) is not registered.
    #[error("no filter schema `{0}` is registered")]
    UnknownSchema(String),
}

/// Whether an instance materializes only the filters the request
/// references (the default) or the whole schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubsetMode {
    /// Materialize the request-referenced subset only.
    #[default]
    Request,
    /// Materialize every filter, and build nested instances for every
    /// related filter down to `depth` levels, after which nested
    /// instances subset normally. Costly; meant for form rendering.
    Full { depth: usize },
}

/// Optional construction inputs for [`FilterSet`].
#[derive(Debug, Clone, Default)]
pub struct InstanceOptions {
    /// The relationship path of this instance relative to the root,
    /// set when the instance governs a related entity.
    pub relationship: Option<String>,
    /// Naming prefix applied by rendering layers, surfaced through
    /// [`FilterSet::prefixed_name`].
    pub form_prefix: Option<String>,
    pub subset: SubsetMode,
}

#[derive(Debug)]
struct RelatedSet<'r, C: Queryable> {
    name: String,
    link: RelatedLink,
    set: FilterSet<'r, C>,
}

/// A request-scoped instance of a filter schema: the active filters
/// for one parameter mapping, the nested instances for its related
/// filters, and the collection they compile against.
#[derive(Debug)]
pub struct FilterSet<'r, C: Queryable> {
    registry: &'r SchemaRegistry,
    schema: Arc<FilterSchema>,
    params: Params,
    relationship: Option<String>,
    form_prefix: Option<String>,
    collection: C,
    active: Vec<(String, FilterDef)>,
    related_sets: Vec<RelatedSet<'r, C>>,
}

/// Join a filter name onto a relationship path.
pub(crate) fn qualify(relationship: Option<&str>, name: &str) -> String {
    match relationship {
        Some(rel) => format!("{}{}{}", rel, LOOKUP_SEP, name),
        None => name.to_string(),
    }
}

impl<'r, C: Queryable> FilterSet<'r, C> {
    /// Build an instance of schema `schema_id` for `params` over
    /// `collection`, with default options.
    pub fn new(
        registry: &'r SchemaRegistry,
        schema_id: &str,
        params: Params,
        collection: C,
    ) -> Result<Self, InstanceError> {
        Self::with_options(
            registry,
            schema_id,
            params,
            collection,
            InstanceOptions::default(),
        )
    }

    pub fn with_options(
        registry: &'r SchemaRegistry,
        schema_id: &str,
        params: Params,
        collection: C,
        options: InstanceOptions,
    ) -> Result<Self, InstanceError> {
        let schema = registry
            .schema(schema_id)
            .ok_or_else(|| InstanceError::UnknownSchema(schema_id.to_string()))?;
        let relationship = options.relationship;

        let subset: Vec<FilterDef> = match options.subset {
            SubsetMode::Request => schema.filter_subset(
                params.keys().map(|k| k.as_str()),
                relationship.as_deref(),
            ),
            SubsetMode::Full { .. } => schema.filters().cloned().collect(),
        };

        // Exclusion expansion: each filter whose negated parameter is
        // present gets a flipped copy keyed `name!`, kept alongside
        // the positive entry.
        let mut active = Vec::with_capacity(subset.len());
        for f in subset {
            let exclude_name = format!("{}{}", f.name(), EXCLUSION_MARKER);
            let has_exclusion = params.contains_key(&qualify(relationship.as_deref(), &exclude_name));
            let name = f.name().to_string();
            active.push((name, f.clone()));
            if has_exclusion {
                active.push((exclude_name, f.negated()));
            }
        }

        // Nested instances for the related filters in the subset; the
        // relationship path extends by the filter's name at each
        // level. Recursion terminates because each level subsets
        // against the same finite parameter set.
        let mut related_sets = Vec::new();
        for (name, link) in schema.related() {
            if !active.iter().any(|(n, _)| n == name) {
                continue;
            }
            let child_subset = match options.subset {
                SubsetMode::Full { depth } if depth > 0 => SubsetMode::Full { depth: depth - 1 },
                _ => SubsetMode::Request,
            };
            let set = FilterSet::with_options(
                registry,
                &link.target_schema,
                params.clone(),
                collection.related_collection(&link.field_path),
                InstanceOptions {
                    relationship: Some(qualify(relationship.as_deref(), name)),
                    form_prefix: options.form_prefix.clone(),
                    subset: child_subset,
                },
            )?;
            related_sets.push(RelatedSet {
                name: name.to_string(),
                link: link.clone(),
                set,
            });
        }

        Ok(Self {
            registry,
            schema,
            params,
            relationship,
            form_prefix: options.form_prefix,
            collection,
            active,
            related_sets,
        })
    }

    pub fn schema(&self) -> &FilterSchema {
        &self.schema
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn relationship(&self) -> Option<&str> {
        self.relationship.as_deref()
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// The active filter mapping for this request: request-visible
    /// name to filter, exclusion copies included.
    pub fn request_filters(&self) -> impl Iterator<Item = (&str, &FilterDef)> {
        self.active.iter().map(|(n, f)| (n.as_str(), f))
    }

    /// The nested instances built for this request's related filters,
    /// keyed by the related filter's local name.
    pub fn related_filtersets(&self) -> impl Iterator<Item = (&str, &FilterSet<'r, C>)> {
        self.related_sets.iter().map(|r| (r.name.as_str(), &r.set))
    }

    /// A filter name as presented to a rendering layer, wrapped in the
    /// naming prefix when one was supplied.
    pub fn prefixed_name(&self, name: &str) -> String {
        match &self.form_prefix {
            Some(prefix) => format!("{}-{}", prefix, name),
            None => name.to_string(),
        }
    }

    fn param_value(&self, request_name: &str) -> Option<&str> {
        let param = qualify(self.relationship.as_deref(), request_name);
        self.params
            .get(&param)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Compile the instance tree into a filtered collection.
    ///
    /// Active filters whose parameter carries a value become direct
    /// predicates. Each related filter whose nested instance received
    /// parameters scoped under its prefix is compiled recursively and
    /// folded in as a correlated sub-selection on the related entity's
    /// key; a related filter with no qualifying parameters leaves the
    /// result untouched.
    pub fn apply(&self) -> C {
        let mut collection = self.collection.clone();

        for (request_name, f) in &self.active {
            let Some(value) = self.param_value(request_name) else {
                continue;
            };
            let predicate = Predicate {
                field_path: f.field_path().to_string(),
                lookup: f.lookup(),
                value: value.to_string(),
                exclude: f.is_exclude(),
            };
            trace!(
                "schema `{}`: applying `{}` as {:?}",
                self.schema.id(),
                request_name,
                predicate
            );
            collection = collection.filter(&predicate);
        }

        for related in &self.related_sets {
            let prefix = format!(
                "{}{}",
                qualify(self.relationship.as_deref(), &related.name),
                LOOKUP_SEP
            );
            if !self.params.keys().any(|p| p.starts_with(&prefix)) {
                continue;
            }
            trace!(
                "schema `{}`: correlating `{}` through `{}`",
                self.schema.id(),
                related.name,
                related.link.field_path
            );
            let key_field = related.set.schema.key_field().to_string();
            let selection = related.set.apply().value_projection(&key_field);
            collection = collection.containment(&related.link.field_path, selection);
        }

        collection
    }

    /// Validate every active filter's parameter value against its
    /// field type and lookup.
    ///
    /// Failures are collected per filter and keyed by the locally
    /// scoped request name; nested instances validate independently
    /// and their keys are re-prefixed with the related filter's name
    /// relative to this instance, so the root sees full dotted paths
    /// while an intermediate instance sees paths scoped to itself.
    /// A failing filter never aborts validation of its siblings.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (request_name, f) in &self.active {
            let Some(value) = self.param_value(request_name) else {
                continue;
            };
            let Ok(ty) = self
                .registry
                .value_type(self.schema.entity(), f.field_path())
            else {
                // expansion already validated the path
                continue;
            };
            if let Err(e) = parse_value(ty, f.lookup(), value) {
                errors.push(request_name.clone(), e.to_string());
            }
        }

        for related in &self.related_sets {
            if let Err(nested) = related.set.validate() {
                errors.merge_nested(&related.name, nested);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
