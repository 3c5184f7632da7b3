//! Schema declaration, expansion, and the registry.
//!
//! Construction is two-phase. A [`SchemaBuilder`] is an ordinary
//! configuration structure collecting declared entries; registering it
//! runs [`expansion`](SchemaRegistry::register) exactly once, producing
//! an immutable [`FilterSchema`] that is shared (behind [`Arc`]) across
//! every request for the schema's lifetime. Expansion is where all
//! configuration errors surface: an unresolvable field path or an
//! unsupported lookup fails here, before any request is served.
//!
//! Related filters reference their target schema by identifier and are
//! resolved through the [`SchemaRegistry`] on first use, so schemas may
//! be registered in any order and may reference each other cyclically.
//! [`SchemaRegistry::verify`] offers an eager check once registration
//! is complete.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, trace};
use thiserror::Error;

use crate::entity::{path_segments, EntityDef, FieldType, PathTarget};
use crate::filters::{AutoFilter, FilterDecl, FilterDef, RelatedFilter, EXCLUSION_MARKER};
use crate::lookups::{Lookup, LOOKUP_SEP};

/// Errors raised while defining entities and schemas.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema targets an entity type that was never registered.
    #[error("no entity type `{0}` is registered")]
    UnknownEntity(String),
    /// A field path does not resolve on the target entity.
    #[error("cannot resolve field path `{path}` on entity `{entity}`")]
    NoField { entity: String, path: String },
    /// A related filter's field path resolves to a scalar field.
    #[error("field path `{path}` on entity `{entity}` is not a relation")]
    NotARelation { entity: String, path: String },
    /// A declared lookup is not valid for the field's type.
    #[error("lookup `{lookup}` is not supported for field `{path}` on entity `{entity}`")]
    UnsupportedLookup {
        entity: String,
        path: String,
        lookup: Lookup,
    },
    /// Two schemas were registered under the same identifier.
    #[error("a schema named `{0}` is already registered")]
    DuplicateSchema(String),
    /// Two entities were registered under the same name.
    #[error("an entity named `{0}` is already registered")]
    DuplicateEntity(String),
    /// A related filter references a schema identifier that is not
    /// registered. Only reported by [`SchemaRegistry::verify`];
    /// resolution is otherwise lazy.
    #[error("filter `{filter}` of schema `{schema}` references unknown schema `{target}`")]
    UnknownSchemaRef {
        schema: String,
        filter: String,
        target: String,
    },
}

/// The relation behind an expanded related filter: the path used to
/// traverse to the related entity and the target schema identifier.
#[derive(Debug, Clone)]
pub struct RelatedLink {
    pub field_path: String,
    pub target_schema: String,
}

/// The declarations for one schema, prior to expansion.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    id: String,
    entity: String,
    declared: Vec<FilterDecl>,
}

impl SchemaBuilder {
    /// Start declaring a schema named `id` over entity type `entity`.
    pub fn new(id: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity: entity.into(),
            declared: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declare a plain filter.
    pub fn filter(mut self, f: FilterDef) -> Self {
        self.declared.push(FilterDecl::Plain(f));
        self
    }

    /// Declare an auto filter, expanded into per-lookup filters.
    pub fn auto(mut self, f: AutoFilter) -> Self {
        self.declared.push(FilterDecl::Auto(f));
        self
    }

    /// Declare a related filter.
    pub fn related(mut self, f: RelatedFilter) -> Self {
        self.declared.push(FilterDecl::Related(f));
        self
    }
}

/// The expanded, immutable form of a schema: an ordered mapping of
/// unique filter names to [`FilterDef`]s, plus the related-filter
/// table. Shared read-only across all requests.
#[derive(Debug)]
pub struct FilterSchema {
    id: String,
    entity: String,
    key_field: String,
    filters: Vec<FilterDef>,
    index: HashMap<String, usize>,
    related: Vec<(String, RelatedLink)>,
    // related names, most specific first, for prefix resolution
    related_names_desc: Vec<String>,
}

impl FilterSchema {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The entity type this schema filters.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The key field of the target entity, projected by correlated
    /// subqueries.
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// All filters, in declaration order.
    pub fn filters(&self) -> impl Iterator<Item = &FilterDef> {
        self.filters.iter()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FilterDef> {
        self.index.get(name).map(|i| &self.filters[*i])
    }

    /// The related filters, in declaration order.
    pub fn related(&self) -> impl Iterator<Item = (&str, &RelatedLink)> {
        self.related.iter().map(|(n, l)| (n.as_str(), l))
    }

    pub fn related_link(&self, name: &str) -> Option<&RelatedLink> {
        self.related
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, l)| l)
    }

    pub fn is_related(&self, name: &str) -> bool {
        self.related_link(name).is_some()
    }

    /// Resolve a raw request parameter to the filter it targets, or
    /// `None` when nothing matches (unknown parameters are ignored,
    /// not errors).
    ///
    /// ```rust
    /// # use filterset::entity::{EntityDef, FieldType};
    /// # use filterset::filters::{AutoFilter, RelatedFilter};
    /// # use filterset::lookups::Lookup;
    /// # use filterset::schema::{SchemaBuilder, SchemaRegistry};
    /// # let mut registry = SchemaRegistry::new();
    /// # registry
    /// #     .add_entity(
    /// #         EntityDef::new("user")
    /// #             .field("id", FieldType::Integer)
    /// #             .field("email", FieldType::Text),
    /// #     )
    /// #     .unwrap();
    /// # registry
    /// #     .add_entity(
    /// #         EntityDef::new("note")
    /// #             .field("id", FieldType::Integer)
    /// #             .relation("author", "user"),
    /// #     )
    /// #     .unwrap();
    /// # registry
    /// #     .register(
    /// #         SchemaBuilder::new("NoteFilter", "note")
    /// #             .related(RelatedFilter::new("author", "author", "UserFilter")),
    /// #     )
    /// #     .unwrap();
    /// let schema = registry.schema("NoteFilter").unwrap();
    /// // related filters claim prefixed parameters
    /// assert_eq!(schema.param_filter_name("author__email", None), Some("author"));
    /// // negation is detected on the final character only
    /// assert_eq!(schema.param_filter_name("author!", None), Some("author"));
    /// assert_eq!(schema.param_filter_name("unknown", None), None);
    /// ```
    pub fn param_filter_name<'s>(
        &'s self,
        param: &str,
        relationship: Option<&str>,
    ) -> Option<&'s str> {
        let mut param = param;
        if let Some(rel) = relationship {
            let prefix = format!("{}{}", rel, LOOKUP_SEP);
            if let Some(stripped) = param.strip_prefix(prefix.as_str()) {
                param = stripped;
            }
        }

        // Exact matches first, covering lookup-suffixed names.
        if let Some(i) = self.index.get(param) {
            return Some(self.filters[*i].name());
        }

        // Then exclusion parameters; negation itself is handled when
        // the request filters are built, not here.
        if let Some(positive) = param.strip_suffix(EXCLUSION_MARKER) {
            if let Some(i) = self.index.get(positive) {
                return Some(self.filters[*i].name());
            }
        }

        // Then relationship prefixes, most specific name first so that
        // `note_author__title` resolves to `note_author` even when
        // `note` is also a valid prefix. Matching includes the
        // separator to keep `note` from claiming `note2__title`.
        self.related_names_desc
            .iter()
            .find(|name| param.starts_with(&format!("{}{}", name, LOOKUP_SEP)))
            .map(|name| name.as_str())
    }

    /// The subset of filters referenced by `params`, in declaration
    /// order. This is what keeps per-request instantiation cheap: only
    /// filters the request actually names are materialized, at every
    /// nesting level. The shared schema is never modified; entries are
    /// returned as request-scoped clones.
    pub fn filter_subset<'p, I>(&self, params: I, relationship: Option<&str>) -> Vec<FilterDef>
    where
        I: IntoIterator<Item = &'p str>,
    {
        let names: HashSet<&str> = params
            .into_iter()
            .filter_map(|p| self.param_filter_name(p, relationship))
            .collect();
        self.filters
            .iter()
            .filter(|f| names.contains(f.name()))
            .cloned()
            .collect()
    }
}

/// Owns entity definitions and expanded schemas. The composition root
/// of the engine: registering a schema expands it against the entity
/// graph, and related filters resolve their targets through here.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entities: HashMap<String, EntityDef>,
    schemas: HashMap<String, Arc<FilterSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, entity: EntityDef) -> Result<(), SchemaError> {
        if self.entities.contains_key(entity.name()) {
            return Err(SchemaError::DuplicateEntity(entity.name().to_string()));
        }
        self.entities.insert(entity.name().to_string(), entity);
        Ok(())
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.values()
    }

    pub fn schema(&self, id: &str) -> Option<Arc<FilterSchema>> {
        self.schemas.get(id).cloned()
    }

    /// Expand `builder` and register the result. Runs once per schema;
    /// all definition-time validation happens here.
    pub fn register(&mut self, builder: SchemaBuilder) -> Result<Arc<FilterSchema>, SchemaError> {
        if self.schemas.contains_key(builder.id()) {
            return Err(SchemaError::DuplicateSchema(builder.id().to_string()));
        }
        let schema = Arc::new(self.expand(builder)?);
        self.schemas.insert(schema.id().to_string(), schema.clone());
        Ok(schema)
    }

    /// Check that every related filter's target schema is registered.
    /// Resolution is lazy by design (schemas may reference each other
    /// cyclically), so dangling references otherwise surface on first
    /// use.
    pub fn verify(&self) -> Result<(), SchemaError> {
        for schema in self.schemas.values() {
            for (name, link) in schema.related() {
                if !self.schemas.contains_key(&link.target_schema) {
                    return Err(SchemaError::UnknownSchemaRef {
                        schema: schema.id().to_string(),
                        filter: name.to_string(),
                        target: link.target_schema.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve a relationship-qualified field path on `entity`.
    pub fn resolve_path(&self, entity: &str, path: &str) -> Result<PathTarget, SchemaError> {
        let no_field = || SchemaError::NoField {
            entity: entity.to_string(),
            path: path.to_string(),
        };
        let mut current = self
            .entities
            .get(entity)
            .ok_or_else(|| SchemaError::UnknownEntity(entity.to_string()))?;
        let segments: Vec<&str> = path_segments(path).collect();
        for (i, seg) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            if let Some(ty) = current.field_type(seg) {
                if last {
                    return Ok(PathTarget::Scalar(ty));
                }
                return Err(no_field());
            }
            if let Some(target) = current.relation_target(seg) {
                if last {
                    return Ok(PathTarget::Relation {
                        entity: target.to_string(),
                    });
                }
                current = self
                    .entities
                    .get(target)
                    .ok_or_else(|| SchemaError::UnknownEntity(target.to_string()))?;
                continue;
            }
            return Err(no_field());
        }
        Err(no_field())
    }

    /// The scalar type a predicate on `path` compares against: the
    /// field's own type, or the target's key type when the path stops
    /// at a relation.
    pub(crate) fn value_type(&self, entity: &str, path: &str) -> Result<FieldType, SchemaError> {
        match self.resolve_path(entity, path)? {
            PathTarget::Scalar(ty) => Ok(ty),
            PathTarget::Relation { entity } => Ok(self.key_type(&entity)),
        }
    }

    pub(crate) fn key_type(&self, entity: &str) -> FieldType {
        self.entities
            .get(entity)
            .and_then(|e| e.field_type(e.key_field()))
            .unwrap_or(FieldType::Integer)
    }

    fn expand(&self, builder: SchemaBuilder) -> Result<FilterSchema, SchemaError> {
        let entity = self
            .entities
            .get(&builder.entity)
            .ok_or_else(|| SchemaError::UnknownEntity(builder.entity.clone()))?;

        let mut filters: Vec<FilterDef> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut related: Vec<(String, RelatedLink)> = Vec::new();
        let mut related_names: HashSet<String> = HashSet::new();

        // Overwrites replace in place so declaration order survives;
        // related entries are never overwritten by generated filters.
        let insert = |filters: &mut Vec<FilterDef>,
                          index: &mut HashMap<String, usize>,
                          related_names: &HashSet<String>,
                          def: FilterDef,
                          force: bool| {
            match index.get(def.name()) {
                Some(i) => {
                    if force || !related_names.contains(def.name()) {
                        filters[*i] = def;
                    }
                }
                None => {
                    index.insert(def.name().to_string(), filters.len());
                    filters.push(def);
                }
            }
        };

        for decl in &builder.declared {
            match decl {
                FilterDecl::Plain(f) => {
                    let ty = self.value_type(entity.name(), f.field_path())?;
                    self.check_lookup(entity.name(), f.field_path(), ty, f.lookup())?;
                    insert(&mut filters, &mut index, &related_names, f.clone(), false);
                }
                FilterDecl::Auto(a) => {
                    let ty = self.value_type(entity.name(), &a.field_path)?;
                    let lookups: Vec<Lookup> = if a.lookups.is_empty() {
                        Lookup::supported_for(ty).to_vec()
                    } else {
                        a.lookups.clone()
                    };
                    for lk in lookups {
                        self.check_lookup(entity.name(), &a.field_path, ty, lk)?;
                        let gen_name =
                            lk.param_name(&a.field_path)
                                .replacen(&a.field_path, &a.name, 1);
                        trace!(
                            "schema `{}`: auto filter `{}` generated `{}`",
                            builder.id,
                            a.name,
                            gen_name
                        );
                        let def = FilterDef::new(gen_name, &a.field_path, lk);
                        insert(&mut filters, &mut index, &related_names, def, false);
                    }
                }
                FilterDecl::Related(r) => {
                    match self.resolve_path(entity.name(), &r.field_path)? {
                        PathTarget::Relation { .. } => {}
                        PathTarget::Scalar(_) => {
                            return Err(SchemaError::NotARelation {
                                entity: entity.name().to_string(),
                                path: r.field_path.clone(),
                            })
                        }
                    }
                    let ty = self.value_type(entity.name(), &r.field_path)?;
                    related.push((
                        r.name.clone(),
                        RelatedLink {
                            field_path: r.field_path.clone(),
                            target_schema: r.target_schema.clone(),
                        },
                    ));
                    related_names.insert(r.name.clone());
                    let def = FilterDef::new(&r.name, &r.field_path, Lookup::Exact);
                    insert(&mut filters, &mut index, &related_names, def, true);
                    for lk in &r.lookups {
                        self.check_lookup(entity.name(), &r.field_path, ty, *lk)?;
                        let gen_name = lk
                            .param_name(&r.field_path)
                            .replacen(&r.field_path, &r.name, 1);
                        let def = FilterDef::new(gen_name, &r.field_path, *lk);
                        insert(&mut filters, &mut index, &related_names, def, false);
                    }
                }
            }
        }

        let mut related_names_desc: Vec<String> =
            related.iter().map(|(n, _)| n.clone()).collect();
        related_names_desc.sort();
        related_names_desc.reverse();

        debug!(
            "expanded schema `{}` over `{}`: {} filters, {} related",
            builder.id,
            builder.entity,
            filters.len(),
            related.len()
        );

        Ok(FilterSchema {
            id: builder.id,
            key_field: entity.key_field().to_string(),
            entity: builder.entity,
            filters,
            index,
            related,
            related_names_desc,
        })
    }

    fn check_lookup(
        &self,
        entity: &str,
        path: &str,
        ty: FieldType,
        lookup: Lookup,
    ) -> Result<(), SchemaError> {
        if Lookup::supported_for(ty).contains(&lookup) {
            Ok(())
        } else {
            Err(SchemaError::UnsupportedLookup {
                entity: entity.to_string(),
                path: path.to_string(),
                lookup,
            })
        }
    }
}
