#![cfg(feature = "mock")]

//! An in-memory backend for tests and endpoint mocking.
//!
//! A [`MemoryStore`] holds one collection of `serde_json` rows per
//! entity type. Relation fields hold the related row's key, or an
//! array of keys for to-many relations. [`MemoryCollection`]
//! implements [`Queryable`] by evaluating predicates directly against
//! the rows, traversing relations through the store, and
//! [`SetCombinable`] by key-based set arithmetic.
//!
//! This backend favors clarity over speed: collections clone their
//! rows, and predicate evaluation re-resolves paths per row. Rows that
//! cannot be evaluated against a predicate (a value of the wrong
//! shape, an unparseable right-hand side) are dropped from the result
//! and logged at debug level; rejecting malformed input properly is
//! the validation adapter's job, not the mock's.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use anyhow::{anyhow, bail};
use chrono::DateTime;
use log::debug;
use regex::Regex;
use serde_json::Value;

use crate::entity::{path_segments, EntityDef, FieldType};
use crate::lookups::Lookup;
use crate::queryable::{Predicate, Queryable, SetCombinable};
use crate::schema::SchemaRegistry;

#[derive(Debug)]
struct StoreInner {
    entities: HashMap<String, EntityDef>,
    rows: HashMap<String, Vec<Value>>,
}

/// Builder for a [`MemoryStore`].
#[derive(Debug, Default)]
pub struct MemoryStoreBuilder {
    entities: HashMap<String, EntityDef>,
    rows: HashMap<String, Vec<Value>>,
}

impl MemoryStoreBuilder {
    /// Add one entity definition.
    pub fn entity(mut self, def: EntityDef) -> Self {
        self.entities.insert(def.name().to_string(), def);
        self
    }

    /// Copy every entity definition from `registry`.
    pub fn entities_from(mut self, registry: &SchemaRegistry) -> Self {
        for def in registry.entities() {
            self.entities.insert(def.name().to_string(), def.clone());
        }
        self
    }

    /// Set the rows of `entity`'s collection.
    pub fn rows(mut self, entity: &str, rows: Vec<Value>) -> Self {
        self.rows.insert(entity.to_string(), rows);
        self
    }

    pub fn build(self) -> MemoryStore {
        MemoryStore {
            inner: Arc::new(StoreInner {
                entities: self.entities,
                rows: self.rows,
            }),
        }
    }
}

/// An immutable in-memory data store, shared by the collections drawn
/// from it.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    /// The full collection of `entity`, or `None` for an unknown
    /// entity type.
    pub fn collection(&self, entity: &str) -> Option<MemoryCollection> {
        let def = self.inner.entities.get(entity)?.clone();
        let rows = self.inner.rows.get(entity).cloned().unwrap_or_default();
        Some(MemoryCollection {
            inner: self.inner.clone(),
            entity: def,
            rows,
        })
    }
}

/// A queryable view over one entity's rows.
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    inner: Arc<StoreInner>,
    entity: EntityDef,
    rows: Vec<Value>,
}

impl MemoryCollection {
    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn entity(&self) -> &EntityDef {
        &self.entity
    }

    /// The key values of the rows, in collection order.
    pub fn keys(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|r| r.get(self.entity.key_field()).cloned().unwrap_or(Value::Null))
            .collect()
    }

    fn key_set(&self) -> BTreeSet<String> {
        self.rows
            .iter()
            .filter_map(|r| r.get(self.entity.key_field()))
            .map(|v| v.to_string())
            .collect()
    }

    fn empty_like(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            entity: self.entity.clone(),
            rows: Vec::new(),
        }
    }

    /// Walk `path` from `row`, traversing relations through the store,
    /// and return the scalar type at the end together with every value
    /// reached (several when a relation is to-many). A path ending on
    /// a relation yields the relation's key values.
    fn resolve_values(&self, row: &Value, path: &str) -> Result<(FieldType, Vec<Value>), anyhow::Error> {
        let mut entity = &self.entity;
        let mut current: Vec<Value> = vec![row.clone()];
        let segments: Vec<&str> = path_segments(path).collect();

        for (i, seg) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();

            if let Some(ty) = entity.field_type(seg) {
                if !last {
                    bail!("`{}` on `{}` is not a relation", seg, entity.name());
                }
                let values = current
                    .iter()
                    .map(|r| r.get(*seg).cloned().unwrap_or(Value::Null))
                    .collect();
                return Ok((ty, values));
            }

            if let Some(target) = entity.relation_target(seg) {
                let keys: Vec<Value> = current
                    .iter()
                    .flat_map(|r| flatten_keys(r.get(*seg)))
                    .collect();
                let target_def = self
                    .inner
                    .entities
                    .get(target)
                    .ok_or_else(|| anyhow!("unknown entity `{}`", target))?;
                if last {
                    let ty = target_def
                        .field_type(target_def.key_field())
                        .unwrap_or(FieldType::Integer);
                    return Ok((ty, keys));
                }
                let target_rows = self
                    .inner
                    .rows
                    .get(target)
                    .map(|v| v.as_slice())
                    .unwrap_or(&[]);
                current = target_rows
                    .iter()
                    .filter(|r| {
                        keys.iter()
                            .any(|k| !k.is_null() && r.get(target_def.key_field()) == Some(k))
                    })
                    .cloned()
                    .collect();
                entity = target_def;
                continue;
            }

            bail!("no field or relation `{}` on `{}`", seg, entity.name());
        }

        bail!("empty field path");
    }

    fn matches(&self, row: &Value, predicate: &Predicate) -> Result<bool, anyhow::Error> {
        let (ty, values) = self.resolve_values(row, &predicate.field_path)?;

        if predicate.lookup == Lookup::IsNull {
            let want_null: bool = predicate
                .value
                .parse()
                .map_err(|_| anyhow!("expected a boolean, got `{}`", predicate.value))?;
            let has_value = values.iter().any(|v| !v.is_null());
            return Ok(want_null != has_value);
        }

        // collection-valued paths pass when any element passes
        for value in values.iter().filter(|v| !v.is_null()) {
            if eval_scalar(ty, predicate.lookup, value, &predicate.value)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn flatten_keys(value: Option<&Value>) -> Vec<Value> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(v) => vec![v.clone()],
    }
}

fn eval_scalar(
    ty: FieldType,
    lookup: Lookup,
    value: &Value,
    raw: &str,
) -> Result<bool, anyhow::Error> {
    match ty {
        FieldType::Text => {
            let s = value
                .as_str()
                .ok_or_else(|| anyhow!("expected a string value, got `{}`", value))?;
            Ok(match lookup {
                Lookup::Exact => s == raw,
                Lookup::IExact => s.to_lowercase() == raw.to_lowercase(),
                Lookup::In => raw.split(',').any(|t| t == s),
                Lookup::Contains => s.contains(raw),
                Lookup::IContains => s.to_lowercase().contains(&raw.to_lowercase()),
                Lookup::StartsWith => s.starts_with(raw),
                Lookup::EndsWith => s.ends_with(raw),
                Lookup::Regex => Regex::new(raw)?.is_match(s),
                Lookup::IRegex => Regex::new(&format!("(?i){}", raw))?.is_match(s),
                Lookup::Lt => s < raw,
                Lookup::Gt => s > raw,
                Lookup::Lte => s <= raw,
                Lookup::Gte => s >= raw,
                Lookup::IsNull => bail!("isnull is handled before scalar evaluation"),
            })
        }
        FieldType::Integer => {
            let v = value
                .as_i64()
                .ok_or_else(|| anyhow!("expected an integer value, got `{}`", value))?;
            if lookup == Lookup::In {
                let targets: Vec<i64> = raw
                    .split(',')
                    .map(|t| t.parse())
                    .collect::<Result<_, _>>()?;
                return Ok(targets.contains(&v));
            }
            let t: i64 = raw.parse()?;
            ordered(lookup, &v, &t)
        }
        FieldType::Float => {
            let v = value
                .as_f64()
                .ok_or_else(|| anyhow!("expected a numeric value, got `{}`", value))?;
            if lookup == Lookup::In {
                let targets: Vec<f64> = raw
                    .split(',')
                    .map(|t| t.parse())
                    .collect::<Result<_, _>>()?;
                return Ok(targets.contains(&v));
            }
            let t: f64 = raw.parse()?;
            Ok(match lookup {
                Lookup::Exact => v == t,
                Lookup::Lt => v < t,
                Lookup::Gt => v > t,
                Lookup::Lte => v <= t,
                Lookup::Gte => v >= t,
                _ => bail!("lookup `{}` is not supported for numeric values", lookup),
            })
        }
        FieldType::Boolean => {
            let v = value
                .as_bool()
                .ok_or_else(|| anyhow!("expected a boolean value, got `{}`", value))?;
            match lookup {
                Lookup::Exact => Ok(v == raw.parse::<bool>()?),
                _ => bail!("lookup `{}` is not supported for boolean values", lookup),
            }
        }
        FieldType::DateTime => {
            let s = value
                .as_str()
                .ok_or_else(|| anyhow!("expected a datetime string, got `{}`", value))?;
            let v = DateTime::parse_from_rfc3339(s)?;
            if lookup == Lookup::In {
                for t in raw.split(',') {
                    if DateTime::parse_from_rfc3339(t)? == v {
                        return Ok(true);
                    }
                }
                return Ok(false);
            }
            let t = DateTime::parse_from_rfc3339(raw)?;
            ordered(lookup, &v, &t)
        }
    }
}

fn ordered<T: PartialOrd>(lookup: Lookup, v: &T, t: &T) -> Result<bool, anyhow::Error> {
    Ok(match lookup {
        Lookup::Exact => v == t,
        Lookup::Lt => v < t,
        Lookup::Gt => v > t,
        Lookup::Lte => v <= t,
        Lookup::Gte => v >= t,
        _ => bail!("lookup `{}` is not supported for ordered values", lookup),
    })
}

impl Queryable for MemoryCollection {
    type Selection = Vec<Value>;

    fn filter(&self, predicate: &Predicate) -> Self {
        let mut out = self.clone();
        out.rows.retain(|row| match self.matches(row, predicate) {
            Ok(hit) => hit != predicate.exclude,
            Err(e) => {
                debug!(
                    "dropping `{}` row from `{:?}`: {}",
                    self.entity.name(),
                    predicate,
                    e
                );
                false
            }
        });
        out
    }

    fn value_projection(&self, field: &str) -> Self::Selection {
        self.rows
            .iter()
            .map(|r| r.get(field).cloned().unwrap_or(Value::Null))
            .collect()
    }

    fn containment(&self, field_path: &str, selection: Self::Selection) -> Self {
        let mut out = self.clone();
        out.rows.retain(|row| match self.resolve_values(row, field_path) {
            Ok((_, values)) => values
                .iter()
                .any(|v| !v.is_null() && selection.contains(v)),
            Err(e) => {
                debug!(
                    "dropping `{}` row from containment on `{}`: {}",
                    self.entity.name(),
                    field_path,
                    e
                );
                false
            }
        });
        out
    }

    fn related_collection(&self, relation_path: &str) -> Self {
        let mut def = &self.entity;
        for seg in path_segments(relation_path) {
            match def
                .relation_target(seg)
                .and_then(|t| self.inner.entities.get(t))
            {
                Some(next) => def = next,
                None => {
                    debug!(
                        "unknown relation path `{}` from `{}`",
                        relation_path,
                        self.entity.name()
                    );
                    return self.empty_like();
                }
            }
        }
        Self {
            inner: self.inner.clone(),
            entity: def.clone(),
            rows: self.inner.rows.get(def.name()).cloned().unwrap_or_default(),
        }
    }
}

impl SetCombinable for MemoryCollection {
    fn and(mut self, other: Self) -> Self {
        let keys = other.key_set();
        let key_field = self.entity.key_field().to_string();
        self.rows.retain(|r| {
            r.get(&key_field)
                .map(|v| keys.contains(&v.to_string()))
                .unwrap_or(false)
        });
        self
    }

    fn or(mut self, other: Self) -> Self {
        let have = self.key_set();
        let key_field = other.entity.key_field().to_string();
        for row in other.rows {
            let fresh = row
                .get(&key_field)
                .map(|v| !have.contains(&v.to_string()))
                .unwrap_or(true);
            if fresh {
                self.rows.push(row);
            }
        }
        self
    }

    fn negate(self) -> Self {
        let keys = self.key_set();
        let key_field = self.entity.key_field().to_string();
        let mut out = Self {
            inner: self.inner.clone(),
            entity: self.entity.clone(),
            rows: self
                .inner
                .rows
                .get(self.entity.name())
                .cloned()
                .unwrap_or_default(),
        };
        out.rows.retain(|r| {
            r.get(&key_field)
                .map(|v| !keys.contains(&v.to_string()))
                .unwrap_or(true)
        });
        out
    }
}
