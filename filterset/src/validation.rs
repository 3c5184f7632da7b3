//! Value validation and error collection.
//!
//! Query compilation never parses right-hand sides; when a caller
//! wants input validation instead of (or before) compilation, each
//! instance validates its own parameters and failures accumulate in a
//! [`ValidationErrors`] mapping. Keys are request-visible parameter
//! names, scoped to the instance that produced them: re-keying on the
//! way up prefixes each key with the related filter's name relative to
//! the parent, so a doubly-nested failure reads `a__b__field` at the
//! root and `b__field` at the intermediate instance.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{anyhow, Context};
use chrono::DateTime;
use regex::Regex;

use crate::entity::FieldType;
use crate::lookups::{Lookup, LOOKUP_SEP};

/// Validation failures, keyed by request-visible parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(key.into())
            .or_default()
            .push(message.into());
    }

    /// Fold a nested instance's errors in under `name`, the related
    /// filter's name relative to this instance.
    pub fn merge_nested(&mut self, name: &str, nested: ValidationErrors) {
        for (key, messages) in nested.errors {
            let qualified = format!("{}{}{}", name, LOOKUP_SEP, key);
            self.errors.entry(qualified).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.errors.get(key).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, messages) in &self.errors {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", key, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Check that `raw` is a well-formed right-hand side for a filter of
/// scalar type `ty` under `lookup`.
pub(crate) fn parse_value(ty: FieldType, lookup: Lookup, raw: &str) -> Result<(), anyhow::Error> {
    match lookup {
        Lookup::IsNull => {
            raw.parse::<bool>()
                .map(|_| ())
                .with_context(|| format!("expected a boolean, got `{}`", raw))
        }
        Lookup::In => {
            for part in raw.split(',') {
                parse_scalar(ty, part)?;
            }
            Ok(())
        }
        Lookup::Regex => Regex::new(raw)
            .map(|_| ())
            .map_err(|e| anyhow!("invalid regular expression: {}", e)),
        Lookup::IRegex => Regex::new(&format!("(?i){}", raw))
            .map(|_| ())
            .map_err(|e| anyhow!("invalid regular expression: {}", e)),
        _ => parse_scalar(ty, raw),
    }
}

fn parse_scalar(ty: FieldType, raw: &str) -> Result<(), anyhow::Error> {
    match ty {
        FieldType::Text => Ok(()),
        FieldType::Integer => raw
            .parse::<i64>()
            .map(|_| ())
            .with_context(|| format!("expected an integer, got `{}`", raw)),
        FieldType::Float => raw
            .parse::<f64>()
            .map(|_| ())
            .with_context(|| format!("expected a number, got `{}`", raw)),
        FieldType::Boolean => raw
            .parse::<bool>()
            .map(|_| ())
            .with_context(|| format!("expected a boolean, got `{}`", raw)),
        FieldType::DateTime => DateTime::parse_from_rfc3339(raw)
            .map(|_| ())
            .with_context(|| format!("expected an RFC 3339 datetime, got `{}`", raw)),
    }
}
