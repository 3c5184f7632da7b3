//! Lookup operators and their per-type support.
//!
//! A lookup operator is the comparison a filter applies between a field
//! and a request-supplied value. The set mirrors the standard Django
//! operators: `exact`, `iexact`, `in`, `contains`, `icontains`,
//! `startswith`, `endswith`, `regex`, `iregex`, `lt`, `gt`, `lte`,
//! `gte` and `isnull`. Operators are rendered into parameter names in
//! lowercase, so `Lookup::EndsWith` appears in a query string as
//! `email__endswith`.

use strum::{Display, EnumString};

use crate::entity::FieldType;

/// The separator used in parameter names, between a relationship path
/// and a filter name, and between a filter name and its lookup.
pub const LOOKUP_SEP: &str = "__";

/// A lookup operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Lookup {
    Exact,
    IExact,
    In,
    Contains,
    IContains,
    StartsWith,
    EndsWith,
    Regex,
    IRegex,
    Lt,
    Gt,
    Lte,
    Gte,
    IsNull,
}

impl Lookup {
    /// The lookups supported for a field of the given type. This is the
    /// expansion used when an auto filter declares no explicit lookup
    /// set.
    pub fn supported_for(ty: FieldType) -> &'static [Lookup] {
        use Lookup::*;
        match ty {
            FieldType::Text => &[
                Exact, IExact, In, Contains, IContains, StartsWith, EndsWith, Regex, IRegex, Lt,
                Gt, Lte, Gte, IsNull,
            ],
            FieldType::Integer | FieldType::Float | FieldType::DateTime => {
                &[Exact, In, Lt, Gt, Lte, Gte, IsNull]
            }
            FieldType::Boolean => &[Exact, IsNull],
        }
    }

    /// The request-visible parameter name for this lookup on `base`.
    ///
    /// `exact` is the implied default and produces the bare name; every
    /// other lookup is suffixed, e.g. `email__endswith`.
    pub fn param_name(self, base: &str) -> String {
        match self {
            Lookup::Exact => base.to_string(),
            _ => format!("{}{}{}", base, LOOKUP_SEP, self),
        }
    }
}
