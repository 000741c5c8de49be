//! XSD Simple Type validators
//!
//! This module implements XSD simple type validation including:
//! - Atomic types (built-in and derived)
//! - List types (whitespace-separated lists)
//! - Union types (value matching any member type)
//!
//! See: https://www.w3.org/TR/xmlschema-2/

use super::builtins::{BuiltinType, XsdValue};
use super::facets::{FacetKind, FacetSet, WhiteSpace, STRING_FACETS, UNION_FACETS};

// =============================================================================
// Simple Type Variety
// =============================================================================

/// Variety of a simple type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleTypeVariety {
    /// Atomic type (single value)
    Atomic,
    /// List type (whitespace-separated values)
    List,
    /// Union type (value matches one of several types)
    Union,
}

impl SimpleTypeVariety {
    fn word(&self) -> &'static str {
        match self {
            SimpleTypeVariety::Atomic => "atomic",
            SimpleTypeVariety::List => "list",
            SimpleTypeVariety::Union => "union",
        }
    }
}

// =============================================================================
// Simple Types
// =============================================================================

/// A compiled simple type: variety, base datatype and accumulated facets
#[derive(Debug, Clone)]
pub enum SimpleType {
    /// Restriction of a built-in atomic type
    Atomic {
        /// Built-in datatype providing the lexical mapping
        builtin: BuiltinType,
        /// Facets of every restriction step
        facets: FacetSet,
    },
    /// Whitespace-separated list of items
    List {
        /// Item type
        item: Box<SimpleType>,
        /// Facets applying to the whole list
        facets: FacetSet,
    },
    /// Union of member types, tried in order
    Union {
        /// Member types
        members: Vec<SimpleType>,
        /// Facets applying to the union
        facets: FacetSet,
    },
}

/// A value accepted by a simple type
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedValue {
    /// Value after whitespace normalization
    pub normalized: String,
    /// Value-space image for atomic values
    pub value: Option<XsdValue>,
    /// ID tokens declared by this value
    pub ids: Vec<String>,
    /// IDREF tokens referenced by this value
    pub idrefs: Vec<String>,
}

impl ValidatedValue {
    /// Whether two values are equal in value space
    pub fn same_value(&self, other: &ValidatedValue) -> bool {
        match (&self.value, &other.value) {
            (Some(a), Some(b)) => a == b,
            _ => self.normalized == other.normalized,
        }
    }
}

impl SimpleType {
    /// Atomic type with no facets
    pub fn atomic(builtin: BuiltinType) -> Self {
        SimpleType::Atomic {
            builtin,
            facets: FacetSet::new(),
        }
    }

    /// List type with no facets
    pub fn list(item: SimpleType) -> Self {
        SimpleType::List {
            item: Box::new(item),
            facets: FacetSet::new(),
        }
    }

    /// Union type with no facets
    pub fn union(members: Vec<SimpleType>) -> Self {
        SimpleType::Union {
            members,
            facets: FacetSet::new(),
        }
    }

    /// Variety of this type
    pub fn variety(&self) -> SimpleTypeVariety {
        match self {
            SimpleType::Atomic { .. } => SimpleTypeVariety::Atomic,
            SimpleType::List { .. } => SimpleTypeVariety::List,
            SimpleType::Union { .. } => SimpleTypeVariety::Union,
        }
    }

    /// Accumulated facets
    pub fn facets(&self) -> &FacetSet {
        match self {
            SimpleType::Atomic { facets, .. }
            | SimpleType::List { facets, .. }
            | SimpleType::Union { facets, .. } => facets,
        }
    }

    /// Built-in datatype of an atomic type
    pub fn builtin(&self) -> Option<BuiltinType> {
        match self {
            SimpleType::Atomic { builtin, .. } => Some(*builtin),
            _ => None,
        }
    }

    /// Effective whitespace handling
    pub fn white_space(&self) -> WhiteSpace {
        match self {
            SimpleType::Atomic { builtin, facets } => {
                facets.white_space.unwrap_or_else(|| builtin.white_space())
            }
            SimpleType::List { .. } => WhiteSpace::Collapse,
            SimpleType::Union { .. } => WhiteSpace::Collapse,
        }
    }

    /// Facets that a restriction of this type may specify
    pub fn admitted_facets(&self) -> &'static [FacetKind] {
        match self {
            SimpleType::Atomic { builtin, .. } => builtin.admitted_facets(),
            SimpleType::List { .. } => STRING_FACETS,
            SimpleType::Union { .. } => UNION_FACETS,
        }
    }

    /// Derive a new type by restriction with additional facets
    pub fn restrict(&self, derived: FacetSet) -> SimpleType {
        match self {
            SimpleType::Atomic { builtin, facets } => SimpleType::Atomic {
                builtin: *builtin,
                facets: facets.restrict(derived),
            },
            SimpleType::List { item, facets } => SimpleType::List {
                item: item.clone(),
                facets: facets.restrict(derived),
            },
            SimpleType::Union { members, facets } => SimpleType::Union {
                members: members.clone(),
                facets: facets.restrict(derived),
            },
        }
    }

    /// Map a facet literal (enumeration or bound) into this type's value space
    ///
    /// The literal is checked against the lexical space but not against the
    /// facets, so an enumeration may narrow an earlier enumeration.
    pub fn parse_facet_value(&self, literal: &str) -> Result<Option<XsdValue>, String> {
        match self {
            SimpleType::Atomic { builtin, .. } => {
                let normalized = self.white_space().normalize(literal);
                builtin
                    .parse(&normalized)
                    .map(Some)
                    .map_err(|_| format!("'{}' is not a valid value of {}", literal, builtin))
            }
            _ => Ok(None),
        }
    }

    /// Validate a raw lexical value
    ///
    /// `type_name` names the type in diagnostics; anonymous types pass None.
    /// On failure returns the diagnostic text without any element or
    /// attribute prefix.
    pub fn validate(&self, raw: &str, type_name: Option<&str>) -> Result<ValidatedValue, String> {
        let normalized = self.white_space().normalize(raw);
        let invalid = || match type_name {
            Some(name) => format!(
                "'{}' is not a valid value of the {} type '{}'.",
                normalized,
                self.variety().word(),
                name
            ),
            None => format!(
                "'{}' is not a valid value of the local {} type.",
                normalized,
                self.variety().word()
            ),
        };

        match self {
            SimpleType::Atomic { builtin, facets } => {
                let value = builtin.parse(&normalized).map_err(|_| invalid())?;

                facets.check_enumeration(&normalized, Some(&value))?;
                facets.check_range(&normalized, &value)?;
                if !matches!(builtin.primitive(), BuiltinType::QName | BuiltinType::Notation) {
                    if let Some(len) = value.length() {
                        facets.check_length(&normalized, len)?;
                    }
                }
                facets.check_patterns(&normalized)?;
                facets.check_digits(&normalized, &value)?;

                let mut result = ValidatedValue {
                    normalized: normalized.clone(),
                    value: Some(value),
                    ids: Vec::new(),
                    idrefs: Vec::new(),
                };
                if builtin.is_id() {
                    result.ids.push(normalized);
                } else if builtin.is_idref() {
                    result.idrefs.push(normalized);
                }
                Ok(result)
            }
            SimpleType::List { item, facets } => {
                let mut result = ValidatedValue {
                    normalized: normalized.clone(),
                    value: None,
                    ids: Vec::new(),
                    idrefs: Vec::new(),
                };
                let mut count = 0usize;
                for token in normalized.split(' ').filter(|t| !t.is_empty()) {
                    let accepted = item.validate(token, None).map_err(|_| invalid())?;
                    result.ids.extend(accepted.ids);
                    result.idrefs.extend(accepted.idrefs);
                    count += 1;
                }

                facets.check_enumeration(&normalized, None)?;
                facets.check_length(&normalized, count)?;
                facets.check_patterns(&normalized)?;
                Ok(result)
            }
            SimpleType::Union { members, facets } => {
                let accepted = members
                    .iter()
                    .find_map(|member| member.validate(raw, None).ok())
                    .ok_or_else(invalid)?;

                facets.check_enumeration(&accepted.normalized, accepted.value.as_ref())?;
                facets.check_patterns(&accepted.normalized)?;
                Ok(accepted)
            }
        }
    }
}
