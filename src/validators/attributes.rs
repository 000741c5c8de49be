//! XSD attribute declarations
//!
//! This module implements attribute declarations, attribute uses inside
//! complex types and named attribute groups.

use indexmap::IndexMap;

use crate::namespaces::QName;

use super::globals::TypeId;
use super::wildcards::Wildcard;

/// Attribute use mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UseMode {
    /// Attribute is optional (default)
    #[default]
    Optional,
    /// Attribute is required
    Required,
    /// Attribute is prohibited
    Prohibited,
}

impl UseMode {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "optional" => Some(UseMode::Optional),
            "required" => Some(UseMode::Required),
            "prohibited" => Some(UseMode::Prohibited),
            _ => None,
        }
    }
}

/// A value constraint: `default` or `fixed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueConstraint {
    /// Value supplied when the item is absent or empty
    Default(String),
    /// Value the item must have
    Fixed(String),
}

impl ValueConstraint {
    /// The fixed value, if this is a fixed constraint
    pub fn fixed(&self) -> Option<&str> {
        match self {
            ValueConstraint::Fixed(v) => Some(v),
            ValueConstraint::Default(_) => None,
        }
    }

    /// The constrained value
    pub fn value(&self) -> &str {
        match self {
            ValueConstraint::Default(v) | ValueConstraint::Fixed(v) => v,
        }
    }
}

/// A compiled attribute declaration (global, or local to a type)
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    /// Attribute name
    pub name: QName,
    /// Simple type of the attribute value
    pub type_id: TypeId,
    /// Value constraint
    pub constraint: Option<ValueConstraint>,
}

/// An attribute as it applies to a complex type
#[derive(Debug, Clone)]
pub struct AttributeUse {
    /// The declaration
    pub decl: AttributeDecl,
    /// Whether the attribute must be present
    pub required: bool,
}

impl AttributeUse {
    /// Attribute name
    pub fn name(&self) -> &QName {
        &self.decl.name
    }
}

/// Attribute uses keyed by name, in declaration order
pub type AttributeUses = IndexMap<QName, AttributeUse>;

/// A named attribute group or the attribute part of a complex type
#[derive(Debug, Clone, Default)]
pub struct AttributeGroup {
    /// Attribute uses
    pub attributes: AttributeUses,
    /// Names declared `use="prohibited"`; removed when restricting a base
    pub prohibited: Vec<QName>,
    /// Attribute wildcard
    pub wildcard: Option<Wildcard>,
}

impl AttributeGroup {
    /// Create an empty attribute group
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge another group in; a duplicate name is reported back
    pub fn merge(&mut self, other: &AttributeGroup) -> Result<(), QName> {
        for (name, attribute) in &other.attributes {
            if self.attributes.contains_key(name) {
                return Err(name.clone());
            }
            self.attributes.insert(name.clone(), attribute.clone());
        }
        self.prohibited.extend(other.prohibited.iter().cloned());
        self.wildcard = match (self.wildcard.take(), &other.wildcard) {
            (Some(mine), Some(theirs)) => Some(mine.intersection(theirs)),
            (mine, theirs) => mine.or_else(|| theirs.clone()),
        };
        Ok(())
    }

    /// Whether the group declares nothing
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.wildcard.is_none()
    }
}
