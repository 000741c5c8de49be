//! XSD Element declarations
//!
//! Elements are the primary building blocks of XML documents.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Element_Declarations

use crate::namespaces::QName;

use super::attributes::ValueConstraint;
use super::globals::{ElementId, TypeId};
use super::identities::XsdIdentity;

/// Element or attribute form (qualified or unqualified)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Form {
    /// Name must be namespace-qualified
    Qualified,
    /// Name is unqualified
    #[default]
    Unqualified,
}

impl Form {
    /// Parse from string attribute value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "qualified" => Some(Self::Qualified),
            "unqualified" => Some(Self::Unqualified),
            _ => None,
        }
    }
}

/// A compiled element declaration
#[derive(Debug, Clone)]
pub struct ElementDecl {
    /// Expanded element name
    pub name: QName,
    /// Declared type
    pub type_id: TypeId,
    /// Whether `xsi:nil` may be used
    pub nillable: bool,
    /// Whether the declaration may not appear in instances
    pub is_abstract: bool,
    /// Value constraint on simple content
    pub constraint: Option<ValueConstraint>,
    /// Substitution group head, for global declarations
    pub substitution_group: Option<ElementId>,
    /// Whether this is a top-level declaration
    pub global: bool,
    /// unique, key and keyref constraints scoped to this element
    pub identities: Vec<XsdIdentity>,
    /// 1-based line of the declaration in the schema
    pub line: u32,
    /// 1-based column of the declaration in the schema
    pub column: u32,
}

impl ElementDecl {
    /// Create a declaration with no constraints
    pub fn new(name: QName, type_id: TypeId) -> Self {
        Self {
            name,
            type_id,
            nillable: false,
            is_abstract: false,
            constraint: None,
            substitution_group: None,
            global: false,
            identities: Vec::new(),
            line: 0,
            column: 0,
        }
    }

    /// The fixed value, if any
    pub fn fixed(&self) -> Option<&str> {
        self.constraint.as_ref().and_then(ValueConstraint::fixed)
    }
}
