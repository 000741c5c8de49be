//! XSD Complex Type definitions
//!
//! Complex types can have element content (model groups), simple content,
//! mixed content with both text and elements, or no content at all.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Complex_Type_Definitions

use std::fmt;

use super::attributes::AttributeGroup;
use super::globals::TypeId;
use super::groups::Particle;

/// Derivation method for types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivationMethod {
    /// Type derived by restriction
    #[default]
    Restriction,
    /// Type derived by extension
    Extension,
}

impl DerivationMethod {
    /// Parse from the derivation element's local name
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "restriction" => Some(Self::Restriction),
            "extension" => Some(Self::Extension),
            _ => None,
        }
    }
}

impl fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restriction => write!(f, "restriction"),
            Self::Extension => write!(f, "extension"),
        }
    }
}

/// Content type of a complex type
#[derive(Debug, Clone)]
pub enum ContentType {
    /// No character data and no child elements
    Empty,
    /// Character data valid against a simple type
    Simple(TypeId),
    /// Child elements only; whitespace text is ignored
    ElementOnly(Particle),
    /// Child elements interleaved with arbitrary text
    Mixed(Particle),
}

impl ContentType {
    /// Content model particle, for element-only and mixed content
    pub fn particle(&self) -> Option<&Particle> {
        match self {
            ContentType::ElementOnly(p) | ContentType::Mixed(p) => Some(p),
            _ => None,
        }
    }

    /// Whether character data is allowed beside child elements
    pub fn is_mixed(&self) -> bool {
        matches!(self, ContentType::Mixed(_))
    }

    /// Label for diagnostics and summaries
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Empty => "empty",
            ContentType::Simple(_) => "simple",
            ContentType::ElementOnly(_) => "element-only",
            ContentType::Mixed(_) => "mixed",
        }
    }
}

/// A compiled complex type
#[derive(Debug, Clone)]
pub struct ComplexType {
    /// Content type
    pub content: ContentType,
    /// Attribute uses and wildcard
    pub attributes: AttributeGroup,
}

impl ComplexType {
    /// Complex type with the given content and no attributes
    pub fn new(content: ContentType) -> Self {
        Self {
            content,
            attributes: AttributeGroup::new(),
        }
    }

    /// Empty content, no attributes
    pub fn empty() -> Self {
        Self::new(ContentType::Empty)
    }
}
