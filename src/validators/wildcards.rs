//! XSD Wildcard validators
//!
//! This module implements wildcards for XSD element and attribute content:
//! - xs:any - allows any element from specified namespaces
//! - xs:anyAttribute - allows any attribute from specified namespaces
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Wildcards

use std::collections::BTreeSet;
use std::fmt;

use crate::namespaces::QName;

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// Validate strictly - element/attribute must be declared
    #[default]
    Strict,
    /// Validate if declaration found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl ProcessContents {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Namespace constraint for wildcards
///
/// Namespaces are stored as strings with the empty string standing for
/// "no namespace".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceConstraint {
    /// Any namespace is allowed (##any)
    #[default]
    Any,
    /// Any namespace except target namespace and no namespace (##other)
    Other {
        /// The target namespace to exclude
        target_namespace: Option<String>,
    },
    /// Specific set of allowed namespaces
    Enumeration(BTreeSet<String>),
}

impl NamespaceConstraint {
    /// Create from namespace attribute value
    pub fn from_namespace_attr(value: &str, target_namespace: Option<&str>) -> Result<Self, String> {
        match value.trim() {
            "##any" => Ok(Self::Any),
            "##other" => Ok(Self::Other {
                target_namespace: target_namespace.map(String::from),
            }),
            value => {
                let mut namespaces = BTreeSet::new();
                for ns in value.split_whitespace() {
                    match ns {
                        "##local" => {
                            namespaces.insert(String::new());
                        }
                        "##targetNamespace" => {
                            namespaces.insert(target_namespace.unwrap_or("").to_string());
                        }
                        s if s.starts_with("##") => {
                            return Err(format!("wrong value '{}' in 'namespace' attribute", s));
                        }
                        s => {
                            namespaces.insert(s.to_string());
                        }
                    }
                }
                Ok(Self::Enumeration(namespaces))
            }
        }
    }

    /// Check if a namespace (None = no namespace) is allowed by this constraint
    pub fn is_allowed(&self, namespace: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Other { target_namespace } => match namespace {
                None | Some("") => false,
                Some(ns) => target_namespace.as_deref() != Some(ns),
            },
            Self::Enumeration(set) => set.contains(namespace.unwrap_or("")),
        }
    }

    /// Compute union with another constraint
    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (a @ Self::Other { .. }, b @ Self::Other { .. }) if a == b => a.clone(),
            (Self::Enumeration(a), Self::Enumeration(b)) => {
                Self::Enumeration(a.union(b).cloned().collect())
            }
            (not @ Self::Other { target_namespace }, Self::Enumeration(set))
            | (Self::Enumeration(set), not @ Self::Other { target_namespace }) => {
                let excluded = target_namespace.as_deref().unwrap_or("");
                if set.contains(excluded) {
                    Self::Any
                } else {
                    not.clone()
                }
            }
            _ => Self::Any,
        }
    }

    /// Compute intersection with another constraint
    pub fn intersection(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, x) | (x, Self::Any) => x.clone(),
            (a @ Self::Other { .. }, Self::Enumeration(set))
            | (Self::Enumeration(set), a @ Self::Other { .. }) => Self::Enumeration(
                set.iter()
                    .filter(|ns| a.is_allowed(Some(ns.as_str())))
                    .cloned()
                    .collect(),
            ),
            (Self::Enumeration(a), Self::Enumeration(b)) => {
                Self::Enumeration(a.intersection(b).cloned().collect())
            }
            (a @ Self::Other { .. }, b @ Self::Other { .. }) if a == b => a.clone(),
            // Two different ##other sets cannot be expressed; keep the first
            _ => self.clone(),
        }
    }
}

/// A compiled `xs:any` or `xs:anyAttribute`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Wildcard {
    /// Namespace constraint
    pub namespace: NamespaceConstraint,
    /// Process contents mode
    pub process_contents: ProcessContents,
}

impl Wildcard {
    /// Create a wildcard
    pub fn new(namespace: NamespaceConstraint, process_contents: ProcessContents) -> Self {
        Self {
            namespace,
            process_contents,
        }
    }

    /// The lax `##any` wildcard used by `xs:anyType`
    pub fn any_lax() -> Self {
        Self::new(NamespaceConstraint::Any, ProcessContents::Lax)
    }

    /// Check whether a name falls within this wildcard
    pub fn matches(&self, name: &QName) -> bool {
        self.namespace.is_allowed(name.namespace.as_deref())
    }

    /// Union of two attribute wildcards; process contents of `self` wins
    pub fn union(&self, other: &Wildcard) -> Wildcard {
        Wildcard::new(self.namespace.union(&other.namespace), self.process_contents)
    }

    /// Intersection of two attribute wildcards; process contents of `self` wins
    pub fn intersection(&self, other: &Wildcard) -> Wildcard {
        Wildcard::new(
            self.namespace.intersection(&other.namespace),
            self.process_contents,
        )
    }

    /// Short description of the namespace constraint for diagnostics
    pub fn describe(&self) -> String {
        match &self.namespace {
            NamespaceConstraint::Any => "##any".to_string(),
            NamespaceConstraint::Other { .. } => "##other".to_string(),
            NamespaceConstraint::Enumeration(set) => set
                .iter()
                .map(|ns| if ns.is_empty() { "##local" } else { ns.as_str() })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}
