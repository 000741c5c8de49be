//! XSD Identity Constraints
//!
//! This module implements identity constraints for XML Schema:
//! - xs:unique - selected key-sequences must be distinct
//! - xs:key - like unique, and every field must be present
//! - xs:keyref - every key-sequence must match one of a key or unique
//!
//! Selectors and fields use the restricted XPath subset of XML Schema 1.0:
//! unions of child-axis paths, optionally starting with `.//`, where a field
//! may end with an attribute step. Paths are compiled once, with prefixes
//! resolved against the declaring schema element, and evaluated over the
//! owned instance tree.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cIdentity-constraint_Definitions

use std::collections::HashMap;
use std::fmt;

use crate::documents::Element;
use crate::error::PathStep;
use crate::names::{is_valid_ncname, is_valid_qname, split_qname};
use crate::namespaces::{NamespaceContext, QName};

/// A tuple of field values forming a composite key
pub type FieldTuple = Vec<String>;

/// Type of identity constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityConstraintKind {
    /// xs:unique - values must be unique, but fields can be missing
    Unique,
    /// xs:key - values must be unique AND all fields must be present
    Key,
    /// xs:keyref - references a key or unique constraint
    Keyref,
}

impl IdentityConstraintKind {
    /// Parse from element local name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "unique" => Some(Self::Unique),
            "key" => Some(Self::Key),
            "keyref" => Some(Self::Keyref),
            _ => None,
        }
    }
}

impl fmt::Display for IdentityConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unique => write!(f, "unique"),
            Self::Key => write!(f, "key"),
            Self::Keyref => write!(f, "keyref"),
        }
    }
}

// =============================================================================
// Restricted XPath
// =============================================================================

/// Name test of a child or attribute step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    /// `*`
    Any,
    /// `prefix:*`
    Namespace(Option<String>),
    /// A qualified name; unprefixed names have no namespace
    Name(QName),
}

impl NameTest {
    fn matches(&self, name: &QName) -> bool {
        match self {
            Self::Any => true,
            Self::Namespace(ns) => name.namespace == *ns,
            Self::Name(expected) => expected == name,
        }
    }
}

/// One location step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `.`
    SelfNode,
    /// A child element step
    Child(NameTest),
}

/// One branch of a selector or field union
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    /// Starts with `.//`
    pub descendants: bool,
    /// Element steps, in order
    pub steps: Vec<Step>,
    /// Final attribute step, fields only
    pub attribute: Option<NameTest>,
}

/// An element reached by a selector, with its path below the scope element
#[derive(Debug, Clone)]
pub struct SelectedNode<'d> {
    /// The selected element
    pub element: &'d Element,
    /// Steps from the scope element down to it
    pub path: Vec<PathStep>,
}

impl PathExpr {
    /// Elements this path reaches from `scope`, before any attribute step
    pub fn select<'d>(&self, scope: &'d Element) -> Vec<SelectedNode<'d>> {
        let start = SelectedNode {
            element: scope,
            path: Vec::new(),
        };
        let mut current = if self.descendants {
            let mut all = Vec::new();
            descendants_or_self(start, &mut all);
            all
        } else {
            vec![start]
        };

        for step in &self.steps {
            if let Step::Child(test) = step {
                current = current.iter().flat_map(|node| children(node, test)).collect();
            }
        }
        current
    }
}

fn children<'d>(node: &SelectedNode<'d>, test: &NameTest) -> Vec<SelectedNode<'d>> {
    let mut seen: HashMap<&QName, usize> = HashMap::new();
    let mut selected = Vec::new();
    for child in &node.element.children {
        let count = seen.entry(&child.qname).or_insert(0);
        *count += 1;
        if test.matches(&child.qname) {
            selected.push(child_node(node, child, *count));
        }
    }
    selected
}

fn child_node<'d>(parent: &SelectedNode<'d>, child: &'d Element, index: usize) -> SelectedNode<'d> {
    let mut path = parent.path.clone();
    path.push(PathStep {
        name: child.local_name().to_string(),
        index,
        attribute: false,
    });
    SelectedNode { element: child, path }
}

fn descendants_or_self<'d>(node: SelectedNode<'d>, out: &mut Vec<SelectedNode<'d>>) {
    let element = node.element;
    let mut seen: HashMap<&QName, usize> = HashMap::new();
    let mut below = Vec::with_capacity(element.children.len());
    for child in &element.children {
        let count = seen.entry(&child.qname).or_insert(0);
        *count += 1;
        below.push(child_node(&node, child, *count));
    }
    out.push(node);
    for child in below {
        descendants_or_self(child, out);
    }
}

/// Compile a selector (`allow_attribute` false) or field expression
pub fn parse_xpath(
    xpath: &str,
    namespaces: &NamespaceContext,
    allow_attribute: bool,
) -> Result<Vec<PathExpr>, String> {
    let compact: String = xpath.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err("the expression is empty".to_string());
    }
    compact
        .split('|')
        .map(|branch| parse_path(branch, namespaces, allow_attribute))
        .collect()
}

fn parse_path(
    branch: &str,
    namespaces: &NamespaceContext,
    allow_attribute: bool,
) -> Result<PathExpr, String> {
    let (descendants, rest) = match branch.strip_prefix(".//") {
        Some(rest) => (true, rest),
        None => (false, branch),
    };
    if rest.is_empty() {
        return Err(format!("'{}' has no location step", branch));
    }

    let parts: Vec<&str> = rest.split('/').collect();
    let mut path = PathExpr {
        descendants,
        steps: Vec::with_capacity(parts.len()),
        attribute: None,
    };
    for (i, part) in parts.iter().enumerate() {
        let last = i + 1 == parts.len();
        let attribute = part
            .strip_prefix('@')
            .or_else(|| part.strip_prefix("attribute::"));
        match attribute {
            Some(name) if allow_attribute && last => {
                path.attribute = Some(parse_name_test(name, namespaces)?);
            }
            Some(_) => return Err(format!("attribute step '{}' is not allowed here", part)),
            None if *part == "." => path.steps.push(Step::SelfNode),
            None => {
                let name = part.strip_prefix("child::").unwrap_or(part);
                path.steps.push(Step::Child(parse_name_test(name, namespaces)?));
            }
        }
    }
    Ok(path)
}

fn parse_name_test(test: &str, namespaces: &NamespaceContext) -> Result<NameTest, String> {
    if test == "*" {
        return Ok(NameTest::Any);
    }
    if let Some(prefix) = test.strip_suffix(":*") {
        if !is_valid_ncname(prefix) {
            return Err(format!("'{}' is not a valid name test", test));
        }
        return resolve_prefix(prefix, namespaces).map(|ns| NameTest::Namespace(Some(ns)));
    }
    if !is_valid_qname(test) {
        return Err(format!("'{}' is not a valid name test", test));
    }
    match split_qname(test) {
        (Some(prefix), local) => {
            let ns = resolve_prefix(prefix, namespaces)?;
            Ok(NameTest::Name(QName::namespaced(ns, local)))
        }
        (None, local) => Ok(NameTest::Name(QName::local(local))),
    }
}

fn resolve_prefix(prefix: &str, namespaces: &NamespaceContext) -> Result<String, String> {
    namespaces
        .get_namespace(prefix)
        .map(str::to_string)
        .ok_or_else(|| format!("the prefix '{}' is not bound", prefix))
}

// =============================================================================
// Constraint components
// =============================================================================

/// XPath selector for identity constraints.
/// The selector identifies which elements are subject to the constraint.
#[derive(Debug, Clone)]
pub struct XsdSelector {
    /// The XPath expression
    pub xpath: String,
    paths: Vec<PathExpr>,
}

impl XsdSelector {
    /// Compile a selector expression
    pub fn parse(xpath: &str, namespaces: &NamespaceContext) -> Result<Self, String> {
        Ok(Self {
            xpath: xpath.to_string(),
            paths: parse_xpath(xpath, namespaces, false)?,
        })
    }

    /// Selected elements in document order
    pub fn select<'d>(&self, scope: &'d Element) -> Vec<SelectedNode<'d>> {
        let mut nodes: Vec<SelectedNode<'d>> =
            self.paths.iter().flat_map(|p| p.select(scope)).collect();
        nodes.sort_by_key(|n| (n.element.line, n.element.column));
        nodes.dedup_by(|a, b| std::ptr::eq(a.element, b.element));
        nodes
    }
}

/// XPath field selector for identity constraints.
/// Fields identify which values form the key within selected elements.
#[derive(Debug, Clone)]
pub struct XsdField {
    /// The XPath expression
    pub xpath: String,
    paths: Vec<PathExpr>,
}

impl XsdField {
    /// Compile a field expression
    pub fn parse(xpath: &str, namespaces: &NamespaceContext) -> Result<Self, String> {
        Ok(Self {
            xpath: xpath.to_string(),
            paths: parse_xpath(xpath, namespaces, true)?,
        })
    }

    /// Whitespace-collapsed values of every node the field reaches
    pub fn values(&self, node: &Element) -> Vec<String> {
        let mut values = Vec::new();
        for path in &self.paths {
            for selected in path.select(node) {
                match &path.attribute {
                    Some(test) => values.extend(
                        selected
                            .element
                            .attributes
                            .iter()
                            .filter(|a| test.matches(&a.qname))
                            .map(|a| collapse(&a.value)),
                    ),
                    None => values.push(collapse(selected.element.text_content())),
                }
            }
        }
        values
    }
}

fn collapse(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A compiled identity constraint, owned by its element declaration
#[derive(Debug, Clone)]
pub struct XsdIdentity {
    /// Constraint name
    pub name: QName,
    /// Kind of constraint
    pub kind: IdentityConstraintKind,
    /// XPath selector
    pub selector: XsdSelector,
    /// XPath fields
    pub fields: Vec<XsdField>,
    /// Referenced key or unique, for keyref
    pub refer: Option<QName>,
}

impl XsdIdentity {
    /// Check if this is a keyref constraint
    pub fn is_keyref(&self) -> bool {
        matches!(self.kind, IdentityConstraintKind::Keyref)
    }

    /// Key-sequences of every selected node below `scope`
    ///
    /// A node with a missing field yields `Ok(None)`, except for keys where it
    /// is an error, as is a field that reaches more than one node.
    pub fn key_sequences<'d>(
        &self,
        scope: &'d Element,
    ) -> Vec<(SelectedNode<'d>, Result<Option<FieldTuple>, String>)> {
        self.selector
            .select(scope)
            .into_iter()
            .map(|node| {
                let fields = self.fields_of(node.element);
                (node, fields)
            })
            .collect()
    }

    fn fields_of(&self, element: &Element) -> Result<Option<FieldTuple>, String> {
        let mut tuple = Vec::with_capacity(self.fields.len());
        let mut complete = true;
        for field in &self.fields {
            let mut values = field.values(element);
            match values.len() {
                0 => complete = false,
                1 => tuple.extend(values.pop()),
                _ => {
                    return Err(format!(
                        "The XPath '{}' of a field of {} identity-constraint '{}' evaluates to a node-set with more than one member.",
                        field.xpath, self.kind, self.name
                    ))
                }
            }
        }
        match (complete, self.kind) {
            (true, _) => Ok(Some(tuple)),
            (false, IdentityConstraintKind::Key) => Err(format!(
                "Not all fields of key identity-constraint '{}' evaluate to a node-set with exactly one member.",
                self.name
            )),
            (false, _) => Ok(None),
        }
    }
}

/// Format a key-sequence the way diagnostics show it: `['a', 'b']`
pub fn key_sequence(fields: &[String]) -> String {
    format!("['{}']", fields.join("', '"))
}

/// Key-sequences collected for one key or unique constraint
#[derive(Debug, Clone, Default)]
pub struct IdentityCounter {
    counter: HashMap<FieldTuple, usize>,
}

impl IdentityCounter {
    /// Create an empty counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a key-sequence; returns how often it has now been seen
    pub fn increase(&mut self, fields: FieldTuple) -> usize {
        let count = self.counter.entry(fields).or_insert(0);
        *count += 1;
        *count
    }

    /// Check if a field tuple exists
    pub fn contains(&self, fields: &[String]) -> bool {
        self.counter.contains_key(fields)
    }

    /// Add every key-sequence of another counter
    pub fn merge(&mut self, other: IdentityCounter) {
        for (fields, count) in other.counter {
            *self.counter.entry(fields).or_insert(0) += count;
        }
    }

    /// Get the number of distinct field tuples
    pub fn len(&self) -> usize {
        self.counter.len()
    }

    /// Check if counter is empty
    pub fn is_empty(&self) -> bool {
        self.counter.is_empty()
    }
}

/// Key and unique tables visible at one element, by constraint name
pub type KeyTables = HashMap<QName, IdentityCounter>;
