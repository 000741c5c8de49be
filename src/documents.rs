//! XML document tree
//!
//! An owned element tree built from `roxmltree`. Every element carries its
//! resolved qualified name, attributes, direct character data, in-scope
//! namespace bindings and its source position. Schemas and instance
//! documents share this representation.

use roxmltree::{NodeType, ParsingOptions};

use crate::error::{Result, XmlOrigin, XmlParseError};
use crate::limits::Limits;
use crate::namespaces::{NamespaceContext, QName};

/// An attribute on an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute qualified name (unprefixed attributes have no namespace)
    pub qname: QName,
    /// Attribute value after XML attribute-value normalization
    pub value: String,
}

/// XML Element in the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Element qualified name
    pub qname: QName,
    /// Element attributes in document order
    pub attributes: Vec<Attribute>,
    /// Concatenated character data directly inside this element, if any
    pub text: Option<String>,
    /// Child elements in document order
    pub children: Vec<Element>,
    /// In-scope namespace bindings
    pub namespaces: NamespaceContext,
    /// 1-based line of the start tag
    pub line: u32,
    /// 1-based column of the start tag
    pub column: u32,
}

impl Element {
    /// Create a new element
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
            namespaces: NamespaceContext::new(),
            line: 0,
            column: 0,
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace.as_deref()
    }

    /// Get an unqualified attribute value by local name
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.qname.namespace.is_none() && a.qname.local_name == name)
            .map(|a| a.value.as_str())
    }

    /// Get an attribute value by qualified name
    pub fn get_attribute_qname(&self, qname: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| &a.qname == qname)
            .map(|a| a.value.as_str())
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append character data
    pub fn push_text(&mut self, text: &str) {
        match self.text {
            Some(ref mut existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Character data, empty when there is none
    pub fn text_content(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Whether the element has character data other than XML whitespace
    pub fn has_significant_text(&self) -> bool {
        self.text
            .as_deref()
            .is_some_and(|t| t.chars().any(|c| !matches!(c, ' ' | '\t' | '\n' | '\r')))
    }

    /// Find child elements by local name
    pub fn find_children<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children
            .iter()
            .filter(move |e| e.local_name() == local_name)
    }
}

/// XML Document representation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Root element of the document
    pub root: Option<Element>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an instance document from a string with default limits
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse(xml, XmlOrigin::Document, &Limits::default())
    }

    /// Parse XML text, tagging failures with where the text came from
    pub fn parse(xml: &str, origin: XmlOrigin, limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;

        let mut options = ParsingOptions::default();
        options.allow_dtd = true;
        options.nodes_limit = limits.max_xml_nodes;

        let doc = roxmltree::Document::parse_with_options(xml, options)
            .map_err(|e| XmlParseError::from_roxmltree(origin, &e))?;
        Ok(Self::from_roxmltree(&doc))
    }

    /// Build an owned tree from an already parsed `roxmltree` document
    pub fn from_roxmltree(doc: &roxmltree::Document<'_>) -> Self {
        Self {
            root: Some(build_element(doc, doc.root_element())),
        }
    }

    /// Get the root element
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }
}

/// Convert an element node and its subtree
fn build_element(doc: &roxmltree::Document<'_>, node: roxmltree::Node<'_, '_>) -> Element {
    let mut element = convert_element(doc, node);
    for child in node.children() {
        match child.node_type() {
            NodeType::Element => element.add_child(build_element(doc, child)),
            NodeType::Text => {
                if let Some(text) = child.text() {
                    element.push_text(text);
                }
            }
            _ => {}
        }
    }
    element
}

fn convert_element(doc: &roxmltree::Document<'_>, node: roxmltree::Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let mut element = Element::new(QName::new(tag.namespace(), tag.name()));

    let pos = doc.text_pos_at(node.range().start);
    element.line = pos.row;
    element.column = pos.col;

    for ns in node.namespaces() {
        match ns.name() {
            Some(prefix) => element.namespaces.add_prefix(prefix, ns.uri()),
            None => element.namespaces.set_default_namespace(ns.uri()),
        }
    }

    element.attributes = node
        .attributes()
        .map(|attr| Attribute {
            qname: QName::new(attr.namespace(), attr.name()),
            value: attr.value().to_string(),
        })
        .collect();

    element
}
