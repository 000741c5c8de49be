//! XML Schema validators
//!
//! [`XsdSchema`] is the compiled, immutable form of one or more schema
//! documents. It is built once and can then validate any number of instance
//! documents, from any number of threads.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::document_validation::validate_document;
use super::globals::{ComponentCounts, XsdGlobals};
use super::parsing::compile_documents;

use crate::documents::Document;
use crate::error::{Error, Result, ValidationError, XmlOrigin};
use crate::limits::Limits;
use crate::namespaces::QName;

/// A compiled XML Schema
#[derive(Debug, Clone)]
pub struct XsdSchema {
    globals: XsdGlobals,
    sources: Vec<Arc<Document>>,
    target_namespaces: Vec<Option<String>>,
    limits: Limits,
}

impl XsdSchema {
    /// Compile a schema from its source text
    pub fn from_string(xsd: &str) -> Result<Self> {
        Self::from_string_with_limits(xsd, Limits::default())
    }

    /// Compile a schema from source text under the given limits
    ///
    /// The limits apply to parsing the schema and to every later validation.
    pub fn from_string_with_limits(xsd: &str, limits: Limits) -> Result<Self> {
        let document = Document::parse(xsd, XmlOrigin::Schema, &limits)?;
        Self::from_documents(vec![document]).map(|schema| schema.with_limits(limits))
    }

    /// Compile a schema from an already parsed schema document
    pub fn from_document(document: Document) -> Result<Self> {
        Self::from_documents(vec![document])
    }

    /// Compile several schema documents into one schema
    ///
    /// Each document keeps its own target namespace and prefix bindings.
    /// Cross-document references resolve by qualified name.
    pub fn from_documents(documents: Vec<Document>) -> Result<Self> {
        Self::from_shared_documents(documents.into_iter().map(Arc::new).collect())
    }

    /// Compile schema documents the caller also holds on to
    ///
    /// The schema keeps every source document alive for its own lifetime.
    pub fn from_shared_documents(sources: Vec<Arc<Document>>) -> Result<Self> {
        debug!(documents = sources.len(), "compiling schema");
        let components = compile_documents(sources.iter().map(Arc::as_ref))?;

        let schema = Self {
            globals: components.globals,
            sources,
            target_namespaces: components.target_namespaces,
            limits: Limits::default(),
        };
        let counts = schema.counts();
        debug!(
            types = counts.types,
            elements = counts.elements,
            attributes = counts.attributes,
            groups = counts.groups,
            "schema compiled"
        );
        Ok(schema)
    }

    /// Compile a schema from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_string(&text)
    }

    /// Compile several schema files into one schema
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let limits = Limits::default();
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
            documents.push(Document::parse(&text, XmlOrigin::Schema, &limits)?);
        }
        Self::from_documents(documents)
    }

    /// Replace the limits used by later validations
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Limits in effect for validation
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Schema documents this schema was compiled from, in input order
    pub fn source_documents(&self) -> &[Arc<Document>] {
        &self.sources
    }

    /// Target namespaces of the compiled documents, in input order
    pub fn target_namespaces(&self) -> &[Option<String>] {
        &self.target_namespaces
    }

    /// The compiled symbol table
    pub fn globals(&self) -> &XsdGlobals {
        &self.globals
    }

    /// Number of global components by kind
    pub fn counts(&self) -> ComponentCounts {
        self.globals.counts()
    }

    /// Names of the global element declarations
    pub fn global_element_names(&self) -> Vec<&QName> {
        let mut names: Vec<&QName> = self.globals.global_elements().map(|(name, _)| name).collect();
        names.sort();
        names
    }

    /// Validate a parsed document
    ///
    /// Returns every validation error in document order; an empty list
    /// means the document is valid.
    pub fn validate(&self, document: &Document) -> Vec<ValidationError> {
        debug!("validating document");
        let errors = validate_document(&self.globals, &self.limits, document);
        debug!(errors = errors.len(), "validation finished");
        errors
    }

    /// Parse and validate a document given as text
    pub fn validate_string(&self, xml: &str) -> Result<Vec<ValidationError>> {
        let document = Document::parse(xml, XmlOrigin::Document, &self.limits)?;
        Ok(self.validate(&document))
    }

    /// Parse and validate a document file
    pub fn validate_file(&self, path: impl AsRef<Path>) -> Result<Vec<ValidationError>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        self.validate_string(&text)
    }

    /// Check whether a parsed document is valid
    pub fn is_valid(&self, document: &Document) -> bool {
        self.validate(document).is_empty()
    }
}

impl fmt::Display for XsdSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.counts();
        write!(
            f,
            "XsdSchema(types={}, elements={}, attributes={}, groups={}, attribute_groups={})",
            counts.types, counts.elements, counts.attributes, counts.groups, counts.attribute_groups
        )
    }
}
