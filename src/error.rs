//! Error types for xsdcheck
//!
//! Failures that abort an operation (unreadable files, malformed XML, broken
//! schemas) are variants of [`Error`]. Document non-conformance is not a
//! failure: it is reported as a list of [`ValidationError`] records.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::namespaces::QName;

/// Result type alias using xsdcheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xsdcheck operations
#[derive(Error, Debug)]
pub enum Error {
    /// A schema or instance file could not be read
    #[error("I/O error reading '{}': {source}", path.display())]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Schema or instance text is not well-formed XML
    #[error("XML error: {0}")]
    XmlParse(#[from] XmlParseError),

    /// The schema is structurally invalid
    #[error("schema error: {0}")]
    SchemaCompile(#[from] CompileError),

    /// A configured resource limit was exceeded
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
}

impl Error {
    /// Create an I/O error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// True for malformed XML input
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::XmlParse(_))
    }

    /// True for schema compilation failures
    pub fn is_compile_error(&self) -> bool {
        matches!(self, Error::SchemaCompile(_))
    }
}

/// Which input a parse error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum XmlOrigin {
    /// The XSD source
    Schema,
    /// The instance document
    Document,
}

impl fmt::Display for XmlOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmlOrigin::Schema => write!(f, "schema"),
            XmlOrigin::Document => write!(f, "document"),
        }
    }
}

/// Malformed XML input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlParseError {
    /// Schema or document
    pub origin: XmlOrigin,
    /// Parser message
    pub message: String,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

impl XmlParseError {
    /// Convert a roxmltree error
    pub fn from_roxmltree(origin: XmlOrigin, err: &roxmltree::Error) -> Self {
        let pos = err.pos();
        Self {
            origin,
            message: err.to_string(),
            line: pos.row,
            column: pos.col,
        }
    }
}

impl fmt::Display for XmlParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed {}: {}", self.origin, self.message)
    }
}

impl std::error::Error for XmlParseError {}

/// XML Schema compilation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Error message
    pub message: String,
    /// Offending component name, if any
    pub name: Option<QName>,
    /// 1-based line of the offending schema element (0 when unknown)
    pub line: u32,
    /// 1-based column of the offending schema element (0 when unknown)
    pub column: u32,
}

impl CompileError {
    /// Create a new compile error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            name: None,
            line: 0,
            column: 0,
        }
    }

    /// Set the offending qualified name
    pub fn with_name(mut self, name: QName) -> Self {
        self.name = Some(name);
        self
    }

    /// Set the source position
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "{}:{}: ", self.line, self.column)?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// One step of the path to a failing node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStep {
    /// Local name of the element or attribute
    pub name: String,
    /// 1-based position among same-named siblings (always 1 for attributes)
    pub index: usize,
    /// Whether this step names an attribute
    pub attribute: bool,
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attribute {
            write!(f, "@{}", self.name)
        } else {
            write!(f, "{}[{}]", self.name, self.index)
        }
    }
}

/// A document does not conform to the schema at some node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Error message
    pub message: String,
    /// Path from the document root to the failing node
    pub path: Vec<PathStep>,
    /// 1-based line of the failing element (0 when unknown)
    pub line: u32,
    /// 1-based column of the failing element (0 when unknown)
    pub column: u32,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            line: 0,
            column: 0,
        }
    }

    /// Set the path where validation failed
    pub fn with_path(mut self, path: Vec<PathStep>) -> Self {
        self.path = path;
        self
    }

    /// Set the source position
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Render the path as `/a[1]/b[2]/@c`
    pub fn path_string(&self) -> String {
        let mut out = String::new();
        for step in &self.path {
            out.push('/');
            out.push_str(&step.to_string());
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ValidationError {}
