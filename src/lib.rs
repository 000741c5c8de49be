//! # xsdcheck
//!
//! Compile XML Schema 1.0 documents and validate XML documents against them,
//! reporting every problem with its location and a libxml2-style message.
//!
//! ## Features
//!
//! - Built-in datatypes and facets of XSD 1.0
//! - Complex types with sequence, choice and all groups, wildcards and derivation
//! - Substitution groups, `xsi:type`, `xsi:nil`, default and fixed values
//! - ID/IDREF checking
//! - Configurable resource limits
//!
//! ## Example
//!
//! ```rust
//! use xsdcheck::XsdSchema;
//!
//! let schema = XsdSchema::from_string(r#"
//!     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!       <xs:element name="qty" type="xs:positiveInteger"/>
//!     </xs:schema>"#)?;
//!
//! let errors = schema.validate_string("<qty>0</qty>")?;
//! assert_eq!(errors.len(), 1);
//! # Ok::<(), xsdcheck::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod names;
pub mod namespaces;

// Node model
pub mod documents;

// Validators
pub mod validators;

// Re-exports for convenience
pub use documents::{Document, Element};
pub use error::{Error, Result, ValidationError};
pub use limits::Limits;
pub use namespaces::QName;
pub use validators::XsdSchema;

/// Version of the xsdcheck library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD 1.0 namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema Instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
