//! XML Schema validators
//!
//! This module contains the schema component model, the schema compiler and
//! the instance validator.

// Foundation
pub mod helpers;
pub mod particles;

// Type system
pub mod attributes;
pub mod builtins;
pub mod facets;
pub mod simple_types;

// Complex structures
pub mod complex_types;
pub mod elements;
pub mod groups;
pub mod identities;
pub mod models;
pub mod wildcards;

// Symbol table and compilation
pub mod globals;
pub mod parsing;

// Validation
pub mod document_validation;
pub mod schemas;
pub mod validation;

// Re-exports
pub use globals::{ComponentCounts, ElementId, TypeId, XsdGlobals};
pub use schemas::XsdSchema;
pub use simple_types::SimpleType;
