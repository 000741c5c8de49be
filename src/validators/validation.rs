//! XML Validation Infrastructure
//!
//! [`ValidationContext`] is the per-call diagnostic collector. It keeps the
//! path from the document root to the node being checked, the error list in
//! document order, and the ID/IDREF bookkeeping that can only be settled once
//! the whole document has been seen.

use std::collections::HashSet;

use crate::error::{PathStep, ValidationError};

/// An IDREF whose target is checked at the end of the walk
#[derive(Debug, Clone)]
struct PendingIdref {
    value: String,
    owner: String,
    path: Vec<PathStep>,
    line: u32,
    column: u32,
}

/// Validation context for one validation call
#[derive(Debug)]
pub struct ValidationContext {
    /// Collected validation errors
    errors: Vec<ValidationError>,
    /// Path to the current node
    path: Vec<PathStep>,
    /// Current nesting level (root element = 1)
    pub level: usize,
    /// Maximum depth for validation
    pub max_depth: usize,
    /// ID values seen so far
    ids: HashSet<String>,
    /// IDREF values awaiting resolution
    idrefs: Vec<PendingIdref>,
}

impl ValidationContext {
    /// Create a new validation context
    pub fn new(max_depth: usize) -> Self {
        Self {
            errors: Vec::new(),
            path: Vec::new(),
            level: 0,
            max_depth,
            ids: HashSet::new(),
            idrefs: Vec::new(),
        }
    }

    /// Check if we've exceeded max depth
    pub fn is_max_depth_exceeded(&self) -> bool {
        self.level > self.max_depth
    }

    /// Enter an element; `index` is its 1-based position among same-named siblings
    pub fn enter_element(&mut self, name: &str, index: usize) {
        self.level += 1;
        self.path.push(PathStep {
            name: name.to_string(),
            index,
            attribute: false,
        });
    }

    /// Leave the current element
    pub fn exit_element(&mut self) {
        if self.level > 0 {
            self.level -= 1;
        }
        self.path.pop();
    }

    /// Current path
    pub fn path(&self) -> &[PathStep] {
        &self.path
    }

    /// Check if any error was recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of errors so far
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Record an error at the current element
    pub fn report(&mut self, message: impl Into<String>, line: u32, column: u32) {
        let error = ValidationError::new(message)
            .with_path(self.path.clone())
            .at(line, column);
        self.errors.push(error);
    }

    /// Record an error at a descendant of the current element
    pub fn report_below(&mut self, below: &[PathStep], message: impl Into<String>, line: u32, column: u32) {
        let mut path = self.path.clone();
        path.extend_from_slice(below);
        let error = ValidationError::new(message).with_path(path).at(line, column);
        self.errors.push(error);
    }

    /// Record an error at an attribute of the current element
    pub fn report_attribute(&mut self, attribute: &str, message: impl Into<String>, line: u32, column: u32) {
        let error = ValidationError::new(message)
            .with_path(self.attribute_path(attribute))
            .at(line, column);
        self.errors.push(error);
    }

    fn attribute_path(&self, attribute: &str) -> Vec<PathStep> {
        let mut path = self.path.clone();
        path.push(PathStep {
            name: attribute.to_string(),
            index: 1,
            attribute: true,
        });
        path
    }

    /// Register an ID value; returns false when it was already declared
    pub fn register_id(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    /// Queue an IDREF for resolution; `owner` prefixes the eventual message
    pub fn defer_idref(
        &mut self,
        value: &str,
        owner: String,
        attribute: Option<&str>,
        line: u32,
        column: u32,
    ) {
        let path = match attribute {
            Some(name) => self.attribute_path(name),
            None => self.path.clone(),
        };
        self.idrefs.push(PendingIdref {
            value: value.to_string(),
            owner,
            path,
            line,
            column,
        });
    }

    /// Settle IDREFs and return every error in report order
    pub fn into_errors(mut self) -> Vec<ValidationError> {
        for pending in std::mem::take(&mut self.idrefs) {
            if !self.ids.contains(&pending.value) {
                self.errors.push(
                    ValidationError::new(format!(
                        "{}: IDREF '{}' does not match any ID in the document.",
                        pending.owner, pending.value
                    ))
                    .with_path(pending.path)
                    .at(pending.line, pending.column),
                );
            }
        }
        self.errors
    }
}
