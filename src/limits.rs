//! Limits and constraints for schema compilation and validation
//!
//! This module defines various limits to prevent resource exhaustion
//! on hostile or accidentally huge inputs.

use crate::error::{Error, Result};

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum element nesting depth checked by the validator
    pub max_xml_depth: usize,

    /// Maximum XML source size in bytes
    pub max_xml_size: usize,

    /// Maximum number of nodes the XML parser will build
    pub max_xml_nodes: u32,

    /// Maximum number of memoized matcher states per element
    pub max_model_states: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 * 1024 * 1024, // 100 MB
            max_xml_nodes: u32::MAX,
            max_model_states: 1_000_000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 100,
            max_xml_size: 10 * 1024 * 1024, // 10 MB
            max_xml_nodes: 1_000_000,
            max_model_states: 100_000,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 10000,
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
            max_xml_nodes: u32::MAX,
            max_model_states: 100_000_000,
        }
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        if size > self.max_xml_size {
            Err(Error::LimitExceeded(format!(
                "XML size {} bytes exceeds maximum {} bytes",
                size, self.max_xml_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if an element depth is within limits
    pub fn is_depth_allowed(&self, depth: usize) -> bool {
        depth <= self.max_xml_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_xml_depth, 1000);
        assert!(limits.check_xml_size(1024).is_ok());
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.max_xml_depth < Limits::default().max_xml_depth);
        assert!(limits.max_model_states < Limits::default().max_model_states);
    }

    #[test]
    fn test_check_xml_size() {
        let limits = Limits::strict();
        assert!(limits.check_xml_size(1024).is_ok());
        let err = limits.check_xml_size(11 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }

    #[test]
    fn test_depth() {
        let limits = Limits::strict();
        assert!(limits.is_depth_allowed(100));
        assert!(!limits.is_depth_allowed(101));
    }
}
