// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Identities
//!
//! Logical names of declared resources and references to the outputs the
//! provisioning engine realizes for them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigurationError;

/// Logical identity of a declared resource
///
/// Stable across runs: the same configuration always yields the same names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigurationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue {
                key: "resource id".into(),
                reason: "Resource ID cannot be empty".into(),
            });
        }
        Ok(Self(id))
    }

    /// Identity for names fixed in code
    pub(crate) fn fixed(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reference to one of this resource's realized outputs
    pub fn output(&self, name: &str) -> OutputRef {
        OutputRef {
            resource: self.clone(),
            output: name.to_string(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A named output of a resource, known only after realization
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRef {
    pub resource: ResourceId,
    pub output: String,
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_validation() {
        assert!(ResourceId::new("csye6225").is_ok());
        assert!(ResourceId::new("").is_err());
        assert!(ResourceId::new("   ").is_err());
    }

    #[test]
    fn test_output_ref_display() {
        let id = ResourceId::new("csye6225").unwrap();
        assert_eq!(id.output("endpoint").to_string(), "csye6225.endpoint");
    }
}
