// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for topology construction
//!
//! Every failure aborts the whole construction. There is no partial-success
//! mode, so each variant carries enough context (stage, key, identifier) for
//! the caller to see where construction stopped.

use thiserror::Error;

use crate::graph::stage::{Stage, Upstream};
use crate::state_machine::TransitionError;

/// Missing or invalid configuration input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A required key was absent or empty
    #[error("Missing required configuration key: {key}")]
    MissingKey { key: String },

    /// A key was present but its value could not be used
    #[error("Invalid value for configuration key {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Stack file could not be parsed
    #[error("Configuration parse error: {0}")]
    Parse(String),
}

/// Invalid address sizing or zone layout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("Invalid CIDR block: {0}")]
    InvalidCidr(String),

    /// Parent block is already narrower than the subnet target length
    #[error("Cannot extend /{parent_prefix} to /{target_prefix}: negative prefix extension")]
    NegativeExtension { parent_prefix: u8, target_prefix: u8 },

    /// Partition index falls outside the parent block
    #[error("Address space of {block} exhausted: {required} /{target_prefix} subnets required, {available} available")]
    AddressSpaceExhausted {
        block: String,
        target_prefix: u8,
        required: u32,
        available: u32,
    },

    #[error("No availability zones discovered")]
    NoAvailabilityZones,

    /// Requested zone count does not fit the discovered zones or the bound
    #[error("Inconsistent AZ count: requested {requested}, allowed 1..={max}")]
    InvalidZoneCount { requested: usize, max: usize },

    /// A rule set breaks the ingress scoping rules
    #[error("Security policy violation: {0}")]
    PolicyViolation(String),

    #[error("Resource declared twice: {0}")]
    DuplicateResource(String),
}

/// A construction stage is missing something it needs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// The stage's required upstream was never produced
    #[error("Stage {stage} is missing upstream {upstream}")]
    MissingUpstream { stage: Stage, upstream: Upstream },

    /// A node references an identity that has not been declared yet
    #[error("Stage {stage}: resource {resource} references undeclared resource {missing}")]
    UndeclaredResource {
        stage: Stage,
        resource: String,
        missing: String,
    },

    /// A stage appears more than once in a plan
    #[error("Stage {stage} is planned more than once")]
    DuplicateStage { stage: Stage },

    /// A security rule names a tier whose identity does not exist yet
    #[error("Security policy of {owner} references tier {peer} before it was constructed")]
    ForwardReference { owner: String, peer: String },
}

/// A deferred value's upstream failed or went away before resolving
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("Upstream {label} failed: {reason}")]
    Failed { label: String, reason: String },

    /// The resolver was dropped without producing a value
    #[error("Upstream {label} was abandoned before resolving")]
    Abandoned { label: String },

    #[error("No realization slot for {0}")]
    UnknownSlot(String),
}

/// Umbrella error for a construction run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Construction phase error: {0}")]
    Phase(#[from] TransitionError),

    /// Failure raised while a stage was running
    #[error("Stage {stage} failed: {source}")]
    StageFailed {
        stage: Stage,
        source: Box<StackError>,
    },
}

impl StackError {
    /// Attribute the error to a stage, unless it already names one
    pub fn in_stage(self, stage: Stage) -> Self {
        if self.stage().is_some() {
            return self;
        }
        StackError::StageFailed {
            stage,
            source: Box::new(self),
        }
    }

    /// Stage the error was raised in, if known
    pub fn stage(&self) -> Option<Stage> {
        match self {
            StackError::StageFailed { stage, .. } => Some(*stage),
            StackError::Dependency(DependencyError::MissingUpstream { stage, .. })
            | StackError::Dependency(DependencyError::UndeclaredResource { stage, .. }) => Some(*stage),
            _ => None,
        }
    }

    /// Underlying error with stage attribution removed
    pub fn root(&self) -> &StackError {
        match self {
            StackError::StageFailed { source, .. } => source.root(),
            err => err,
        }
    }
}

/// Result type for topology operations
pub type StackResult<T> = Result<T, StackError>;

impl From<serde_yaml::Error> for ConfigurationError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigurationError::Parse(err.to_string())
    }
}

impl From<ipnet::AddrParseError> for TopologyError {
    fn from(err: ipnet::AddrParseError) -> Self {
        TopologyError::InvalidCidr(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_error_names_stage_and_upstream() {
        let err = DependencyError::MissingUpstream {
            stage: Stage::Database,
            upstream: Upstream::PrivateSubnets,
        };
        let msg = StackError::from(err).to_string();
        assert!(msg.contains("database"));
        assert!(msg.contains("private_subnets"));
    }

    #[test]
    fn test_stage_attribution() {
        let err = StackError::from(TopologyError::NoAvailabilityZones).in_stage(Stage::Network);
        assert_eq!(err.stage(), Some(Stage::Network));
        assert_eq!(
            err.root(),
            &StackError::Topology(TopologyError::NoAvailabilityZones)
        );
        assert!(err.to_string().starts_with("Stage network failed"));

        let again = err.clone().in_stage(Stage::Dns);
        assert_eq!(again, err);
    }

    #[test]
    fn test_config_error_converts() {
        let err: StackError = ConfigurationError::MissingKey {
            key: "vpc:cidrBlock".into(),
        }
        .into();
        assert!(matches!(err, StackError::Configuration(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required configuration key: vpc:cidrBlock"
        );
    }
}
