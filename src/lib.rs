// Copyright (c) 2025 - Cowboy AI, Inc.
//! Declarative multi-tier cloud topology for the Composable Information Machine
//!
//! Builds the resource graph of a three-tier web application (public load
//! balancer, autoscaled compute, private database) plus its auxiliary
//! services. Values that only exist once upstream resources are realized are
//! carried as [`Deferred`] and resolve on their own as the provisioning engine
//! settles each [`Realization`] slot.

pub mod bootstrap;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod errors;
pub mod frp;
pub mod graph;
pub mod scaling;
pub mod security;
pub mod state_machine;

// Re-export commonly used types
pub use config::StackConfig;
pub use discovery::{StaticZones, ZoneProvider};
pub use domain::{NetworkTopology, OutputRef, ResourceId, ResourceKind, SubnetTier};
pub use errors::{
    ConfigurationError, DependencyError, ResolutionError, StackError, StackResult, TopologyError,
};
pub use frp::Deferred;
pub use graph::{
    construct, AttributeValue, Construction, Realization, ResourceGraph, ResourceGraphBuilder,
    ResourceNode, Stage, StagePlan, Upstream,
};
pub use scaling::{ScalingPolicy, ScalingPolicyEngine};
pub use security::{SecurityPolicy, SecurityPolicyComposer, SecurityTier};
