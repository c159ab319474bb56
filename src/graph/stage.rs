// Copyright (c) 2025 - Cowboy AI, Inc.
//! Construction Stages
//!
//! The builder runs in stages. Each stage declares what it requires from
//! earlier stages and what it produces, which makes the stage ordering an
//! explicit DAG:
//!
//! ```text
//! network ──► security_policy ──► database ──────────┐
//!    │               │                               ▼
//!    │               │          auxiliary_services ─► boot_artifact
//!    │               │                                   │
//!    │               ├──────────────────────────► launch_template
//!    │               ▼                                   │
//!    └──────────► load_balancer ─────────────────► auto_scaling
//!                        │
//!                        └──────────────────────────► dns
//! ```
//!
//! A [`StagePlan`] is validated against this DAG before any stage runs;
//! at run time [`StageOutputs`] checks each stage's inputs again and reports
//! the first missing one.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::domain::ResourceId;
use crate::errors::DependencyError;
use crate::frp::Deferred;

/// One construction stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Network,
    SecurityPolicy,
    Database,
    AuxiliaryServices,
    BootArtifact,
    LaunchTemplate,
    LoadBalancer,
    AutoScaling,
    Dns,
}

/// Something a stage hands to later stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Upstream {
    Vpc,
    PublicSubnets,
    PrivateSubnets,
    LoadBalancerPolicy,
    ComputePolicy,
    DatabasePolicy,
    /// Supplied by configuration rather than a stage
    DatabaseCredential,
    DatabaseEndpoint,
    NotificationTopic,
    KeyValueTable,
    BootArtifact,
    LaunchTemplate,
    TargetGroup,
    LoadBalancerEndpoint,
    AutoScalingGroup,
    DnsRecord,
}

impl Stage {
    /// Standard construction order
    pub const ALL: [Stage; 9] = [
        Stage::Network,
        Stage::SecurityPolicy,
        Stage::Database,
        Stage::AuxiliaryServices,
        Stage::BootArtifact,
        Stage::LaunchTemplate,
        Stage::LoadBalancer,
        Stage::AutoScaling,
        Stage::Dns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Network => "network",
            Stage::SecurityPolicy => "security_policy",
            Stage::Database => "database",
            Stage::AuxiliaryServices => "auxiliary_services",
            Stage::BootArtifact => "boot_artifact",
            Stage::LaunchTemplate => "launch_template",
            Stage::LoadBalancer => "load_balancer",
            Stage::AutoScaling => "auto_scaling",
            Stage::Dns => "dns",
        }
    }

    /// Inputs that must exist before the stage runs
    pub fn requires(&self) -> &'static [Upstream] {
        use Upstream::*;
        match self {
            Stage::Network => &[],
            Stage::SecurityPolicy => &[Vpc],
            Stage::Database => &[DatabasePolicy, PrivateSubnets, DatabaseCredential],
            Stage::AuxiliaryServices => &[],
            Stage::BootArtifact => &[DatabaseCredential, DatabaseEndpoint, NotificationTopic],
            Stage::LaunchTemplate => &[ComputePolicy, BootArtifact],
            Stage::LoadBalancer => &[Vpc, PublicSubnets, LoadBalancerPolicy],
            Stage::AutoScaling => &[LaunchTemplate, TargetGroup, PublicSubnets],
            Stage::Dns => &[LoadBalancerEndpoint],
        }
    }

    /// Outputs the stage provides on success
    pub fn produces(&self) -> &'static [Upstream] {
        use Upstream::*;
        match self {
            Stage::Network => &[Vpc, PublicSubnets, PrivateSubnets],
            Stage::SecurityPolicy => &[LoadBalancerPolicy, ComputePolicy, DatabasePolicy],
            Stage::Database => &[DatabaseEndpoint],
            Stage::AuxiliaryServices => &[NotificationTopic, KeyValueTable],
            Stage::BootArtifact => &[BootArtifact],
            Stage::LaunchTemplate => &[LaunchTemplate],
            Stage::LoadBalancer => &[TargetGroup, LoadBalancerEndpoint],
            Stage::AutoScaling => &[AutoScalingGroup],
            Stage::Dns => &[DnsRecord],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::Vpc => "vpc",
            Upstream::PublicSubnets => "public_subnets",
            Upstream::PrivateSubnets => "private_subnets",
            Upstream::LoadBalancerPolicy => "load_balancer_policy",
            Upstream::ComputePolicy => "compute_policy",
            Upstream::DatabasePolicy => "database_policy",
            Upstream::DatabaseCredential => "database_credential",
            Upstream::DatabaseEndpoint => "database_endpoint",
            Upstream::NotificationTopic => "notification_topic",
            Upstream::KeyValueTable => "key_value_table",
            Upstream::BootArtifact => "boot_artifact",
            Upstream::LaunchTemplate => "launch_template",
            Upstream::TargetGroup => "target_group",
            Upstream::LoadBalancerEndpoint => "load_balancer_endpoint",
            Upstream::AutoScalingGroup => "auto_scaling_group",
            Upstream::DnsRecord => "dns_record",
        }
    }

    /// Whether configuration provides this before any stage runs
    pub fn from_configuration(&self) -> bool {
        matches!(self, Upstream::DatabaseCredential)
    }

    /// Stage that produces this upstream in the standard order
    pub fn producer(&self) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.produces().contains(self))
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dependency edge between two stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageEdge {
    pub from: Stage,
    pub to: Stage,
    pub via: Upstream,
}

/// Ordered list of stages to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl Default for StagePlan {
    fn default() -> Self {
        Self::standard()
    }
}

impl StagePlan {
    /// All stages in the standard order
    pub fn standard() -> Self {
        Self {
            stages: Stage::ALL.to_vec(),
        }
    }

    /// Caller-chosen order; checked by [`StagePlan::validate`]
    pub fn custom(stages: impl IntoIterator<Item = Stage>) -> Self {
        Self {
            stages: stages.into_iter().collect(),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Check that every stage's inputs are produced by an earlier stage
    ///
    /// Reports the first stage, in plan order, with a missing input.
    pub fn validate(&self) -> Result<(), DependencyError> {
        let mut available: BTreeSet<Upstream> = BTreeSet::new();
        let mut seen: BTreeSet<Stage> = BTreeSet::new();

        for stage in &self.stages {
            if !seen.insert(*stage) {
                return Err(DependencyError::DuplicateStage { stage: *stage });
            }
            for upstream in stage.requires() {
                if !upstream.from_configuration() && !available.contains(upstream) {
                    return Err(DependencyError::MissingUpstream {
                        stage: *stage,
                        upstream: *upstream,
                    });
                }
            }
            available.extend(stage.produces().iter().copied());
        }
        Ok(())
    }

    /// Edges between planned stages, in plan order
    pub fn dependency_edges(&self) -> Vec<StageEdge> {
        self.stages
            .iter()
            .flat_map(|stage| {
                stage.requires().iter().filter_map(move |upstream| {
                    self.producer_of(*upstream).map(|from| StageEdge {
                        from,
                        to: *stage,
                        via: *upstream,
                    })
                })
            })
            .collect()
    }

    /// Planned stage producing `upstream`
    pub fn producer_of(&self, upstream: Upstream) -> Option<Stage> {
        self.stages
            .iter()
            .copied()
            .find(|s| s.produces().contains(&upstream))
    }
}

/// What completed stages have handed forward
///
/// Resource identities and named deferred values, keyed by upstream. A stage
/// reads only through the accessors, which fail with
/// [`DependencyError::MissingUpstream`] naming the reading stage.
#[derive(Debug, Clone, Default)]
pub struct StageOutputs {
    resources: BTreeMap<Upstream, Vec<ResourceId>>,
    values: BTreeMap<(Upstream, &'static str), Deferred<String>>,
}

impl StageOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provide_resources(&mut self, upstream: Upstream, ids: Vec<ResourceId>) {
        self.resources.insert(upstream, ids);
    }

    pub fn provide_resource(&mut self, upstream: Upstream, id: ResourceId) {
        self.provide_resources(upstream, vec![id]);
    }

    pub fn provide_value(&mut self, upstream: Upstream, name: &'static str, value: Deferred<String>) {
        self.values.insert((upstream, name), value);
    }

    /// Whether anything was provided for `upstream`
    pub fn is_provided(&self, upstream: Upstream) -> bool {
        self.resources.get(&upstream).is_some_and(|ids| !ids.is_empty())
            || self.values.keys().any(|(u, _)| *u == upstream)
    }

    fn missing(stage: Stage, upstream: Upstream) -> DependencyError {
        DependencyError::MissingUpstream { stage, upstream }
    }

    /// All identities provided for `upstream`; an empty list counts as missing
    pub fn resources(&self, stage: Stage, upstream: Upstream) -> Result<&[ResourceId], DependencyError> {
        self.resources
            .get(&upstream)
            .filter(|ids| !ids.is_empty())
            .map(Vec::as_slice)
            .ok_or_else(|| Self::missing(stage, upstream))
    }

    /// The single identity provided for `upstream`
    pub fn resource(&self, stage: Stage, upstream: Upstream) -> Result<&ResourceId, DependencyError> {
        self.resources(stage, upstream)?
            .first()
            .ok_or_else(|| Self::missing(stage, upstream))
    }

    pub fn value(
        &self,
        stage: Stage,
        upstream: Upstream,
        name: &'static str,
    ) -> Result<Deferred<String>, DependencyError> {
        self.values
            .get(&(upstream, name))
            .cloned()
            .ok_or_else(|| Self::missing(stage, upstream))
    }

    /// Check that every input of `stage` has been provided
    pub fn ensure(&self, stage: Stage) -> Result<(), DependencyError> {
        match stage.requires().iter().find(|u| !self.is_provided(**u)) {
            Some(upstream) => Err(Self::missing(stage, *upstream)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_standard_plan_is_valid() {
        assert!(StagePlan::standard().validate().is_ok());
    }

    #[test]
    fn test_every_requirement_has_an_earlier_producer() {
        for (position, stage) in Stage::ALL.iter().enumerate() {
            for upstream in stage.requires() {
                if upstream.from_configuration() {
                    continue;
                }
                let producer = upstream.producer().unwrap();
                let producer_position = Stage::ALL.iter().position(|s| *s == producer).unwrap();
                assert!(producer_position < position, "{stage} needs {upstream}");
            }
        }
    }

    #[test]
    fn test_reordered_plan_names_stage_and_upstream() {
        let plan = StagePlan::custom([Stage::Network, Stage::Database, Stage::SecurityPolicy]);
        assert_eq!(
            plan.validate(),
            Err(DependencyError::MissingUpstream {
                stage: Stage::Database,
                upstream: Upstream::DatabasePolicy
            })
        );
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let plan = StagePlan::custom([Stage::Network, Stage::Network]);
        assert_eq!(
            plan.validate(),
            Err(DependencyError::DuplicateStage {
                stage: Stage::Network
            })
        );
    }

    #[test]
    fn test_partial_plan_is_valid() {
        let plan = StagePlan::custom([Stage::Network, Stage::SecurityPolicy, Stage::LoadBalancer]);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_dependency_edges() {
        let edges = StagePlan::standard().dependency_edges();
        assert!(edges.contains(&StageEdge {
            from: Stage::LoadBalancer,
            to: Stage::Dns,
            via: Upstream::LoadBalancerEndpoint
        }));
        assert!(edges
            .iter()
            .all(|e| e.via != Upstream::DatabaseCredential));
    }

    #[test]
    fn test_outputs_report_missing_upstream() {
        let mut outputs = StageOutputs::new();
        outputs.provide_resources(Upstream::PrivateSubnets, Vec::new());

        assert_eq!(
            outputs.resources(Stage::Database, Upstream::PrivateSubnets),
            Err(DependencyError::MissingUpstream {
                stage: Stage::Database,
                upstream: Upstream::PrivateSubnets
            })
        );
        assert!(outputs.ensure(Stage::Network).is_ok());
        assert!(outputs.ensure(Stage::SecurityPolicy).is_err());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Stage::AuxiliaryServices.to_string(), "auxiliary_services");
        assert_eq!(Upstream::LoadBalancerEndpoint.to_string(), "load_balancer_endpoint");
    }
}
