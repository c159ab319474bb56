// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Policy Composition
//!
//! Builds each tier's rule set from the fixed [`POLICY_TABLE`]. Tier peers in
//! the table are resolved against the identities registered so far; a rule
//! naming a tier that has not been registered is a forward reference and is
//! rejected.
//!
//! ```text
//!             80,443 (any)
//!   internet ─────────────► load balancer
//!                               │ 8080
//!          22 (any v4+v6)       ▼
//!   admin ──────────────────► compute ──► 443 (any, telemetry)
//!                               │ 3306
//!                               ▼
//!                            database
//! ```

use ipnet::IpNet;
use std::collections::BTreeMap;
use tracing::debug;

use super::policy::{
    Direction, Peer, PortRange, Protocol, Rule, SecurityPolicy, SecurityTier, TierIdentity,
    APP_PORT, DB_PORT, HTTPS_PORT, HTTP_PORT, SSH_PORT, TELEMETRY_PORT,
};
use crate::domain::ResourceId;
use crate::errors::{DependencyError, StackResult};

/// Peer as written in the policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerTemplate {
    /// `0.0.0.0/0`
    AnywhereV4,
    /// `0.0.0.0/0` and `::/0`
    AnywhereDual,
    /// Another tier's security group
    Tier(SecurityTier),
}

/// One row of the policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTemplate {
    pub owner: SecurityTier,
    pub name: &'static str,
    pub direction: Direction,
    pub port: u16,
    pub peer: PeerTemplate,
    pub description: Option<&'static str>,
}

const fn row(
    owner: SecurityTier,
    name: &'static str,
    direction: Direction,
    port: u16,
    peer: PeerTemplate,
    description: Option<&'static str>,
) -> RuleTemplate {
    RuleTemplate {
        owner,
        name,
        direction,
        port,
        peer,
        description,
    }
}

/// Every rule of every tier; all TCP
pub const POLICY_TABLE: &[RuleTemplate] = &[
    // Load balancer
    row(SecurityTier::LoadBalancer, "httpIngress", Direction::Ingress, HTTP_PORT, PeerTemplate::AnywhereV4, None),
    row(SecurityTier::LoadBalancer, "httpsIngress", Direction::Ingress, HTTPS_PORT, PeerTemplate::AnywhereV4, None),
    row(SecurityTier::LoadBalancer, "toEC2Egress", Direction::Egress, APP_PORT, PeerTemplate::Tier(SecurityTier::Compute), None),
    // Compute
    row(SecurityTier::Compute, "appPortIngress", Direction::Ingress, APP_PORT, PeerTemplate::Tier(SecurityTier::LoadBalancer), None),
    row(SecurityTier::Compute, "sshIngress", Direction::Ingress, SSH_PORT, PeerTemplate::AnywhereDual, None),
    row(SecurityTier::Compute, "database_egress", Direction::Egress, DB_PORT, PeerTemplate::Tier(SecurityTier::Database), Some("database_egress")),
    row(SecurityTier::Compute, "EC2_to_CloudWatch_egress", Direction::Egress, TELEMETRY_PORT, PeerTemplate::AnywhereV4, Some("Allows HTTPS traffic to AWS CloudWatch")),
    row(SecurityTier::Compute, "EC2_to_LoadBalancer_egress", Direction::Egress, APP_PORT, PeerTemplate::Tier(SecurityTier::LoadBalancer), Some("Allows traffic to AWS LoadBalancer")),
    // Database
    row(SecurityTier::Database, "dbIngressRule", Direction::Ingress, DB_PORT, PeerTemplate::Tier(SecurityTier::Compute), None),
];

fn anywhere_v4() -> IpNet {
    IpNet::V4(ipnet::Ipv4Net::default())
}

fn anywhere_v6() -> IpNet {
    IpNet::V6(ipnet::Ipv6Net::default())
}

/// Composes per-tier policies from the table
#[derive(Debug, Clone, Default)]
pub struct SecurityPolicyComposer {
    identities: BTreeMap<SecurityTier, TierIdentity>,
}

impl SecurityPolicyComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tier's identity once its security group is declared
    pub fn register(&mut self, tier: SecurityTier, group: ResourceId) -> TierIdentity {
        let identity = TierIdentity { tier, group };
        self.identities.insert(tier, identity.clone());
        identity
    }

    pub fn identity(&self, tier: SecurityTier) -> Option<&TierIdentity> {
        self.identities.get(&tier)
    }

    fn resolve_peer(&self, template: &RuleTemplate) -> Result<Peer, DependencyError> {
        match template.peer {
            PeerTemplate::AnywhereV4 => Ok(Peer::Cidrs(vec![anywhere_v4()])),
            PeerTemplate::AnywhereDual => Ok(Peer::Cidrs(vec![anywhere_v4(), anywhere_v6()])),
            PeerTemplate::Tier(peer) => self
                .identities
                .get(&peer)
                .cloned()
                .map(Peer::Tier)
                .ok_or_else(|| DependencyError::ForwardReference {
                    owner: template.owner.to_string(),
                    peer: peer.to_string(),
                }),
        }
    }

    /// Rule set of one tier
    ///
    /// The owner and every tier it names must already be registered.
    pub fn compose(&self, tier: SecurityTier) -> StackResult<SecurityPolicy> {
        let owner = self
            .identities
            .get(&tier)
            .cloned()
            .ok_or_else(|| DependencyError::ForwardReference {
                owner: tier.to_string(),
                peer: tier.to_string(),
            })?;

        let rules = POLICY_TABLE
            .iter()
            .filter(|t| t.owner == tier)
            .map(|t| {
                Ok(Rule {
                    direction: t.direction,
                    ports: PortRange::single(t.port),
                    protocol: Protocol::Tcp,
                    peer: self.resolve_peer(t)?,
                    name: t.name.to_string(),
                    description: t.description.map(str::to_string),
                })
            })
            .collect::<Result<Vec<_>, DependencyError>>()?;

        let policy = SecurityPolicy::new(owner, rules);
        policy.validate()?;
        debug!(%tier, rules = policy.rules().len(), "composed security policy");
        Ok(policy)
    }

    /// Policies for all three tiers, in construction order
    pub fn compose_all(&self) -> StackResult<Vec<SecurityPolicy>> {
        SecurityTier::ALL.iter().map(|tier| self.compose(*tier)).collect()
    }
}
