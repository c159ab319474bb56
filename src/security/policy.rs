// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Policy Value Objects

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::ResourceId;
use crate::errors::TopologyError;

/// Application port served by the compute tier
pub const APP_PORT: u16 = 8080;
/// Relational database port
pub const DB_PORT: u16 = 3306;
/// Outbound port of the telemetry agent
pub const TELEMETRY_PORT: u16 = 443;
pub const SSH_PORT: u16 = 22;
pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;

/// Security tier owning a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityTier {
    LoadBalancer,
    Compute,
    Database,
}

impl SecurityTier {
    /// Construction order of the tiers' security groups
    pub const ALL: [SecurityTier; 3] = [Self::LoadBalancer, Self::Compute, Self::Database];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadBalancer => "load_balancer",
            Self::Compute => "compute",
            Self::Database => "database",
        }
    }

    /// Logical name of the tier's security group
    pub fn group_name(&self) -> &'static str {
        match self {
            Self::LoadBalancer => "loadBalancerSG",
            Self::Compute => "webapp_security_group",
            Self::Database => "DBSecurityGroup",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::LoadBalancer => "Load balancer security group",
            Self::Compute => "webapp security group",
            Self::Database => "Enable access for RDS instances",
        }
    }
}

impl fmt::Display for SecurityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A constructed tier: its kind plus the identity of its security group
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TierIdentity {
    pub tier: SecurityTier,
    pub group: ResourceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingress => "ingress",
            Self::Egress => "egress",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
        }
    }
}

/// Inclusive port range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRange {
    pub from: u16,
    pub to: u16,
}

impl PortRange {
    pub fn new(from: u16, to: u16) -> Result<Self, TopologyError> {
        if from > to {
            return Err(TopologyError::PolicyViolation(format!(
                "port range {from}-{to} is inverted"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn single(port: u16) -> Self {
        Self { from: port, to: port }
    }

    pub fn contains(&self, port: u16) -> bool {
        self.from <= port && port <= self.to
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

/// Other side of a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Peer {
    /// Address ranges, IPv4 and/or IPv6
    Cidrs(Vec<IpNet>),
    /// Another tier's security group
    Tier(TierIdentity),
}

impl Peer {
    /// Whether any range is a wildcard (`/0`)
    pub fn is_open(&self) -> bool {
        match self {
            Self::Cidrs(cidrs) => cidrs.iter().any(|c| c.prefix_len() == 0),
            Self::Tier(_) => false,
        }
    }

    pub fn ipv4(&self) -> Vec<IpNet> {
        match self {
            Self::Cidrs(cidrs) => cidrs.iter().filter(|c| matches!(c, IpNet::V4(_))).copied().collect(),
            Self::Tier(_) => Vec::new(),
        }
    }

    pub fn ipv6(&self) -> Vec<IpNet> {
        match self {
            Self::Cidrs(cidrs) => cidrs.iter().filter(|c| matches!(c, IpNet::V6(_))).copied().collect(),
            Self::Tier(_) => Vec::new(),
        }
    }

    pub fn tier(&self) -> Option<&TierIdentity> {
        match self {
            Self::Tier(identity) => Some(identity),
            Self::Cidrs(_) => None,
        }
    }
}

/// One ingress or egress rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rule {
    pub direction: Direction,
    pub ports: PortRange,
    pub protocol: Protocol,
    pub peer: Peer,
    /// Logical name of the rule resource
    pub name: String,
    pub description: Option<String>,
}

/// Ordered rule set owned by one tier
///
/// Rules are kept sorted, so two policies built from the same table compare
/// equal regardless of composition order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub owner: TierIdentity,
    rules: Vec<Rule>,
}

impl SecurityPolicy {
    pub fn new(owner: TierIdentity, mut rules: Vec<Rule>) -> Self {
        rules.sort();
        rules.dedup();
        Self { owner, rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn ingress(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.direction == Direction::Ingress)
    }

    pub fn egress(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.direction == Direction::Egress)
    }

    /// Check that wildcard ingress is limited to the publicly exposed ports
    ///
    /// Only the load-balancer HTTP(S) ports and SSH may accept `/0` peers;
    /// application and database ports must always be scoped to a tier.
    pub fn validate(&self) -> Result<(), TopologyError> {
        for rule in self.ingress().filter(|r| r.peer.is_open()) {
            let public_lb_port = self.owner.tier == SecurityTier::LoadBalancer
                && (rule.ports == PortRange::single(HTTP_PORT)
                    || rule.ports == PortRange::single(HTTPS_PORT));
            let ssh = rule.ports == PortRange::single(SSH_PORT);

            if !(public_lb_port || ssh) {
                return Err(TopologyError::PolicyViolation(format!(
                    "{} accepts unscoped ingress on port {}",
                    self.owner.tier, rule.ports
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(tier: SecurityTier) -> TierIdentity {
        TierIdentity {
            tier,
            group: ResourceId::new(tier.group_name()).unwrap(),
        }
    }

    fn ingress(port: u16, peer: Peer) -> Rule {
        Rule {
            direction: Direction::Ingress,
            ports: PortRange::single(port),
            protocol: Protocol::Tcp,
            peer,
            name: format!("ingress{port}"),
            description: None,
        }
    }

    fn anywhere() -> Peer {
        Peer::Cidrs(vec!["0.0.0.0/0".parse().unwrap()])
    }

    #[test]
    fn test_port_range() {
        assert!(PortRange::new(80, 443).unwrap().contains(100));
        assert!(PortRange::new(443, 80).is_err());
        assert_eq!(PortRange::single(22).to_string(), "22");
        assert_eq!(PortRange::new(1, 2).unwrap().to_string(), "1-2");
    }

    #[test]
    fn test_peer_openness() {
        assert!(anywhere().is_open());
        assert!(Peer::Cidrs(vec!["::/0".parse().unwrap()]).is_open());
        assert!(!Peer::Cidrs(vec!["10.0.0.0/16".parse().unwrap()]).is_open());
        assert!(!Peer::Tier(identity(SecurityTier::Compute)).is_open());
    }

    #[test]
    fn test_open_app_port_rejected() {
        let policy = SecurityPolicy::new(
            identity(SecurityTier::Compute),
            vec![ingress(APP_PORT, anywhere())],
        );
        assert!(matches!(policy.validate(), Err(TopologyError::PolicyViolation(_))));
    }

    #[test]
    fn test_open_db_port_rejected() {
        let policy = SecurityPolicy::new(
            identity(SecurityTier::Database),
            vec![ingress(DB_PORT, anywhere())],
        );
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_open_http_only_on_load_balancer() {
        let lb = SecurityPolicy::new(
            identity(SecurityTier::LoadBalancer),
            vec![ingress(HTTP_PORT, anywhere())],
        );
        assert!(lb.validate().is_ok());

        let compute = SecurityPolicy::new(
            identity(SecurityTier::Compute),
            vec![ingress(HTTP_PORT, anywhere())],
        );
        assert!(compute.validate().is_err());
    }

    #[test]
    fn test_rules_sorted_independent_of_input_order() {
        let a = ingress(SSH_PORT, anywhere());
        let b = ingress(APP_PORT, Peer::Tier(identity(SecurityTier::LoadBalancer)));

        let p1 = SecurityPolicy::new(identity(SecurityTier::Compute), vec![a.clone(), b.clone()]);
        let p2 = SecurityPolicy::new(identity(SecurityTier::Compute), vec![b, a]);
        assert_eq!(p1, p2);
    }
}
