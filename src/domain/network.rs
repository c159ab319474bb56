// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Topology Value Objects
//!
//! Subnet tiers, per-zone subnet layouts and the overall
//! [`NetworkTopology`] computed from an address block and the discovered
//! availability zones.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::partition::CidrPartitioner;
use crate::errors::TopologyError;

/// Upper bound on the number of availability zones used per tier
pub const MAX_ZONES: usize = 3;

/// Network tier a subnet belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetTier {
    /// Routed through the internet gateway, public IPs on launch
    Public,
    /// No route to the gateway
    Private,
}

impl SubnetTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    /// Logical name of the route table every subnet of this tier joins
    pub fn route_table(&self) -> &'static str {
        match self {
            Self::Public => "public-route-table",
            Self::Private => "private-route-table",
        }
    }
}

impl fmt::Display for SubnetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One subnet of one tier in one availability zone
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub tier: SubnetTier,
    /// 1-based zone index
    pub az_index: usize,
    pub zone: String,
    pub cidr: Ipv4Net,
    pub route_table: String,
}

impl SubnetSpec {
    /// Logical resource name, e.g. `publicSubnet2`
    pub fn resource_name(&self) -> String {
        format!("{}Subnet{}", self.tier.as_str(), self.az_index)
    }

    /// Name tag, e.g. `private-subnet1`
    pub fn name_tag(&self) -> String {
        format!("{}-subnet{}", self.tier.as_str(), self.az_index)
    }

    /// Logical name of the route-table association node
    pub fn association_name(&self) -> String {
        format!("{}Association{}", self.tier.as_str(), self.az_index)
    }
}

/// Clamp the discovered zone count to [`MAX_ZONES`]
pub fn bounded_zone_count(discovered: usize) -> Result<usize, TopologyError> {
    if discovered == 0 {
        return Err(TopologyError::NoAvailabilityZones);
    }
    Ok(discovered.min(MAX_ZONES))
}

/// Address block partitioned into public and private subnets per zone
///
/// Pure function of `(address block, zones)`: rebuilding from the same
/// inputs yields an identical value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTopology {
    pub address_block: Ipv4Net,
    pub az_count: usize,
    pub public: Vec<SubnetSpec>,
    pub private: Vec<SubnetSpec>,
}

impl NetworkTopology {
    /// Plan subnets for the given block across the discovered zones
    pub fn plan(address_block: Ipv4Net, zones: &[String]) -> Result<Self, TopologyError> {
        let az_count = bounded_zone_count(zones.len())?;
        let blocks = CidrPartitioner::default().partition(address_block, az_count)?;

        let specs = |tier: SubnetTier, cidrs: Vec<Ipv4Net>| -> Vec<SubnetSpec> {
            cidrs
                .into_iter()
                .zip(zones.iter())
                .enumerate()
                .map(|(i, (cidr, zone))| SubnetSpec {
                    tier,
                    az_index: i + 1,
                    zone: zone.clone(),
                    cidr,
                    route_table: tier.route_table().to_string(),
                })
                .collect()
        };

        Ok(Self {
            address_block: address_block.trunc(),
            az_count,
            public: specs(SubnetTier::Public, blocks.public),
            private: specs(SubnetTier::Private, blocks.private),
        })
    }

    pub fn subnets(&self, tier: SubnetTier) -> &[SubnetSpec] {
        match tier {
            SubnetTier::Public => &self.public,
            SubnetTier::Private => &self.private,
        }
    }

    /// All subnets, public tier first
    pub fn all_subnets(&self) -> impl Iterator<Item = &SubnetSpec> {
        self.public.iter().chain(self.private.iter())
    }
}
