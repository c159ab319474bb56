// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Domain Models
//!
//! Value objects for the declared topology: subnet tiers and the CIDR
//! partition across availability zones, resource identities, and the resource
//! kind taxonomy.
//!
//! - [`NetworkTopology`] - Address block split into tiered subnets per zone
//! - [`CidrPartitioner`] - Deterministic two-tier subnetting
//! - [`ResourceId`] / [`OutputRef`] - Logical identities and realized outputs
//! - [`ResourceKind`] - Resource taxonomy with provider type tokens

pub mod identity;
pub mod network;
pub mod partition;
pub mod resource_type;

pub use identity::{OutputRef, ResourceId};
pub use network::{bounded_zone_count, NetworkTopology, SubnetSpec, SubnetTier, MAX_ZONES};
pub use partition::{CidrPartitioner, TierBlocks, SUBNET_PREFIX_LEN};
pub use resource_type::ResourceKind;
