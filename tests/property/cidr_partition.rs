// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for CIDR Partitioning

use cim_topology::domain::{CidrPartitioner, NetworkTopology, SUBNET_PREFIX_LEN};
use cim_topology::TopologyError;
use ipnet::Ipv4Net;
use proptest::prelude::*;
use std::collections::HashSet;
use std::net::Ipv4Addr;

fn block(addr: u32, prefix: u8) -> Ipv4Net {
    Ipv4Net::new(Ipv4Addr::from(addr), prefix).unwrap().trunc()
}

fn zone_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("zone-{i}")).collect()
}

proptest! {
    /// Every block large enough yields min(zones, 3) disjoint /24s per tier
    #[test]
    fn prop_partition_is_disjoint_and_contained(
        addr in any::<u32>(),
        prefix in 8u8..=21,
        zones in 1usize..=6,
    ) {
        let parent = block(addr, prefix);
        let topology = NetworkTopology::plan(parent, &zone_names(zones)).unwrap();
        let expected = zones.min(3);

        prop_assert_eq!(topology.az_count, expected);
        prop_assert_eq!(topology.public.len(), expected);
        prop_assert_eq!(topology.private.len(), expected);

        let mut seen = HashSet::new();
        for subnet in topology.all_subnets() {
            prop_assert_eq!(subnet.cidr.prefix_len(), SUBNET_PREFIX_LEN);
            prop_assert!(parent.contains(&subnet.cidr));
            prop_assert!(seen.insert(subnet.cidr), "duplicate block {}", subnet.cidr);
        }
    }

    /// Public blocks take indices 1..=n and private blocks n+1..=2n
    #[test]
    fn prop_partition_indices(addr in any::<u32>(), prefix in 8u8..=21, n in 1usize..=3) {
        let parent = block(addr, prefix);
        let blocks = CidrPartitioner::default().partition(parent, n).unwrap();
        let base = u32::from(parent.network());
        let index = |net: &Ipv4Net| (u32::from(net.network()) - base) >> 8;

        let public: Vec<u32> = blocks.public.iter().map(index).collect();
        let private: Vec<u32> = blocks.private.iter().map(index).collect();
        prop_assert_eq!(public, (1..=n as u32).collect::<Vec<_>>());
        prop_assert_eq!(private, (n as u32 + 1..=2 * n as u32).collect::<Vec<_>>());
    }

    /// Same inputs, same topology
    #[test]
    fn prop_plan_is_deterministic(addr in any::<u32>(), prefix in 8u8..=21, zones in 1usize..=5) {
        let parent = block(addr, prefix);
        let names = zone_names(zones);
        prop_assert_eq!(
            NetworkTopology::plan(parent, &names).unwrap(),
            NetworkTopology::plan(parent, &names).unwrap()
        );
    }

    /// Prefixes longer than /24 cannot be extended
    #[test]
    fn prop_longer_prefix_rejected(addr in any::<u32>(), prefix in 25u8..=32) {
        let result = CidrPartitioner::default().partition(block(addr, prefix), 1);
        let is_negative_extension = matches!(result, Err(TopologyError::NegativeExtension { .. }));
        prop_assert!(is_negative_extension);
    }
}

#[test]
fn test_small_blocks_exhausted() {
    // /23 holds two /24s; even one zone needs three indices
    for (prefix, zones) in [(23u8, 1usize), (22, 2), (22, 3), (24, 1)] {
        let result = CidrPartitioner::default().partition(block(0x0a00_0000, prefix), zones);
        assert!(
            matches!(result, Err(TopologyError::AddressSpaceExhausted { .. })),
            "/{prefix} with {zones} zones: {result:?}"
        );
    }
}

#[test]
fn test_largest_block_that_fits() {
    // /22 holds four /24s: index 0 reserved, then one public and one private
    let blocks = CidrPartitioner::default()
        .partition(block(0x0a00_0000, 22), 1)
        .unwrap();
    assert_eq!(blocks.public[0].to_string(), "10.0.1.0/24");
    assert_eq!(blocks.private[0].to_string(), "10.0.2.0/24");
}
