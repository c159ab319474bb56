// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Graph Construction Order

use std::collections::HashMap;

use cim_topology::config::keys;
use cim_topology::construct;
use proptest::prelude::*;

use crate::fixtures::{stack_map, zones};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every node's dependencies were declared before it
    #[test]
    fn prop_declaration_order_is_topological(zone_count in 1usize..=6, third_octet in 0u8..=250) {
        let mut map = stack_map();
        map.insert(keys::CIDR_BLOCK.to_string(), format!("10.{third_octet}.0.0/16"));

        let construction = construct(&map, zones(zone_count)).unwrap();
        let position: HashMap<_, _> = construction
            .graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.clone(), i))
            .collect();

        for (i, node) in construction.graph.nodes().iter().enumerate() {
            for dependency in &node.depends_on {
                prop_assert!(position[dependency] < i, "{} declared before {}", node.id, dependency);
            }
        }
    }

    /// Building twice from the same inputs exports the same plan
    #[test]
    fn prop_export_is_deterministic(zone_count in 1usize..=6) {
        let first = construct(&stack_map(), zones(zone_count)).unwrap();
        let second = construct(&stack_map(), zones(zone_count)).unwrap();
        prop_assert_eq!(first.graph.to_json(), second.graph.to_json());
    }
}
