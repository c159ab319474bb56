// Copyright (c) 2025 - Cowboy AI, Inc.
//! CIDR Partitioning
//!
//! Splits one address block into two tiers of equally sized subnets.
//!
//! The block's prefix is extended to a fixed target length and sub-blocks are
//! enumerated by index. Index 0 is never handed out; the public tier takes
//! indices `1..=n` and the private tier `n+1..=2n`, so the tiers cannot
//! collide.
//!
//! ```text
//! 10.0.0.0/16, n = 3
//!
//! index:   0      1      2      3      4      5      6
//!        ┌──────┬──────┬──────┬──────┬──────┬──────┬──────┐
//!        │ rsvd │ pub1 │ pub2 │ pub3 │ prv1 │ prv2 │ prv3 │ ...
//!        └──────┴──────┴──────┴──────┴──────┴──────┴──────┘
//!         .0.0   .1.0   .2.0   .3.0   .4.0   .5.0   .6.0
//! ```

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

use super::network::MAX_ZONES;
use crate::errors::TopologyError;

/// Prefix length of every generated subnet
pub const SUBNET_PREFIX_LEN: u8 = 24;

/// Subnet blocks for both tiers, ordered by zone index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierBlocks {
    pub public: Vec<Ipv4Net>,
    pub private: Vec<Ipv4Net>,
}

/// Deterministic two-tier subnet partitioner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrPartitioner {
    target_prefix: u8,
}

impl Default for CidrPartitioner {
    fn default() -> Self {
        Self {
            target_prefix: SUBNET_PREFIX_LEN,
        }
    }
}

impl CidrPartitioner {
    pub fn target_prefix(&self) -> u8 {
        self.target_prefix
    }

    /// Number of bits added to the parent prefix
    ///
    /// Fails when the parent is already longer than the target.
    pub fn extension(&self, block: Ipv4Net) -> Result<u8, TopologyError> {
        self.target_prefix
            .checked_sub(block.prefix_len())
            .ok_or(TopologyError::NegativeExtension {
                parent_prefix: block.prefix_len(),
                target_prefix: self.target_prefix,
            })
    }

    /// The `index`-th target-length sub-block of `block`
    pub fn subnet(&self, block: Ipv4Net, index: u32) -> Result<Ipv4Net, TopologyError> {
        let extension = self.extension(block)?;
        let available = 1u64 << extension;
        if u64::from(index) >= available {
            return Err(TopologyError::AddressSpaceExhausted {
                block: block.trunc().to_string(),
                target_prefix: self.target_prefix,
                required: index.saturating_add(1),
                available: available.min(u64::from(u32::MAX)) as u32,
            });
        }

        let base = u32::from(block.network());
        let size = 1u32 << (32 - u32::from(self.target_prefix));
        let address = Ipv4Addr::from(base + index * size);

        Ipv4Net::new(address, self.target_prefix)
            .map_err(|e| TopologyError::InvalidCidr(e.to_string()))
    }

    /// Partition `block` into `count` public and `count` private subnets
    pub fn partition(&self, block: Ipv4Net, count: usize) -> Result<TierBlocks, TopologyError> {
        if count == 0 || count > MAX_ZONES {
            return Err(TopologyError::InvalidZoneCount {
                requested: count,
                max: MAX_ZONES,
            });
        }

        let block = block.trunc();
        let n = count as u32;

        // Size check up front so a too-small block never yields a partial tier
        let extension = self.extension(block)?;
        let available = 1u64 << extension;
        if u64::from(2 * n) >= available {
            return Err(TopologyError::AddressSpaceExhausted {
                block: block.to_string(),
                target_prefix: self.target_prefix,
                required: 2 * n + 1,
                available: available as u32,
            });
        }

        let public = (1..=n)
            .map(|i| self.subnet(block, i))
            .collect::<Result<Vec<_>, _>>()?;
        let private = (n + 1..=2 * n)
            .map(|i| self.subnet(block, i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TierBlocks { public, private })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    #[test]
    fn test_partition_sixteen_three_zones() {
        let blocks = CidrPartitioner::default().partition(net("10.0.0.0/16"), 3).unwrap();

        let public: Vec<String> = blocks.public.iter().map(|n| n.to_string()).collect();
        let private: Vec<String> = blocks.private.iter().map(|n| n.to_string()).collect();

        assert_eq!(public, vec!["10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"]);
        assert_eq!(private, vec!["10.0.4.0/24", "10.0.5.0/24", "10.0.6.0/24"]);
    }

    #[test]
    fn test_partition_one_zone() {
        let blocks = CidrPartitioner::default().partition(net("172.16.0.0/12"), 1).unwrap();
        assert_eq!(blocks.public, vec![net("172.16.1.0/24")]);
        assert_eq!(blocks.private, vec![net("172.16.2.0/24")]);
    }

    #[test]
    fn test_extension() {
        let partitioner = CidrPartitioner::default();
        assert_eq!(partitioner.extension(net("10.0.0.0/16")).unwrap(), 8);
        assert_eq!(partitioner.extension(net("10.0.0.0/24")).unwrap(), 0);
        assert_eq!(
            partitioner.extension(net("10.0.0.0/26")),
            Err(TopologyError::NegativeExtension {
                parent_prefix: 26,
                target_prefix: 24
            })
        );
    }

    #[test]
    fn test_partition_rejects_longer_prefix() {
        let err = CidrPartitioner::default().partition(net("10.0.0.0/25"), 1).unwrap_err();
        assert!(matches!(err, TopologyError::NegativeExtension { .. }));
    }

    #[test]
    fn test_partition_rejects_small_block() {
        // /22 holds 4 sub-blocks; 3 zones need indices up to 6
        let err = CidrPartitioner::default().partition(net("10.0.0.0/22"), 3).unwrap_err();
        assert_eq!(
            err,
            TopologyError::AddressSpaceExhausted {
                block: "10.0.0.0/22".into(),
                target_prefix: 24,
                required: 7,
                available: 4,
            }
        );

        // but 1 zone fits: indices 1 and 2
        assert!(CidrPartitioner::default().partition(net("10.0.0.0/22"), 1).is_ok());
    }

    #[test]
    fn test_partition_rejects_zone_count() {
        let partitioner = CidrPartitioner::default();
        assert!(matches!(
            partitioner.partition(net("10.0.0.0/16"), 0),
            Err(TopologyError::InvalidZoneCount { requested: 0, .. })
        ));
        assert!(matches!(
            partitioner.partition(net("10.0.0.0/16"), 4),
            Err(TopologyError::InvalidZoneCount { requested: 4, .. })
        ));
    }

    #[test]
    fn test_subnet_index_zero_is_block_start() {
        let subnet = CidrPartitioner::default().subnet(net("10.1.0.0/16"), 0).unwrap();
        assert_eq!(subnet, net("10.1.0.0/24"));
    }

    #[test]
    fn test_partition_ignores_host_bits() {
        let a = CidrPartitioner::default().partition(net("10.0.0.0/16"), 2).unwrap();
        let b = CidrPartitioner::default().partition(net("10.0.77.1/16"), 2).unwrap();
        assert_eq!(a, b);
    }
}
