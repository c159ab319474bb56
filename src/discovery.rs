// Copyright (c) 2025 - Cowboy AI, Inc.
//! Availability Zone Discovery
//!
//! The zone list comes from the cloud provider at construction time. The
//! lookup sits behind [`ZoneProvider`] so the builder never talks to a cloud
//! API itself.

use async_trait::async_trait;

use crate::errors::{StackResult, TopologyError};

/// Source of the availability zones of a region
#[async_trait]
pub trait ZoneProvider: Send + Sync {
    /// Zone names in provider order
    async fn availability_zones(&self, region: &str) -> StackResult<Vec<String>>;
}

/// Fixed zone list, for planning without a provider
#[derive(Debug, Clone, Default)]
pub struct StaticZones {
    zones: Vec<String>,
}

impl StaticZones {
    pub fn new<I, S>(zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            zones: zones.into_iter().map(Into::into).collect(),
        }
    }

    /// `<region>a`, `<region>b`, ... for `count` zones
    pub fn lettered(region: &str, count: usize) -> Self {
        Self::new((b'a'..=b'z').take(count).map(|c| format!("{region}{}", c as char)))
    }
}

#[async_trait]
impl ZoneProvider for StaticZones {
    async fn availability_zones(&self, _region: &str) -> StackResult<Vec<String>> {
        if self.zones.is_empty() {
            return Err(TopologyError::NoAvailabilityZones.into());
        }
        Ok(self.zones.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_zones() {
        let provider = StaticZones::lettered("us-east-1", 3);
        let zones = provider.availability_zones("us-east-1").await.unwrap();
        assert_eq!(zones, vec!["us-east-1a", "us-east-1b", "us-east-1c"]);
    }

    #[tokio::test]
    async fn test_empty_provider_fails() {
        let provider = StaticZones::default();
        assert!(provider.availability_zones("us-east-1").await.is_err());
    }
}
