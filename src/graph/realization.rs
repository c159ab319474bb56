// Copyright (c) 2025 - Cowboy AI, Inc.
//! Realization Slots
//!
//! The handle through which the external provisioning engine feeds realized
//! outputs (database endpoint, topic identifier, load-balancer address) back
//! into the declared graph. Each slot settles one pending [`Deferred`];
//! everything derived from it resolves on its own once all of its inputs are
//! in.

use std::collections::BTreeMap;
use tracing::info;

use crate::domain::OutputRef;
use crate::errors::{ResolutionError, TopologyError};
use crate::frp::{Deferred, Resolver};

/// Open slots keyed by resource output
#[derive(Debug, Default)]
pub struct Realization {
    slots: BTreeMap<OutputRef, Resolver<String>>,
}

impl Realization {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a slot for `output` and return the value it will settle
    pub fn slot(&mut self, output: OutputRef) -> Result<Deferred<String>, TopologyError> {
        if self.slots.contains_key(&output) {
            return Err(TopologyError::DuplicateResource(output.to_string()));
        }
        let (resolver, value) = Deferred::output(output.clone());
        self.slots.insert(output, resolver);
        Ok(value)
    }

    /// Outputs still waiting for the engine, in order
    pub fn pending(&self) -> impl Iterator<Item = &OutputRef> {
        self.slots.keys()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn take_slot(&mut self, output: &OutputRef) -> Result<Resolver<String>, ResolutionError> {
        self.slots
            .remove(output)
            .ok_or_else(|| ResolutionError::UnknownSlot(output.to_string()))
    }

    /// Provide the realized value of `output`
    pub fn resolve(&mut self, output: &OutputRef, value: impl Into<String>) -> Result<(), ResolutionError> {
        let resolver = self.take_slot(output)?;
        info!(%output, "output realized");
        resolver.resolve(value.into());
        Ok(())
    }

    /// Report that the resource behind `output` failed to realize
    pub fn fail(&mut self, output: &OutputRef, reason: impl Into<String>) -> Result<(), ResolutionError> {
        self.take_slot(output)?.fail(reason);
        Ok(())
    }

    /// Hand a slot's resolver to the caller, e.g. to settle it on another task
    pub fn take(&mut self, output: &OutputRef) -> Option<Resolver<String>> {
        self.slots.remove(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceId;

    fn endpoint() -> OutputRef {
        ResourceId::new("csye6225").unwrap().output("endpoint")
    }

    #[tokio::test]
    async fn test_resolve_slot() {
        let mut realization = Realization::new();
        let value = realization.slot(endpoint()).unwrap();
        assert_eq!(realization.pending().collect::<Vec<_>>(), vec![&endpoint()]);

        realization.resolve(&endpoint(), "db.internal").unwrap();
        assert!(realization.is_empty());
        assert_eq!(value.resolve().await.unwrap(), "db.internal");
    }

    #[test]
    fn test_unknown_slot() {
        let mut realization = Realization::new();
        assert_eq!(
            realization.resolve(&endpoint(), "x"),
            Err(ResolutionError::UnknownSlot("csye6225.endpoint".into()))
        );
    }

    #[test]
    fn test_slot_opened_once() {
        let mut realization = Realization::new();
        let _value = realization.slot(endpoint()).unwrap();
        assert!(realization.slot(endpoint()).is_err());
    }

    #[tokio::test]
    async fn test_failed_slot() {
        let mut realization = Realization::new();
        let value = realization.slot(endpoint()).unwrap();
        realization.fail(&endpoint(), "instance quota").unwrap();
        assert!(matches!(
            value.resolve().await,
            Err(ResolutionError::Failed { reason, .. }) if reason == "instance quota"
        ));
    }
}
