// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Policy
//!
//! Tier-scoped ingress/egress rule sets for the load-balancer, compute and
//! database tiers, composed from a fixed policy table.

pub mod composer;
pub mod policy;

pub use composer::{PeerTemplate, RuleTemplate, SecurityPolicyComposer, POLICY_TABLE};
pub use policy::{
    Direction, Peer, PortRange, Protocol, Rule, SecurityPolicy, SecurityTier, TierIdentity,
    APP_PORT, DB_PORT, HTTPS_PORT, HTTP_PORT, SSH_PORT, TELEMETRY_PORT,
};
