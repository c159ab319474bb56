// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-topology
//!
//! Deterministic stack configurations and zone lists. Secret values are
//! distinctive strings so tests can assert they never leak into exports.

#![allow(dead_code)]

use std::collections::BTreeMap;

use cim_topology::config::keys;
use cim_topology::StackConfig;

pub const DB_PASSWORD: &str = "pw1-f1xture-secret";
pub const CERTIFICATE_ARN: &str = "arn:aws:acm:us-east-1:123456789012:certificate/f1xture";
pub const MAILGUN_API_KEY: &str = "mg-f1xture-key";
pub const REGION: &str = "us-east-1";

/// Complete stack key map for a `10.0.0.0/16` block
pub fn stack_map() -> BTreeMap<String, String> {
    [
        (keys::CIDR_BLOCK, "10.0.0.0/16"),
        (keys::VPC_NAME, "csye6225-vpc"),
        (keys::IGW_NAME, "csye6225-igw"),
        (keys::REGION, REGION),
        (keys::PUBLIC_ROUTE_DESTINATION, "0.0.0.0/0"),
        (keys::KEY_PAIR, "ec2-key"),
        (keys::AMI_ID, "ami-0123456789abcdef0"),
        (keys::MAILGUN_API_KEY, MAILGUN_API_KEY),
        (keys::DOMAIN_NAME, "demo.example.com"),
        (keys::ACCOUNT_ID, "123456789012"),
        (keys::HOSTED_ZONE_ID, "Z0123456789"),
        (keys::CERTIFICATE_ARN, CERTIFICATE_ARN),
        (keys::DB_PASSWORD, DB_PASSWORD),
        (keys::PROFILE, "demo"),
        (keys::SERVERLESS_ZIP, "serverless.zip"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn stack_config() -> StackConfig {
    StackConfig::from_map(&stack_map()).expect("fixture configuration is complete")
}

/// `count` lettered zones of the fixture region
pub fn zones(count: usize) -> Vec<String> {
    (b'a'..=b'z')
        .take(count)
        .map(|c| format!("{REGION}{}", c as char))
        .collect()
}
