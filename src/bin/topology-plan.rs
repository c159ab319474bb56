// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Plan
//!
//! Reads a stack file, builds the resource graph and prints the plan the
//! provisioning engine consumes.
//!
//! Run with: cargo run --bin topology-plan
//!
//! Environment:
//! 1. TOPOLOGY_CONFIG - stack YAML file (default: Stack.yaml)
//! 2. TOPOLOGY_PROJECT - project namespace of the stack keys (default: csye6225)
//! 3. TOPOLOGY_ZONES - comma-separated availability zones (default: three
//!    lettered zones of the configured region)
//! 4. TOPOLOGY_<KEY> - override of a single stack key

use anyhow::{Context, Result};
use cim_topology::{ResourceGraphBuilder, StackConfig, StaticZones};
use tracing::info;

#[derive(Debug, Clone)]
struct PlanOptions {
    config_path: String,
    project: String,
    zones: Option<Vec<String>>,
}

impl PlanOptions {
    fn from_env() -> Self {
        let config_path =
            std::env::var("TOPOLOGY_CONFIG").unwrap_or_else(|_| "Stack.yaml".to_string());
        let project = std::env::var("TOPOLOGY_PROJECT").unwrap_or_else(|_| "csye6225".to_string());
        let zones = std::env::var("TOPOLOGY_ZONES").ok().map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|z| !z.is_empty())
                .map(String::from)
                .collect()
        });

        Self {
            config_path,
            project,
            zones,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let options = PlanOptions::from_env();
    let yaml = std::fs::read_to_string(&options.config_path)
        .with_context(|| format!("reading stack file {}", options.config_path))?;
    let config = StackConfig::from_yaml_str_with_env(&options.project, &yaml, |name| {
        std::env::var(name).ok()
    })
    .context("invalid stack configuration")?;

    let provider = match options.zones {
        Some(zones) => StaticZones::new(zones),
        None => StaticZones::lettered(&config.region, 3),
    };

    let construction = ResourceGraphBuilder::build_with_provider(&config, &provider)
        .await
        .context("topology construction failed")?;

    info!(
        resources = construction.graph.len(),
        pending_outputs = construction.realization.len(),
        "plan ready"
    );
    let plan = serde_json::to_string_pretty(&construction.graph.to_json())?;
    println!("{plan}");
    Ok(())
}
