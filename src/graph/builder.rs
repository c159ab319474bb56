// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Graph Builder
//!
//! Runs the construction stages of a [`StagePlan`] against a validated
//! configuration and the discovered availability zones. The plan is checked
//! before the first stage runs; each stage then checks its own inputs and
//! the run stops at the first failure.

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

use super::stage::{Stage, StageOutputs, StagePlan, Upstream};
use super::stages::StageContext;
use super::{Realization, ResourceGraph};
use crate::config::StackConfig;
use crate::discovery::ZoneProvider;
use crate::domain::NetworkTopology;
use crate::errors::{StackError, StackResult};
use crate::frp::Deferred;
use crate::scaling::ScalingPolicy;
use crate::security::SecurityPolicy;
use crate::state_machine::{ConstructionInput, ConstructionPhase, StateMachineWithHistory};

/// Result of a successful construction run
///
/// Stage-specific parts are `None` when the plan did not include the stage.
#[derive(Debug)]
pub struct Construction {
    pub graph: ResourceGraph,
    /// Slots the provisioning engine settles as it realizes resources
    pub realization: Realization,
    pub topology: Option<NetworkTopology>,
    pub policies: Vec<SecurityPolicy>,
    pub boot_artifact: Option<Deferred<String>>,
    pub user_data: Option<Deferred<String>>,
    pub scaling: Option<ScalingPolicy>,
    pub phase: StateMachineWithHistory<ConstructionPhase>,
}

/// Orchestrates construction order
#[derive(Debug)]
pub struct ResourceGraphBuilder<'a> {
    config: &'a StackConfig,
    zones: Vec<String>,
    plan: StagePlan,
}

impl<'a> ResourceGraphBuilder<'a> {
    pub fn new(config: &'a StackConfig, zones: Vec<String>) -> Self {
        Self {
            config,
            zones,
            plan: StagePlan::standard(),
        }
    }

    pub fn with_plan(mut self, plan: StagePlan) -> Self {
        self.plan = plan;
        self
    }

    /// Discover zones through `provider`, then build
    pub async fn build_with_provider(
        config: &'a StackConfig,
        provider: &dyn ZoneProvider,
    ) -> StackResult<Construction> {
        let zones = provider.availability_zones(&config.region).await?;
        Self::new(config, zones).build()
    }

    /// Run every planned stage
    #[instrument(skip(self), fields(region = %self.config.region, zones = self.zones.len()))]
    pub fn build(self) -> StackResult<Construction> {
        let mut phase = StateMachineWithHistory::new(ConstructionPhase::Planned);

        if let Err(err) = self.plan.validate() {
            warn!(error = %err, "stage plan rejected");
            phase.transition_with_history(ConstructionInput::Abort(err.to_string()), Utc::now())?;
            return Err(err.into());
        }

        let mut outputs = StageOutputs::new();
        outputs.provide_value(
            Upstream::DatabaseCredential,
            "password",
            self.config.db_password_value(),
        );
        let mut ctx = StageContext::new(self.config, &self.zones, outputs);

        for stage in self.plan.stages() {
            phase.transition_with_history(ConstructionInput::Begin(*stage), Utc::now())?;
            info!(%stage, "stage started");

            if let Err(err) = Self::run_stage(&mut ctx, *stage) {
                warn!(%stage, error = %err, "stage failed, construction aborted");
                phase.transition_with_history(ConstructionInput::Abort(err.to_string()), Utc::now())?;
                return Err(err);
            }

            phase.transition_with_history(ConstructionInput::Finish, Utc::now())?;
            info!(%stage, resources = ctx.graph.nodes_in_stage(*stage).count(), "stage finished");
        }

        phase.transition_with_history(ConstructionInput::Seal, Utc::now())?;
        info!(
            resources = ctx.graph.len(),
            pending_outputs = ctx.realization.len(),
            "construction complete"
        );

        Ok(Construction {
            graph: ctx.graph,
            realization: ctx.realization,
            topology: ctx.topology,
            policies: ctx.policies,
            boot_artifact: ctx.boot_artifact,
            user_data: ctx.user_data,
            scaling: ctx.scaling,
            phase,
        })
    }

    fn run_stage(ctx: &mut StageContext<'_>, stage: Stage) -> StackResult<()> {
        ctx.outputs.ensure(stage)?;
        ctx.run(stage).map_err(|e: StackError| e.in_stage(stage))
    }
}

/// Validate a key map and build the full topology for `zones`
pub fn construct(config: &BTreeMap<String, String>, zones: Vec<String>) -> StackResult<Construction> {
    let config = StackConfig::from_map(config)?;
    ResourceGraphBuilder::new(&config, zones).build()
}
