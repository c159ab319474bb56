// Copyright (c) 2025 - Cowboy AI, Inc.
//! Scaling Policy Engine
//!
//! Fixed scale-up and scale-down policies bound to the CPU utilization of the
//! compute tier's autoscaling group. Every value here is a constant; nothing
//! is derived from load or configuration.

use serde::{Deserialize, Serialize};

use crate::domain::ResourceId;

/// Seconds between scaling activities
pub const COOLDOWN_SECS: u32 = 60;
/// Alarm evaluation window in seconds
pub const PERIOD_SECS: u32 = 60;
pub const EVALUATION_PERIODS: u32 = 1;
/// CPU percentage above which the group scales out
pub const SCALE_UP_THRESHOLD: f64 = 5.0;
/// CPU percentage below which the group scales in
pub const SCALE_DOWN_THRESHOLD: f64 = 3.0;

pub const METRIC_NAME: &str = "CPUUtilization";
pub const METRIC_NAMESPACE: &str = "AWS/EC2";
pub const STATISTIC: &str = "Average";
/// Dimension binding an alarm to one autoscaling group
pub const GROUP_DIMENSION: &str = "AutoScalingGroupName";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    GreaterThanThreshold,
    LessThanThreshold,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterThanThreshold => "GreaterThanThreshold",
            Self::LessThanThreshold => "LessThanThreshold",
        }
    }
}

/// Metric alarm half of a directional policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub metric: &'static str,
    pub namespace: &'static str,
    pub statistic: &'static str,
    pub comparison: Comparison,
    pub threshold: f64,
    pub period_secs: u32,
    pub evaluation_periods: u32,
}

/// One scaling direction: the adjustment policy and the alarm that fires it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionalPolicy {
    pub name: &'static str,
    /// Instances added (positive) or removed (negative)
    pub adjustment: i32,
    pub adjustment_type: &'static str,
    pub policy_type: &'static str,
    pub cooldown_secs: u32,
    pub aggregation: &'static str,
    pub alarm: AlarmSpec,
}

/// Scale-up and scale-down policies owned by one autoscaling group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalingPolicy {
    pub owner: ResourceId,
    pub scale_up: DirectionalPolicy,
    pub scale_down: DirectionalPolicy,
}

impl ScalingPolicy {
    pub fn directions(&self) -> [&DirectionalPolicy; 2] {
        [&self.scale_up, &self.scale_down]
    }
}

fn directional(
    name: &'static str,
    adjustment: i32,
    alarm: &'static str,
    description: &'static str,
    comparison: Comparison,
    threshold: f64,
) -> DirectionalPolicy {
    DirectionalPolicy {
        name,
        adjustment,
        adjustment_type: "ChangeInCapacity",
        policy_type: "SimpleScaling",
        cooldown_secs: COOLDOWN_SECS,
        aggregation: STATISTIC,
        alarm: AlarmSpec {
            name: alarm,
            description,
            metric: METRIC_NAME,
            namespace: METRIC_NAMESPACE,
            statistic: STATISTIC,
            comparison,
            threshold,
            period_secs: PERIOD_SECS,
            evaluation_periods: EVALUATION_PERIODS,
        },
    }
}

/// Emits the fixed policy pair for an autoscaling group
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalingPolicyEngine;

impl ScalingPolicyEngine {
    pub fn policies_for(&self, group: &ResourceId) -> ScalingPolicy {
        ScalingPolicy {
            owner: group.clone(),
            scale_up: directional(
                "scaleUpPolicy",
                1,
                "scaleUpAlarm",
                "Scale up if CPU > 5%",
                Comparison::GreaterThanThreshold,
                SCALE_UP_THRESHOLD,
            ),
            scale_down: directional(
                "scaleDownPolicy",
                -1,
                "scaleDownAlarm",
                "Scale down if CPU < 3%",
                Comparison::LessThanThreshold,
                SCALE_DOWN_THRESHOLD,
            ),
        }
    }
}
