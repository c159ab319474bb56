// Copyright (c) 2025 - Cowboy AI, Inc.
//! Construction Phase State Machine
//!
//! Tracks a construction run through its stages.
//!
//! # States
//!
//! - Planned: plan validated, nothing built yet
//! - Building(stage): stage running
//! - Built(stage): stage finished, next one not started
//! - Complete: all planned stages built (terminal)
//! - Aborted: a stage or the plan failed (terminal)
//!
//! # Inputs
//!
//! - Begin(stage): Planned | Built → Building
//! - Finish: Building → Built
//! - Abort(reason): Planned | Building → Aborted
//! - Seal: Planned | Built → Complete
//!
//! The output of a transition is the stage it closed, if any.

use serde::Serialize;
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};
use crate::graph::Stage;

/// Where a construction run is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionPhase {
    Planned,
    Building(Stage),
    Built(Stage),
    Complete,
    Aborted { stage: Option<Stage>, reason: String },
}

/// Construction event (FSM input)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionInput {
    Begin(Stage),
    Finish,
    Abort(String),
    Seal,
}

impl ConstructionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Aborted { .. })
    }
}

impl fmt::Display for ConstructionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planned => write!(f, "planned"),
            Self::Building(stage) => write!(f, "building {stage}"),
            Self::Built(stage) => write!(f, "built {stage}"),
            Self::Complete => write!(f, "complete"),
            Self::Aborted { stage: Some(stage), .. } => write!(f, "aborted in {stage}"),
            Self::Aborted { stage: None, .. } => write!(f, "aborted"),
        }
    }
}

impl StateMachine for ConstructionPhase {
    type Input = ConstructionInput;
    type Output = Option<Stage>;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use ConstructionInput::*;
        use ConstructionPhase::*;

        match (self, input) {
            (Planned | Built(_), Begin(stage)) => Ok((Building(*stage), None)),
            (Building(stage), Finish) => Ok((Built(*stage), Some(*stage))),
            (Planned | Built(_), Seal) => Ok((Complete, None)),

            (_, Abort(reason)) if reason.trim().is_empty() => Err(
                TransitionError::PreconditionFailed("abort requires a reason".to_string()),
            ),
            (Planned, Abort(reason)) => Ok((
                Aborted {
                    stage: None,
                    reason: reason.clone(),
                },
                None,
            )),
            (Building(stage), Abort(reason)) => Ok((
                Aborted {
                    stage: Some(*stage),
                    reason: reason.clone(),
                },
                Some(*stage),
            )),

            (from, input) => Err(TransitionError::InvalidTransition {
                from: from.to_string(),
                to: format!("{input:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::StateMachineWithHistory;
    use chrono::Utc;

    #[test]
    fn test_stage_cycle() {
        let (building, closed) = ConstructionPhase::Planned
            .transition(&ConstructionInput::Begin(Stage::Network))
            .unwrap();
        assert_eq!(building, ConstructionPhase::Building(Stage::Network));
        assert_eq!(closed, None);

        let (built, closed) = building.transition(&ConstructionInput::Finish).unwrap();
        assert_eq!(built, ConstructionPhase::Built(Stage::Network));
        assert_eq!(closed, Some(Stage::Network));
    }

    #[test]
    fn test_abort_records_stage() {
        let (aborted, _) = ConstructionPhase::Building(Stage::Database)
            .transition(&ConstructionInput::Abort("missing private_subnets".into()))
            .unwrap();
        assert_eq!(aborted.to_string(), "aborted in database");
        assert!(aborted.is_terminal());
    }

    #[test]
    fn test_abort_needs_reason() {
        let result = ConstructionPhase::Planned.transition(&ConstructionInput::Abort(" ".into()));
        assert!(matches!(result, Err(TransitionError::PreconditionFailed(_))));
    }

    #[test]
    fn test_terminal_states_reject_input() {
        assert!(!ConstructionPhase::Complete.can_transition(&ConstructionInput::Begin(Stage::Dns)));
        assert!(!ConstructionPhase::Complete.can_transition(&ConstructionInput::Seal));
    }

    #[test]
    fn test_cannot_begin_while_building() {
        let result = ConstructionPhase::Building(Stage::Network)
            .transition(&ConstructionInput::Begin(Stage::SecurityPolicy));
        assert!(matches!(result, Err(TransitionError::InvalidTransition { .. })));
    }

    #[test]
    fn test_history() {
        let mut fsm = StateMachineWithHistory::new(ConstructionPhase::Planned);
        fsm.transition_with_history(ConstructionInput::Begin(Stage::Network), Utc::now())
            .unwrap();
        fsm.transition_with_history(ConstructionInput::Finish, Utc::now())
            .unwrap();
        fsm.transition_with_history(ConstructionInput::Seal, Utc::now())
            .unwrap();

        assert_eq!(*fsm.current_state(), ConstructionPhase::Complete);
        assert_eq!(fsm.get_history().len(), 3);
        assert_eq!(fsm.get_history()[1].to, ConstructionPhase::Built(Stage::Network));
    }
}
