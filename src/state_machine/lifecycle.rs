// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Provisioning Lifecycle
//!
//! FSM for one logical resource record, driven by the resource controller.
//!
//! # States
//!
//! - Absent: no record exists
//! - Creating / Updating / Deleting: an operation is in flight
//! - Succeeded / Failed / Canceled: the last operation finished
//!
//! # Inputs
//!
//! - BeginCreate: Absent → Creating
//! - BeginUpdate: Succeeded | Failed | Canceled → Updating
//! - BeginDelete: Succeeded | Failed | Canceled → Deleting, Absent → Absent
//! - Complete: Creating | Updating → Succeeded, Deleting → Absent
//! - Fail: Creating | Updating | Deleting → Failed
//! - Cancel: Creating | Updating | Deleting → Canceled
//!
//! Starting an operation while another one is in flight is rejected.

use std::fmt;

use super::{StateMachine, TransitionError, TransitionOutput, TransitionResult};
use crate::domain::ProvisioningState;

/// Lifecycle state of a resource record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Absent,
    Creating,
    Updating,
    Deleting,
    Succeeded,
    Failed,
    Canceled,
}

/// Lifecycle command (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    BeginCreate,
    BeginUpdate,
    BeginDelete,
    Complete,
    Fail,
    Cancel,
}

impl LifecycleState {
    /// State of a stored record
    pub fn from_record(state: Option<ProvisioningState>) -> Self {
        match state {
            None => Self::Absent,
            Some(ProvisioningState::Accepted) => Self::Creating,
            Some(ProvisioningState::Updating) => Self::Updating,
            Some(ProvisioningState::Deleting) => Self::Deleting,
            Some(ProvisioningState::Succeeded) => Self::Succeeded,
            Some(ProvisioningState::Failed) => Self::Failed,
            Some(ProvisioningState::Canceled) => Self::Canceled,
        }
    }

    /// Provisioning state to persist, `None` when the record is gone
    pub fn provisioning_state(&self) -> Option<ProvisioningState> {
        match self {
            Self::Absent => None,
            Self::Creating => Some(ProvisioningState::Accepted),
            Self::Updating => Some(ProvisioningState::Updating),
            Self::Deleting => Some(ProvisioningState::Deleting),
            Self::Succeeded => Some(ProvisioningState::Succeeded),
            Self::Failed => Some(ProvisioningState::Failed),
            Self::Canceled => Some(ProvisioningState::Canceled),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Creating | Self::Updating | Self::Deleting)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl StateMachine for LifecycleState {
    type Input = LifecycleCommand;
    type Output = TransitionOutput;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use LifecycleCommand::*;
        use LifecycleState::*;

        match (self, input) {
            (Absent, BeginCreate) => Ok((Creating, TransitionOutput::none())),
            (Absent, BeginDelete) => Ok((Absent, TransitionOutput::note("resource does not exist"))),

            (Succeeded | Failed | Canceled, BeginUpdate) => Ok((Updating, TransitionOutput::none())),
            (Succeeded | Failed | Canceled, BeginDelete) => Ok((Deleting, TransitionOutput::none())),

            (Creating | Updating, Complete) => Ok((Succeeded, TransitionOutput::none())),
            (Deleting, Complete) => Ok((Absent, TransitionOutput::none())),

            (Creating | Updating | Deleting, Fail) => {
                Ok((Failed, TransitionOutput::failure(format!("{} failed", self))))
            }
            (Creating | Updating | Deleting, Cancel) => {
                Ok((Canceled, TransitionOutput::note(format!("{} was canceled", self))))
            }

            (Creating | Updating | Deleting, BeginCreate | BeginUpdate | BeginDelete) => {
                Err(TransitionError::InProgress(self.to_string()))
            }

            (Absent, BeginUpdate) => Err(TransitionError::Missing),
            (Succeeded | Failed | Canceled, BeginCreate) => Err(TransitionError::AlreadyExists),

            (from, command) => Err(TransitionError::InvalidTransition {
                from: from.to_string(),
                to: format!("{:?}", command),
            }),
        }
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        use LifecycleCommand::*;
        use LifecycleState::*;

        match self {
            Absent => vec![BeginCreate, BeginDelete],
            Creating | Updating | Deleting => vec![Complete, Fail, Cancel],
            Succeeded | Failed | Canceled => vec![BeginUpdate, BeginDelete],
        }
    }
}
