// Copyright (c) 2025 - Cowboy AI, Inc.
//! Finite State Machine Abstractions
//!
//! Generic, pure state machine types used to model resource lifecycles.
//! Transitions are deterministic functions with no side effects; callers
//! perform the side effects only after a transition has been accepted.
//!
//! # Mealy Machine
//!
//! Output depends on both current state and input:
//! ```text
//! (State, Input) → (State, Output)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cim_deployment::state_machine::*;
//!
//! let (next, output) = LifecycleState::Absent.transition(&LifecycleCommand::BeginCreate)?;
//! assert_eq!(next, LifecycleState::Creating);
//! assert!(output.notes.is_empty());
//! ```

pub mod lifecycle;

pub use lifecycle::{LifecycleCommand, LifecycleState};

/// Result of a state transition
pub type TransitionResult<S> = Result<S, TransitionError>;

/// Errors that can occur during state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Transition from current state to target state is not allowed
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The operation needs a record that does not exist
    #[error("resource does not exist")]
    Missing,

    /// The operation would create a record that already exists
    #[error("resource already exists")]
    AlreadyExists,

    /// Another operation on the record has not finished
    #[error("another operation is in progress (state {0})")]
    InProgress(String),
}

/// Trait for finite state machines
///
/// Implement this trait to define a state machine with typed states,
/// inputs, and outputs.
pub trait StateMachine: Sized + Clone {
    /// Input type that triggers transitions
    type Input;

    /// Output type produced by transitions (use () if none)
    type Output;

    /// Attempt to transition to a new state given an input
    ///
    /// # Returns
    /// - Ok((new_state, output)) if transition is valid
    /// - Err(TransitionError) if transition is invalid
    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)>;

    /// Check if a transition is valid without performing it
    fn can_transition(&self, input: &Self::Input) -> bool {
        self.transition(input).is_ok()
    }

    /// Get all valid inputs from current state (if enumerable)
    fn valid_inputs(&self) -> Vec<Self::Input>
    where
        Self::Input: Clone,
    {
        Vec::new()
    }
}

/// What an accepted transition reports besides the new state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionOutput {
    /// Operator-facing notes
    pub notes: Vec<String>,

    /// The transition records a failed operation
    pub is_failure: bool,
}

impl TransitionOutput {
    /// Nothing to report
    pub fn none() -> Self {
        Self::default()
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self {
            notes: vec![message.into()],
            is_failure: false,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            notes: vec![message.into()],
            is_failure: true,
        }
    }

    /// Emit the notes on the current span
    pub fn log(&self) {
        for note in &self.notes {
            if self.is_failure {
                tracing::error!(note = %note, "Lifecycle transition");
            } else {
                tracing::info!(note = %note, "Lifecycle transition");
            }
        }
    }
}
