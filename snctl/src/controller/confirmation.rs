//! Confirmation gate for destructive actions.
//!
//! `Idle -> AwaitingConfirmation -> (Idle | AwaitingConfirmation { invalid })`. The gate holds at
//! most one pending action; a new request replaces whatever was waiting. It only decides whether
//! an action may go ahead and never performs it itself.

use crate::errors::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation<A> {
    pub action: A,
    pub message: String,
    /// Text the user must type exactly (case-sensitive, untrimmed) for the action to proceed.
    pub required_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState<A> {
    Idle,
    AwaitingConfirmation {
        pending: PendingConfirmation<A>,
        /// Set after a submission whose name did not match
        invalid: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision<A> {
    Proceed(PendingConfirmation<A>),
    NameMismatch,
}

#[derive(Debug, Clone)]
pub struct ConfirmationGate<A> {
    state: GateState<A>,
}

impl<A> Default for ConfirmationGate<A> {
    fn default() -> Self {
        Self { state: GateState::Idle }
    }
}

impl<A: Clone> ConfirmationGate<A> {
    pub fn state(&self) -> &GateState<A> {
        &self.state
    }

    pub fn pending(&self) -> Option<&PendingConfirmation<A>> {
        match &self.state {
            GateState::Idle => None,
            GateState::AwaitingConfirmation { pending, .. } => Some(pending),
        }
    }

    pub fn is_flagged_invalid(&self) -> bool {
        matches!(self.state, GateState::AwaitingConfirmation { invalid: true, .. })
    }

    /// Start waiting for confirmation of `pending`. Any earlier pending action is dropped.
    pub fn request(&mut self, pending: PendingConfirmation<A>) {
        self.state = GateState::AwaitingConfirmation { pending, invalid: false };
    }

    pub fn cancel(&mut self) -> Result<PendingConfirmation<A>> {
        match std::mem::replace(&mut self.state, GateState::Idle) {
            GateState::Idle => Err(Error::NoPendingConfirmation),
            GateState::AwaitingConfirmation { pending, .. } => Ok(pending),
        }
    }

    /// Resolve the pending action with what the user typed. On a name mismatch the gate stays
    /// open and is flagged invalid; otherwise it goes back to idle and hands the action over.
    pub fn submit(&mut self, input: Option<&str>) -> Result<GateDecision<A>> {
        let GateState::AwaitingConfirmation { pending, invalid } = &mut self.state else {
            return Err(Error::NoPendingConfirmation);
        };

        if let Some(required) = &pending.required_name
            && input != Some(required.as_str())
        {
            *invalid = true;
            return Ok(GateDecision::NameMismatch);
        }

        let pending = pending.clone();
        self.state = GateState::Idle;
        Ok(GateDecision::Proceed(pending))
    }
}
