//! Per-turn state machine.
//!
//! `Received -> MemoryRead -> PromptBuilt -> Reasoning -> (ToolDispatch -> Reasoning)* -> Responded`.
//! Any non-terminal state may fail straight to `Responded`; nothing leaves
//! `Responded`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnState {
    Received,
    MemoryRead,
    PromptBuilt,
    Reasoning,
    ToolDispatch,
    Responded,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Responded)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnEvent {
    MemoryLoaded,
    PromptRendered,
    ReasoningRequested,
    ToolCallsSelected,
    ToolResultsReturned,
    FinalAnswerProduced,
    TurnFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: TurnState,
    pub to: TurnState,
    pub event: TurnEvent,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnTransitionError {
    #[error("invalid turn transition from {state:?} using event {event:?}")]
    InvalidTransition { state: TurnState, event: TurnEvent },
}

pub fn transition(current: TurnState, event: TurnEvent) -> Result<TurnState, TurnTransitionError> {
    use TurnEvent::{
        FinalAnswerProduced, MemoryLoaded, PromptRendered, ReasoningRequested, ToolCallsSelected,
        ToolResultsReturned, TurnFailed,
    };
    use TurnState::{MemoryRead, PromptBuilt, Reasoning, Received, Responded, ToolDispatch};

    match (current, event) {
        (Received, MemoryLoaded) => Ok(MemoryRead),
        (MemoryRead, PromptRendered) => Ok(PromptBuilt),
        (PromptBuilt, ReasoningRequested) => Ok(Reasoning),
        (Reasoning, ToolCallsSelected) => Ok(ToolDispatch),
        (ToolDispatch, ToolResultsReturned) => Ok(Reasoning),
        (Reasoning, FinalAnswerProduced) => Ok(Responded),
        (state, TurnFailed) if !state.is_terminal() => Ok(Responded),
        (state, event) => Err(TurnTransitionError::InvalidTransition { state, event }),
    }
}

#[derive(Clone, Debug)]
pub struct TurnMachine {
    state: TurnState,
    tool_rounds: u32,
    history: Vec<TurnState>,
}

impl Default for TurnMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnMachine {
    pub fn new() -> Self {
        Self { state: TurnState::Received, tool_rounds: 0, history: vec![TurnState::Received] }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Completed `ToolDispatch` rounds so far.
    pub fn tool_rounds(&self) -> u32 {
        self.tool_rounds
    }

    pub fn history(&self) -> &[TurnState] {
        &self.history
    }

    pub fn apply(&mut self, event: TurnEvent) -> Result<TransitionOutcome, TurnTransitionError> {
        let from = self.state;
        let to = transition(from, event)?;
        if event == TurnEvent::ToolCallsSelected {
            self.tool_rounds += 1;
        }
        self.state = to;
        self.history.push(to);
        Ok(TransitionOutcome { from, to, event })
    }
}
