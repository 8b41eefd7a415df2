//! Phases of an ingest session and the allowed moves between them.

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No job running
    #[default]
    Idle,
    /// Waiting for the operator to insert the current card
    WaitingForCard,
    /// Both copies of the current card are running
    Copying,
    /// Last card copied, the ledger row is being written
    Finalizing,
    Done,
    /// The current card failed; retry or abandon
    Failed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WaitingForCard => "waiting_for_card",
            Self::Copying => "copying",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionInput {
    Start,
    BeginCopy,
    Cancel,
    CardCopied { last: bool },
    CardFailed,
    Retry,
    Abandon,
    Finalized,
    Reset,
}

impl fmt::Display for SessionInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::BeginCopy => f.write_str("begin copy"),
            Self::Cancel => f.write_str("cancel"),
            Self::CardCopied { last: true } => f.write_str("last card copied"),
            Self::CardCopied { last: false } => f.write_str("card copied"),
            Self::CardFailed => f.write_str("card failed"),
            Self::Retry => f.write_str("retry"),
            Self::Abandon => f.write_str("abandon"),
            Self::Finalized => f.write_str("finalized"),
            Self::Reset => f.write_str("reset"),
        }
    }
}

/// Next phase for `input` in `from`, or an error if the move is not allowed
pub fn transition(from: SessionPhase, input: SessionInput) -> Result<SessionPhase, SessionError> {
    use SessionInput as I;
    use SessionPhase as P;

    let to = match (from, input) {
        (P::Idle, I::Start) => P::WaitingForCard,
        (P::WaitingForCard, I::BeginCopy) => P::Copying,
        (P::WaitingForCard, I::Cancel) => P::Idle,
        (P::Copying, I::CardCopied { last: false }) => P::WaitingForCard,
        (P::Copying, I::CardCopied { last: true }) => P::Finalizing,
        (P::Copying, I::CardFailed) => P::Failed,
        (P::Failed, I::Retry) => P::WaitingForCard,
        (P::Failed, I::Abandon) => P::Idle,
        (P::Finalizing, I::Finalized) => P::Done,
        (P::Done, I::Reset) => P::Idle,
        _ => {
            return Err(SessionError::InvalidTransition {
                from: from.to_string(),
                input: input.to_string(),
            })
        }
    };
    Ok(to)
}
