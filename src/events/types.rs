//! Event type definitions for progress reporting.

use crate::core::copier::CopyExit;
use crate::core::ingest::{IngestResult, SpaceReport};
use crate::core::layout::Destination;
use crate::core::ledger::LedgerStatus;
use crate::core::session::SessionPhase;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the ingest core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Single-card ingest events
    Ingest(IngestEvent),
    /// Multi-card session events
    Session(SessionEvent),
}

/// Events while one card is being ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IngestEvent {
    /// The operation has started for a card
    Started { card_index: u32, source: PathBuf },
    /// The pre-flight space check finished
    SpaceChecked(SpaceReport),
    /// A copy was launched
    CopyStarted {
        destination: Destination,
        target: PathBuf,
        log_path: PathBuf,
    },
    /// A copy finished. `None` when it could not run at all.
    CopyFinished {
        destination: Destination,
        exit_code: Option<CopyExit>,
    },
    /// The worker produced a result (success or structured failure)
    Finished { result: IngestResult },
    /// The worker hit an unexpected error
    Crashed { message: String },
}

/// Events from the session state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The session moved to a new phase
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
        card_index: u32,
    },
    /// A ledger row was appended
    LedgerWritten { status: LedgerStatus, path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Ingest(IngestEvent::CopyStarted {
            destination: Destination::Proxy,
            target: PathBuf::from("/proxy/Cactus/A_-_B/Proxy/2026-01-15/SD1"),
            log_path: PathBuf::from("/proxy/Cactus/A_-_B/Proxy/2026-01-15/_logs/SD1_ssd_robocopy.log"),
        });

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Ingest(IngestEvent::CopyStarted { destination, .. }) => {
                assert_eq!(destination, Destination::Proxy);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn phase_change_is_serializable() {
        let event = Event::Session(SessionEvent::PhaseChanged {
            from: SessionPhase::WaitingForCard,
            to: SessionPhase::Copying,
            card_index: 2,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("waiting_for_card"));
        assert!(json.contains("copying"));
    }
}
