//! A multi-card ingest job driven through the session phases.

use super::machine::{transition, SessionInput, SessionPhase};
use crate::core::ingest::{CardIngest, IngestRequest, IngestResult};
use crate::core::job::JobConfig;
use crate::core::ledger::{append_session_row, LedgerStatus};
use crate::error::{Result, SessionError};
use crate::events::{null_sender, Event, EventSender, SessionEvent};
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Default studio folder at the top of both destinations
pub const DEFAULT_BASE_FOLDER: &str = "Cactus";

/// One job: N cards copied in order, then one ledger row.
pub struct IngestSession {
    id: Uuid,
    job: JobConfig,
    phase: SessionPhase,
    card_index: u32,
    started_at: Option<NaiveDateTime>,
    base_folder_name: String,
    ingest_date: Option<String>,
    ledger_path: PathBuf,
    events: EventSender,
}

impl IngestSession {
    /// Create a session for a validated job
    pub fn new(job: JobConfig, ledger_path: impl Into<PathBuf>) -> Result<Self> {
        job.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            job,
            phase: SessionPhase::Idle,
            card_index: 1,
            started_at: None,
            base_folder_name: DEFAULT_BASE_FOLDER.to_string(),
            ingest_date: None,
            ledger_path: ledger_path.into(),
            events: null_sender(),
        })
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn with_base_folder(mut self, name: impl Into<String>) -> Self {
        self.base_folder_name = name.into();
        self
    }

    /// Pin the date folder instead of using the session start date
    pub fn with_ingest_date(mut self, date: impl Into<String>) -> Self {
        self.ingest_date = Some(date.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn job(&self) -> &JobConfig {
        &self.job
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// 1-based index of the card being waited for or copied
    pub fn card_index(&self) -> u32 {
        self.card_index
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn is_last_card(&self) -> bool {
        self.card_index >= self.job.num_cards
    }

    fn apply(&mut self, input: SessionInput) -> Result<SessionPhase> {
        let from = self.phase;
        let to = transition(from, input)?;
        self.phase = to;
        tracing::debug!(session = %self.id, %from, %to, card = self.card_index, "session phase changed");
        self.events.send(Event::Session(SessionEvent::PhaseChanged {
            from,
            to,
            card_index: self.card_index,
        }));
        Ok(to)
    }

    /// Begin the job at card 1
    pub fn start(&mut self) -> Result<()> {
        self.apply(SessionInput::Start)?;
        self.card_index = 1;
        self.started_at = Some(Local::now().naive_local());
        tracing::info!(
            session = %self.id,
            client = %self.job.client_name,
            project = %self.job.project_name,
            cards = self.job.num_cards,
            "session started"
        );
        Ok(())
    }

    /// Request for the current card read from `source_root`
    pub fn request_for(&self, source_root: impl Into<PathBuf>) -> Result<IngestRequest> {
        if self.phase != SessionPhase::WaitingForCard && self.phase != SessionPhase::Copying {
            return Err(SessionError::InvalidTransition {
                from: self.phase.to_string(),
                input: "card request".to_string(),
            }
            .into());
        }

        let ingest_date = match &self.ingest_date {
            Some(date) => date.clone(),
            None => self
                .started_at
                .unwrap_or_else(|| Local::now().naive_local())
                .format("%Y-%m-%d")
                .to_string(),
        };

        Ok(IngestRequest {
            source_root: source_root.into(),
            archive_root: self.job.archive_path.clone(),
            proxy_root: self.job.proxy_path.clone(),
            base_folder_name: self.base_folder_name.clone(),
            client_project: self.job.safe_project_folder(),
            ingest_date,
            card_index: self.card_index,
        })
    }

    /// Mark the current card as copying
    pub fn begin_copy(&mut self) -> Result<()> {
        self.apply(SessionInput::BeginCopy)?;
        Ok(())
    }

    /// Feed the outcome of the current card back into the session.
    ///
    /// A successful non-last card advances the index. A successful last card
    /// moves to finalizing. Anything else fails the card.
    pub fn record_result(&mut self, result: &IngestResult) -> Result<SessionPhase> {
        if self.phase != SessionPhase::Copying {
            return Err(SessionError::InvalidTransition {
                from: self.phase.to_string(),
                input: "card result".to_string(),
            }
            .into());
        }
        if !result.ok {
            tracing::warn!(session = %self.id, card = self.card_index, reason = %result.reason, "card failed");
            return self.apply(SessionInput::CardFailed);
        }

        let last = self.is_last_card();
        let phase = self.apply(SessionInput::CardCopied { last })?;
        if !last {
            self.card_index += 1;
        }
        Ok(phase)
    }

    /// The current card stopped on an internal error rather than a result
    pub fn record_crash(&mut self, message: &str) -> Result<SessionPhase> {
        tracing::error!(session = %self.id, card = self.card_index, %message, "card crashed");
        self.apply(SessionInput::CardFailed)
    }

    /// Run the current card end-to-end on the calling thread
    pub fn ingest_card(
        &mut self,
        ingest: &CardIngest,
        source_root: impl Into<PathBuf>,
    ) -> Result<IngestResult> {
        let request = self.request_for(source_root)?;
        self.begin_copy()?;

        match ingest.ingest_with_events(&request, &self.events) {
            Ok(result) => {
                self.record_result(&result)?;
                Ok(result)
            }
            Err(e) => {
                self.record_crash(&e.to_string())?;
                Err(e)
            }
        }
    }

    /// Try the current card again
    pub fn retry(&mut self) -> Result<()> {
        self.apply(SessionInput::Retry)?;
        Ok(())
    }

    /// Give up on a failed card and record the session as failed
    pub fn abandon(&mut self) -> Result<()> {
        self.end_with(SessionInput::Abandon, LedgerStatus::Failed)
    }

    /// Stop while waiting for a card and record the session as canceled
    pub fn cancel(&mut self) -> Result<()> {
        self.end_with(SessionInput::Cancel, LedgerStatus::Canceled)
    }

    /// Write the OK ledger row after the last card
    pub fn finalize(&mut self) -> Result<()> {
        self.end_with(SessionInput::Finalized, LedgerStatus::Ok)
    }

    /// Back to idle after a finished job
    pub fn reset(&mut self) -> Result<()> {
        self.apply(SessionInput::Reset)?;
        self.card_index = 1;
        self.started_at = None;
        Ok(())
    }

    /// Write the closing ledger row, then move on.
    ///
    /// The phase only changes once the row is on disk, so a failed write can
    /// be retried with the same call.
    fn end_with(&mut self, input: SessionInput, status: LedgerStatus) -> Result<()> {
        transition(self.phase, input)?;
        self.write_ledger(status)?;
        self.apply(input)?;
        Ok(())
    }

    fn write_ledger(&self, status: LedgerStatus) -> Result<()> {
        let started_at = self.started_at.unwrap_or_else(|| Local::now().naive_local());
        append_session_row(
            &self.ledger_path,
            started_at,
            Some(Local::now().naive_local()),
            status,
            &self.job,
        )?;
        self.events.send(Event::Session(SessionEvent::LedgerWritten {
            status,
            path: self.ledger_path.clone(),
        }));
        Ok(())
    }
}
