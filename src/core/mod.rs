//! # Core Module
//!
//! The front-end agnostic ingest engine.
//!
//! ## Modules
//! - `space` - Free/used space and the safety margin
//! - `layout` - Destination folders and log paths for a card
//! - `copier` - Robocopy and native copy backends
//! - `ingest` - The dual-destination copy of one card
//! - `job` - Operator choices for a session
//! - `session` - Multi-card phases and ledger writes
//! - `ledger` - Append-only session CSV
//! - `registry` - Recent projects list
//! - `drives` - Mounted volume enumeration

pub mod copier;
pub mod drives;
pub mod ingest;
pub mod job;
pub mod layout;
pub mod ledger;
pub mod registry;
pub mod session;
pub mod space;

// Re-export commonly used types
pub use copier::{CopierKind, CopyExit, CopyRunner};
pub use ingest::{CardIngest, IngestReason, IngestRequest, IngestResult, IngestWorker};
pub use job::{JobConfig, JobMode};
pub use ledger::{LedgerEntry, LedgerStatus};
pub use session::{IngestSession, SessionPhase};
pub use space::{DiskSpace, SpaceQuery};
