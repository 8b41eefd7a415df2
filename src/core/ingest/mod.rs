//! # Ingest Module
//!
//! Copies one camera card to the archive drive and the proxy SSD.
//!
//! ## Steps
//! 1. **Layout** - derive and create the card and log folders on both drives
//! 2. **Space** - card usage plus safety margin must fit on *both* drives
//! 3. **Copy** - both copies launched together, both always joined
//! 4. **Classify** - exit codes 0-7 pass, 8+ fail
//!
//! Nothing is retried or cleaned up here. A rerun of the same card is safe
//! because unchanged files are skipped by the copier.

mod operation;
mod types;
mod worker;

pub use operation::{CardIngest, CardIngestBuilder};
pub use types::{CopyReport, IngestReason, IngestRequest, IngestResult, SpaceReport};
pub use worker::IngestWorker;
