//! # Session Module
//!
//! Drives an N-card job: wait for a card, copy it, advance, and write a
//! single ledger row when the job ends.
//!
//! The phase table lives in `machine` as a pure function so front-ends can
//! ask what is allowed without touching a live session.

mod driver;
mod machine;

pub use driver::{IngestSession, DEFAULT_BASE_FOLDER};
pub use machine::{transition, SessionInput, SessionPhase};
