//! # Error Module
//!
//! Error types for the card ingest tool.
//!
//! ## Design Principles
//! - **Structured failures are not errors** - running out of space or a failed
//!   copy is reported through `IngestResult`, never through these types
//! - **Include context** - paths, program names, what went wrong
//! - **Operator-friendly messages** - the person at the ingest PC should understand

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Space query error: {0}")]
    Space(#[from] SpaceError),

    #[error("Copy error: {0}")]
    Copy(#[from] CopyError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Card stopped before reporting a result: {0}")]
    Interrupted(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors while preparing the destination folder layout
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Card index must start at 1 (got {index})")]
    InvalidCardIndex { index: u32 },

    #[error("Archive and proxy both point at {path}. Pick two different drives")]
    SameDestination { path: PathBuf },
}

/// Errors while asking a volume how much space it has
#[derive(Error, Debug)]
pub enum SpaceError {
    #[error("No mounted volume contains {path}. Is the drive still connected?")]
    NoVolume { path: PathBuf },

    #[error("Failed to query space for {path}: {reason}")]
    QueryFailed { path: PathBuf, reason: String },
}

/// Errors that stop a copy from running at all
///
/// A copy that runs and reports a failure exit code is not an error here.
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for {program} to exit: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open copy log {path}: {source}")]
    LogOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build copy worker pool: {0}")]
    WorkerPool(String),

    #[error("The {destination} copy thread panicked")]
    ThreadPanicked { destination: String },
}

/// Errors reading or writing the session ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to access ledger {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Ledger row is incomplete: {0}")]
    Incomplete(String),
}

/// Errors from the multi-card session state machine
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot apply {input} while the session is {from}")]
    InvalidTransition { from: String, input: String },

    #[error("Job is not ready to start: {0}")]
    InvalidJob(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, IngestError>;
