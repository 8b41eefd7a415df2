//! # Card Ingest
//!
//! Copies a camera card to an archive drive and a proxy SSD at the same
//! time, after checking both have room for it.
//!
//! ## Ground Rules
//! - **Both or neither** - a card is only copied if both drives fit it
//! - **Never delete** - the card is read, never modified
//! - **Leave a trail** - every copy has a log, every session a ledger row
//!
//! ## Architecture
//! - `core` - The ingest engine (space, layout, copy, session)
//! - `config` - Persisted settings and file locations
//! - `events` - Event-driven progress reporting
//! - `error` - Error types with the offending path in every message

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{IngestError, Result};

/// Initialize tracing for the binary.
///
/// Reads `RUST_LOG`, defaulting to `info`, and writes to stderr so JSON on
/// stdout stays clean.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
