//! # Events Module
//!
//! Event-driven progress reporting.
//!
//! ## Design
//! The core emits events through channels, so any front-end (CLI today, a
//! desktop shell later) can subscribe and display progress without the core
//! knowing about it.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Ingest(IngestEvent::CopyStarted { destination, .. }) => {
//!                 println!("Copying to {}", destination)
//!             }
//!             Event::Ingest(IngestEvent::Finished { result }) => println!("{}", result.message),
//!             _ => {}
//!         }
//!     }
//! });
//!
//! IngestWorker::spawn(operation, request, sender);
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
