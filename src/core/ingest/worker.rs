//! Runs an ingest off the front-end thread.

use super::operation::CardIngest;
use super::types::IngestRequest;
use crate::events::{Event, EventSender, IngestEvent};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Background runner for one card.
///
/// Sends exactly one `Finished` or `Crashed` event, then exits.
pub struct IngestWorker;

impl IngestWorker {
    pub fn spawn(
        operation: Arc<CardIngest>,
        request: IngestRequest,
        events: EventSender,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                operation.ingest_with_events(&request, &events)
            }));

            let event = match outcome {
                Ok(Ok(result)) => IngestEvent::Finished { result },
                Ok(Err(e)) => {
                    tracing::error!(card = request.card_index, error = %e, "ingest crashed");
                    IngestEvent::Crashed {
                        message: e.to_string(),
                    }
                }
                Err(_) => {
                    tracing::error!(card = request.card_index, "ingest worker panicked");
                    IngestEvent::Crashed {
                        message: format!("ingest of SD{} panicked", request.card_index),
                    }
                }
            };
            events.send(Event::Ingest(event));
        })
    }
}
