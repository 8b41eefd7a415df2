//! crossbeam-backed event channel.
//!
//! The ingest worker, the two copy threads and the session all hold clones
//! of one `EventSender`; a single front-end thread drains the receiver.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Cloneable sending half handed to the core
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send without caring whether anyone is listening.
    ///
    /// A dropped receiver just means nobody wants progress; the ingest
    /// itself carries on.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receiving half owned by the front-end
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block for the next event; `None` once every sender is gone
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Drain events until every sender has dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Factory for sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    /// Unbounded pair. A card produces only a handful of events.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// Sender whose receiver is already gone, for callers that want no events
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}
