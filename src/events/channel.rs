//! Event channel built on crossbeam-channel.
//!
//! Senders are cheap to clone and are handed to every worker thread of
//! a run; the CLI holds the receiving end.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Sends events out of the core library.
///
/// A sender created with [`EventSender::disabled`] drops everything,
/// which is what library callers get when they don't care about progress.
#[derive(Clone, Default)]
pub struct EventSender {
    inner: Option<Sender<Event>>,
}

impl EventSender {
    /// Wrap a raw crossbeam sender
    pub fn new(sender: Sender<Event>) -> Self {
        Self {
            inner: Some(sender),
        }
    }

    /// A sender that discards every event
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Whether anyone could be listening
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Send an event.
    ///
    /// A dropped receiver is not an error: progress reporting is optional.
    pub fn send(&self, event: Event) {
        if let Some(sender) = &self.inner {
            let _ = sender.send(event);
        }
    }
}

impl std::fmt::Debug for EventSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSender")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Receives events from the core library
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, or `None` once every sender is gone
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Iterate until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Constructors for connected sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    /// Create an unbounded channel
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (EventSender::new(sender), EventReceiver { inner: receiver })
    }
}

/// A sender for runs without a listener
pub fn null_sender() -> EventSender {
    EventSender::disabled()
}
