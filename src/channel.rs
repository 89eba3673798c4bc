//! Event channel: subscribe/unsubscribe hub plus the async pump that feeds it
//!
//! Sources push `ChannelMessage`s into an mpsc queue; `pump` drains it,
//! validates raw lines at the boundary and hands typed events to every
//! subscriber in emission order.

use {
    crate::{error::EventError, event::DetectionEvent},
    std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    tokio::sync::mpsc,
};

/// Message sent from event sources to the channel pump
#[derive(Debug, Clone)]
pub enum ChannelMessage {
    /// Unvalidated JSON document (one line of a stream)
    Raw(String),
    /// Line that is not valid UTF-8; the pump rejects it
    Undecodable(Vec<u8>),
    /// Event already built in-process
    Event(DetectionEvent),
    Shutdown,
}

/// Opaque token returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

type Callback = Box<dyn FnMut(&DetectionEvent) + Send>;

/// Delivery counters
///
/// `delivered` counts events that reached at least one subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub delivered: u64,
    pub rejected: u64,
}

/// Fan-out of validated detection events to subscribers
///
/// Callbacks run while the subscriber list is locked. Once `unsubscribe`
/// returns, the removed callback is never invoked again, and two publishes
/// never interleave.
#[derive(Default)]
pub struct EventChannel {
    subscribers: Mutex<Vec<(SubscriptionHandle, Callback)>>,
    next_id: AtomicU64,
    delivered: AtomicU64,
    rejected: AtomicU64,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, on_event: F) -> SubscriptionHandle
    where
        F: FnMut(&DetectionEvent) + Send + 'static,
    {
        let handle = SubscriptionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((handle, Box::new(on_event)));
        log::debug!("Subscriber {:?} attached", handle);
        handle
    }

    /// Returns false when the handle was not (or no longer) subscribed
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != handle);
        let removed = subscribers.len() != before;
        if removed {
            log::debug!("Subscriber {:?} detached", handle);
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Deliver an event to every subscriber; returns how many received it
    pub fn publish(&self, event: &DetectionEvent) -> usize {
        let mut subscribers = self.lock();
        for (_, on_event) in subscribers.iter_mut() {
            on_event(event);
        }
        if !subscribers.is_empty() {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
        subscribers.len()
    }

    /// Validate a raw JSON line, then publish it
    ///
    /// Malformed input is counted and returned as an error; no subscriber
    /// sees any part of it.
    pub fn publish_raw(&self, line: &str) -> Result<usize, EventError> {
        match DetectionEvent::from_json(line) {
            Ok(event) => Ok(self.publish(&event)),
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Decode one raw line as UTF-8, then publish it like `publish_raw`
    pub fn publish_bytes(&self, line: &[u8]) -> Result<usize, EventError> {
        match std::str::from_utf8(line) {
            Ok(text) => self.publish_raw(text.trim()),
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(EventError::InvalidUtf8(e))
            }
        }
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionHandle, Callback)>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drain source messages into the channel until shutdown or until every sender is gone
pub async fn pump(mut receiver: mpsc::Receiver<ChannelMessage>, channel: Arc<EventChannel>) {
    log::info!("Event channel pump started");

    while let Some(message) = receiver.recv().await {
        match message {
            ChannelMessage::Raw(line) => {
                if let Err(e) = channel.publish_raw(&line) {
                    log::warn!("Rejected malformed detection event: {} (input: {})", e, truncate(&line, 120));
                }
            }
            ChannelMessage::Undecodable(bytes) => {
                if let Err(e) = channel.publish_bytes(&bytes) {
                    log::warn!(
                        "Rejected undecodable detection event: {} (input: {})",
                        e,
                        truncate(&String::from_utf8_lossy(&bytes), 120)
                    );
                }
            }
            ChannelMessage::Event(event) => {
                channel.publish(&event);
            }
            ChannelMessage::Shutdown => {
                log::info!("Event channel pump received shutdown signal");
                break;
            }
        }
    }

    let stats = channel.stats();
    log::info!(
        "Event channel pump stopped (delivered: {}, rejected: {})",
        stats.delivered,
        stats.rejected
    );
}

fn truncate(line: &str, max_chars: usize) -> String {
    match line.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &line[..end]),
        None => line.to_string(),
    }
}
