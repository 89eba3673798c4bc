//! # detflow
//!
//! Incremental aggregation of live vehicle-detection events for real-time
//! dashboards.
//!
//! ```text
//! EventSource (simulate | stdin | file)
//!     ↓  mpsc<ChannelMessage>
//! channel::pump → EventChannel (boundary validation, fan-out)
//!     ↓  subscriber callback
//! SharedStore / AggregationStore::ingest   (one write lock per event)
//!     ↓  watch<revision>
//! SnapshotProjector → DashboardSnapshot → ui / JSON consumers
//! ```
//!
//! The store keeps running per-category totals, so an ingest costs
//! O(categories in the event) no matter how long the session has run.

pub mod channel;
pub mod config;
pub mod error;
pub mod event;
pub mod projector;
pub mod source;
pub mod store;
pub mod ui;

pub use channel::{ChannelMessage, ChannelStats, EventChannel, SubscriptionHandle};
pub use error::{ConfigError, EventError, SourceError};
pub use event::{CategoryCounts, DetectionEvent, Timestamp};
pub use projector::{
    Bubble, CategoryShare, DashboardSnapshot, IndexedPoint, RankedCategory, SnapshotProjector,
    TimePoint,
};
pub use store::{AggregationState, AggregationStore, CategoryTally, SharedStore};

use std::sync::Arc;

/// Route every event delivered by `channel` into `store`
///
/// The returned handle detaches the store again via `EventChannel::unsubscribe`.
pub fn attach_store(channel: &EventChannel, store: &SharedStore) -> SubscriptionHandle {
    let store = store.clone();
    channel.subscribe(move |event| store.ingest(event.clone()))
}

/// Wire a fresh channel and store together
pub fn connect() -> (Arc<EventChannel>, SharedStore, SubscriptionHandle) {
    let channel = Arc::new(EventChannel::new());
    let store = SharedStore::default();
    let handle = attach_store(&channel, &store);
    (channel, store, handle)
}
