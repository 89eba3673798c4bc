use {
    crate::{
        event::{CategoryCounts, DetectionEvent},
        projector::{DashboardSnapshot, SnapshotProjector},
    },
    std::{
        collections::HashMap,
        num::NonZeroUsize,
        sync::{Arc, PoisonError, RwLock},
    },
    tokio::sync::watch,
};

/// Running per-category sums, iterated in first-seen order
///
/// `index` maps a label to its slot so an ingest touches only the
/// categories present in the incoming event.
#[derive(Debug, Clone, Default)]
pub struct CategoryTally {
    slots: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl CategoryTally {
    fn add(&mut self, category: &str, count: u64) {
        match self.index.get(category) {
            Some(&slot) => {
                let total = &mut self.slots[slot].1;
                *total = total.saturating_add(count);
            }
            None => {
                self.index.insert(category.to_string(), self.slots.len());
                self.slots.push((category.to_string(), count));
            }
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    pub fn get(&self, category: &str) -> Option<u64> {
        self.index.get(category).map(|&slot| self.slots[slot].1)
    }

    /// First-seen position of a category
    pub fn rank_of(&self, category: &str) -> Option<usize> {
        self.index.get(category).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.slots.iter().map(|(label, total)| (label.as_str(), *total))
    }

    pub fn to_counts(&self) -> CategoryCounts {
        self.iter().collect()
    }
}

/// State owned by the aggregation store
///
/// Only `AggregationStore` mutates it; readers get `&AggregationState`
/// under a lock or owned projections.
#[derive(Debug, Clone, Default)]
pub struct AggregationState {
    event_log: Vec<DetectionEvent>,
    category_totals: CategoryTally,
    latest_category_counts: CategoryCounts,
    revision: u64,
}

impl AggregationState {
    /// Events in arrival order
    pub fn event_log(&self) -> &[DetectionEvent] {
        &self.event_log
    }

    pub fn category_totals(&self) -> &CategoryTally {
        &self.category_totals
    }

    pub fn latest_category_counts(&self) -> &CategoryCounts {
        &self.latest_category_counts
    }

    /// Number of mutations (ingests and resets) applied so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn event_count(&self) -> usize {
        self.event_log.len()
    }
}

/// Incremental aggregation engine
///
/// Every successful `ingest` appends to the log, folds the event's class counts
/// into the running totals, replaces the latest counts, and publishes exactly
/// one change notification (the new revision) on a watch channel.
pub struct AggregationStore {
    state: AggregationState,
    changes: watch::Sender<u64>,
}

impl AggregationStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            state: AggregationState::default(),
            changes,
        }
    }

    pub fn ingest(&mut self, event: DetectionEvent) {
        for (category, count) in event.category_counts.iter() {
            self.state.category_totals.add(category, count);
        }
        self.state.latest_category_counts = event.category_counts.clone();
        self.state.event_log.push(event);
        self.bump_revision();
    }

    /// Drop all session data (session restart)
    pub fn reset(&mut self) {
        self.state.event_log.clear();
        self.state.category_totals.clear();
        self.state.latest_category_counts = CategoryCounts::new();
        self.bump_revision();
        log::info!("Aggregation state reset (revision {})", self.state.revision);
    }

    pub fn state(&self) -> &AggregationState {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.state.revision
    }

    pub fn projector(&self) -> SnapshotProjector<'_> {
        SnapshotProjector::new(&self.state)
    }

    /// Receiver that observes the revision after every mutation
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn bump_revision(&mut self) {
        self.state.revision += 1;
        // send_replace never fails, even with no receivers attached
        self.changes.send_replace(self.state.revision);
    }
}

impl Default for AggregationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle over one `AggregationStore`
///
/// The write lock is held for exactly one ingest, so readers always see
/// either the state before or after a whole event.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<RwLock<AggregationStore>>,
    changes: watch::Receiver<u64>,
}

impl SharedStore {
    pub fn new(store: AggregationStore) -> Self {
        let changes = store.subscribe_changes();
        Self {
            inner: Arc::new(RwLock::new(store)),
            changes,
        }
    }

    pub fn ingest(&self, event: DetectionEvent) {
        let mut store = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        store.ingest(event);
        log::debug!(
            "Ingested event #{} (revision {})",
            store.state().event_count(),
            store.revision()
        );
    }

    pub fn reset(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }

    /// Run `f` against a consistent view of the state
    pub fn read<R>(&self, f: impl FnOnce(&AggregationState) -> R) -> R {
        let store = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(store.state())
    }

    /// Owned bundle of every projection, taken under one read lock
    pub fn snapshot(&self, top_n: NonZeroUsize) -> DashboardSnapshot {
        self.read(|state| SnapshotProjector::new(state).dashboard(top_n))
    }

    pub fn revision(&self) -> u64 {
        self.read(AggregationState::revision)
    }

    /// Fresh receiver for change notifications
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.changes.clone()
    }
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new(AggregationStore::new())
    }
}
