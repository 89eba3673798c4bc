//! Read-only projections over `AggregationState`
//!
//! Every method is a pure function of the current state and returns owned
//! values, so consumers never hold references into live state. Calling a
//! projection twice without an intervening ingest yields equal results.

use crate::event::{CategoryCounts, DetectionEvent, Timestamp};
use crate::store::AggregationState;
use serde::Serialize;
use std::num::NonZeroUsize;

/// Divisor applied to an event's total to size its bubble
pub const BUBBLE_RADIUS_DIVISOR: f64 = 10.0;

/// One point of the total-detections time series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    pub timestamp: Timestamp,
    pub total_count: u64,
}

/// Position-keyed value; `index` is the event's 0-based position in the log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedPoint<T> {
    pub index: usize,
    pub value: T,
}

/// Magnitude-encoded point for bubble plots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bubble {
    pub value: u64,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCategory {
    pub category: String,
    pub count: u64,
}

/// A category's fraction of the cumulative total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub count: u64,
    pub share: f64,
}

/// Every projection a dashboard refresh needs, taken from one state view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub revision: u64,
    pub event_count: usize,
    pub time_series: Vec<TimePoint>,
    pub cumulative: CategoryCounts,
    pub latest: CategoryCounts,
    pub top: Vec<RankedCategory>,
    pub shares: Vec<CategoryShare>,
    pub bubbles: Vec<IndexedPoint<Bubble>>,
}

pub struct SnapshotProjector<'a> {
    state: &'a AggregationState,
}

impl<'a> SnapshotProjector<'a> {
    pub fn new(state: &'a AggregationState) -> Self {
        Self { state }
    }

    /// `(timestamp, total)` per event, in arrival order
    pub fn time_series(&self) -> Vec<TimePoint> {
        self.state
            .event_log()
            .iter()
            .map(|event| TimePoint {
                timestamp: event.timestamp.clone(),
                total_count: event.total_count,
            })
            .collect()
    }

    /// Cumulative per-category totals in first-seen order
    pub fn cumulative_distribution(&self) -> CategoryCounts {
        self.state.category_totals().to_counts()
    }

    /// Class counts of the most recent event
    pub fn latest_distribution(&self) -> CategoryCounts {
        self.state.latest_category_counts().clone()
    }

    /// Categories ranked by cumulative count, highest first
    ///
    /// Equal counts keep first-seen order (the sort is stable over
    /// first-seen iteration). Returns fewer than `n` entries when fewer
    /// categories exist.
    pub fn top_n(&self, n: NonZeroUsize) -> Vec<RankedCategory> {
        let mut ranked: Vec<RankedCategory> = self
            .state
            .category_totals()
            .iter()
            .map(|(category, count)| RankedCategory {
                category: category.to_string(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(n.get());
        ranked
    }

    /// Arbitrary per-event value keyed by log position
    pub fn indexed_series<T, F>(&self, selector: F) -> Vec<IndexedPoint<T>>
    where
        F: Fn(&DetectionEvent) -> T,
    {
        self.state
            .event_log()
            .iter()
            .enumerate()
            .map(|(index, event)| IndexedPoint {
                index,
                value: selector(event),
            })
            .collect()
    }

    /// Total per event with a radius proportional to it
    pub fn bubble_series(&self) -> Vec<IndexedPoint<Bubble>> {
        self.indexed_series(|event| Bubble {
            value: event.total_count,
            radius: event.total_count as f64 / BUBBLE_RADIUS_DIVISOR,
        })
    }

    /// Shares of the cumulative total; empty when nothing has been counted
    pub fn normalized_distribution(&self) -> Vec<CategoryShare> {
        let totals = self.state.category_totals();
        let grand_total = totals
            .iter()
            .fold(0u64, |acc, (_, count)| acc.saturating_add(count));
        if grand_total == 0 {
            return Vec::new();
        }

        totals
            .iter()
            .map(|(category, count)| CategoryShare {
                category: category.to_string(),
                count,
                share: count as f64 / grand_total as f64,
            })
            .collect()
    }

    pub fn dashboard(&self, top_n: NonZeroUsize) -> DashboardSnapshot {
        DashboardSnapshot {
            revision: self.state.revision(),
            event_count: self.state.event_count(),
            time_series: self.time_series(),
            cumulative: self.cumulative_distribution(),
            latest: self.latest_distribution(),
            top: self.top_n(top_n),
            shares: self.normalized_distribution(),
            bubbles: self.bubble_series(),
        }
    }
}
