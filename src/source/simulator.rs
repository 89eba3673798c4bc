//! Synthetic detection feed
//!
//! Stands in for the upstream video detector: every interval it "samples a
//! frame", draws a handful of detections over the detector's vehicle classes,
//! and emits the per-class tally the same way the detector does (zero-count
//! classes omitted, total = number of detections, ISO-8601 timestamp).

use super::{forward, EventSource};
use crate::{
    channel::ChannelMessage,
    error::SourceError,
    event::{CategoryCounts, DetectionEvent},
};
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Class labels of the vehicle detection model
pub const VEHICLE_CLASSES: [&str; 21] = [
    "ambulance",
    "army vehicle",
    "auto rickshaw",
    "bicycle",
    "bus",
    "car",
    "garbagevan",
    "human hauler",
    "minibus",
    "minivan",
    "motorbike",
    "pickup",
    "policecar",
    "rickshaw",
    "scooter",
    "suv",
    "taxi",
    "three wheelers -CNG-",
    "truck",
    "van",
    "wheelbarrow",
];

/// Classes that dominate real traffic, weighted up so the feed looks plausible
const COMMON_CLASSES: [&str; 5] = ["car", "bus", "motorbike", "rickshaw", "truck"];

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Time between emitted detections (the detector samples every 2s)
    pub interval: Duration,
    /// Upper bound on detections in a single frame
    pub max_detections: u32,
    /// Stop (and send `Shutdown`) after this many events
    pub limit: Option<u64>,
    /// Fixed seed for reproducible feeds
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2_000),
            max_detections: 20,
            limit: None,
            seed: None,
        }
    }
}

pub struct Simulator {
    config: SimulatorConfig,
    rng: StdRng,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Draw one frame's worth of detections
    pub fn next_event(&mut self) -> DetectionEvent {
        let detections = self.rng.gen_range(0..=self.config.max_detections);
        let mut tally = [0u64; VEHICLE_CLASSES.len()];

        for _ in 0..detections {
            let class = if self.rng.gen_bool(0.7) {
                COMMON_CLASSES[self.rng.gen_range(0..COMMON_CLASSES.len())]
            } else {
                VEHICLE_CLASSES[self.rng.gen_range(0..VEHICLE_CLASSES.len())]
            };
            if let Some(slot) = VEHICLE_CLASSES.iter().position(|name| *name == class) {
                tally[slot] += 1;
            }
        }

        let class_counts: CategoryCounts = VEHICLE_CLASSES
            .iter()
            .zip(tally)
            .filter(|(_, count)| *count > 0)
            .map(|(name, count)| (*name, count))
            .collect();

        DetectionEvent::new(
            chrono::Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            u64::from(detections),
            class_counts,
        )
    }
}

#[async_trait]
impl EventSource for Simulator {
    fn name(&self) -> &'static str {
        "simulate"
    }

    async fn run(self: Box<Self>, tx: mpsc::Sender<ChannelMessage>) -> Result<(), SourceError> {
        let mut simulator = *self;
        let mut ticker = interval(simulator.config.interval);
        let mut emitted = 0u64;

        log::info!(
            "🎥 Simulated detector started (every {}ms, limit: {:?})",
            simulator.config.interval.as_millis(),
            simulator.config.limit
        );

        loop {
            if simulator.config.limit.map_or(false, |limit| emitted >= limit) {
                log::info!("Simulated detector finished after {} events", emitted);
                return forward(&tx, ChannelMessage::Shutdown).await;
            }

            ticker.tick().await;
            let event = simulator.next_event();
            log::debug!(
                "Emitting detection update: {} vehicles, {} classes",
                event.total_count,
                event.category_counts.len()
            );

            if forward(&tx, ChannelMessage::Event(event)).await.is_err() {
                log::warn!("Channel closed, stopping simulated detector");
                return Ok(());
            }
            emitted += 1;
        }
    }
}
