//! Core engine: classify sightings, sample prices, score groups.

pub mod classifier;
pub mod registry;
pub mod stats;
pub mod tracker;

pub use classifier::{Classifier, IngestOutcome, Ingestor};
pub use registry::{LoopRegistry, LoopState};
pub use stats::{build_report, GroupStats, PerformanceReport};
pub use tracker::{Sample, StartOutcome, Tracker};
