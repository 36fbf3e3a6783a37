//! Virtual-provider racing engine
//!
//! Fans a generation request out to every participant of a virtual model (or,
//! in legacy mode, every attached provider) concurrently, and returns the
//! first or best usable streaming response according to a configurable
//! strategy. See `race-core` for the provider capability set this schedules
//! over.

pub mod config;
pub mod engine;
pub mod metrics;
pub mod strategy;
pub mod stream;
pub mod tracker;

pub use config::{ConfigError, EngineDefaults, ProviderRef, RaceConfig, ResolvedModel, Strategy, VirtualModel};
pub use engine::{EngineMetrics, ModelEntry, RaceEngine};
pub use metrics::{MetricEvent, MetricEventType, MetricsCollector, SharedCollector};
pub use stream::{RaceAnnotation, RacingStream};
pub use tracker::{PerformanceTracker, ProviderStats, DEFAULT_SCORE};
