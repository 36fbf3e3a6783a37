//! Metric event emission
//!
//! Events are best-effort: a collector that errors or panics-proofs itself
//! must never affect the outcome of the race that produced the event (§7,
//! `metric-emission`).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// The closed set of event kinds this engine emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricEventType {
    /// A race was just dispatched
    RequestStarted,
    /// A race concluded with a winner
    RaceComplete,
    /// The engine selected a provider to serve the response
    ProviderSwitch,
    /// The race succeeded end to end
    Success,
    /// The race failed
    Error,
}

impl MetricEventType {
    /// Stable string form used in structured fields
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestStarted => "request_started",
            Self::RaceComplete => "race_complete",
            Self::ProviderSwitch => "provider_switch",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// A single emitted metric event
#[derive(Debug, Clone)]
pub struct MetricEvent {
    /// Event kind
    pub event_type: MetricEventType,
    /// Reporting identity: the engine's own name
    pub provider_name: String,
    /// Reporting identity: the engine's own type tag
    pub provider_type: String,
    /// Virtual model identifier this race ran under, if any
    pub model_id: String,
    /// Unix epoch milliseconds when the event was recorded
    pub timestamp_ms: u64,
    /// Latency in milliseconds, when applicable
    pub latency_ms: Option<u64>,
    /// Machine-readable error category, when applicable
    pub error_type: Option<String>,
    /// Human-readable error detail, when applicable
    pub error_message: Option<String>,
    /// Every participant that raced
    pub race_participants: Vec<String>,
    /// Per-participant latency, aligned with `race_participants` where known
    pub race_latencies_ms: Vec<Option<u64>>,
    /// Winning participant, when the race succeeded
    pub race_winner: Option<String>,
    /// Provider the engine is switching to, for `ProviderSwitch` events
    pub to_provider: Option<String>,
    /// Why the switch happened: "race_winner", "race_winner_weighted", or "race_winner_fallback"
    pub switch_reason: Option<String>,
    /// Free-form extra fields
    pub metadata: Map<String, Value>,
}

impl MetricEvent {
    /// Start a builder for `event_type`, filling in required identity fields
    #[must_use]
    pub fn new(event_type: MetricEventType, provider_name: impl Into<String>, provider_type: impl Into<String>) -> Self {
        Self {
            event_type,
            provider_name: provider_name.into(),
            provider_type: provider_type.into(),
            model_id: String::new(),
            timestamp_ms: 0,
            latency_ms: None,
            error_type: None,
            error_message: None,
            race_participants: Vec::new(),
            race_latencies_ms: Vec::new(),
            race_winner: None,
            to_provider: None,
            switch_reason: None,
            metadata: Map::new(),
        }
    }
}

/// Sink for metric events emitted by the engine
///
/// Implementations must not block the race: `record` is called synchronously
/// during selection, so a slow collector (e.g. one that forwards to a
/// collector process) should buffer internally rather than awaiting I/O here.
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    /// Record one event; errors are logged by the caller and never propagated
    async fn record(&self, event: MetricEvent);
}

/// Shared handle to an optional collector
pub type SharedCollector = Option<Arc<dyn MetricsCollector>>;

/// Emit `event` to `collector`, if present, swallowing and logging any panic-free failure path
pub async fn emit(collector: &SharedCollector, event: MetricEvent) {
    if let Some(collector) = collector {
        let event_type = event.event_type;
        collector.record(event).await;
        tracing::trace!(event_type = event_type.as_str(), "metric event emitted");
    }
}
