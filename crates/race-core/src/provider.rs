//! The capability set a backend must satisfy for the racing engine to use it

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::chunk::GenerationChunk;
use crate::context::RaceContext;
use crate::error::RaceError;
use crate::request::GenerationOptions;

/// A generation stream as returned by a participant
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<GenerationChunk, RaceError>> + Send>>;

/// Point-in-time counters a provider reports about itself
///
/// Aggregated by the engine's `get_metrics` across every attached provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderMetrics {
    /// Total requests issued to this provider
    pub requests: u64,
    /// Requests that completed successfully
    pub successes: u64,
    /// Requests that errored
    pub errors: u64,
    /// Total tokens generated across successful requests
    pub tokens: u64,
    /// Sum of latencies (milliseconds) across successful requests
    pub total_latency_ms: u64,
}

/// A text-generation backend the racing engine can dispatch to
///
/// Racing is stream-only: the engine only ever consumes `generate_chat_completion`,
/// never a non-streaming variant, since the fastest usable token stream is the
/// whole point of the race.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name, used as the key in performance tracking
    /// and as the `racing_winner` annotation
    fn name(&self) -> &str;

    /// A short tag identifying the provider's backend kind (e.g. "openai")
    fn identify_type(&self) -> &str;

    /// One-line human-readable description, surfaced via `get_models`
    fn describe(&self) -> &str {
        ""
    }

    /// Issue a generation request, returning a token stream
    async fn generate_chat_completion(
        &self,
        ctx: &RaceContext,
        options: &GenerationOptions,
    ) -> Result<ChunkStream, RaceError>;

    /// Check whether this provider is currently reachable
    async fn health_check(&self, ctx: &RaceContext) -> Result<(), RaceError>;

    /// Snapshot this provider's own request counters
    fn report_own_metrics(&self) -> ProviderMetrics {
        ProviderMetrics::default()
    }
}
