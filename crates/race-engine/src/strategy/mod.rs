//! Winner-selection strategies
//!
//! The strategy set is closed (first-wins, weighted, quality), so dispatch is
//! a plain match rather than an open-ended trait-object registry like this
//! lineage's routing-strategy registry — there is no plugin point here.

mod first_wins;
mod weighted;

use race_core::{ChunkStream, RaceContext};
use tokio::sync::mpsc;

use crate::config::Strategy;
use crate::tracker::PerformanceTracker;

/// One participant's outcome, pushed onto the results channel by its racing task
pub struct RaceResult {
    /// Provider name
    pub provider: String,
    /// Measured latency until this result was known, in milliseconds
    pub latency_ms: u64,
    /// The stream on success, or the failure reason
    pub outcome: Result<ChunkStream, anyhow::Error>,
}

/// A chosen winner, along with the full per-participant picture for metrics
pub struct Selection {
    /// Winning provider name
    pub winner: String,
    /// Winning provider's stream
    pub stream: ChunkStream,
    /// Winning provider's measured latency, in milliseconds
    pub latency_ms: u64,
    /// Every participant name that reported (in receive order)
    pub participants: Vec<String>,
    /// Per-participant latency, aligned with `participants`
    pub latencies_ms: Vec<Option<u64>>,
    /// Why this strategy is reported in metric events: "race_winner" or "race_winner_weighted"
    pub switch_reason: &'static str,
}

/// Why selection failed
pub enum SelectionError {
    /// Every participant errored
    AllFailed(String),
    /// No successful candidate arrived before the grace window/deadline closed
    NoCandidates,
    /// The race context was cancelled before a winner was chosen
    ContextCancelled,
}

/// Drain `results` and select a winner per `strategy`, recording every
/// participant's outcome in `tracker` along the way (§4.2)
pub async fn select(
    strategy: Strategy,
    results: mpsc::Receiver<RaceResult>,
    tracker: &PerformanceTracker,
    ctx: &RaceContext,
    grace_period_ms: u64,
) -> Result<Selection, SelectionError> {
    match strategy {
        Strategy::FirstWins => first_wins::select(results, tracker, ctx).await,
        Strategy::Weighted | Strategy::Quality => {
            weighted::select(results, tracker, ctx, grace_period_ms).await
        }
    }
}
