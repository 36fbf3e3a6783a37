//! First usable stream wins
//!
//! Drains the results channel to completion rather than stopping at the
//! first success, so every participant's latency is known for metric
//! emission. Only participants that reported an error are recorded as
//! losses (§4.2): a success that arrives after the winner was already
//! chosen records neither a win nor a loss.

use race_core::RaceContext;
use tokio::sync::mpsc;

use super::{RaceResult, Selection, SelectionError};
use crate::tracker::PerformanceTracker;

pub(super) async fn select(
    mut results: mpsc::Receiver<RaceResult>,
    tracker: &PerformanceTracker,
    ctx: &RaceContext,
) -> Result<Selection, SelectionError> {
    let mut participants = Vec::new();
    let mut latencies_ms = Vec::new();
    let mut winner: Option<(String, RaceResult)> = None;
    let mut last_error: Option<String> = None;

    loop {
        tokio::select! {
            biased;

            () = ctx.cancelled() => {
                return finalize(tracker, winner, participants, latencies_ms)
                    .ok_or(SelectionError::ContextCancelled);
            }

            received = results.recv() => {
                let Some(result) = received else {
                    let err = last_error.unwrap_or_else(|| "all providers failed".to_owned());
                    return finalize(tracker, winner, participants, latencies_ms)
                        .ok_or(SelectionError::AllFailed(err));
                };

                participants.push(result.provider.clone());
                latencies_ms.push(Some(result.latency_ms));

                match &result.outcome {
                    Ok(_) if winner.is_none() => {
                        winner = Some((result.provider.clone(), result));
                    }
                    Ok(_) => {
                        // A later success neither wins nor loses; see module docs.
                    }
                    Err(err) => {
                        last_error = Some(err.to_string());
                        tracker.record_loss(&result.provider, result.latency_ms);
                    }
                }
            }
        }
    }
}

/// Record the winner's outcome and build its `Selection`, if one was ever found
fn finalize(
    tracker: &PerformanceTracker,
    winner: Option<(String, RaceResult)>,
    participants: Vec<String>,
    latencies_ms: Vec<Option<u64>>,
) -> Option<Selection> {
    let (name, result) = winner?;
    tracker.record_win(&name, result.latency_ms);

    let stream = result.outcome.expect("winner outcome is Ok by construction");
    Some(Selection {
        winner: name,
        stream,
        latency_ms: result.latency_ms,
        participants,
        latencies_ms,
        switch_reason: "race_winner",
    })
}

#[cfg(test)]
mod tests {
    use futures_util::stream;
    use race_core::{ChunkStream, GenerationChunk};
    use tokio::sync::mpsc;

    use super::*;

    fn ok_stream() -> ChunkStream {
        let s: ChunkStream = Box::pin(stream::iter(vec![Ok(GenerationChunk::default())]));
        s
    }

    fn ok_result(provider: &str, latency_ms: u64) -> RaceResult {
        RaceResult {
            provider: provider.to_owned(),
            latency_ms,
            outcome: Ok(ok_stream()),
        }
    }

    fn err_result(provider: &str, latency_ms: u64) -> RaceResult {
        RaceResult {
            provider: provider.to_owned(),
            latency_ms,
            outcome: Err(anyhow::anyhow!("boom")),
        }
    }

    #[tokio::test]
    async fn earliest_success_wins_and_only_errors_are_losses() {
        let tracker = PerformanceTracker::new();
        let (tx, rx) = mpsc::channel(4);
        tx.send(err_result("e", 5)).await.unwrap();
        tx.send(ok_result("first", 10)).await.unwrap();
        tx.send(ok_result("second", 20)).await.unwrap();
        drop(tx);

        let ctx = RaceContext::new();
        let selection = select(rx, &tracker, &ctx).await.ok().unwrap();
        assert_eq!(selection.winner, "first");
        assert_eq!(selection.participants, vec!["e", "first", "second"]);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.get("first").unwrap().wins, 1);
        assert_eq!(snapshot.get("e").unwrap().losses, 1);
        assert!(!snapshot.contains_key("second"), "a later success is neither a win nor a loss");
    }

    #[tokio::test]
    async fn every_participant_failing_is_all_failed() {
        let tracker = PerformanceTracker::new();
        let (tx, rx) = mpsc::channel(2);
        tx.send(err_result("a", 5)).await.unwrap();
        tx.send(err_result("b", 5)).await.unwrap();
        drop(tx);

        let ctx = RaceContext::new();
        let err = select(rx, &tracker, &ctx).await.err().unwrap();
        assert!(matches!(err, SelectionError::AllFailed(_)));
    }

    #[tokio::test]
    async fn cancellation_before_any_candidate_is_context_cancelled() {
        let tracker = PerformanceTracker::new();
        let (_tx, rx) = mpsc::channel(1);
        let ctx = RaceContext::new();
        ctx.cancel();

        let err = select(rx, &tracker, &ctx).await.err().unwrap();
        assert!(matches!(err, SelectionError::ContextCancelled));
    }
}
