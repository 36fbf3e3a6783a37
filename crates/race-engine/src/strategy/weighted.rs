//! Best adjusted-score candidate, chosen after a grace window
//!
//! On the first success a grace timer is armed; further successes accumulate
//! until the timer fires, the results channel closes, or the race context
//! ends. The winner maximizes `score(provider) * 1/(1 + latency_seconds)`.
//! Unlike first-wins, every successful-but-unchosen candidate here is
//! recorded as a loss: weighted actively compares the candidates it collected,
//! so "lost the comparison" is a meaningful outcome in a way it isn't when
//! the first arrival always wins regardless of the rest.

use std::time::Duration;

use race_core::{ChunkStream, RaceContext};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::{RaceResult, Selection, SelectionError};
use crate::tracker::PerformanceTracker;

struct Candidate {
    provider: String,
    stream: ChunkStream,
    latency_ms: u64,
}

pub(super) async fn select(
    mut results: mpsc::Receiver<RaceResult>,
    tracker: &PerformanceTracker,
    ctx: &RaceContext,
    grace_period_ms: u64,
) -> Result<Selection, SelectionError> {
    let mut participants = Vec::new();
    let mut latencies_ms = Vec::new();
    let mut candidates = Vec::new();
    let mut deadline: Option<Instant> = None;

    loop {
        let sleep = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;

            () = ctx.cancelled() => {
                return conclude(tracker, candidates, participants, latencies_ms)
                    .ok_or(SelectionError::ContextCancelled);
            }

            () = sleep => {
                return conclude(tracker, candidates, participants, latencies_ms)
                    .ok_or(SelectionError::NoCandidates);
            }

            received = results.recv() => {
                let Some(result) = received else {
                    return conclude(tracker, candidates, participants, latencies_ms)
                        .ok_or(SelectionError::NoCandidates);
                };

                participants.push(result.provider.clone());
                latencies_ms.push(Some(result.latency_ms));

                match result.outcome {
                    Ok(stream) => {
                        if deadline.is_none() {
                            deadline = Some(Instant::now() + Duration::from_millis(grace_period_ms));
                        }
                        candidates.push(Candidate {
                            provider: result.provider,
                            stream,
                            latency_ms: result.latency_ms,
                        });
                    }
                    Err(_) => {
                        tracker.record_loss(&result.provider, result.latency_ms);
                    }
                }
            }
        }
    }
}

/// Score and pick the winning candidate, recording win/loss for every candidate seen
fn conclude(
    tracker: &PerformanceTracker,
    mut candidates: Vec<Candidate>,
    participants: Vec<String>,
    latencies_ms: Vec<Option<u64>>,
) -> Option<Selection> {
    if candidates.is_empty() {
        return None;
    }

    let winner_index = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let latency_secs = candidate.latency_ms as f64 / 1000.0;
            let score = tracker.get_score(&candidate.provider) * (1.0 / (1.0 + latency_secs));
            (index, score)
        })
        .fold(None::<(usize, f64)>, |best, (index, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((index, score)),
        })
        .map_or(0, |(index, _)| index);

    let winner = candidates.swap_remove(winner_index);
    for loser in &candidates {
        tracker.record_loss(&loser.provider, loser.latency_ms);
    }
    tracker.record_win(&winner.provider, winner.latency_ms);

    Some(Selection {
        winner: winner.provider,
        stream: winner.stream,
        latency_ms: winner.latency_ms,
        participants,
        latencies_ms,
        switch_reason: "race_winner_weighted",
    })
}
