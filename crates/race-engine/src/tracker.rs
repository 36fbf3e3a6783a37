//! Per-provider performance statistics feeding the weighted selection strategy
//!
//! A sharded concurrent map rather than a single `RwLock<HashMap>`, matching
//! this lineage's existing provider-health and feedback trackers: per-provider
//! writes never serialize against each other, which matters here since every
//! racing task touches the tracker at race end.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

/// Neutral prior returned for a provider with no recorded history
pub const DEFAULT_SCORE: f64 = 0.5;

struct Stats {
    races: AtomicU64,
    wins: AtomicU64,
    losses: AtomicU64,
    total_latency_ms: AtomicU64,
    last_updated_secs: AtomicU64,
}

impl Stats {
    fn new() -> Self {
        Self {
            races: AtomicU64::new(0),
            wins: AtomicU64::new(0),
            losses: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            last_updated_secs: AtomicU64::new(now_secs()),
        }
    }
}

/// A point-in-time copy of one provider's accumulated statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderStats {
    /// Total races this provider participated in and reported an outcome for
    pub races: u64,
    /// Races won
    pub wins: u64,
    /// Races lost (i.e. the participant errored)
    pub losses: u64,
    /// Sum of recorded latencies, in milliseconds
    pub total_latency_ms: u64,
    /// `total_latency_ms / races`, or 0.0 when `races` is 0
    pub average_latency_ms: f64,
    /// `wins / races`, or 0.0 when `races` is 0
    pub win_rate: f64,
}

/// Thread-safe, cross-race provider performance statistics
pub struct PerformanceTracker {
    providers: DashMap<String, Stats>,
}

impl PerformanceTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
        }
    }

    /// Record that `provider` won a race, taking `latency_ms` to respond
    pub fn record_win(&self, provider: &str, latency_ms: u64) {
        let stats = self.providers.entry(provider.to_owned()).or_insert_with(Stats::new);
        stats.races.fetch_add(1, Ordering::Relaxed);
        stats.wins.fetch_add(1, Ordering::Relaxed);
        stats.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        stats.last_updated_secs.store(now_secs(), Ordering::Relaxed);
    }

    /// Record that `provider` lost (errored out of) a race
    pub fn record_loss(&self, provider: &str, latency_ms: u64) {
        let stats = self.providers.entry(provider.to_owned()).or_insert_with(Stats::new);
        stats.races.fetch_add(1, Ordering::Relaxed);
        stats.losses.fetch_add(1, Ordering::Relaxed);
        stats.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        stats.last_updated_secs.store(now_secs(), Ordering::Relaxed);
    }

    /// Current score for `provider`: its win rate, or `DEFAULT_SCORE` if unknown
    #[must_use]
    pub fn get_score(&self, provider: &str) -> f64 {
        let Some(stats) = self.providers.get(provider) else {
            return DEFAULT_SCORE;
        };
        let races = stats.races.load(Ordering::Relaxed);
        if races == 0 {
            return DEFAULT_SCORE;
        }
        stats.wins.load(Ordering::Relaxed) as f64 / races as f64
    }

    /// A deep-copied snapshot of every tracked provider's statistics
    #[must_use]
    pub fn snapshot(&self) -> std::collections::HashMap<String, ProviderStats> {
        self.providers
            .iter()
            .map(|entry| {
                let races = entry.races.load(Ordering::Relaxed);
                let wins = entry.wins.load(Ordering::Relaxed);
                let losses = entry.losses.load(Ordering::Relaxed);
                let total_latency_ms = entry.total_latency_ms.load(Ordering::Relaxed);
                let (average_latency_ms, win_rate) = if races == 0 {
                    (0.0, 0.0)
                } else {
                    (total_latency_ms as f64 / races as f64, wins as f64 / races as f64)
                };
                (
                    entry.key().clone(),
                    ProviderStats {
                        races,
                        wins,
                        losses,
                        total_latency_ms,
                        average_latency_ms,
                        win_rate,
                    },
                )
            })
            .collect()
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_has_neutral_score() {
        let tracker = PerformanceTracker::new();
        assert!((tracker.get_score("ghost") - DEFAULT_SCORE).abs() < f64::EPSILON);
    }

    #[test]
    fn win_rate_tracks_wins_and_losses() {
        let tracker = PerformanceTracker::new();
        tracker.record_win("a", 10);
        tracker.record_win("a", 20);
        tracker.record_loss("a", 5);

        let snapshot = tracker.snapshot();
        let stats = snapshot.get("a").unwrap();
        assert_eq!(stats.races, 3);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert!((stats.win_rate - (2.0 / 3.0)).abs() < 1e-9);
        assert!((stats.average_latency_ms - (35.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn independent_provider_tracking() {
        let tracker = PerformanceTracker::new();
        tracker.record_win("a", 10);
        tracker.record_loss("b", 10);

        assert!((tracker.get_score("a") - 1.0).abs() < f64::EPSILON);
        assert!(tracker.get_score("b").abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_is_a_deep_copy() {
        let tracker = PerformanceTracker::new();
        tracker.record_win("a", 10);
        let mut snapshot = tracker.snapshot();
        snapshot.get_mut("a").unwrap().wins = 999;

        let fresh = tracker.snapshot();
        assert_eq!(fresh.get("a").unwrap().wins, 1);
    }
}
