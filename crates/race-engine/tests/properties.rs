//! Property-based tests for the universal invariants in the racing engine spec

use proptest::prelude::*;
use race_engine::PerformanceTracker;

#[derive(Debug, Clone, Copy)]
enum Event {
    Win(u64),
    Loss(u64),
}

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        (0u64..5_000).prop_map(Event::Win),
        (0u64..5_000).prop_map(Event::Loss),
    ]
}

proptest! {
    #[test]
    fn races_equal_wins_plus_losses(events in proptest::collection::vec(event_strategy(), 0..200)) {
        let tracker = PerformanceTracker::new();
        let mut wins = 0u64;
        let mut losses = 0u64;

        for event in &events {
            match *event {
                Event::Win(latency) => {
                    tracker.record_win("p", latency);
                    wins += 1;
                }
                Event::Loss(latency) => {
                    tracker.record_loss("p", latency);
                    losses += 1;
                }
            }
        }

        let snapshot = tracker.snapshot();
        if wins + losses == 0 {
            prop_assert!(snapshot.get("p").is_none());
        } else {
            let stats = snapshot.get("p").unwrap();
            prop_assert_eq!(stats.races, wins + losses);
            prop_assert_eq!(stats.wins, wins);
            prop_assert_eq!(stats.losses, losses);
            let expected_rate = wins as f64 / stats.races as f64;
            prop_assert!((stats.win_rate - expected_rate).abs() < 1e-9);
        }
    }

    #[test]
    fn unknown_providers_always_score_the_neutral_prior(name in "[a-z]{1,12}") {
        let tracker = PerformanceTracker::new();
        prop_assert!((tracker.get_score(&name) - race_engine::DEFAULT_SCORE).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_never_reflects_mutation_of_the_copy(wins in 0u64..50, losses in 0u64..50) {
        let tracker = PerformanceTracker::new();
        for _ in 0..wins {
            tracker.record_win("p", 1);
        }
        for _ in 0..losses {
            tracker.record_loss("p", 1);
        }

        let mut snapshot = tracker.snapshot();
        if let Some(stats) = snapshot.get_mut("p") {
            stats.wins = 999_999;
        }

        let fresh = tracker.snapshot();
        if wins + losses > 0 {
            prop_assert_eq!(fresh.get("p").unwrap().wins, wins);
        }
    }
}
