//! # Unique-Address Sampling
//!
//! The loop nearly every generating backend shares: keep asking a
//! candidate producer for addresses until `count` distinct ones have been
//! accepted. "Distinct" means byte-distinct: no canonicalization happens
//! here, so two spellings of one address are two candidates.
//!
//! Unlike the naive `while unique < count` loop, the sampler carries an
//! attempt budget. When the candidate space is smaller than the request
//! the loop cannot make progress forever; once the budget is spent it
//! fails with `InsufficientCandidates` instead of hanging. The result is
//! all-or-nothing: a failure never returns the partial set.

use std::collections::HashSet;

use sixkit_common::error::{KitError, KitResult};
use sixkit_common::event::{CancelToken, EventSink};

/// Attempts granted per requested address.
pub const ATTEMPT_FACTOR: u64 = 64;

/// Lower bound on the total attempt budget, so tiny requests still get a
/// fair number of draws against sparse producers.
pub const ATTEMPT_FLOOR: u64 = 4096;

/// Draws from `produce` until `count` distinct valid candidates have been
/// collected.
///
/// The producer may yield one candidate or a whole batch per call; batch
/// order decides insertion order. One progress event fires per accepted
/// candidate, never more than `count` in total. Cancellation is checked
/// once per producer round.
pub fn generate_unique<P, V>(
    count: u64,
    mut produce: P,
    mut is_valid: V,
    events: &dyn EventSink,
    cancel: &CancelToken,
) -> KitResult<Vec<String>>
where
    P: FnMut() -> KitResult<Vec<String>>,
    V: FnMut(&str) -> bool,
{
    if count == 0 {
        return Err(KitError::InvalidCount);
    }

    let budget = count.saturating_mul(ATTEMPT_FACTOR).max(ATTEMPT_FLOOR);
    let mut seen: HashSet<String> = HashSet::new();
    let mut accepted: Vec<String> = Vec::with_capacity(count as usize);
    let mut attempts: u64 = 0;

    while (accepted.len() as u64) < count {
        if cancel.is_cancelled() {
            return Err(KitError::Cancelled);
        }
        if attempts >= budget {
            return Err(KitError::InsufficientCandidates {
                found: accepted.len() as u64,
                requested: count,
            });
        }

        let batch = produce()?;
        // An empty batch still burns an attempt, so a dead producer
        // cannot stall the loop.
        attempts += (batch.len() as u64).max(1);

        for candidate in batch {
            if accepted.len() as u64 == count {
                break;
            }
            if !is_valid(&candidate) {
                continue;
            }
            if seen.insert(candidate.clone()) {
                accepted.push(candidate);
                events.on_progress(accepted.len() as u64, count);
            }
        }
    }

    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sixkit_common::address::Pattern;
    use sixkit_common::event::NullSink;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingSink {
        calls: AtomicU64,
        last: Mutex<Option<(u64, u64)>>,
    }

    impl CountingSink {
        fn new() -> Self {
            Self {
                calls: AtomicU64::new(0),
                last: Mutex::new(None),
            }
        }
    }

    impl EventSink for CountingSink {
        fn on_progress(&self, current: u64, total: u64) {
            self.calls.fetch_add(1, Ordering::Relaxed);
            *self.last.lock().unwrap() = Some((current, total));
        }

        fn on_log(&self, _level: sixkit_common::event::LogLevel, _message: &str) {}
    }

    #[test]
    fn exact_count_of_distinct_candidates() {
        let mut next = 0u64;
        let sink = CountingSink::new();

        let result = generate_unique(
            10,
            || {
                next += 1;
                // every value produced twice, so dedup has work to do
                Ok(vec![format!("2001:db8::{:x}", next / 2)])
            },
            |_| true,
            &sink,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(result.len(), 10);
        let distinct: HashSet<_> = result.iter().collect();
        assert_eq!(distinct.len(), 10);
        assert_eq!(sink.calls.load(Ordering::Relaxed), 10);
        assert_eq!(*sink.last.lock().unwrap(), Some((10, 10)));
    }

    #[test]
    fn pattern_fill_scenario_one_wildcard() {
        let pattern = Pattern::parse("2001:db8::*").unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let result = generate_unique(
            5,
            || Ok(vec![pattern.fill(&mut rng)]),
            |candidate| candidate.parse::<std::net::Ipv6Addr>().is_ok(),
            &NullSink,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(result.len(), 5);
        for addr in &result {
            assert!(addr.starts_with("2001:db8::"));
            assert!(addr.chars().last().unwrap().is_ascii_hexdigit());
        }
        let distinct: HashSet<_> = result.iter().collect();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn exhausted_space_terminates_with_insufficient_candidates() {
        // candidate space of exactly two values, five requested
        let mut flip = false;

        let err = generate_unique(
            5,
            || {
                flip = !flip;
                Ok(vec![if flip {
                    "2001:db8::a".to_string()
                } else {
                    "2001:db8::b".to_string()
                }])
            },
            |_| true,
            &NullSink,
            &CancelToken::new(),
        )
        .unwrap_err();

        match err {
            KitError::InsufficientCandidates { found, requested } => {
                assert_eq!(found, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_batches_still_consume_the_budget() {
        let err = generate_unique(
            3,
            || Ok(Vec::new()),
            |_| true,
            &NullSink,
            &CancelToken::new(),
        )
        .unwrap_err();

        assert!(matches!(err, KitError::InsufficientCandidates { found: 0, .. }));
    }

    #[test]
    fn zero_count_is_an_invalid_request() {
        let err = generate_unique(
            0,
            || Ok(vec!["::1".to_string()]),
            |_| true,
            &NullSink,
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, KitError::InvalidCount));
    }

    #[test]
    fn cancellation_wins_over_further_draws() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = generate_unique(
            3,
            || Ok(vec!["::1".to_string()]),
            |_| true,
            &NullSink,
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, KitError::Cancelled));
    }

    #[test]
    fn invalid_candidates_are_rejected_without_progress() {
        let mut next = 0u64;
        let sink = CountingSink::new();

        let result = generate_unique(
            4,
            || {
                next += 1;
                Ok(vec![
                    "garbage".to_string(),
                    format!("2001:db8::{next:x}"),
                ])
            },
            |candidate| candidate.parse::<std::net::Ipv6Addr>().is_ok(),
            &sink,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(result.len(), 4);
        assert_eq!(sink.calls.load(Ordering::Relaxed), 4);
    }
}
