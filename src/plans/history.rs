//! Workout History
//!
//! Recent workouts per request key, newest first. A bucket expires as a
//! whole once it has gone `ttl` without an update.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::config::HistoryConfig;
use crate::types::PreviousWorkout;

#[derive(Debug)]
struct HistoryBucket {
    workouts: VecDeque<PreviousWorkout>,
    updated_at: Instant,
}

impl HistoryBucket {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.updated_at.elapsed() >= ttl
    }
}

/// Concurrent per-key workout history
#[derive(Debug)]
pub struct WorkoutHistory {
    buckets: DashMap<String, HistoryBucket>,
    max_entries: usize,
    ttl: Duration,
}

impl Default for WorkoutHistory {
    fn default() -> Self {
        Self::from_config(&HistoryConfig::default())
    }
}

impl WorkoutHistory {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.max_entries, config.ttl())
    }

    /// Newest-first workouts for `key`; empty when absent or expired
    pub fn recent(&self, key: &str) -> Vec<PreviousWorkout> {
        let expired = match self.buckets.get(key) {
            Some(bucket) if !bucket.is_expired(self.ttl) => {
                return bucket.workouts.iter().cloned().collect();
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!(key, "Dropping expired workout history");
            self.buckets
                .remove_if(key, |_, bucket| bucket.is_expired(self.ttl));
        }
        Vec::new()
    }

    /// Prepend `workout` and refresh the bucket's timestamp
    pub fn record(&self, key: &str, workout: PreviousWorkout) {
        let now = Instant::now();
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| HistoryBucket {
                workouts: VecDeque::new(),
                updated_at: now,
            });

        if bucket.is_expired(self.ttl) {
            bucket.workouts.clear();
        }
        bucket.workouts.push_front(workout);
        bucket.workouts.truncate(self.max_entries);
        bucket.updated_at = now;
    }

    /// Number of keys with a history bucket, expired ones included
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workout(title: &str) -> PreviousWorkout {
        PreviousWorkout {
            title: title.to_string(),
            exercises: vec![format!("{title} Squat")],
        }
    }

    fn titles(history: &[PreviousWorkout]) -> Vec<&str> {
        history.iter().map(|w| w.title.as_str()).collect()
    }

    #[test]
    fn test_newest_first_and_bounded() {
        let history = WorkoutHistory::new(5, Duration::from_secs(60));
        for i in 1..=7 {
            history.record("k", workout(&format!("W{i}")));
        }
        assert_eq!(
            titles(&history.recent("k")),
            vec!["W7", "W6", "W5", "W4", "W3"]
        );
        assert!(history.recent("other").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_expires_after_ttl() {
        let history = WorkoutHistory::new(5, Duration::from_secs(60));
        history.record("k", workout("W1"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(history.recent("k").len(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(history.recent("k").is_empty());
        assert!(history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_refreshes_ttl_and_expired_bucket_restarts() {
        let history = WorkoutHistory::new(5, Duration::from_secs(60));
        history.record("k", workout("W1"));
        tokio::time::advance(Duration::from_secs(45)).await;
        history.record("k", workout("W2"));
        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(titles(&history.recent("k")), vec!["W2", "W1"]);

        tokio::time::advance(Duration::from_secs(60)).await;
        history.record("k", workout("W3"));
        assert_eq!(titles(&history.recent("k")), vec!["W3"]);
    }
}
