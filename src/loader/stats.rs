//! Load-time bookkeeping for completed decodes.

use std::collections::VecDeque;

use serde::Serialize;

use crate::constants::{MAX_LOAD_TIME_RECORDS, RECENT_LOAD_RECORDS};
use crate::model::now_millis;

/// One completed load.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRecord {
    /// Cache key of the loaded reference
    pub key: String,
    /// Wall time spent fetching, decoding and thumbnailing
    pub load_time_ms: f64,
    /// When the load finished, milliseconds since the Unix epoch
    pub recorded_at: u64,
}

/// Aggregate over the retained records.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    pub count: usize,
    pub average_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub total_ms: f64,
    /// Most recent records, oldest first
    pub recent: Vec<LoadRecord>,
}

/// Rolling window of the most recent load times.
#[derive(Debug, Clone, Default)]
pub struct LoadTimeTracker {
    records: VecDeque<LoadRecord>,
}

impl LoadTimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished load, dropping the oldest record past the window.
    pub fn record(&mut self, key: impl Into<String>, load_time_ms: f64) {
        self.records.push_back(LoadRecord {
            key: key.into(),
            load_time_ms,
            recorded_at: now_millis(),
        });
        while self.records.len() > MAX_LOAD_TIME_RECORDS {
            self.records.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> LoadStats {
        if self.records.is_empty() {
            return LoadStats::default();
        }

        let times = self.records.iter().map(|r| r.load_time_ms);
        let total_ms: f64 = times.clone().sum();
        let min_ms = times.clone().fold(f64::INFINITY, f64::min);
        let max_ms = times.fold(f64::NEG_INFINITY, f64::max);
        let count = self.records.len();
        let skip = count.saturating_sub(RECENT_LOAD_RECORDS);

        LoadStats {
            count,
            average_ms: total_ms / count as f64,
            min_ms,
            max_ms,
            total_ms,
            recent: self.records.iter().skip(skip).cloned().collect(),
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let tracker = LoadTimeTracker::new();
        assert_eq!(tracker.stats(), LoadStats::default());
    }

    #[test]
    fn test_aggregates() {
        let mut tracker = LoadTimeTracker::new();
        tracker.record("a", 10.0);
        tracker.record("b", 30.0);
        tracker.record("c", 20.0);

        let stats = tracker.stats();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total_ms, 60.0);
        assert_eq!(stats.average_ms, 20.0);
        assert_eq!(stats.min_ms, 10.0);
        assert_eq!(stats.max_ms, 30.0);
        assert_eq!(stats.recent.len(), 3);
        assert_eq!(stats.recent[0].key, "a");
    }

    #[test]
    fn test_window_and_recent() {
        let mut tracker = LoadTimeTracker::new();
        for i in 0..(MAX_LOAD_TIME_RECORDS + 5) {
            tracker.record(format!("img-{}", i), i as f64);
        }
        assert_eq!(tracker.len(), MAX_LOAD_TIME_RECORDS);

        let stats = tracker.stats();
        assert_eq!(stats.min_ms, 5.0);
        assert_eq!(stats.recent.len(), RECENT_LOAD_RECORDS);
        let last = format!("img-{}", MAX_LOAD_TIME_RECORDS + 4);
        assert_eq!(stats.recent.last().map(|r| r.key.as_str()), Some(last.as_str()));

        tracker.clear();
        assert!(tracker.is_empty());
    }
}
