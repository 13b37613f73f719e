//! Checkpoint policy and settled-height tracking
//!
//! Workers finish heights in any order. [`SettledHeight`] turns that stream
//! into the contiguous prefix that is actually committed, and
//! [`CheckpointPolicy`] picks which settled heights get reported.

use crate::error::{FarmError, Result};
use std::collections::BTreeSet;

/// Which heights are reported to the authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointPolicy {
    interval: u64,
    total_height: u64,
}

impl CheckpointPolicy {
    pub fn new(interval: u64, total_height: u64) -> Result<Self> {
        if interval == 0 {
            return Err(FarmError::InvalidInput(
                "set_height_interval must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            interval,
            total_height,
        })
    }

    /// First height, every `interval`-th height, and the last height
    pub fn should_report(&self, height: u64) -> bool {
        height == 1 || height % self.interval == 0 || height == self.total_height
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn total_height(&self) -> u64 {
        self.total_height
    }
}

/// Largest height such that every height up to it has completed
#[derive(Debug, Default)]
pub struct SettledHeight {
    settled: u64,
    ahead: BTreeSet<u64>,
}

impl SettledHeight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settled(&self) -> u64 {
        self.settled
    }

    /// Number of completed heights still waiting on a gap below them
    pub fn pending(&self) -> usize {
        self.ahead.len()
    }

    /// Mark `height` complete and return the heights that became settled,
    /// in increasing order. Duplicate or already-settled heights settle
    /// nothing.
    pub fn complete(&mut self, height: u64) -> Vec<u64> {
        if height <= self.settled {
            return Vec::new();
        }
        self.ahead.insert(height);

        let mut newly = Vec::new();
        while self.ahead.remove(&(self.settled + 1)) {
            self.settled += 1;
            newly.push(self.settled);
        }
        newly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_policy_first_interval_last() {
        let policy = CheckpointPolicy::new(4, 10).unwrap();
        let reported: Vec<u64> = (1..=10).filter(|h| policy.should_report(*h)).collect();
        assert_eq!(reported, vec![1, 4, 8, 10]);
    }

    #[test]
    fn test_policy_interval_one_reports_everything() {
        let policy = CheckpointPolicy::new(1, 5).unwrap();
        assert!((1..=5).all(|h| policy.should_report(h)));
    }

    #[test]
    fn test_policy_rejects_zero_interval() {
        assert!(matches!(
            CheckpointPolicy::new(0, 10),
            Err(FarmError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_settled_in_order() {
        let mut tracker = SettledHeight::new();
        assert_eq!(tracker.complete(1), vec![1]);
        assert_eq!(tracker.complete(2), vec![2]);
        assert_eq!(tracker.settled(), 2);
    }

    #[test]
    fn test_settled_waits_for_gap() {
        let mut tracker = SettledHeight::new();
        assert!(tracker.complete(3).is_empty());
        assert!(tracker.complete(2).is_empty());
        assert_eq!(tracker.pending(), 2);
        assert_eq!(tracker.complete(1), vec![1, 2, 3]);
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn test_settled_ignores_duplicates() {
        let mut tracker = SettledHeight::new();
        tracker.complete(1);
        assert!(tracker.complete(1).is_empty());
        assert!(tracker.complete(0).is_empty());
        assert_eq!(tracker.settled(), 1);
    }

    proptest! {
        #[test]
        fn prop_checkpoints_are_ordered_for_any_completion_order(
            order in (1u64..=40).prop_flat_map(|n| Just((1..=n).collect::<Vec<u64>>()).prop_shuffle()),
            interval in 1u64..10,
        ) {
            let total = order.len() as u64;
            let policy = CheckpointPolicy::new(interval, total).unwrap();
            let mut tracker = SettledHeight::new();

            let mut reported = Vec::new();
            for height in order {
                for settled in tracker.complete(height) {
                    if policy.should_report(settled) {
                        reported.push(settled);
                    }
                }
            }

            let expected: Vec<u64> = (1..=total).filter(|h| policy.should_report(*h)).collect();
            prop_assert_eq!(reported, expected);
            prop_assert_eq!(tracker.settled(), total);
        }
    }
}
