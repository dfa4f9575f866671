//! Commit boundary state machine.

use super::CommitRegime;
use crate::opts::TailPolicy;

/// What the driver must do after reporting progress to a [`CommitPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum CommitAction {
    Continue,
    Commit,
}

/// Tracks units of work (rows or batch flushes) since the last commit.
///
/// Under auto-commit the engine commits every statement itself, so the policy
/// never asks for a commit and never holds pending work. Under manual commit
/// it asks for a commit each time `threshold` units have accumulated.
#[derive(Debug, Clone)]
pub struct CommitPolicy {
    auto_commit: bool,
    threshold: u32,
    pending: u32,
}

impl CommitPolicy {
    /// A threshold of 0 is treated as 1.
    pub fn new(regime: CommitRegime, threshold: u32) -> Self {
        Self {
            auto_commit: regime == CommitRegime::Auto,
            threshold: threshold.max(1),
            pending: 0,
        }
    }

    /// Report `units` successful executions.
    pub fn record(&mut self, units: u32) -> CommitAction {
        if self.auto_commit {
            return CommitAction::Continue;
        }
        self.pending = self.pending.saturating_add(units);
        if self.pending >= self.threshold {
            self.pending = 0;
            CommitAction::Commit
        } else {
            CommitAction::Continue
        }
    }

    /// Decide what happens to work still pending after the last row.
    pub fn finish(&mut self, tail: TailPolicy) -> CommitAction {
        if self.pending == 0 || tail == TailPolicy::Leave {
            return CommitAction::Continue;
        }
        self.pending = 0;
        CommitAction::Commit
    }

    /// Units executed since the last commit.
    pub fn pending(&self) -> u32 {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commits_at(policy: &mut CommitPolicy, rows: u32) -> Vec<u32> {
        (1..=rows)
            .filter(|_| policy.record(1) == CommitAction::Commit)
            .collect()
    }

    #[test]
    fn auto_commit_never_commits() {
        let mut policy = CommitPolicy::new(CommitRegime::Auto, 50);
        assert!(commits_at(&mut policy, 120).is_empty());
        assert_eq!(policy.pending(), 0);
        assert_eq!(policy.finish(TailPolicy::Flush), CommitAction::Continue);
    }

    #[test]
    fn manual_commit_every_threshold_rows() {
        let mut policy = CommitPolicy::new(CommitRegime::Manual, 50);
        assert_eq!(commits_at(&mut policy, 1000).len(), 20);
        assert_eq!(policy.pending(), 0);
        assert_eq!(policy.finish(TailPolicy::Flush), CommitAction::Continue);
    }

    #[test]
    fn manual_commit_boundaries_match_row_numbers() {
        let mut policy = CommitPolicy::new(CommitRegime::Manual, 50);
        assert_eq!(commits_at(&mut policy, 160), vec![50, 100, 150]);
        assert_eq!(policy.pending(), 10);
    }

    #[test]
    fn tail_policy_controls_final_commit() {
        let mut flush = CommitPolicy::new(CommitRegime::Manual, 50);
        let _ = commits_at(&mut flush, 510);
        assert_eq!(flush.finish(TailPolicy::Flush), CommitAction::Commit);
        assert_eq!(flush.pending(), 0);

        let mut leave = CommitPolicy::new(CommitRegime::Manual, 50);
        let _ = commits_at(&mut leave, 510);
        assert_eq!(leave.finish(TailPolicy::Leave), CommitAction::Continue);
        assert_eq!(leave.pending(), 10);
    }

    #[test]
    fn per_flush_policy_commits_each_flush() {
        let mut policy = CommitPolicy::new(CommitRegime::Manual, 1);
        assert_eq!(policy.record(1), CommitAction::Commit);
        assert_eq!(policy.record(1), CommitAction::Commit);
    }
}
