//! Monthly goal update workflow.
//!
//! Employees accumulate progress over a month by submitting deltas; the
//! tracker folds each delta into the stored snapshot and appends an
//! audit entry per submission. The target amount is chosen once: the
//! first positive value wins and later proposals are ignored.
//!
//! Two limitations are inherited from the system this replaces and are
//! deliberately preserved:
//!
//! - The snapshot read and the snapshot write are not one atomic step,
//!   so two concurrent submissions for the same (user, month) can lose
//!   an update.
//! - The goal upsert and the log append are two separate writes. If the
//!   append fails after a successful upsert, cumulative totals end up
//!   ahead of the log sum and nothing reconciles them.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::DomainError;
use crate::observability::LatencyTracker;
use crate::storage::goals::{GoalRow, PerformanceLogRow};
use crate::storage::Storage;
use crate::time;

/// One update submission: an optional first-time target plus the
/// progress made since the last submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalUpdate {
    /// Used only while the stored target is 0; ignored afterwards.
    pub proposed_target: f64,
    pub added_completed: f64,
    pub added_revenue: f64,
}

/// The totals a submission resolves to, before any write happens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdatePlan {
    pub target: f64,
    pub completed: f64,
    pub revenue: f64,
    /// `Some((added_completed, added_revenue))` when a log entry must be
    /// appended, i.e. when at least one delta is positive.
    pub log_entry: Option<(f64, f64)>,
}

/// Current cumulative totals for a (user, month); all zero when no row exists.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Snapshot {
    pub target: f64,
    pub completed: f64,
    pub revenue: f64,
}

impl From<&GoalRow> for Snapshot {
    fn from(row: &GoalRow) -> Self {
        Self {
            target: row.target_amount,
            completed: row.completed_amount,
            revenue: row.revenue_amount,
        }
    }
}

/// Resolve a submission against the current snapshot.
///
/// Returns `None` when there is nothing to persist: no first-time target
/// is being set and both deltas are zero. That case is a no-op, not an
/// error — the caller reports "nothing to update" and leaves the store
/// untouched.
pub fn plan_update(current: Snapshot, update: &GoalUpdate) -> Option<UpdatePlan> {
    let sets_target = current.target == 0.0 && update.proposed_target > 0.0;
    let has_delta = update.added_completed > 0.0 || update.added_revenue > 0.0;
    if !sets_target && !has_delta {
        return None;
    }

    let target = if current.target > 0.0 {
        current.target
    } else {
        update.proposed_target
    };

    Some(UpdatePlan {
        target,
        completed: current.completed + update.added_completed,
        revenue: current.revenue + update.added_revenue,
        log_entry: has_delta.then_some((update.added_completed, update.added_revenue)),
    })
}

/// Outcome of a submission.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The no-op guard fired; nothing was written.
    NothingToUpdate,
    /// The snapshot was written; `log` is the appended entry, if any.
    Updated {
        goal: GoalRow,
        log: Option<PerformanceLogRow>,
    },
}

/// Goal update workflow over the goal store.
#[derive(Clone)]
pub struct GoalTracker {
    storage: Arc<Storage>,
}

impl GoalTracker {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    fn validate(username: &str, month: &str, update: &GoalUpdate) -> Result<(), DomainError> {
        if username.trim().is_empty() {
            return Err(DomainError::MissingField("username"));
        }
        if !time::is_valid_month(month) {
            return Err(DomainError::InvalidMonth(month.to_string()));
        }
        for (field, value) in [
            ("proposed_target", update.proposed_target),
            ("added_completed", update.added_completed),
            ("added_revenue", update.added_revenue),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(DomainError::NegativeAmount { field, value });
            }
        }
        Ok(())
    }

    /// Submit one update for (username, month).
    ///
    /// Reads the current snapshot (absent = all zeros), resolves the new
    /// totals, upserts the goal row keyed on (username, month), and
    /// appends a performance log entry when at least one delta is
    /// positive. See the module docs for the two preserved limitations.
    pub async fn submit(
        &self,
        username: &str,
        month: &str,
        update: GoalUpdate,
    ) -> Result<SubmitOutcome, DomainError> {
        Self::validate(username, month, &update)?;
        let tracker = LatencyTracker::start("goal.submit");

        let current = self
            .storage
            .get_goal(username, month)
            .await?
            .as_ref()
            .map(Snapshot::from)
            .unwrap_or_default();

        let Some(plan) = plan_update(current, &update) else {
            tracker.finish();
            return Ok(SubmitOutcome::NothingToUpdate);
        };

        let goal = self
            .storage
            .upsert_goal(username, month, plan.target, plan.completed, plan.revenue)
            .await?;

        let log = match plan.log_entry {
            Some((added_completed, added_revenue)) => {
                let appended = self
                    .storage
                    .append_performance_log(username, month, added_completed, added_revenue)
                    .await;
                match appended {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        // The snapshot write already landed; totals are now
                        // ahead of the log sum until someone reconciles by hand.
                        warn!(
                            username,
                            month,
                            err = %e,
                            "goal snapshot written but log append failed"
                        );
                        return Err(e.into());
                    }
                }
            }
            None => None,
        };

        info!(
            username,
            month,
            target = goal.target_amount,
            completed = goal.completed_amount,
            revenue = goal.revenue_amount,
            logged = log.is_some(),
            "goal updated"
        );
        tracker.finish();
        Ok(SubmitOutcome::Updated { goal, log })
    }

    /// Current snapshot for (username, month), or `None` when no goal is set.
    pub async fn get_goal(
        &self,
        username: &str,
        month: &str,
    ) -> Result<Option<GoalRow>, DomainError> {
        if !time::is_valid_month(month) {
            return Err(DomainError::InvalidMonth(month.to_string()));
        }
        Ok(self.storage.get_goal(username, month).await?)
    }

    /// Every user's snapshot for a month, best completion first.
    pub async fn all_goals(&self, month: &str) -> Result<Vec<GoalRow>, DomainError> {
        if !time::is_valid_month(month) {
            return Err(DomainError::InvalidMonth(month.to_string()));
        }
        Ok(self.storage.list_goals(month).await?)
    }

    /// Submission history for (username, month), newest first.
    pub async fn logs(
        &self,
        username: &str,
        month: &str,
    ) -> Result<Vec<PerformanceLogRow>, DomainError> {
        if !time::is_valid_month(month) {
            return Err(DomainError::InvalidMonth(month.to_string()));
        }
        Ok(self.storage.list_performance_logs(username, month).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snap(target: f64, completed: f64, revenue: f64) -> Snapshot {
        Snapshot {
            target,
            completed,
            revenue,
        }
    }

    #[test]
    fn test_noop_when_nothing_changes() {
        // No target set, none proposed, no deltas.
        assert_eq!(plan_update(snap(0.0, 0.0, 0.0), &GoalUpdate::default()), None);

        // Target already set, deltas zero, differing proposal is ignored.
        let update = GoalUpdate {
            proposed_target: 9000.0,
            ..Default::default()
        };
        assert_eq!(plan_update(snap(5000.0, 2000.0, 300.0), &update), None);
    }

    #[test]
    fn test_first_submission_sets_target_and_totals() {
        let update = GoalUpdate {
            proposed_target: 5000.0,
            added_completed: 1200.0,
            added_revenue: 300.0,
        };
        let plan = plan_update(Snapshot::default(), &update).unwrap();
        assert_eq!(plan.target, 5000.0);
        assert_eq!(plan.completed, 1200.0);
        assert_eq!(plan.revenue, 300.0);
        assert_eq!(plan.log_entry, Some((1200.0, 300.0)));
    }

    #[test]
    fn test_target_locked_once_positive() {
        let update = GoalUpdate {
            proposed_target: 9000.0,
            added_completed: 800.0,
            added_revenue: 0.0,
        };
        let plan = plan_update(snap(5000.0, 1200.0, 300.0), &update).unwrap();
        assert_eq!(plan.target, 5000.0);
        assert_eq!(plan.completed, 2000.0);
        assert_eq!(plan.revenue, 300.0);
        assert_eq!(plan.log_entry, Some((800.0, 0.0)));
    }

    #[test]
    fn test_target_only_submission_writes_but_does_not_log() {
        let update = GoalUpdate {
            proposed_target: 7000.0,
            ..Default::default()
        };
        let plan = plan_update(Snapshot::default(), &update).unwrap();
        assert_eq!(plan.target, 7000.0);
        assert_eq!(plan.completed, 0.0);
        assert_eq!(plan.log_entry, None);
    }

    proptest! {
        /// Any submission with at least one positive delta increases the
        /// totals by exactly the deltas and carries them into the log entry.
        #[test]
        fn prop_deltas_accumulate_exactly(
            cur_completed in 0.0f64..1e9,
            cur_revenue in 0.0f64..1e9,
            c in 0.0f64..1e6,
            r in 0.0f64..1e6,
        ) {
            prop_assume!(c > 0.0 || r > 0.0);
            let current = snap(5000.0, cur_completed, cur_revenue);
            let update = GoalUpdate {
                proposed_target: 0.0,
                added_completed: c,
                added_revenue: r,
            };
            let plan = plan_update(current, &update).unwrap();
            prop_assert_eq!(plan.target, 5000.0);
            prop_assert_eq!(plan.completed, cur_completed + c);
            prop_assert_eq!(plan.revenue, cur_revenue + r);
            prop_assert_eq!(plan.log_entry, Some((c, r)));
        }

        /// Zero-delta submissions never produce a log entry.
        #[test]
        fn prop_no_log_without_delta(target in 1.0f64..1e6) {
            let update = GoalUpdate { proposed_target: target, ..Default::default() };
            match plan_update(Snapshot::default(), &update) {
                Some(plan) => prop_assert_eq!(plan.log_entry, None),
                None => prop_assert!(false, "first-time target must be written"),
            }
        }
    }

    mod submit {
        use super::super::*;
        use crate::storage::Storage;
        use std::sync::Arc;

        async fn make_tracker() -> GoalTracker {
            GoalTracker::new(Arc::new(Storage::in_memory().await.unwrap()))
        }

        #[tokio::test]
        async fn test_submit_rejects_bad_inputs() {
            let tracker = make_tracker().await;
            let err = tracker
                .submit("", "2026-08", GoalUpdate::default())
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::MissingField("username")));

            let err = tracker
                .submit("li.na", "2026-8", GoalUpdate::default())
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidMonth(_)));

            let update = GoalUpdate {
                added_completed: -1.0,
                ..Default::default()
            };
            let err = tracker.submit("li.na", "2026-08", update).await.unwrap_err();
            assert!(matches!(err, DomainError::NegativeAmount { .. }));
        }

        #[tokio::test]
        async fn test_noop_leaves_store_untouched() {
            let tracker = make_tracker().await;
            let outcome = tracker
                .submit("li.na", "2026-08", GoalUpdate::default())
                .await
                .unwrap();
            assert!(matches!(outcome, SubmitOutcome::NothingToUpdate));
            assert!(tracker.get_goal("li.na", "2026-08").await.unwrap().is_none());
            assert!(tracker.logs("li.na", "2026-08").await.unwrap().is_empty());
        }
    }
}
