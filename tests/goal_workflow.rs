//! End-to-end tests for the monthly goal update workflow on an
//! on-disk store.

use reportd::goals::{GoalTracker, GoalUpdate, SubmitOutcome};
use reportd::storage::Storage;
use std::sync::Arc;
use tempfile::TempDir;

async fn make_tracker(dir: &TempDir) -> (Arc<Storage>, GoalTracker) {
    let storage = Arc::new(Storage::new(dir.path()).await.unwrap());
    (storage.clone(), GoalTracker::new(storage))
}

fn update(target: f64, completed: f64, revenue: f64) -> GoalUpdate {
    GoalUpdate {
        proposed_target: target,
        added_completed: completed,
        added_revenue: revenue,
    }
}

#[tokio::test]
async fn test_two_submission_scenario() {
    let dir = TempDir::new().unwrap();
    let (_storage, tracker) = make_tracker(&dir).await;

    // First submission sets the target and the first deltas.
    let outcome = tracker
        .submit("zhang.wei", "2026-08", update(5000.0, 1200.0, 300.0))
        .await
        .unwrap();
    let SubmitOutcome::Updated { goal, log } = outcome else {
        panic!("first submission must write");
    };
    assert_eq!(goal.target_amount, 5000.0);
    assert_eq!(goal.completed_amount, 1200.0);
    assert_eq!(goal.revenue_amount, 300.0);
    let log = log.expect("positive deltas must be logged");
    assert_eq!(log.added_completed, 1200.0);
    assert_eq!(log.added_revenue, 300.0);

    // Second submission: differing proposed target is ignored, deltas accumulate.
    let outcome = tracker
        .submit("zhang.wei", "2026-08", update(9000.0, 800.0, 0.0))
        .await
        .unwrap();
    let SubmitOutcome::Updated { goal, log } = outcome else {
        panic!("second submission must write");
    };
    assert_eq!(goal.target_amount, 5000.0, "target is locked once set");
    assert_eq!(goal.completed_amount, 2000.0);
    assert_eq!(goal.revenue_amount, 300.0);
    assert!(log.is_some());

    let logs = tracker.logs("zhang.wei", "2026-08").await.unwrap();
    assert_eq!(logs.len(), 2);
    // Newest first.
    assert_eq!(logs[0].added_completed, 800.0);
    assert_eq!(logs[1].added_completed, 1200.0);
}

#[tokio::test]
async fn test_no_duplicate_rows_per_user_month() {
    let dir = TempDir::new().unwrap();
    let (_storage, tracker) = make_tracker(&dir).await;

    for _ in 0..3 {
        tracker
            .submit("li.na", "2026-08", update(0.0, 100.0, 10.0))
            .await
            .unwrap();
    }

    let all = tracker.all_goals("2026-08").await.unwrap();
    assert_eq!(all.len(), 1, "upsert must never duplicate the (user, month) row");
    assert_eq!(all[0].completed_amount, 300.0);
    assert_eq!(all[0].revenue_amount, 30.0);
    // Target was never proposed, so it stays unset.
    assert_eq!(all[0].target_amount, 0.0);
}

#[tokio::test]
async fn test_noop_reports_nothing_to_update() {
    let dir = TempDir::new().unwrap();
    let (_storage, tracker) = make_tracker(&dir).await;

    tracker
        .submit("li.na", "2026-08", update(5000.0, 0.0, 0.0))
        .await
        .unwrap();
    let before = tracker.get_goal("li.na", "2026-08").await.unwrap().unwrap();

    // Target already set, no deltas, differing proposal: no write at all.
    let outcome = tracker
        .submit("li.na", "2026-08", update(9000.0, 0.0, 0.0))
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::NothingToUpdate));

    let after = tracker.get_goal("li.na", "2026-08").await.unwrap().unwrap();
    assert_eq!(after.target_amount, 5000.0);
    assert_eq!(after.updated_at, before.updated_at, "row must be untouched");
    assert!(tracker.logs("li.na", "2026-08").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_log_sums_match_totals() {
    let dir = TempDir::new().unwrap();
    let (_storage, tracker) = make_tracker(&dir).await;

    let submissions = [
        (3000.0, 500.0, 100.0),
        (0.0, 250.5, 0.0),
        (0.0, 0.0, 75.25),
        (0.0, 1000.0, 200.0),
    ];
    for (t, c, r) in submissions {
        tracker
            .submit("zhang.wei", "2026-08", update(t, c, r))
            .await
            .unwrap();
    }

    let goal = tracker
        .get_goal("zhang.wei", "2026-08")
        .await
        .unwrap()
        .unwrap();
    let logs = tracker.logs("zhang.wei", "2026-08").await.unwrap();

    let completed_sum: f64 = logs.iter().map(|l| l.added_completed).sum();
    let revenue_sum: f64 = logs.iter().map(|l| l.added_revenue).sum();
    assert_eq!(completed_sum, goal.completed_amount);
    assert_eq!(revenue_sum, goal.revenue_amount);
}

#[tokio::test]
async fn test_users_and_months_are_independent() {
    let dir = TempDir::new().unwrap();
    let (_storage, tracker) = make_tracker(&dir).await;

    tracker
        .submit("zhang.wei", "2026-08", update(5000.0, 100.0, 0.0))
        .await
        .unwrap();
    tracker
        .submit("li.na", "2026-08", update(8000.0, 900.0, 0.0))
        .await
        .unwrap();
    tracker
        .submit("zhang.wei", "2026-09", update(6000.0, 0.0, 0.0))
        .await
        .unwrap();

    let august = tracker.all_goals("2026-08").await.unwrap();
    assert_eq!(august.len(), 2);
    // Ordered by completion, best first.
    assert_eq!(august[0].username, "li.na");

    let september = tracker.all_goals("2026-09").await.unwrap();
    assert_eq!(september.len(), 1);
    assert_eq!(september[0].target_amount, 6000.0);
    assert_eq!(september[0].completed_amount, 0.0);
}
