mod common;

use chrono::{Duration, Utc, Weekday};
use common::{t, upcoming, TestApp};
use tutoring_backend::domain::models::{job::NotificationEvent, user::UserRole};
use tutoring_backend::domain::ports::JobRepository;
use tutoring_backend::domain::services::outbox::Delivery;

#[tokio::test]
async fn test_stale_claim_is_taken_over() {
    let app = TestApp::new().await;
    let parent = app.seed_user("Parent", UserRole::Parent).await;
    let tutor = app.seed_tutor("Tutor", Some(4.2), None).await;
    app.seed_window(&tutor.id, &[Weekday::Wed], t(14, 0), t(18, 0), 1).await;
    let wednesday = upcoming(Weekday::Wed);
    app.schedule(&parent.id, &tutor.id, &[Weekday::Wed], t(15, 0), t(16, 0), wednesday, wednesday)
        .await
        .unwrap();

    let jobs = app.pending_jobs().await;
    assert_eq!(jobs.len(), 1);
    let job_id = jobs[0].id.clone();

    // A worker claims the job and then stops before finishing it.
    let claimed = app.state.job_repo.claim(&job_id, Utc::now() + Duration::minutes(10)).await.unwrap();
    assert_eq!(claimed.unwrap().status, "PROCESSING");

    // While the lease runs nobody else gets it.
    assert!(app.drain_outbox().await.is_empty());
    assert!(app.state.job_repo.claim(&job_id, Utc::now() + Duration::minutes(10)).await.unwrap().is_none());
    assert!(app.notifier.events().is_empty());

    sqlx::query("UPDATE jobs SET execute_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::seconds(1))
        .bind(&job_id)
        .execute(&app.pool)
        .await
        .unwrap();

    let deliveries = app.drain_outbox().await;
    assert_eq!(deliveries.len(), 1);
    assert!(matches!(deliveries[0], Delivery::Delivered(_)));
    assert_eq!(app.notifier.events(), vec![NotificationEvent::ContractScheduled]);

    let job = app.state.job_repo.find_by_id(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, "COMPLETED");

    // Completed jobs are never picked up again.
    assert!(app.drain_outbox().await.is_empty());
}

#[tokio::test]
async fn test_claim_due_sets_lease() {
    let app = TestApp::new().await;
    let parent = app.seed_user("Parent", UserRole::Parent).await;
    let tutor = app.seed_tutor("Tutor", None, None).await;
    app.seed_window(&tutor.id, &[Weekday::Thu], t(8, 0), t(10, 0), 1).await;
    let thursday = upcoming(Weekday::Thu);
    app.schedule(&parent.id, &tutor.id, &[Weekday::Thu], t(8, 0), t(9, 0), thursday, thursday)
        .await
        .unwrap();

    let before = Utc::now();
    let claimed = app.state.outbox().claim_due(10).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].status, "PROCESSING");
    // The test config leases claims for 60 seconds.
    assert!(claimed[0].execute_at >= before + Duration::seconds(59));
    assert!(app.state.outbox().claim_due(10).await.unwrap().is_empty());
}
