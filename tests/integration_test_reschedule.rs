mod common;

use std::sync::atomic::Ordering;

use chrono::{Duration, NaiveDate, NaiveTime, Utc, Weekday};
use common::{contract_params, point, t, upcoming, TestApp};
use tutoring_backend::domain::models::{
    availability::AvailabilityWindow,
    contract::Contract,
    job::NotificationEvent,
    reschedule::{NewRescheduleParams, RescheduleStatus},
    session::{SessionInstance, SessionStatus},
    user::{User, UserRole},
};
use tutoring_backend::domain::ports::JobRepository;
use tutoring_backend::domain::services::outbox::Delivery;
use tutoring_backend::domain::services::reschedule::RefundOutcome;
use tutoring_backend::error::AppError;

struct Fixture {
    parent: User,
    main_tutor: User,
    substitute: User,
    main_window: AvailabilityWindow,
    substitute_window: AvailabilityWindow,
    contract: Contract,
    session: SessionInstance,
    monday: NaiveDate,
    tuesday: NaiveDate,
}

/// One Monday 10:00-11:00 session with the main tutor, plus a substitute
/// free on Tuesday mornings.
async fn fixture(app: &TestApp) -> Fixture {
    let parent = app.seed_user("Parent", UserRole::Parent).await;
    let main_tutor = app.seed_tutor("Main", Some(4.5), None).await;
    let substitute = app.seed_tutor("Substitute", Some(4.8), None).await;
    let main_window = app.seed_window(&main_tutor.id, &[Weekday::Mon], t(9, 0), t(12, 0), 2).await;
    let substitute_window = app.seed_window(&substitute.id, &[Weekday::Tue], t(9, 0), t(12, 0), 2).await;

    let monday = upcoming(Weekday::Mon);
    let (contract, sessions) = app
        .schedule(&parent.id, &main_tutor.id, &[Weekday::Mon], t(10, 0), t(11, 0), monday, monday)
        .await
        .unwrap();

    Fixture {
        parent,
        main_tutor,
        substitute,
        main_window,
        substitute_window,
        contract,
        session: sessions[0].clone(),
        monday,
        tuesday: monday + Duration::days(1),
    }
}

fn move_to(session_id: &str, date: NaiveDate, start: NaiveTime, end: NaiveTime, tutor_id: Option<&str>) -> NewRescheduleParams {
    NewRescheduleParams {
        booking_id: session_id.to_string(),
        requested_date: date,
        start_time: start,
        end_time: end,
        requested_tutor_id: tutor_id.map(str::to_string),
        reason: Some("Family trip".to_string()),
    }
}

#[tokio::test]
async fn test_create_request_validation() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let workflow = app.state.reschedule_workflow();
    let stranger = app.seed_user("Stranger", UserRole::Parent).await;

    let err = workflow.create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(11, 0), t(10, 0), None)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let err = workflow.create(&f.parent.id, move_to(&f.session.id, yesterday, t(10, 0), t(11, 0), None)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let err = workflow.create(&f.parent.id, move_to("missing", f.tuesday, t(10, 0), t(11, 0), None)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // An unknown session is reported before anything wrong with the requested slot.
    let err = workflow.create(&f.parent.id, move_to("missing", yesterday, t(11, 0), t(10, 0), None)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = workflow.create(&stranger.id, move_to(&f.session.id, f.tuesday, t(10, 0), t(11, 0), None)).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let err = workflow.create(&f.parent.id, move_to(&f.session.id, f.monday, t(10, 0), t(11, 0), Some(&f.main_tutor.id))).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let err = workflow.create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(10, 0), t(11, 0), Some(&stranger.id))).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let err = workflow.create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(10, 0), t(11, 0), Some("ghost"))).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let request = workflow.create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(10, 0), t(11, 0), Some(&f.substitute.id))).await.unwrap();
    assert_eq!(request.status, RescheduleStatus::Pending);
    assert_eq!(request.parent_id, f.parent.id);

    let err = workflow.create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(9, 0), t(10, 0), None)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let pending = workflow.list_pending_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, request.id);
}

#[tokio::test]
async fn test_approve_moves_session_and_booking() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let workflow = app.state.reschedule_workflow();
    let staff = app.seed_user("Staff", UserRole::Staff).await;

    let request = workflow
        .create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(10, 0), t(11, 0), Some(&f.substitute.id)))
        .await
        .unwrap();

    let (approved, moved) = workflow.approve(&staff.id, &request.id, None).await.unwrap();
    assert_eq!(approved.status, RescheduleStatus::Approved);
    assert_eq!(approved.staff_id.as_deref(), Some(staff.id.as_str()));
    assert_eq!(approved.approved_tutor_id.as_deref(), Some(f.substitute.id.as_str()));
    assert!(approved.processed_date.is_some());

    assert_eq!(moved.id, f.session.id);
    assert_eq!(moved.tutor_id, f.substitute.id);
    assert_eq!(moved.session_date, f.tuesday);
    assert_eq!(moved.availability_id.as_deref(), Some(f.substitute_window.id.as_str()));
    assert_eq!(app.session(&f.session.id).await.tutor_id, f.substitute.id);

    assert_eq!(app.window(&f.main_window.id).await.current_bookings, 0);
    assert_eq!(app.window(&f.substitute_window.id).await.current_bookings, 1);

    app.drain_outbox().await;
    let events = app.notifier.events();
    assert!(events.contains(&NotificationEvent::RescheduleRequested));
    assert!(events.contains(&NotificationEvent::RescheduleApproved));

    let err = workflow.approve(&staff.id, &request.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_move_within_held_window_keeps_counter() {
    let app = TestApp::new().await;
    let parent = app.seed_user("Parent", UserRole::Parent).await;
    let staff = app.seed_user("Staff", UserRole::Staff).await;
    let tutor = app.seed_tutor("Main", None, None).await;
    let window = app.seed_window(&tutor.id, &[Weekday::Mon], t(9, 0), t(12, 0), 1).await;
    let monday = upcoming(Weekday::Mon);

    let (_, sessions) = app
        .schedule(&parent.id, &tutor.id, &[Weekday::Mon], t(9, 0), t(10, 0), monday, monday + Duration::days(7))
        .await
        .unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(app.window(&window.id).await.current_bookings, 1);

    // The window is at capacity, but this contract already holds it.
    let workflow = app.state.reschedule_workflow();
    let request = workflow
        .create(&parent.id, move_to(&sessions[0].id, monday, t(11, 0), t(12, 0), None))
        .await
        .unwrap();
    let (_, moved) = workflow.approve(&staff.id, &request.id, None).await.unwrap();

    assert_eq!(moved.start_time, t(11, 0));
    assert_eq!(moved.tutor_id, tutor.id);
    assert_eq!(app.window(&window.id).await.current_bookings, 1);
}

#[tokio::test]
async fn test_approve_with_conflicting_tutor_leaves_request_pending() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let workflow = app.state.reschedule_workflow();
    let staff = app.seed_user("Staff", UserRole::Staff).await;

    let request = workflow
        .create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(10, 0), t(11, 0), Some(&f.substitute.id)))
        .await
        .unwrap();

    // The substitute gets booked for the same slot after the request was filed.
    let other_parent = app.seed_user("Other", UserRole::Parent).await;
    app.schedule(&other_parent.id, &f.substitute.id, &[Weekday::Tue], t(10, 30), t(11, 30), f.tuesday, f.tuesday)
        .await
        .unwrap();

    let err = workflow.approve(&staff.id, &request.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::SchedulingConflict(_)));

    let unchanged = workflow.find_request(&request.id).await.unwrap();
    assert_eq!(unchanged.status, RescheduleStatus::Pending);
    assert!(unchanged.staff_id.is_none());

    let session = app.session(&f.session.id).await;
    assert_eq!(session.tutor_id, f.main_tutor.id);
    assert_eq!(session.session_date, f.monday);
    assert_eq!(app.window(&f.main_window.id).await.current_bookings, 1);
    assert_eq!(app.window(&f.substitute_window.id).await.current_bookings, 1);

    // Staff can still place the session with someone who is free.
    let backup = app.seed_tutor("Backup", Some(3.9), None).await;
    let backup_window = app.seed_window(&backup.id, &[Weekday::Tue], t(9, 0), t(12, 0), 1).await;
    let (approved, moved) = workflow.approve(&staff.id, &request.id, Some(&backup.id)).await.unwrap();
    assert_eq!(approved.approved_tutor_id.as_deref(), Some(backup.id.as_str()));
    assert_eq!(moved.tutor_id, backup.id);
    assert_eq!(app.window(&backup_window.id).await.current_bookings, 1);
    assert_eq!(app.window(&f.main_window.id).await.current_bookings, 0);
}

#[tokio::test]
async fn test_substitutes_exclude_current_and_main_tutor() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let workflow = app.state.reschedule_workflow();

    // The main tutor is free on Monday at 11 too, but never offered.
    let request = workflow
        .create(&f.parent.id, move_to(&f.session.id, f.monday, t(11, 0), t(12, 0), None))
        .await
        .unwrap();
    assert!(workflow.get_available_substitutes(&request.id).await.unwrap().is_empty());

    let weekend = app.seed_tutor("Weekend", None, None).await;
    app.seed_window(&weekend.id, &[Weekday::Mon, Weekday::Sat], t(8, 0), t(20, 0), 1).await;

    let candidates = workflow.get_available_substitutes(&request.id).await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].tutor_id, weekend.id);
    assert_ne!(candidates[0].tutor_id, f.substitute.id);
}

#[tokio::test]
async fn test_reject_after_approve_is_invalid() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let workflow = app.state.reschedule_workflow();
    let staff = app.seed_user("Staff", UserRole::Staff).await;

    let request = workflow
        .create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(9, 0), t(10, 0), Some(&f.substitute.id)))
        .await
        .unwrap();
    let (approved, _) = workflow.approve(&staff.id, &request.id, None).await.unwrap();

    let err = workflow.reject(&staff.id, &request.id, Some("Too late".to_string())).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let stored = workflow.find_request(&request.id).await.unwrap();
    assert_eq!(stored.status, RescheduleStatus::Approved);
    assert_eq!(stored.reason, approved.reason);
    assert_eq!(stored.reason.as_deref(), Some("Family trip"));
    assert!(stored.rejection_reason.is_none());
    assert_eq!(stored.staff_id, approved.staff_id);
    assert_eq!(stored.processed_date, approved.processed_date);
}

#[tokio::test]
async fn test_reject_and_withdraw() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let workflow = app.state.reschedule_workflow();
    let staff = app.seed_user("Staff", UserRole::Staff).await;

    let first = workflow
        .create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(9, 0), t(10, 0), None))
        .await
        .unwrap();
    let rejected = workflow.reject(&staff.id, &first.id, Some("No tutor free".to_string())).await.unwrap();
    assert_eq!(rejected.status, RescheduleStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("No tutor free"));
    assert_eq!(rejected.reason.as_deref(), Some("Family trip"));
    let stored = workflow.find_request(&first.id).await.unwrap();
    assert_eq!(stored.reason.as_deref(), Some("Family trip"));
    assert_eq!(stored.rejection_reason.as_deref(), Some("No tutor free"));
    assert_eq!(rejected.staff_id.as_deref(), Some(staff.id.as_str()));

    let err = workflow.approve(&staff.id, &first.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // A rejected request does not block a new one.
    let second = workflow
        .create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(10, 0), t(11, 0), Some(&f.substitute.id)))
        .await
        .unwrap();

    let err = workflow.cancel_request(&f.main_tutor.id, &second.id).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let withdrawn = workflow.cancel_request(&f.parent.id, &second.id).await.unwrap();
    assert_eq!(withdrawn.status, RescheduleStatus::Cancelled);
    assert!(workflow.list_pending_requests().await.unwrap().is_empty());

    let session = app.session(&f.session.id).await;
    assert_eq!(session.session_date, f.monday);
    assert_eq!(session.tutor_id, f.main_tutor.id);
}

#[tokio::test]
async fn test_concurrent_approvals_for_same_slot() {
    let app = TestApp::new().await;
    let staff = app.seed_user("Staff", UserRole::Staff).await;
    let popular = app.seed_tutor("Popular", Some(5.0), None).await;
    let popular_window = app.seed_window(&popular.id, &[Weekday::Tue], t(9, 0), t(12, 0), 2).await;
    let monday = upcoming(Weekday::Mon);
    let tuesday = monday + Duration::days(1);

    let mut requests = Vec::new();
    for name in ["First", "Second"] {
        let parent = app.seed_user(name, UserRole::Parent).await;
        let tutor = app.seed_tutor(&format!("{} tutor", name), None, None).await;
        app.seed_window(&tutor.id, &[Weekday::Mon], t(9, 0), t(12, 0), 1).await;
        let (_, sessions) = app
            .schedule(&parent.id, &tutor.id, &[Weekday::Mon], t(10, 0), t(11, 0), monday, monday)
            .await
            .unwrap();
        let request = app.state.reschedule_workflow()
            .create(&parent.id, move_to(&sessions[0].id, tuesday, t(10, 0), t(11, 0), Some(&popular.id)))
            .await
            .unwrap();
        requests.push(request);
    }

    let first = app.state.reschedule_workflow();
    let second = app.state.reschedule_workflow();
    let (a, b) = tokio::join!(
        first.approve(&staff.id, &requests[0].id, None),
        second.approve(&staff.id, &requests[1].id, None),
    );

    let outcomes = [a, b];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = outcomes.iter().position(|r| r.is_err()).unwrap();
    assert!(matches!(outcomes[loser], Err(AppError::SchedulingConflict(_))));

    let stored = app.state.reschedule_workflow().find_request(&requests[loser].id).await.unwrap();
    assert_eq!(stored.status, RescheduleStatus::Pending);
    assert_eq!(app.window(&popular_window.id).await.current_bookings, 1);
}

#[tokio::test]
async fn test_concurrent_creates_leave_one_pending_request() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;

    let first = app.state.reschedule_workflow();
    let second = app.state.reschedule_workflow();
    let (a, b) = tokio::join!(
        first.create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(9, 0), t(10, 0), None)),
        second.create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(10, 0), t(11, 0), Some(&f.substitute.id))),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = outcomes.iter().position(|r| r.is_err()).unwrap();
    assert!(matches!(outcomes[loser], Err(AppError::InvalidState(_))));

    let pending = app.state.reschedule_workflow().list_pending_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].booking_id, f.session.id);

    // The unique guard also holds when the workflow checks are bypassed.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reschedule_requests WHERE booking_id = ? AND status = 'pending'")
        .bind(&f.session.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_create_for_cancelled_session_is_invalid() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let workflow = app.state.reschedule_workflow();

    workflow.cancel_session_and_refund(&f.session.id).await.unwrap();

    let err = workflow
        .create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(10, 0), t(11, 0), None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert!(workflow.list_pending_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_offline_approval_respects_max_distance() {
    let app = TestApp::new().await;
    let parent = app.seed_user("Parent", UserRole::Parent).await;
    let staff = app.seed_user("Staff", UserRole::Staff).await;
    let main_tutor = app.seed_tutor("Main", Some(4.5), Some((10.0, 106.0))).await;
    // 0.18 degrees of latitude is roughly 20 km.
    let far_tutor = app.seed_tutor("Far", Some(4.9), Some((10.18, 106.0))).await;
    app.seed_window(&main_tutor.id, &[Weekday::Mon], t(9, 0), t(12, 0), 2).await;
    let far_window = app.seed_window(&far_tutor.id, &[Weekday::Tue], t(9, 0), t(12, 0), 2).await;

    let monday = upcoming(Weekday::Mon);
    let tuesday = monday + Duration::days(1);
    let mut params = contract_params(&parent.id, &main_tutor.id, &[Weekday::Mon], t(10, 0), t(11, 0), monday, monday);
    params.is_online = false;
    params.offline_address = Some("12 Le Loi".to_string());
    params.offline_location = Some(point(10.0, 106.0));
    params.max_distance_km = 15.0;
    let (_, sessions) = app.state.schedule_generator().schedule_contract(params).await.unwrap();
    let session = sessions[0].clone();
    assert!(!session.is_online);

    // Without its own coordinates the session falls back to the contract's location.
    sqlx::query("UPDATE sessions SET offline_latitude = NULL, offline_longitude = NULL WHERE id = ?")
        .bind(&session.id)
        .execute(&app.pool)
        .await
        .unwrap();

    let workflow = app.state.reschedule_workflow();
    let request = workflow
        .create(&parent.id, move_to(&session.id, tuesday, t(10, 0), t(11, 0), Some(&far_tutor.id)))
        .await
        .unwrap();

    assert!(workflow.get_available_substitutes(&request.id).await.unwrap().is_empty());
    let err = workflow.approve(&staff.id, &request.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::SchedulingConflict(_)));

    let unchanged = workflow.find_request(&request.id).await.unwrap();
    assert_eq!(unchanged.status, RescheduleStatus::Pending);
    assert_eq!(app.session(&session.id).await.tutor_id, main_tutor.id);
    assert_eq!(app.window(&far_window.id).await.current_bookings, 0);

    // Roughly 10 km away now, inside the contract's radius.
    sqlx::query("UPDATE users SET latitude = ? WHERE id = ?")
        .bind(10.09)
        .bind(&far_tutor.id)
        .execute(&app.pool)
        .await
        .unwrap();

    let candidates = workflow.get_available_substitutes(&request.id).await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].tutor_id, far_tutor.id);
    let distance = candidates[0].distance_km.unwrap();
    assert!((distance - 10.0).abs() < 0.5, "distance was {}", distance);

    let (approved, moved) = workflow.approve(&staff.id, &request.id, None).await.unwrap();
    assert_eq!(approved.status, RescheduleStatus::Approved);
    assert_eq!(moved.tutor_id, far_tutor.id);
    assert_eq!(moved.session_date, tuesday);
    assert_eq!(app.window(&far_window.id).await.current_bookings, 1);
}

#[tokio::test]
async fn test_cancel_session_refunds_and_releases() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let workflow = app.state.reschedule_workflow();

    let pending = workflow
        .create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(10, 0), t(11, 0), None))
        .await
        .unwrap();

    let outcome = workflow.cancel_session_and_refund(&f.session.id).await.unwrap();
    assert_eq!(outcome.session.status, SessionStatus::Cancelled);
    assert_eq!(outcome.refund, RefundOutcome::Completed { reference: format!("refund-{}", f.session.id) });

    assert_eq!(app.wallet.refunds.lock().unwrap().clone(), vec![(f.session.id.clone(), f.contract.session_fee)]);
    assert_eq!(app.window(&f.main_window.id).await.current_bookings, 0);

    let withdrawn = workflow.find_request(&pending.id).await.unwrap();
    assert_eq!(withdrawn.status, RescheduleStatus::Cancelled);

    let err = workflow.cancel_session_and_refund(&f.session.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert_eq!(app.wallet.refunds.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_refund_stays_queued() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let workflow = app.state.reschedule_workflow();
    app.wallet.fail.store(true, Ordering::SeqCst);

    let outcome = workflow.cancel_session_and_refund(&f.session.id).await.unwrap();
    assert_eq!(outcome.session.status, SessionStatus::Cancelled);
    let RefundOutcome::Queued { job_id, reason } = outcome.refund else {
        panic!("refund should have been queued");
    };
    assert!(reason.contains("wallet service unavailable"));

    // The cancellation itself is committed.
    assert_eq!(app.session(&f.session.id).await.status, SessionStatus::Cancelled);
    assert_eq!(app.window(&f.main_window.id).await.current_bookings, 0);

    let job = app.state.job_repo.find_by_id(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, "PENDING");
    assert_eq!(job.attempts, 1);
    assert!(job.execute_at > Utc::now());

    app.wallet.fail.store(false, Ordering::SeqCst);
    sqlx::query("UPDATE jobs SET execute_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::seconds(1))
        .bind(&job_id)
        .execute(&app.pool)
        .await
        .unwrap();

    let deliveries = app.drain_outbox().await;
    assert!(deliveries.iter().any(|d| matches!(d, Delivery::Delivered(Some(_)))));
    assert_eq!(app.wallet.refunds.lock().unwrap().len(), 1);

    let job = app.state.job_repo.find_by_id(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, "COMPLETED");
}

#[tokio::test]
async fn test_notification_failure_does_not_undo_changes() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let workflow = app.state.reschedule_workflow();
    app.notifier.fail.store(true, Ordering::SeqCst);

    let request = workflow
        .create(&f.parent.id, move_to(&f.session.id, f.tuesday, t(10, 0), t(11, 0), None))
        .await
        .unwrap();

    let deliveries = app.drain_outbox().await;
    assert!(!deliveries.is_empty());
    assert!(deliveries.iter().all(|d| matches!(d, Delivery::Retrying(_))));
    assert!(app.notifier.events().is_empty());

    let stored = workflow.find_request(&request.id).await.unwrap();
    assert_eq!(stored.status, RescheduleStatus::Pending);
    assert_eq!(app.pending_jobs().await.len(), deliveries.len());
}
