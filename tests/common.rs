#![allow(dead_code)]

use tutoring_backend::{
    state::AppState,
    config::Config,
    infra::repositories::{
        sqlite_availability_repo::SqliteAvailabilityRepo,
        sqlite_contract_repo::SqliteContractRepo,
        sqlite_job_repo::SqliteJobRepo,
        sqlite_reschedule_repo::SqliteRescheduleRepo,
        sqlite_session_repo::SqliteSessionRepo,
        sqlite_user_repo::SqliteUserRepo,
    },
    domain::models::{
        availability::{AvailabilityWindow, NewAvailabilityParams},
        contract::{Contract, NewContractParams},
        job::{Job, NotificationEvent},
        session::SessionInstance,
        user::{User, UserRole},
        weekday::WeekdaySet,
    },
    domain::ports::{
        AvailabilityRepository, JobRepository, NotificationService, PaymentService, RefundReceipt,
        SessionRepository, TutorDirectory,
    },
    domain::services::{distance::GeoPoint, outbox::Delivery},
    error::AppError,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions}, Pool, Sqlite};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::str::FromStr;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde_json::Value;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Default)]
pub struct MockNotificationService {
    pub sent: Mutex<Vec<(NotificationEvent, Value)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl NotificationService for MockNotificationService {
    async fn notify(&self, event: NotificationEvent, payload: &Value) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Collaborator("notification service unavailable".into()));
        }
        self.sent.lock().unwrap().push((event, payload.clone()));
        Ok(())
    }
}

impl MockNotificationService {
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.sent.lock().unwrap().iter().map(|(e, _)| *e).collect()
    }
}

#[derive(Default)]
pub struct MockWalletService {
    pub refunds: Mutex<Vec<(String, i64)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl PaymentService for MockWalletService {
    async fn refund(&self, _contract_id: &str, session_id: &str, amount: i64) -> Result<RefundReceipt, AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Collaborator("wallet service unavailable".into()));
        }
        self.refunds.lock().unwrap().push((session_id.to_string(), amount));
        Ok(RefundReceipt { reference: format!("refund-{}", session_id) })
    }
}

pub struct TestApp {
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub notifier: Arc<MockNotificationService>,
    pub wallet: Arc<MockWalletService>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = test_config(db_url.clone());

        let notifier = Arc::new(MockNotificationService::default());
        let wallet = Arc::new(MockWalletService::default());

        let state = Arc::new(AppState {
            config,
            availability_repo: Arc::new(SqliteAvailabilityRepo::new(pool.clone())),
            session_repo: Arc::new(SqliteSessionRepo::new(pool.clone())),
            contract_repo: Arc::new(SqliteContractRepo::new(pool.clone())),
            reschedule_repo: Arc::new(SqliteRescheduleRepo::new(pool.clone())),
            tutor_directory: Arc::new(SqliteUserRepo::new(pool.clone())),
            job_repo: Arc::new(SqliteJobRepo::new(pool.clone())),
            notification_service: notifier.clone(),
            payment_service: wallet.clone(),
        });

        Self {
            pool,
            db_filename,
            state,
            notifier,
            wallet,
        }
    }

    pub async fn seed_user(&self, name: &str, role: UserRole) -> User {
        let user = User::new(name.to_string(), role);
        self.state.tutor_directory.create(&user).await.unwrap()
    }

    pub async fn seed_tutor(&self, name: &str, rating: Option<f64>, location: Option<(f64, f64)>) -> User {
        let mut user = User::new(name.to_string(), UserRole::Tutor);
        user.rating = rating;
        user.latitude = location.map(|l| l.0);
        user.longitude = location.map(|l| l.1);
        user.subjects = Json(vec!["Math".to_string()]);
        self.state.tutor_directory.create(&user).await.unwrap()
    }

    /// Open-ended window, valid from today, both teaching modes.
    pub async fn seed_window(&self, tutor_id: &str, days: &[Weekday], start: NaiveTime, end: NaiveTime, max: i32) -> AvailabilityWindow {
        self.state.availability_catalog().create_window(NewAvailabilityParams {
            tutor_id: tutor_id.to_string(),
            weekdays: WeekdaySet::encode(days.iter().copied()).unwrap(),
            start_time: start,
            end_time: end,
            effective_from: Utc::now().date_naive(),
            effective_until: None,
            can_teach_online: true,
            can_teach_offline: true,
            max_concurrent_bookings: max,
        }).await.unwrap()
    }

    pub async fn window(&self, id: &str) -> AvailabilityWindow {
        self.state.availability_repo.find_by_id(id).await.unwrap().unwrap()
    }

    pub async fn session(&self, id: &str) -> SessionInstance {
        self.state.session_repo.find_by_id(id).await.unwrap().unwrap()
    }

    /// Online contract for `tutor_id` covering `[start_date, end_date]`.
    pub async fn schedule(
        &self,
        parent_id: &str,
        tutor_id: &str,
        days: &[Weekday],
        start: NaiveTime,
        end: NaiveTime,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<(Contract, Vec<SessionInstance>), AppError> {
        self.state.schedule_generator().schedule_contract(contract_params(parent_id, tutor_id, days, start, end, start_date, end_date)).await
    }

    pub async fn pending_jobs(&self) -> Vec<Job> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE status = 'PENDING' ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .unwrap()
    }

    /// Runs every due outbox job once, the way the background worker would.
    pub async fn drain_outbox(&self) -> Vec<Delivery> {
        let outbox = self.state.outbox();
        let jobs = outbox.claim_due(100).await.unwrap();
        let mut results = Vec::new();
        for job in jobs {
            results.push(outbox.run(&job).await.unwrap());
        }
        results
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

pub fn test_config(database_url: String) -> Config {
    Config {
        database_url,
        notification_service_url: "http://localhost".to_string(),
        notification_service_token: "token".to_string(),
        wallet_service_url: "http://localhost".to_string(),
        wallet_service_token: "token".to_string(),
        collaborator_timeout: Duration::from_secs(2),
        database_acquire_timeout: Duration::from_secs(5),
        database_busy_timeout: Duration::from_secs(10),
        outbox_poll_interval: Duration::from_millis(50),
        outbox_max_attempts: 3,
        outbox_lease: Duration::from_secs(60),
    }
}

pub fn contract_params(
    parent_id: &str,
    tutor_id: &str,
    days: &[Weekday],
    start: NaiveTime,
    end: NaiveTime,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> NewContractParams {
    NewContractParams {
        parent_id: parent_id.to_string(),
        child_id: format!("child-of-{}", parent_id),
        main_tutor_id: tutor_id.to_string(),
        substitute_tutor_ids: Vec::new(),
        weekdays: WeekdaySet::encode(days.iter().copied()).unwrap(),
        start_time: start,
        end_time: end,
        start_date,
        end_date,
        is_online: true,
        offline_address: None,
        offline_location: None,
        max_distance_km: 10.0,
        session_fee: 150_000,
    }
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// First `weekday` at least a week from today.
pub fn upcoming(weekday: Weekday) -> NaiveDate {
    let mut date = Utc::now().date_naive() + chrono::Duration::days(7);
    while date.weekday() != weekday {
        date = date.succ_opt().unwrap();
    }
    date
}

pub fn point(latitude: f64, longitude: f64) -> GeoPoint {
    GeoPoint::new(latitude, longitude).unwrap()
}
