use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{error, info, warn};

use crate::domain::models::job::{Job, JOB_NOTIFY, JOB_REFUND};
use crate::domain::ports::{JobRepository, NotificationService, PaymentService, RefundReceipt};
use crate::error::AppError;

/// Result of delivering one job.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Delivered(Option<RefundReceipt>),
    /// Left for a later attempt.
    Retrying(String),
    /// Attempts exhausted.
    Failed(String),
}

/// Delivers outbox jobs to the notification and wallet collaborators.
#[derive(Clone)]
pub struct OutboxDispatcher {
    job_repo: Arc<dyn JobRepository>,
    notifier: Arc<dyn NotificationService>,
    wallet: Arc<dyn PaymentService>,
    timeout: Duration,
    max_attempts: i32,
    lease: Duration,
}

impl OutboxDispatcher {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        notifier: Arc<dyn NotificationService>,
        wallet: Arc<dyn PaymentService>,
        timeout: Duration,
        max_attempts: i32,
        lease: Duration,
    ) -> Self {
        Self { job_repo, notifier, wallet, timeout, max_attempts, lease }
    }

    fn lease_until(&self) -> Result<DateTime<Utc>, AppError> {
        let lease = chrono::Duration::from_std(self.lease)
            .map_err(|e| AppError::Internal(format!("Invalid outbox lease: {}", e)))?;
        Ok(Utc::now() + lease)
    }

    /// Claims up to `limit` due jobs, including ones whose earlier claim was
    /// abandoned and whose lease has run out.
    pub async fn claim_due(&self, limit: i32) -> Result<Vec<Job>, AppError> {
        self.job_repo.find_pending(limit, self.lease_until()?).await
    }

    /// Claims and delivers a single job right away. Returns None when the
    /// job is already held by another worker.
    pub async fn dispatch_now(&self, job_id: &str) -> Result<Option<Delivery>, AppError> {
        match self.job_repo.claim(job_id, self.lease_until()?).await? {
            Some(job) => Ok(Some(self.run(&job).await?)),
            None => Ok(None),
        }
    }

    /// Delivers an already-claimed job and records the outcome.
    pub async fn run(&self, job: &Job) -> Result<Delivery, AppError> {
        match self.deliver(job).await {
            Ok(receipt) => {
                self.job_repo.update_status(&job.id, "COMPLETED", None).await?;
                info!("Job {} ({}) delivered", job.id, job.job_type);
                Ok(Delivery::Delivered(receipt))
            }
            Err(e) => {
                let err_msg = e.to_string();
                let attempts = job.attempts + 1;
                if attempts >= self.max_attempts {
                    error!("Job {} failed permanently after {} attempts: {}", job.id, attempts, err_msg);
                    self.job_repo.update_status(&job.id, "FAILED", Some(err_msg.clone())).await?;
                    Ok(Delivery::Failed(err_msg))
                } else {
                    let retry_at = Utc::now() + chrono::Duration::seconds(30 * attempts as i64);
                    warn!("Job {} failed (attempt {}), retrying at {}: {}", job.id, attempts, retry_at, err_msg);
                    self.job_repo.retry_later(&job.id, retry_at, err_msg.clone()).await?;
                    Ok(Delivery::Retrying(err_msg))
                }
            }
        }
    }

    async fn deliver(&self, job: &Job) -> Result<Option<RefundReceipt>, AppError> {
        let payload = &job.payload.0;

        match job.job_type.as_str() {
            JOB_NOTIFY => {
                let event = payload.event
                    .ok_or(AppError::Internal(format!("Notify job {} has no event", job.id)))?;
                let body = json!({
                    "contract_id": payload.contract_id,
                    "session_id": payload.session_id,
                    "request_id": payload.request_id,
                });
                self.with_timeout("notification", self.notifier.notify(event, &body)).await?;
                Ok(None)
            }
            JOB_REFUND => {
                let session_id = payload.session_id.as_deref()
                    .ok_or(AppError::Internal(format!("Refund job {} has no session", job.id)))?;
                let amount = payload.amount
                    .ok_or(AppError::Internal(format!("Refund job {} has no amount", job.id)))?;
                let receipt = self.with_timeout("refund", self.wallet.refund(&payload.contract_id, session_id, amount)).await?;
                Ok(Some(receipt))
            }
            other => Err(AppError::Internal(format!("Unknown job type {}", other))),
        }
    }

    async fn with_timeout<T, F>(&self, what: &str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| AppError::Timeout(format!("{} call exceeded {:?}", what, self.timeout)))?
    }
}
