use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use crate::state::AppState;

/// Polls the outbox and delivers due notification and refund jobs.
pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting outbox worker...");

    let outbox = state.outbox();
    let poll_interval = state.config.outbox_poll_interval;

    loop {
        match outbox.claim_due(10).await {
            Ok(jobs) => {
                for job in jobs {
                    let span = info_span!(
                        "outbox_job",
                        job_id = %job.id,
                        job_type = %job.job_type,
                        contract_id = %job.payload.contract_id
                    );

                    async {
                        info!("Processing job (attempt {})", job.attempts + 1);
                        if let Err(e) = outbox.run(&job).await {
                            error!("Failed to record job outcome: {:?}", e);
                        }
                    }
                        .instrument(span)
                        .await;
                }
            }
            Err(e) => error!("Failed to fetch pending jobs: {:?}", e),
        }
        sleep(poll_interval).await;
    }
}
