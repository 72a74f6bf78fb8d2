use crate::domain::ports::{PaymentService, RefundReceipt};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

/// Wallet collaborator reached over HTTP. Gateway signatures and settlement
/// stay on the wallet side; this adapter only submits refund instructions.
pub struct HttpWalletService {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpWalletService {
    pub fn new(api_url: String, api_key: String, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build wallet client: {}", e)))?;
        Ok(Self { client, api_url, api_key })
    }
}

#[derive(Serialize)]
struct RefundPayload<'a> {
    contract_id: &'a str,
    session_id: &'a str,
    amount: i64,
    // Lets the wallet drop duplicate instructions for the same session.
    idempotency_key: String,
}

#[async_trait]
impl PaymentService for HttpWalletService {
    async fn refund(&self, contract_id: &str, session_id: &str, amount: i64) -> Result<RefundReceipt, AppError> {
        let payload = RefundPayload {
            contract_id,
            session_id,
            amount,
            idempotency_key: format!("refund:{}", session_id),
        };

        let res = self.client.post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Wallet service connection error: {}", e);
                error!("{}", msg);
                if e.is_timeout() { AppError::Timeout(msg) } else { AppError::Collaborator(msg) }
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Wallet service failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::Collaborator(msg));
        }

        let receipt = res.json::<RefundReceipt>().await
            .map_err(|e| AppError::Collaborator(format!("Wallet service returned an unreadable receipt: {}", e)))?;
        info!("Refund of {} for session {} accepted ({})", amount, session_id, receipt.reference);
        Ok(receipt)
    }
}
