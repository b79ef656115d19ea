use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::{
    config::SettlementConfig,
    gateway::{
        error::{ReconcileError, internal_error, settlement_failure},
        ports::SettlementPort,
        types::BillingClaim,
    },
};

/// Settlement delegate talking to the marketplace daemon's REST API. A
/// non-success response or a transport failure surfaces as a settlement
/// error; the recorded decision is not rolled back.
pub struct HttpSettlement {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSettlement {
    pub fn new(config: &SettlementConfig) -> Result<Self, ReconcileError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|err| internal_error(format!("failed to build settlement client: {err}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn accept(&self, path: &str, claim: &BillingClaim) -> Result<(), ReconcileError> {
        let url = format!("{}/{}/{}/accept", self.base_url, path, claim.claim_id);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "total_amount_accepted": claim.amount }))
            .send()
            .await
            .map_err(|err| {
                settlement_failure(format!(
                    "settlement call for claim {} failed: {err}",
                    claim.claim_id
                ))
            })?;

        if !response.status().is_success() {
            return Err(settlement_failure(format!(
                "settlement for claim {} returned status {}",
                claim.claim_id,
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SettlementPort for HttpSettlement {
    async fn settle_invoice(&self, claim: &BillingClaim) -> Result<(), ReconcileError> {
        self.accept("invoices", claim).await
    }

    async fn settle_debit_note(&self, claim: &BillingClaim) -> Result<(), ReconcileError> {
        self.accept("debit-notes", claim).await
    }
}
