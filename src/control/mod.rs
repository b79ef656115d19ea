use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    gateway::error::{ReconcileError, invalid_input, not_configured},
    ledger::{AgreementLedger, ProviderAgreement},
    params::{DynamicParams, ParamStore},
    reputation::{ReputationEntry, ReputationStore, ResetOutcome},
};

/// Operator-facing update body. All fields are required and numeric; the
/// merge into the current baseline only touches speed and efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DynamicParamsUpdate {
    pub minimum_speed: f64,
    pub minimum_efficiency: f64,
    pub single_pass_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BannedProvidersView {
    pub banned_providers: Vec<ReputationEntry>,
    pub count: usize,
}

/// Synchronous, single-shot operator operations over the live stores. There
/// is no caching layer: an effect is visible to the next read.
pub struct ControlSurface {
    params: Arc<ParamStore>,
    reputation: Arc<ReputationStore>,
    ledger: Arc<AgreementLedger>,
}

impl ControlSurface {
    pub fn new(
        params: Arc<ParamStore>,
        reputation: Arc<ReputationStore>,
        ledger: Arc<AgreementLedger>,
    ) -> Self {
        Self {
            params,
            reputation,
            ledger,
        }
    }

    pub fn dynamic_params(&self) -> Result<DynamicParams, ReconcileError> {
        self.params
            .get()
            .map(|snapshot| (*snapshot).clone())
            .ok_or_else(|| not_configured("dynamic parameters not set"))
    }

    /// Merges the update into the current baseline and applies it. Fails with
    /// a distinct "not configured" condition when no baseline exists, and
    /// rejects non-finite or negative values before touching the store.
    pub fn set_dynamic_params(
        &self,
        update: DynamicParamsUpdate,
    ) -> Result<DynamicParams, ReconcileError> {
        for (field, value) in [
            ("minimum_speed", update.minimum_speed),
            ("minimum_efficiency", update.minimum_efficiency),
            ("single_pass_seconds", update.single_pass_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid_input(format!(
                    "{field} must be a non-negative number, got {value}"
                )));
            }
        }

        let baseline = self
            .params
            .get()
            .ok_or_else(|| not_configured("dynamic parameters not set"))?;

        let merged = DynamicParams {
            minimum_accepted_speed: update.minimum_speed,
            minimum_accepted_efficiency: update.minimum_efficiency,
            single_pass_seconds: baseline.single_pass_seconds,
        };
        self.params.set(merged.clone());
        Ok(merged)
    }

    pub fn banned_providers(&self) -> BannedProvidersView {
        let banned_providers = self.reputation.list();
        let count = banned_providers.len();
        BannedProvidersView {
            banned_providers,
            count,
        }
    }

    pub fn reset_banned_providers(&self) -> Result<ResetOutcome, ReconcileError> {
        self.reputation.reset()
    }

    pub async fn status(&self) -> Vec<ProviderAgreement> {
        self.ledger.status_snapshot().await
    }
}
