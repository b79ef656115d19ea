use serde::{Deserialize, Serialize};

use crate::ledger::types::IterationStatus;

/// One NDJSON request line on the admin socket. Unknown `type` values are
/// rejected; extra fields on a known message are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminRequest {
    GetParams,
    SetParams {
        minimum_speed: f64,
        minimum_efficiency: f64,
        single_pass_seconds: f64,
    },
    BannedProviders,
    ResetBannedProviders,
    Status,
    IterationReport {
        agreement_id: String,
        provider_id: String,
        provider_name: String,
        iteration_no: u64,
        duration_sec: f64,
        status: IterationStatus,
    },
    Invoice {
        claim_id: String,
        agreement_id: String,
        provider_id: String,
        provider_name: String,
        amount: String,
    },
    DebitNote {
        claim_id: String,
        agreement_id: String,
        provider_id: String,
        provider_name: String,
        amount: String,
    },
    Exit,
}

/// One NDJSON response line. Errors carry a machine-readable code so the
/// operator layer can distinguish bad input from "not configured" from
/// server faults.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AdminResponse {
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error {
        code: String,
        message: String,
    },
}

impl AdminResponse {
    pub fn ok_data(data: serde_json::Value) -> Self {
        Self::Ok {
            data: Some(data),
            message: None,
        }
    }

    pub fn ok_message(message: impl Into<String>) -> Self {
        Self::Ok {
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

pub fn parse_admin_request(line: &str) -> Result<AdminRequest, serde_json::Error> {
    serde_json::from_str(line)
}
