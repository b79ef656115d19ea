use serde::{Deserialize, Serialize};

/// Live acceptance thresholds. Replaced wholesale on update; absence means the
/// operator has never configured a baseline, which is distinct from any
/// zero-valued configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicParams {
    pub minimum_accepted_speed: f64,
    pub minimum_accepted_efficiency: f64,
    pub single_pass_seconds: u64,
}
