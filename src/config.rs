use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::DynamicParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub control: ControlRuntimeConfig,
    #[serde(default)]
    pub gateway: GatewayRuntimeConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Baseline thresholds at startup. Absent means "not configured": the
    /// anomaly check is skipped until an operator sets a baseline.
    #[serde(default)]
    pub initial_params: Option<DynamicParams>,
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("reckoner.sock")
}

fn default_decision_log_path() -> PathBuf {
    PathBuf::from("./state/decisions.jsonl")
}

fn default_ban_table_path() -> PathBuf {
    PathBuf::from("./state/bans.jsonl")
}

fn default_settlement_base_url() -> String {
    String::from("http://127.0.0.1:7465/payment-api/v1")
}

fn default_settlement_timeout_ms() -> u64 {
    30_000
}

fn default_otlp_endpoint() -> String {
    String::from("http://127.0.0.1:4317")
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/reckoner")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

fn default_enabled_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRuntimeConfig {
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
}

impl Default for ControlRuntimeConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayRuntimeConfig {
    /// Hard ceiling on the cumulative claimed amount per agreement. Absent
    /// means the budget gate only enforces monotonicity.
    #[serde(default)]
    pub agreement_budget_ceiling: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_decision_log_path")]
    pub decision_log_path: PathBuf,
    #[serde(default = "default_ban_table_path")]
    pub ban_table_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            decision_log_path: default_decision_log_path(),
            ban_table_path: default_ban_table_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    #[serde(default = "default_settlement_base_url")]
    pub base_url: String,
    #[serde(default = "default_settlement_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            base_url: default_settlement_base_url(),
            request_timeout_ms: default_settlement_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: default_otlp_endpoint(),
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize config")?;

        if !config.control.socket_path.is_absolute() {
            config.control.socket_path = config_base.join(&config.control.socket_path);
        }
        if !config.persistence.decision_log_path.is_absolute() {
            config.persistence.decision_log_path =
                config_base.join(&config.persistence.decision_log_path);
        }
        if !config.persistence.ban_table_path.is_absolute() {
            config.persistence.ban_table_path =
                config_base.join(&config.persistence.ban_table_path);
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join("reckoner.schema.json");
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or reckoner.schema.json"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
