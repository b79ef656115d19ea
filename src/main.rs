use std::sync::Arc;

use anyhow::{Context, Result};

use reckoner::{
    cli::config_path_from_args,
    config::Config,
    control::ControlSurface,
    gateway::{
        HttpSettlement, PaymentGateway,
        telemetry::{NoopMetricsSink, PaymentMetricsSink},
    },
    ledger::AgreementLedger,
    logging::init_tracing,
    observability::{MetricsRuntime, OtelMetricsSink},
    params::ParamStore,
    persistence::{JsonlBanTable, JsonlDecisionLog},
    reputation::ReputationStore,
    server,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let logging_guard = init_tracing(&config.logging)?;
    tracing::info!(
        target: "main",
        run_id = logging_guard.run_id(),
        config = %config_path.display(),
        "reckoner starting"
    );

    let metrics_runtime = if config.metrics.enabled {
        Some(MetricsRuntime::install(&config.metrics).context("failed to install metrics")?)
    } else {
        None
    };
    let metrics: Arc<dyn PaymentMetricsSink> = if config.metrics.enabled {
        Arc::new(OtelMetricsSink::from_global())
    } else {
        Arc::new(NoopMetricsSink)
    };

    let decision_log = Arc::new(
        JsonlDecisionLog::open(config.persistence.decision_log_path.clone())
            .context("failed to open decision log")?,
    );
    tracing::info!(
        target: "main",
        decided_claims = decision_log.decided_count(),
        "decision log recovered"
    );

    let ban_table = Arc::new(JsonlBanTable::open(config.persistence.ban_table_path.clone()));
    let reputation = Arc::new(
        ReputationStore::recover(ban_table).context("failed to recover reputation store")?,
    );
    tracing::info!(
        target: "main",
        banned_providers = reputation.count(),
        "reputation store recovered"
    );

    let params = Arc::new(ParamStore::new(config.initial_params.clone()));
    let ledger = Arc::new(AgreementLedger::new(config.gateway.agreement_budget_ceiling));
    let settlement = Arc::new(
        HttpSettlement::new(&config.settlement).context("failed to build settlement delegate")?,
    );

    let gateway = Arc::new(PaymentGateway::new(
        Arc::clone(&ledger),
        Arc::clone(&reputation),
        Arc::clone(&params),
        settlement,
        decision_log,
        metrics,
    ));
    let control = Arc::new(ControlSurface::new(params, reputation, ledger));

    let result = server::run(&config.control.socket_path, control, gateway).await;

    if let Some(runtime) = metrics_runtime {
        runtime.shutdown();
    }
    result
}
