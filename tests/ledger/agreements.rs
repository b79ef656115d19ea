use reckoner::{
    ledger::{AgreementLedger, AgreementPhase, IterationReport, IterationStatus},
    params::DynamicParams,
};

fn params() -> DynamicParams {
    DynamicParams {
        minimum_accepted_speed: 10.0,
        minimum_accepted_efficiency: 0.5,
        single_pass_seconds: 20,
    }
}

fn report(agreement_id: &str, iteration_no: u64, duration_sec: f64, status: IterationStatus) -> IterationReport {
    IterationReport {
        agreement_id: agreement_id.to_string(),
        provider_id: "prov-1".to_string(),
        provider_name: "provider one".to_string(),
        iteration_no,
        duration_sec,
        status,
    }
}

#[tokio::test]
async fn given_recorded_iterations_then_snapshot_reflects_totals() {
    let ledger = AgreementLedger::new(None);
    ledger
        .record_iteration(&report("agr-1", 1, 21.0, IterationStatus::Completed))
        .await;
    ledger
        .record_iteration(&report("agr-1", 2, 19.5, IterationStatus::Failed))
        .await;
    ledger
        .record_iteration(&report("agr-1", 3, 20.5, IterationStatus::Completed))
        .await;

    let snapshot = ledger.status_snapshot().await;
    assert_eq!(snapshot.len(), 1);
    let agreement = &snapshot[0];
    assert_eq!(agreement.iteration_count, 3);
    assert_eq!(agreement.successful_iterations, 2);
    assert_eq!(agreement.cumulative_duration_sec, 61.0);
    assert_eq!(agreement.last_iteration_status, Some(IterationStatus::Completed));
    assert_eq!(agreement.phase, AgreementPhase::Active);
}

#[tokio::test]
async fn given_invalid_durations_then_wall_clock_is_untouched() {
    let ledger = AgreementLedger::new(None);
    ledger
        .record_iteration(&report("agr-1", 1, f64::NAN, IterationStatus::Completed))
        .await;
    ledger
        .record_iteration(&report("agr-1", 2, -4.0, IterationStatus::Completed))
        .await;

    let snapshot = ledger.status_snapshot().await;
    assert_eq!(snapshot[0].cumulative_duration_sec, 0.0);
    assert_eq!(snapshot[0].iteration_count, 2);
}

#[tokio::test]
async fn given_anomalous_claim_then_agreement_stays_terminated() {
    let ledger = AgreementLedger::new(None);
    let params = params();

    let mut lease = ledger.lease("agr-1", "prov-1", "provider one").await;
    assert!(ledger.check_anomalous(&mut lease, 5.0, Some(&params)));
    drop(lease);

    // Healthy work afterwards does not revive the agreement.
    for iteration_no in 1..=10 {
        ledger
            .record_iteration(&report("agr-1", iteration_no, 21.0, IterationStatus::Completed))
            .await;
    }
    let mut lease = ledger.lease("agr-1", "prov-1", "provider one").await;
    assert!(ledger.check_anomalous(&mut lease, 5.0, Some(&params)));
    assert!(!ledger.report_cost(&mut lease, 5.0).accepted);
}

#[tokio::test]
async fn given_no_params_then_anomaly_check_passes_through() {
    let ledger = AgreementLedger::new(None);
    let mut lease = ledger.lease("agr-1", "prov-1", "provider one").await;

    assert!(!ledger.check_anomalous(&mut lease, 5.0, None));
    assert_eq!(lease.agreement().phase, AgreementPhase::Active);
}

#[tokio::test]
async fn given_accepted_claims_then_cumulative_tracks_latest_amount() {
    let ledger = AgreementLedger::new(None);
    let mut lease = ledger.lease("agr-1", "prov-1", "provider one").await;

    assert!(ledger.report_cost(&mut lease, 3.0).accepted);
    assert!(ledger.report_cost(&mut lease, 7.5).accepted);
    assert_eq!(lease.agreement().cumulative_claimed, 7.5);

    let decreased = ledger.report_cost(&mut lease, 4.0);
    assert!(!decreased.accepted);
    assert_eq!(lease.agreement().cumulative_claimed, 7.5);
}

#[tokio::test]
async fn given_budget_ceiling_then_claims_above_it_are_rejected() {
    let ledger = AgreementLedger::new(Some(10.0));
    let mut lease = ledger.lease("agr-1", "prov-1", "provider one").await;

    assert!(ledger.report_cost(&mut lease, 10.0).accepted);
    let over = ledger.report_cost(&mut lease, 10.5);
    assert!(!over.accepted);
    assert!(
        over.reason
            .as_deref()
            .expect("rejection should carry a reason")
            .contains("ceiling")
    );
    assert_eq!(lease.agreement().cumulative_claimed, 10.0);
}

#[tokio::test]
async fn given_multiple_agreements_then_snapshot_is_sorted_by_id() {
    let ledger = AgreementLedger::new(None);
    for agreement_id in ["agr-c", "agr-a", "agr-b"] {
        drop(ledger.lease(agreement_id, "prov-1", "provider one").await);
    }

    let snapshot = ledger.status_snapshot().await;
    let ids: Vec<&str> = snapshot.iter().map(|a| a.agreement_id.as_str()).collect();
    assert_eq!(ids, vec!["agr-a", "agr-b", "agr-c"]);
}
