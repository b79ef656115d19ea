use std::sync::Arc;

use reckoner::gateway::{ports::DecisionStore, types::DecisionOutcome};

use crate::support::{
    baseline_params, debit_note, harness, invoice, record_healthy_iterations,
};

#[tokio::test]
async fn given_non_numeric_amount_when_invoice_then_invalid_amount_rejection() {
    let harness = harness(None, Some(baseline_params()));

    let claim = invoice("cl-1", "agr-1", "abc");
    let decision = harness
        .gateway
        .accept_invoice(&claim)
        .await
        .expect("pipeline should decide");

    assert_eq!(decision.outcome, DecisionOutcome::RejectedInvalidAmount);
    assert!(!decision.settled);
    assert_eq!(harness.settlement.call_count(), 0);
    assert!(!harness.reputation.is_banned(&claim.provider_id));
}

#[tokio::test]
async fn given_negative_amount_when_debit_note_then_invalid_amount_rejection() {
    let harness = harness(None, Some(baseline_params()));

    let decision = harness
        .gateway
        .accept_debit_note(&debit_note("cl-1", "agr-1", "-2.5"))
        .await
        .expect("pipeline should decide");

    assert_eq!(decision.outcome, DecisionOutcome::RejectedInvalidAmount);
    assert_eq!(harness.settlement.call_count(), 0);
}

#[tokio::test]
async fn given_kind_mismatch_when_accept_invoice_then_invalid_input() {
    let harness = harness(None, Some(baseline_params()));

    let err = harness
        .gateway
        .accept_invoice(&debit_note("cl-1", "agr-1", "1.0"))
        .await
        .expect_err("a debit note must not pass the invoice entry point");

    assert_eq!(err.code(), "invalid_input");
}

#[tokio::test]
async fn given_no_successful_iterations_when_debit_note_then_provider_banned() {
    let harness = harness(None, Some(baseline_params()));

    let claim = debit_note("cl-1", "agr-1", "5.0");
    let decision = harness
        .gateway
        .accept_debit_note(&claim)
        .await
        .expect("pipeline should decide");

    assert_eq!(decision.outcome, DecisionOutcome::RejectedAnomaly);
    assert!(harness.reputation.is_banned(&claim.provider_id));
    let banned = harness.reputation.list();
    assert_eq!(banned.len(), 1);
    assert_eq!(banned[0].provider_id, claim.provider_id);
    assert_eq!(banned[0].reason, "failed to deliver work");
    assert_eq!(harness.settlement.call_count(), 0);
}

#[tokio::test]
async fn given_terminated_agreement_when_later_healthy_claim_then_still_rejected() {
    let harness = harness(None, Some(baseline_params()));

    let first = harness
        .gateway
        .accept_debit_note(&debit_note("cl-1", "agr-1", "5.0"))
        .await
        .expect("pipeline should decide");
    assert_eq!(first.outcome, DecisionOutcome::RejectedAnomaly);

    // Delivering work afterwards does not reopen a terminated agreement.
    record_healthy_iterations(&harness, "agr-1", 10).await;
    let second = harness
        .gateway
        .accept_debit_note(&debit_note("cl-2", "agr-1", "5.0"))
        .await
        .expect("pipeline should decide");

    assert_eq!(second.outcome, DecisionOutcome::RejectedAnomaly);
    assert_eq!(harness.reputation.count(), 1);
    assert_eq!(harness.settlement.call_count(), 0);
}

#[tokio::test]
async fn given_unconfigured_params_when_claim_then_anomaly_check_skipped() {
    let harness = harness(None, None);

    let decision = harness
        .gateway
        .accept_debit_note(&debit_note("cl-1", "agr-1", "5.0"))
        .await
        .expect("pipeline should decide");

    assert_eq!(decision.outcome, DecisionOutcome::Accepted);
    assert!(decision.settled);
    assert_eq!(harness.settlement.call_count(), 1);
    assert!(!harness.reputation.is_banned("prov-agr-1"));
}

#[tokio::test]
async fn given_ceiling_when_cumulative_claim_exceeds_then_rejected_budget() {
    let harness = harness(Some(10.0), Some(baseline_params()));
    record_healthy_iterations(&harness, "agr-1", 10).await;

    let over = harness
        .gateway
        .accept_debit_note(&debit_note("cl-1", "agr-1", "12"))
        .await
        .expect("pipeline should decide");
    assert_eq!(over.outcome, DecisionOutcome::RejectedBudget);
    assert_eq!(harness.settlement.call_count(), 0);

    let within = harness
        .gateway
        .accept_debit_note(&debit_note("cl-2", "agr-1", "8"))
        .await
        .expect("pipeline should decide");
    assert_eq!(within.outcome, DecisionOutcome::Accepted);
    assert!(within.settled);
    assert_eq!(harness.settlement.call_count(), 1);
}

#[tokio::test]
async fn given_decreasing_cumulative_claim_then_rejected_budget() {
    let harness = harness(None, Some(baseline_params()));
    record_healthy_iterations(&harness, "agr-1", 10).await;

    let first = harness
        .gateway
        .accept_debit_note(&debit_note("cl-1", "agr-1", "9"))
        .await
        .expect("pipeline should decide");
    assert_eq!(first.outcome, DecisionOutcome::Accepted);

    let decreased = harness
        .gateway
        .accept_debit_note(&debit_note("cl-2", "agr-1", "6"))
        .await
        .expect("pipeline should decide");
    assert_eq!(decreased.outcome, DecisionOutcome::RejectedBudget);
    assert!(
        decreased
            .reason
            .as_deref()
            .expect("rejection should carry a reason")
            .contains("decreased")
    );

    // The rejected claim must not have moved the cumulative amount.
    let resumed = harness
        .gateway
        .accept_debit_note(&debit_note("cl-3", "agr-1", "9.5"))
        .await
        .expect("pipeline should decide");
    assert_eq!(resumed.outcome, DecisionOutcome::Accepted);
    assert_eq!(harness.settlement.call_count(), 2);
}

#[tokio::test]
async fn given_settled_claim_when_replayed_then_recorded_decision_returned() {
    let harness = harness(None, None);

    let claim = debit_note("cl-1", "agr-1", "5.0");
    let first = harness
        .gateway
        .accept_debit_note(&claim)
        .await
        .expect("pipeline should decide");
    assert!(first.settled);
    assert_eq!(harness.settlement.call_count(), 1);

    let replayed = harness
        .gateway
        .accept_debit_note(&claim)
        .await
        .expect("pipeline should decide");
    assert_eq!(replayed.outcome, DecisionOutcome::Accepted);
    assert!(replayed.settled);
    assert_eq!(harness.settlement.call_count(), 1);

    let snapshot = harness.ledger.status_snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].cumulative_claimed, 5.0);
}

#[tokio::test]
async fn given_accepted_but_unsettled_claim_when_replayed_then_settlement_retried() {
    let harness = harness(None, None);
    harness.settlement.set_failing(true);

    let claim = debit_note("cl-1", "agr-1", "5.0");
    let err = harness
        .gateway
        .accept_debit_note(&claim)
        .await
        .expect_err("settlement outage should surface");
    assert_eq!(err.code(), "settlement_failure");

    let recorded = harness
        .decisions
        .find("cl-1")
        .expect("accepted decision should be durable before settlement");
    assert_eq!(recorded.outcome, DecisionOutcome::Accepted);
    assert!(!recorded.settled);

    harness.settlement.set_failing(false);
    let retried = harness
        .gateway
        .accept_debit_note(&claim)
        .await
        .expect("replay should settle");
    assert!(retried.settled);
    assert_eq!(harness.settlement.call_count(), 1);

    // The retry must not have re-run the budget gate.
    let snapshot = harness.ledger.status_snapshot().await;
    assert_eq!(snapshot[0].cumulative_claimed, 5.0);
}

#[tokio::test]
async fn given_params_configured_later_then_kill_switch_activates() {
    let harness = harness(None, None);

    let before = harness
        .gateway
        .accept_debit_note(&debit_note("cl-1", "agr-1", "5.0"))
        .await
        .expect("pipeline should decide");
    assert_eq!(before.outcome, DecisionOutcome::Accepted);

    harness.params.set(baseline_params());
    let after = harness
        .gateway
        .accept_debit_note(&debit_note("cl-2", "agr-1", "6.0"))
        .await
        .expect("pipeline should decide");

    assert_eq!(after.outcome, DecisionOutcome::RejectedAnomaly);
    assert!(harness.reputation.is_banned("prov-agr-1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_concurrent_duplicate_claims_then_exactly_one_settlement() {
    let harness = harness(None, None);

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let gateway = Arc::clone(&harness.gateway);
        tasks.push(tokio::spawn(async move {
            gateway
                .accept_debit_note(&debit_note("cl-dup", "agr-1", "5.0"))
                .await
        }));
    }
    for task in tasks {
        let decision = task
            .await
            .expect("task should not panic")
            .expect("pipeline should decide");
        assert_eq!(decision.outcome, DecisionOutcome::Accepted);
        assert!(decision.settled);
    }

    assert_eq!(harness.settlement.call_count(), 1);
    let snapshot = harness.ledger.status_snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].cumulative_claimed, 5.0);
}

#[tokio::test]
async fn given_concurrent_claims_then_cumulative_amount_is_monotonic() {
    let harness = harness(None, None);

    let mut tasks = Vec::new();
    for step in 1..=20u32 {
        let gateway = Arc::clone(&harness.gateway);
        tasks.push(tokio::spawn(async move {
            let claim = debit_note(&format!("cl-{step}"), "agr-1", &format!("{step}"));
            gateway.accept_debit_note(&claim).await
        }));
    }
    for task in tasks {
        task.await
            .expect("task should not panic")
            .expect("pipeline should decide");
    }

    // Whatever the interleaving, the highest cumulative claim wins and the
    // recorded amount never goes backwards.
    let snapshot = harness.ledger.status_snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].cumulative_claimed, 20.0);
}
