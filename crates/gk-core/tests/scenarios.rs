//! End-to-end approval scenarios driven through the public API, one redraw
//! at a time.

use std::sync::Arc;

use gk_core::testing::ActionCounter;
use gk_core::{
    ApprovalGate, ApprovalId, ApprovalStatus, ApprovalStore, Decision, Error, RerunReconciler,
    Resolution,
};

struct Harness {
    gate: ApprovalGate,
    reconciler: RerunReconciler,
    counter: ActionCounter,
}

impl Harness {
    fn new(enabled: bool) -> Self {
        let gate = ApprovalGate::new(Arc::new(ApprovalStore::new()), enabled);
        Self {
            reconciler: RerunReconciler::new(gate.clone()),
            gate,
            counter: ActionCounter::new(),
        }
    }

    fn store(&self) -> &ApprovalStore {
        self.gate.store()
    }

    fn status(&self, id: u64) -> ApprovalStatus {
        self.store().get(ApprovalId::new(id)).unwrap().status
    }
}

#[test]
fn approving_one_of_three_leaves_the_others_pending() {
    let mut h = Harness::new(true);
    for expr in ["1 + 1", "2 + 2", "3 + 3"] {
        h.gate.request(format!("Calculate: {}", expr), h.counter.action(Ok("ok")));
    }

    assert!(h.reconciler.should_show_approvals());
    let panel = h.reconciler.redraw();
    assert_eq!(panel.pending.len(), 3);

    h.reconciler.approve(ApprovalId::new(1));

    assert_eq!(h.status(0), ApprovalStatus::Pending);
    assert_eq!(h.status(1), ApprovalStatus::Executed);
    assert_eq!(h.status(2), ApprovalStatus::Pending);
    assert_eq!(h.counter.count(), 1);
}

#[test]
fn disabled_gate_returns_result_and_creates_nothing() {
    let h = Harness::new(false);
    let out = h.gate.request("x", h.counter.action(Ok("Calculation result: 4")));

    assert_eq!(out, "Calculation result: 4");
    assert!(h.store().is_empty());
    assert_eq!(h.counter.count(), 1);
}

#[test]
fn denied_request_never_executes_and_is_cleared() {
    let mut h = Harness::new(true);
    h.gate.request("File write: a.txt", h.counter.action(Ok("written")));

    h.reconciler.deny(ApprovalId::new(0));
    for _ in 0..3 {
        h.reconciler.redraw();
        h.reconciler.approve(ApprovalId::new(0));
    }

    assert_eq!(h.counter.count(), 0);
    assert_eq!(h.status(0), ApprovalStatus::Denied);
    assert!(h.store().mark_executed(ApprovalId::new(0), "x").is_err());
    assert_eq!(h.store().clear_processed(), 1);
    assert!(h.store().is_empty());
}

#[test]
fn failing_action_ends_in_error_and_is_cleared() {
    let mut h = Harness::new(true);
    h.gate.request("File read: gone.txt", h.counter.action(Err("no such file")));

    let report = h.reconciler.approve(ApprovalId::new(0));

    assert_eq!(
        report.resolutions,
        vec![Resolution::Failed {
            id: ApprovalId::new(0),
            error: "no such file".to_string(),
        }]
    );
    let request = h.store().get(ApprovalId::new(0)).unwrap();
    assert_eq!(request.status, ApprovalStatus::Error);
    assert_eq!(request.error.as_deref(), Some("no such file"));
    assert_eq!(h.store().clear_processed(), 1);
}

#[test]
fn third_sequential_approval_is_still_shown() {
    let mut h = Harness::new(true);

    for round in 0..3u64 {
        let turn = h.store().begin_turn();
        let placeholder =
            h.gate.request(format!("Calculate: {} * 2", round), h.counter.action(Ok("ok")));
        h.reconciler.hold_turn(turn, placeholder);

        assert!(h.reconciler.should_show_approvals(), "round {}", round);
        let panel = h.reconciler.redraw();
        assert!(panel.visible, "round {}", round);
        assert!(panel.newly_raised, "round {}", round);
        assert_eq!(panel.pending.len(), 1);
        assert_eq!(panel.pending[0].id, ApprovalId::new(round));

        let report = h.reconciler.approve(ApprovalId::new(round));
        assert_eq!(report.released.len(), 1);

        let after = h.reconciler.redraw();
        assert!(after.pending.is_empty());
    }
    assert_eq!(h.counter.count(), 3);
}

#[test]
fn approve_all_skips_already_denied() {
    let mut h = Harness::new(true);
    h.gate.request("a", h.counter.action(Ok("A")));
    h.gate.request("b", h.counter.action(Err("boom")));
    h.gate.request("c", h.counter.action(Ok("C")));
    h.reconciler.deny(ApprovalId::new(1));

    let report = h.reconciler.approve_all();

    assert_eq!(report.resolutions.len(), 2);
    assert!(report.resolutions.iter().all(|r| !r.is_stale()));
    assert_eq!(h.status(0), ApprovalStatus::Executed);
    assert_eq!(h.status(1), ApprovalStatus::Denied);
    assert_eq!(h.status(2), ApprovalStatus::Executed);
    assert_eq!(h.counter.count(), 2);
}

#[test]
fn approve_all_continues_past_a_failure() {
    let mut h = Harness::new(true);
    h.gate.request("a", h.counter.action(Err("boom")));
    h.gate.request("b", h.counter.action(Ok("B")));

    let report = h.reconciler.approve_all();

    assert!(matches!(report.resolutions[0], Resolution::Failed { .. }));
    assert!(matches!(report.resolutions[1], Resolution::Executed { .. }));
}

#[test]
fn second_resolve_is_rejected_without_double_execution() {
    let mut h = Harness::new(true);
    h.gate.request("a", h.counter.action(Ok("A")));
    let id = ApprovalId::new(0);

    h.reconciler.approve(id);
    let err = h.store().resolve(id, Decision::Approved).unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));

    let report = h.reconciler.approve(id);
    assert!(report.resolutions[0].is_stale());
    assert_eq!(h.counter.count(), 1);
}

#[test]
fn out_of_order_resolution_keeps_entries_independent() {
    let mut h = Harness::new(true);
    let turn = h.store().begin_turn();
    let first = h.gate.request("Calculate: 1", h.counter.action(Ok("one")));
    let second = h.gate.request("Calculate: 2", h.counter.action(Ok("two")));
    h.reconciler.hold_turn(turn, format!("{}\n{}", first, second));

    let report = h.reconciler.approve(ApprovalId::new(1));
    assert!(report.released.is_empty());
    assert_eq!(h.status(0), ApprovalStatus::Pending);

    let report = h.reconciler.deny(ApprovalId::new(0));
    assert_eq!(report.released.len(), 1);
    assert_eq!(report.released[0].content, "Operation denied by user\ntwo");
}

#[test]
fn observed_statuses_only_move_forward() {
    let mut h = Harness::new(true);
    h.gate.request("a", h.counter.action(Ok("A")));
    let id = ApprovalId::new(0);
    let mut seen = vec![h.status(0)];

    h.store().resolve(id, Decision::Approved).unwrap();
    seen.push(h.status(0));
    assert!(h.store().resolve(id, Decision::Denied).is_err());
    h.reconciler.approve(id);
    seen.push(h.status(0));
    h.reconciler.deny(id);
    seen.push(h.status(0));

    // Approved by hand, so the reconciler's approve is stale and nothing runs.
    assert_eq!(h.counter.count(), 0);
    assert_eq!(
        seen,
        vec![
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Approved,
            ApprovalStatus::Approved,
        ]
    );
}
