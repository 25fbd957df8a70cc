//! Tests for cascades
//!
//! Wave ordering, refraction, limits, failure handling, rule registration,
//! retention, and provenance.

use std::sync::Arc;

use concord_engine::{
    ActionPattern, ActionRecord, ActionTemplate, EngineConfig, FlowId, Retention, SyncEngine,
    SyncRule,
};
use concord_foundation::{ErrorKind, Fields, SemanticLimit, Value, Vars, fields};

use crate::support::{FAIL, Ledger, NOTE, OPEN, REQUEST, engine, engine_with};

/// request { user } => open { owner: user }
fn open_for_request(v: &mut Vars) -> SyncRule {
    let user = v.var("user");
    SyncRule::new("OpenForRequest")
        .when(ActionPattern::new(REQUEST).input("user", &user))
        .then(ActionTemplate::new(OPEN).input("owner", &user))
}

/// request { user } + open { owner: user } -> { account } => note { account }
fn note_opened(v: &mut Vars) -> SyncRule {
    let [user, account] = v.vars(["user", "account"]);
    SyncRule::new("NoteOpened")
        .when(ActionPattern::new(REQUEST).input("user", &user))
        .when(
            ActionPattern::new(OPEN)
                .input("owner", &user)
                .output("account", &account),
        )
        .then(ActionTemplate::new(NOTE).input("account", &account))
}

/// note { .. } => note { .. }, forever.
fn note_forever(v: &mut Vars) -> SyncRule {
    let n = v.var("n");
    SyncRule::new("NoteForever")
        .when(ActionPattern::new(NOTE).input("n", &n))
        .then(ActionTemplate::new(NOTE).input("n", &n))
}

fn summary(records: &[Arc<ActionRecord>]) -> Vec<(String, Fields, Fields)> {
    records
        .iter()
        .map(|r| (r.action.to_string(), r.input.clone(), r.output.clone()))
        .collect()
}

fn opening_engine(config: EngineConfig) -> SyncEngine {
    let engine = engine_with(Ledger::new(), config);
    engine.register_rule(open_for_request).unwrap();
    engine.register_rule(note_opened).unwrap();
    engine
}

// =============================================================================
// Waves and refraction
// =============================================================================

#[test]
fn follow_ups_join_across_waves() {
    let engine = opening_engine(EngineConfig::new());
    let report = engine
        .submit_with_report(REQUEST, fields! { "user" => "u1" })
        .unwrap();

    assert_eq!(report.records, vec![1, 2, 3]);
    assert_eq!(report.firings, 2);
    assert_eq!(report.waves, 3);

    let records = engine.records().unwrap();
    let note = &records[2];
    assert_eq!(note.action, NOTE);
    assert_eq!(note.input, fields! { "account" => "acct1" });
    let cause = note.cause.as_ref().unwrap();
    assert_eq!(cause.rule.as_ref(), "NoteOpened");
    assert_eq!(cause.wave, 2);
    assert_eq!(cause.triggers, vec![1, 2]);
}

#[test]
fn each_combination_fires_once() {
    let engine = engine();
    engine.register_rule(open_for_request).unwrap();
    // Observes both the request and the open; must not refire when later
    // waves add unrelated records.
    engine
        .register_rule(|v| {
            let user = v.var("user");
            SyncRule::new("NoteAny")
                .when(ActionPattern::new(REQUEST).input("user", &user))
                .when(ActionPattern::new(OPEN))
                .then(ActionTemplate::new(NOTE).input("user", &user))
        })
        .unwrap();
    engine.register_rule(note_opened).unwrap();

    engine.submit(REQUEST, fields! { "user" => "u1" }).unwrap();
    let fired: Vec<String> = engine
        .records()
        .unwrap()
        .iter()
        .filter_map(|r| r.cause.as_ref().map(|c| c.rule.to_string()))
        .collect();
    assert_eq!(fired, vec!["OpenForRequest", "NoteAny", "NoteOpened"]);
}

#[test]
fn identical_submissions_produce_identical_logs() {
    let run = || {
        let engine = opening_engine(EngineConfig::new());
        engine.submit(REQUEST, fields! { "user" => "u1" }).unwrap();
        engine.submit(REQUEST, fields! { "user" => "u2" }).unwrap();
        summary(&engine.records().unwrap())
    };
    let first = run();
    assert_eq!(first.len(), 6);
    assert_eq!(first, run());
}

#[test]
fn flows_are_isolated() {
    let engine = opening_engine(EngineConfig::new());
    engine.submit(REQUEST, fields! { "user" => "u1" }).unwrap();
    let second = engine
        .submit_with_report(REQUEST, fields! { "user" => "u1" })
        .unwrap();

    // Same user, but the first flow's open is invisible to the second.
    assert_eq!(second.flow, FlowId(2));
    assert_eq!(second.records, vec![4, 5, 6]);
    let flow_two = engine.flow_records(FlowId(2)).unwrap();
    assert_eq!(flow_two[2].input, fields! { "account" => "acct2" });
    assert_eq!(flow_two[2].cause.as_ref().unwrap().triggers, vec![4, 5]);
}

// =============================================================================
// Limits and failures
// =============================================================================

#[test]
fn runaway_cascade_hits_depth_limit() {
    let engine = engine_with(Ledger::new(), EngineConfig::new().with_max_cascade_depth(3));
    engine.register_rule(note_forever).unwrap();

    let err = engine.submit(NOTE, fields! { "n" => 1 }).unwrap_err();
    assert!(err.is_limit_exceeded());
    assert!(matches!(
        err.kind,
        ErrorKind::LimitExceeded(SemanticLimit::MaxCascadeDepth { limit: 3, flow: 1 })
    ));
    assert_eq!(engine.records().unwrap().len(), 4);

    // The engine stays usable for the next flow.
    assert!(engine.submit(REQUEST, Fields::new()).is_ok());
}

#[test]
fn depth_limit_counts_only_waves_that_fire() {
    // Two hops: request -> open -> note, then a quiet wave.
    let exact = opening_engine(EngineConfig::new().with_max_cascade_depth(2));
    let report = exact
        .submit_with_report(REQUEST, fields! { "user" => "u1" })
        .unwrap();
    assert_eq!(report.records, vec![1, 2, 3]);
    assert_eq!(report.waves, 3);

    let single = engine_with(Ledger::new(), EngineConfig::new().with_max_cascade_depth(1));
    single.register_rule(open_for_request).unwrap();
    assert!(single.submit(REQUEST, fields! { "user" => "u1" }).is_ok());

    let short = opening_engine(EngineConfig::new().with_max_cascade_depth(1));
    let err = short.submit(REQUEST, fields! { "user" => "u1" }).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::LimitExceeded(SemanticLimit::MaxCascadeDepth { limit: 1, flow: 1 })
    ));
    assert_eq!(err.context.unwrap().stack, vec!["flow-1, wave 2".to_string()]);
    assert_eq!(short.records().unwrap().len(), 2);
}

#[test]
fn failed_follow_up_keeps_earlier_records() {
    let engine = engine();
    engine.register_rule(open_for_request).unwrap();
    engine
        .register_rule(|v| {
            let account = v.var("account");
            SyncRule::new("FailAfterOpen")
                .when(ActionPattern::new(OPEN).output("account", &account))
                .then(ActionTemplate::new(NOTE).input("account", &account))
                .then(ActionTemplate::new(FAIL))
        })
        .unwrap();

    let err = engine.submit(REQUEST, fields! { "user" => "u1" }).unwrap_err();
    assert!(err.is_action_failure());
    assert_eq!(
        err.context.unwrap().source.as_deref(),
        Some("FailAfterOpen")
    );

    let actions: Vec<String> = engine
        .records()
        .unwrap()
        .iter()
        .map(|r| r.action.to_string())
        .collect();
    assert_eq!(actions, vec!["Ledger.request", "Ledger.open", "Ledger.note"]);
}

#[test]
fn concept_rejection_of_follow_up_input_is_fatal() {
    let engine = engine();
    engine
        .register_rule(|_| {
            SyncRule::new("OpenWithoutOwner")
                .when(ActionPattern::new(REQUEST))
                .then(ActionTemplate::new(OPEN))
        })
        .unwrap();

    let err = engine.submit(REQUEST, Fields::new()).unwrap_err();
    assert!(err.is_action_failure());
    assert_eq!(engine.records().unwrap().len(), 1);
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn malformed_rules_are_rejected() {
    let engine = engine();

    let no_then = engine.register_rule(|_| SyncRule::new("NoThen").when(ActionPattern::new(NOTE)));
    assert!(matches!(no_then.unwrap_err().kind, ErrorKind::InvalidRule { .. }));

    let no_when = engine.register_rule(|_| SyncRule::new("NoWhen").then(ActionTemplate::new(NOTE)));
    assert!(matches!(no_when.unwrap_err().kind, ErrorKind::InvalidRule { .. }));

    let unbound = engine.register_rule(|v| {
        let stray = v.var("stray");
        SyncRule::new("Stray")
            .when(ActionPattern::new(REQUEST))
            .then(ActionTemplate::new(NOTE).input("x", &stray))
    });
    let err = unbound.unwrap_err();
    assert!(err.to_string().contains("never bound"));

    let twice = engine.register_rule(|v| {
        let [a, b] = v.vars(["a", "b"]);
        SyncRule::new("Twice")
            .when(ActionPattern::new(REQUEST).input("k", &a).input("k", &b))
            .then(ActionTemplate::new(NOTE))
    });
    assert!(twice.is_err());

    assert!(engine.rule_names().unwrap().is_empty());
}

#[test]
fn follow_up_outputs_bind_for_later_templates() {
    let engine = engine();
    engine
        .register_rule(|v| {
            let [user, account] = v.vars(["user", "account"]);
            SyncRule::new("OpenThenNote")
                .when(ActionPattern::new(REQUEST).input("user", &user))
                .then(
                    ActionTemplate::new(OPEN)
                        .input("owner", &user)
                        .output("account", &account),
                )
                .then(ActionTemplate::new(NOTE).input("account", &account))
        })
        .unwrap();

    engine.submit(REQUEST, fields! { "user" => "u1" }).unwrap();
    let records = engine.records().unwrap();
    assert_eq!(records[2].input.get("account"), Some(&Value::from("acct1")));
}

#[test]
fn reregistering_a_name_replaces_the_rule() {
    let engine = engine();
    let first = engine.register_rule(open_for_request).unwrap();
    let second = engine
        .register_rule(|v| {
            let user = v.var("user");
            SyncRule::new("OpenForRequest")
                .when(ActionPattern::new(REQUEST).input("user", &user))
                .then(ActionTemplate::new(NOTE).input("user", &user))
        })
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.rule_names().unwrap().len(), 1);

    engine.submit(REQUEST, fields! { "user" => "u1" }).unwrap();
    assert_eq!(engine.records().unwrap()[1].action, NOTE);
}

// =============================================================================
// Retention and provenance
// =============================================================================

#[test]
fn discarding_retention_keeps_sequence_numbers_moving() {
    let engine = opening_engine(EngineConfig::new().with_retention(Retention::DiscardCompletedFlows));

    let first = engine
        .submit_with_report(REQUEST, fields! { "user" => "u1" })
        .unwrap();
    assert_eq!(first.records, vec![1, 2, 3]);
    assert!(engine.records().unwrap().is_empty());

    let second = engine
        .submit_with_report(REQUEST, fields! { "user" => "u1" })
        .unwrap();
    assert_eq!(second.records, vec![4, 5, 6]);
    assert!(engine.with_log(concord_engine::ActionLog::is_empty).unwrap());
}

#[test]
fn lineage_walks_back_to_the_submission() {
    let engine = opening_engine(EngineConfig::new());
    engine.submit(REQUEST, fields! { "user" => "u1" }).unwrap();

    let seqs: Vec<u64> = engine.lineage(3).unwrap().iter().map(|r| r.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);

    let explanation = engine.explain(3).unwrap();
    assert!(explanation.contains("NoteOpened"));
    assert!(explanation.contains("submitted"));

    assert!(engine.lineage(42).is_err());
}
