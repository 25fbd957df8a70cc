//! Tests for guard execution
//!
//! Guards may expand a frame into several, drop it silently, or fail the flow.

use concord_engine::{
    ActionPattern, ActionTemplate, EngineConfig, QueryRef, SyncEngine, SyncRule, first_or,
};
use concord_foundation::{Error, ErrorKind, Fields, Value, Vars, fields};
use proptest::prelude::*;

use crate::support::{Ledger, NOTE, REQUEST, engine, engine_with};

const ROWS: QueryRef = QueryRef::new("Ledger", "_rows");

fn row(id: &str) -> Fields {
    fields! { "id" => id }
}

/// For every request, note each `_rows` row.
fn note_each_row(v: &mut Vars) -> SyncRule {
    let id = v.var("id");
    let guard_id = id.clone();
    SyncRule::new("NoteEachRow")
        .when(ActionPattern::new(REQUEST))
        .guard(move |frames, ctx| frames.query(ctx, ROWS, &[], &[("id", &guard_id)]))
        .then(ActionTemplate::new(NOTE).input("id", &id))
}

fn noted_ids(engine: &SyncEngine) -> Vec<String> {
    engine
        .records()
        .unwrap()
        .iter()
        .filter(|r| r.action == NOTE)
        .filter_map(|r| r.input.get("id").and_then(Value::as_str).map(String::from))
        .collect()
}

#[test]
fn query_rows_expand_frames_in_order() {
    let ledger = Ledger::with_rows(vec![row("x"), row("y"), row("z")]);
    let engine = engine_with(ledger, EngineConfig::new());
    engine.register_rule(note_each_row).unwrap();

    let report = engine.submit_with_report(REQUEST, Fields::new()).unwrap();
    assert_eq!(report.firings, 3);
    assert_eq!(noted_ids(&engine), vec!["x", "y", "z"]);

    // All three share one cause.
    let records = engine.records().unwrap();
    let causes: Vec<_> = records[1..].iter().map(|r| r.cause.clone().unwrap()).collect();
    assert!(causes.iter().all(|c| c.rule.as_ref() == "NoteEachRow" && c.triggers == vec![1]));
}

#[test]
fn empty_query_drops_silently() {
    let engine = engine();
    engine.register_rule(note_each_row).unwrap();

    let report = engine.submit_with_report(REQUEST, Fields::new()).unwrap();
    assert_eq!(report.records, vec![1]);
    assert_eq!(report.firings, 0);
}

#[test]
fn filter_drops_only_failing_frames() {
    let engine = engine();
    engine
        .register_rule(|v| {
            let n = v.var("n");
            let guard_n = n.clone();
            SyncRule::new("OnlyPositive")
                .when(ActionPattern::new(REQUEST).input("n", &n))
                .guard(move |frames, _| {
                    Ok(frames.filter(|f| f.get(&guard_n).and_then(Value::as_int).is_some_and(|n| n > 0)))
                })
                .then(ActionTemplate::new(NOTE).input("n", &n))
        })
        .unwrap();

    assert_eq!(engine.submit_with_report(REQUEST, fields! { "n" => -1 }).unwrap().records.len(), 1);
    assert_eq!(engine.submit_with_report(REQUEST, fields! { "n" => 5 }).unwrap().records.len(), 2);
}

#[test]
fn derived_values_flow_into_follow_ups() {
    let ledger = Ledger::with_rows(vec![fields! { "total" => 8 }]);
    let engine = engine_with(ledger, EngineConfig::new());
    engine
        .register_rule(|v| {
            let [total, fallback] = v.vars(["total", "fallback"]);
            let (t, fb) = (total.clone(), fallback.clone());
            SyncRule::new("Totals")
                .when(ActionPattern::new(REQUEST))
                .guard(move |frames, ctx| {
                    let rows = ctx.query(ROWS, &Fields::new())?;
                    frames
                        .derive(&t, |_| Ok(first_or(&rows, "total", Value::Int(0))))?
                        .derive(&fb, |_| Ok(first_or(&rows, "missing", Value::Int(0))))
                })
                .then(
                    ActionTemplate::new(NOTE)
                        .input("total", &total)
                        .input("fallback", &fallback),
                )
        })
        .unwrap();

    engine.submit(REQUEST, Fields::new()).unwrap();
    let note = &engine.records().unwrap()[1];
    assert_eq!(note.input, fields! { "fallback" => 0, "total" => 8 });
}

#[test]
fn guard_error_aborts_the_flow() {
    let engine = engine();
    engine
        .register_rule(|_| {
            SyncRule::new("Refuses")
                .when(ActionPattern::new(REQUEST))
                .guard(|_, _| Err(Error::not_found("row", "r1")))
                .then(ActionTemplate::new(NOTE))
        })
        .unwrap();

    let err = engine.submit(REQUEST, Fields::new()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotFound { kind: "row", .. }));
    let context = err.context.unwrap();
    assert_eq!(context.source.as_deref(), Some("Refuses"));
    assert_eq!(context.stack, vec!["flow-1, wave 1".to_string()]);
    // The root stays recorded.
    assert_eq!(engine.records().unwrap().len(), 1);
}

#[test]
fn unbound_follow_up_variable_is_fatal() {
    let engine = engine();
    engine
        .register_rule(|v| {
            let never = v.var("never");
            SyncRule::new("LeavesUnbound")
                .when(ActionPattern::new(REQUEST))
                .guard(|frames, _| Ok(frames))
                .then(ActionTemplate::new(NOTE).input("x", &never))
        })
        .unwrap();

    let err = engine.submit(REQUEST, Fields::new()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnboundVariable(_)));
}

proptest! {
    /// Row order changes dispatch order, never the set of records.
    #[test]
    fn row_order_does_not_change_the_result(
        ids in prop::collection::btree_set("[a-z]{1,4}", 1..6),
        seed in any::<u64>(),
    ) {
        let ordered: Vec<String> = ids.iter().cloned().collect();
        let mut shuffled = ordered.clone();
        // Deterministic rotation plus reversal stands in for a shuffle.
        let len = shuffled.len();
        shuffled.rotate_left(usize::try_from(seed % len as u64).unwrap_or(0));
        if seed % 2 == 0 {
            shuffled.reverse();
        }

        let run = |rows: &[String]| {
            let ledger = Ledger::with_rows(rows.iter().map(|id| row(id)).collect());
            let engine = engine_with(ledger, EngineConfig::new());
            engine.register_rule(note_each_row).unwrap();
            engine.submit(REQUEST, Fields::new()).unwrap();
            let mut ids = noted_ids(&engine);
            ids.sort();
            ids
        };

        prop_assert_eq!(run(&ordered), run(&shuffled));
    }
}
