//! Tests for trigger matching
//!
//! Joins, literal filters, flow isolation, and the semi-naive delta pass.

use concord_engine::{ActionLog, ActionPattern, ActionRef, FlowId, Match, Matcher};
use concord_foundation::{Fields, Value, Vars, fields};
use proptest::prelude::*;

use crate::support::{NOTE, OPEN, REQUEST};

const F1: FlowId = FlowId(1);
const F2: FlowId = FlowId(2);
const REQUEST_FLOW: FlowId = FlowId(7);

fn append(log: &mut ActionLog, flow: FlowId, action: ActionRef, input: Fields) -> u64 {
    let output = input.clone();
    log.append(flow, action, input, output, None)
}

// =============================================================================
// Joins
// =============================================================================

#[test]
fn shared_variable_is_a_join_key() {
    let mut log = ActionLog::new();
    append(&mut log, F1, REQUEST, fields! { "user" => "u1" });
    log.append(F1, OPEN, fields! { "owner" => "u2" }, fields! { "account" => "acct1" }, None);
    log.append(F1, OPEN, fields! { "owner" => "u1" }, fields! { "account" => "acct2" }, None);

    let mut vars = Vars::new();
    let [user, account] = vars.vars(["user", "account"]);
    let patterns = [
        ActionPattern::new(REQUEST).input("user", &user),
        ActionPattern::new(OPEN).input("owner", &user).output("account", &account),
    ];

    let matches = Matcher::match_all(&patterns, &log, F1);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].records, vec![1, 3]);
    assert_eq!(matches[0].frame.get(&account), Some(&Value::from("acct2")));
}

#[test]
fn unrelated_patterns_enumerate_every_combination() {
    let mut log = ActionLog::new();
    append(&mut log, F1, REQUEST, fields! { "n" => 1 });
    append(&mut log, F1, REQUEST, fields! { "n" => 2 });
    append(&mut log, F1, NOTE, fields! { "m" => 1 });
    append(&mut log, F1, NOTE, fields! { "m" => 2 });

    let patterns = [ActionPattern::new(REQUEST), ActionPattern::new(NOTE)];
    let records: Vec<Vec<u64>> = Matcher::match_all(&patterns, &log, F1)
        .into_iter()
        .map(|m| m.records)
        .collect();
    assert_eq!(records, vec![vec![1, 3], vec![1, 4], vec![2, 3], vec![2, 4]]);
}

#[test]
fn literals_compare_strictly() {
    let mut log = ActionLog::new();
    append(&mut log, F1, NOTE, fields! { "n" => 1 });
    append(&mut log, F1, NOTE, fields! { "n" => "1" });
    append(&mut log, F1, NOTE, fields! { "other" => 1 });
    append(&mut log, F1, NOTE, fields! { "n" => 1.0 });

    let as_int = [ActionPattern::new(NOTE).input("n", 1_i64)];
    let as_str = [ActionPattern::new(NOTE).input("n", "1")];

    let seqs = |patterns: &[ActionPattern]| -> Vec<Vec<u64>> {
        Matcher::match_all(patterns, &log, F1)
            .into_iter()
            .map(|m| m.records)
            .collect()
    };
    assert_eq!(seqs(&as_int), vec![vec![1]]);
    assert_eq!(seqs(&as_str), vec![vec![2]]);
}

#[test]
fn mentioned_field_must_be_present() {
    let mut log = ActionLog::new();
    append(&mut log, REQUEST_FLOW, REQUEST, fields! { "method" => "GET" });

    let mut vars = Vars::new();
    let path = vars.var("path");
    let pattern = [ActionPattern::new(REQUEST)
        .input("method", "GET")
        .input("path", &path)];
    assert!(Matcher::match_all(&pattern, &log, REQUEST_FLOW).is_empty());

    // Extra fields on the record do not matter.
    let loose = [ActionPattern::new(REQUEST)];
    assert_eq!(Matcher::match_all(&loose, &log, REQUEST_FLOW).len(), 1);
}

#[test]
fn flows_never_join() {
    let mut log = ActionLog::new();
    append(&mut log, F1, REQUEST, fields! { "user" => "u1" });
    append(&mut log, F2, NOTE, fields! { "user" => "u1" });

    let mut vars = Vars::new();
    let user = vars.var("user");
    let patterns = [
        ActionPattern::new(REQUEST).input("user", &user),
        ActionPattern::new(NOTE).input("user", &user),
    ];
    assert!(Matcher::match_all(&patterns, &log, F1).is_empty());
    assert!(Matcher::match_all(&patterns, &log, F2).is_empty());

    append(&mut log, F1, NOTE, fields! { "user" => "u1" });
    assert_eq!(Matcher::match_all(&patterns, &log, F1).len(), 1);
}

// =============================================================================
// Semi-naive delta
// =============================================================================

#[test]
fn delta_only_reports_new_combinations() {
    let mut log = ActionLog::new();
    let mut vars = Vars::new();
    let key = vars.var("key");
    let patterns = [
        ActionPattern::new(REQUEST).input("key", &key),
        ActionPattern::new(NOTE).input("key", &key),
    ];

    let r = append(&mut log, F1, REQUEST, fields! { "key" => "a" });
    assert!(Matcher::match_delta(&patterns, &log, F1, &[r]).is_empty());

    let n1 = append(&mut log, F1, NOTE, fields! { "key" => "a" });
    let n2 = append(&mut log, F1, NOTE, fields! { "key" => "b" });
    let found = Matcher::match_delta(&patterns, &log, F1, &[n1, n2]);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].records, vec![r, n1]);

    assert!(Matcher::match_delta(&patterns, &log, F1, &[]).is_empty());
}

#[test]
fn self_join_within_one_delta_is_reported_once() {
    let mut log = ActionLog::new();
    let a = append(&mut log, F1, NOTE, fields! { "k" => 1 });
    let b = append(&mut log, F1, NOTE, fields! { "k" => 1 });

    let mut vars = Vars::new();
    let k = vars.var("k");
    let patterns = [
        ActionPattern::new(NOTE).input("k", &k),
        ActionPattern::new(NOTE).input("k", &k),
    ];

    let records: Vec<Vec<u64>> = Matcher::match_delta(&patterns, &log, F1, &[a, b])
        .into_iter()
        .map(|m| m.records)
        .collect();
    assert_eq!(records, vec![vec![a, a], vec![a, b], vec![b, a], vec![b, b]]);
}

fn sorted(mut matches: Vec<Match>) -> Vec<Vec<u64>> {
    matches.sort_by(|a, b| a.records.cmp(&b.records));
    matches.into_iter().map(|m| m.records).collect()
}

proptest! {
    /// Feeding the log in batches, the deltas together find exactly what a
    /// full join over the final log finds, each combination once.
    #[test]
    fn deltas_cover_the_full_join(
        batches in prop::collection::vec(
            prop::collection::vec((0_u8..3, 0_i64..3), 1..4),
            1..5,
        )
    ) {
        let mut vars = Vars::new();
        let [k, j] = vars.vars(["k", "j"]);
        let patterns = [
            ActionPattern::new(REQUEST).input("k", &k),
            ActionPattern::new(NOTE).input("k", &k),
            ActionPattern::new(NOTE).input("k", &j),
        ];

        let mut log = ActionLog::new();
        let mut incremental = Vec::new();
        for batch in &batches {
            let delta: Vec<u64> = batch
                .iter()
                .map(|&(kind, key)| {
                    let action = match kind {
                        0 => REQUEST,
                        1 => NOTE,
                        _ => OPEN,
                    };
                    append(&mut log, F1, action, fields! { "k" => key })
                })
                .collect();
            incremental.extend(Matcher::match_delta(&patterns, &log, F1, &delta));
        }

        let found = sorted(incremental);
        let mut deduped = found.clone();
        deduped.dedup();
        prop_assert_eq!(&found, &deduped);
        prop_assert_eq!(found, sorted(Matcher::match_all(&patterns, &log, F1)));
    }
}
