//! Tests for concurrent submissions
//!
//! Identical requests from several threads must each be answered with the
//! quiz their own flow created.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use concord_concepts::{api, quiz};
use concord_foundation::{Value, fields};

use crate::{app, field};

#[test]
fn identical_requests_get_their_own_responses() {
    const THREADS: usize = 8;
    let app = Arc::new(app());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let app = Arc::clone(&app);
            thread::spawn(move || {
                app.request("POST", "/quizzes", fields! { "owner" => "u1", "title" => "Same" })
                    .unwrap()
                    .unwrap()
            })
        })
        .collect();

    let ids: BTreeSet<String> = handles
        .into_iter()
        .map(|h| field(&h.join().unwrap(), "quiz"))
        .collect();
    let expected: BTreeSet<String> = (1..=THREADS).map(|n| format!("q{n}")).collect();
    assert_eq!(ids, expected);

    // Within every flow, the response names the quiz that flow created.
    let records = app.engine().records().unwrap();
    assert_eq!(records.len(), THREADS * 3);
    for flow in records.iter().map(|r| r.flow).collect::<BTreeSet<_>>() {
        let in_flow: Vec<_> = records.iter().filter(|r| r.flow == flow).collect();
        let created = in_flow
            .iter()
            .find(|r| r.action == quiz::CREATE_QUIZ)
            .and_then(|r| r.output.get("quiz"))
            .cloned()
            .unwrap();
        let responded = in_flow
            .iter()
            .find(|r| r.action == api::RESPONSE)
            .and_then(|r| r.input.get("output"))
            .and_then(Value::as_record)
            .and_then(|o| o.get("quiz"))
            .cloned()
            .unwrap();
        assert_eq!(created, responded);
    }
}

#[test]
fn concurrent_votes_are_all_counted() {
    let app = Arc::new(app());
    app.request("POST", "/quizzes", fields! { "owner" => "host", "title" => "Poll" })
        .unwrap();
    app.request("POST", "/quizzes/q1/questions", fields! { "text" => "?" })
        .unwrap();
    app.request("POST", "/questions/qs1/options", fields! { "label" => "Yes" })
        .unwrap();
    app.request("POST", "/questions/qs1/activate", fields! {})
        .unwrap();

    let handles: Vec<_> = (0..6)
        .map(|n| {
            let app = Arc::clone(&app);
            thread::spawn(move || {
                app.request(
                    "POST",
                    "/activations/a1/choose",
                    fields! { "user" => format!("u{n}"), "option" => "o1" },
                )
                .unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().is_some());
    }

    let payload = app
        .request("GET", "/activations/a1", fields! {})
        .unwrap()
        .unwrap();
    let count = payload
        .as_record()
        .and_then(|r| r.get("options"))
        .and_then(Value::as_list)
        .and_then(|l| l.get(0))
        .and_then(Value::as_record)
        .and_then(|o| o.get("count"))
        .and_then(Value::as_int);
    assert_eq!(count, Some(6));
}
