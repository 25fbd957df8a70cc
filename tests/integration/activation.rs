//! Tests for live polls: activation, voting, and the read models

use concord_concepts::QuizApp;
use concord_foundation::{Fields, Value, fields};

use crate::{app, call, field};

/// One quiz, one question `qs1` with options `o1` (Red) and `o2` (Blue).
fn poll() -> QuizApp {
    let app = app();
    call(&app, "POST", "/quizzes", fields! { "owner" => "host", "title" => "Poll" });
    call(&app, "POST", "/quizzes/q1/questions", fields! { "text" => "Color?" });
    call(&app, "POST", "/questions/qs1/options", fields! { "label" => "Red" });
    call(&app, "POST", "/questions/qs1/options", fields! { "label" => "Blue" });
    app
}

fn vote(app: &QuizApp, activation: &str, user: &str, option: &str) {
    call(
        app,
        "POST",
        &format!("/activations/{activation}/choose"),
        fields! { "user" => user, "option" => option },
    );
}

fn int(value: &Value, name: &str) -> i64 {
    value
        .as_record()
        .and_then(|r| r.get(name))
        .and_then(Value::as_int)
        .unwrap_or_else(|| panic!("no int field {name} in {value}"))
}

fn options(payload: &Value) -> Vec<Value> {
    payload
        .as_record()
        .and_then(|r| r.get("options"))
        .and_then(Value::as_list)
        .map(|l| l.iter().cloned().collect())
        .unwrap_or_default()
}

#[test]
fn tallies_are_lettered_in_registration_order() {
    let app = poll();
    let activated = call(&app, "POST", "/questions/qs1/activate", Fields::new());
    assert_eq!(field(&activated, "activation"), "a1");

    for user in ["u1", "u2", "u3"] {
        vote(&app, "a1", user, "o1");
    }
    for user in ["u4", "u5", "u6", "u7", "u8"] {
        vote(&app, "a1", user, "o2");
    }

    let payload = call(&app, "GET", "/activations/a1", Fields::new());
    assert_eq!(field(&payload, "quiz"), "q1");
    let record = payload.as_record().unwrap();
    assert_eq!(record.get("showResults"), Some(&Value::Bool(false)));
    let question = record.require("question").unwrap();
    assert_eq!(field(question, "text"), "Color?");

    let options = options(&payload);
    assert_eq!(options.len(), 2);
    assert_eq!(field(&options[0], "letter"), "A");
    assert_eq!(field(&options[0], "label"), "Red");
    assert_eq!(int(&options[0], "count"), 3);
    assert_eq!(field(&options[1], "letter"), "B");
    assert_eq!(field(&options[1], "label"), "Blue");
    assert_eq!(int(&options[1], "count"), 5);
    assert!(options.iter().all(|o| int(o, "total") == 8));
}

#[test]
fn options_without_votes_count_zero() {
    let app = poll();
    call(&app, "POST", "/questions/qs1/activate", Fields::new());
    vote(&app, "a1", "u1", "o2");

    let options = options(&call(&app, "GET", "/activations/a1", Fields::new()));
    assert_eq!(int(&options[0], "count"), 0);
    assert_eq!(int(&options[0], "total"), 1);
    assert_eq!(int(&options[1], "count"), 1);
}

#[test]
fn a_later_vote_replaces_the_earlier_one() {
    let app = poll();
    call(&app, "POST", "/questions/qs1/activate", Fields::new());
    vote(&app, "a1", "u1", "o1");
    vote(&app, "a1", "u1", "o2");

    let options = options(&call(&app, "GET", "/activations/a1", Fields::new()));
    assert_eq!(int(&options[0], "count"), 0);
    assert_eq!(int(&options[1], "count"), 1);
    assert_eq!(int(&options[1], "total"), 1);
}

#[test]
fn voting_on_an_inactive_poll_fails() {
    let app = poll();
    call(&app, "POST", "/questions/qs1/activate", Fields::new());
    call(&app, "POST", "/activations/a1/deactivate", Fields::new());

    let err = app
        .request("POST", "/activations/a1/choose", fields! { "user" => "u1", "option" => "o1" })
        .unwrap_err();
    assert!(err.is_action_failure());
}

#[test]
fn show_and_hide_toggle_results() {
    let app = poll();
    call(&app, "POST", "/questions/qs1/activate", Fields::new());
    call(&app, "POST", "/activations/a1/show", Fields::new());

    let shown = call(&app, "GET", "/activations/a1", Fields::new());
    assert_eq!(shown.as_record().unwrap().get("showResults"), Some(&Value::Bool(true)));

    call(&app, "POST", "/activations/a1/hide", Fields::new());
    let hidden = call(&app, "GET", "/activations/a1", Fields::new());
    assert_eq!(hidden.as_record().unwrap().get("showResults"), Some(&Value::Bool(false)));
}

#[test]
fn display_follows_the_active_poll() {
    let app = poll();
    call(&app, "POST", "/questions/qs1/activate", Fields::new());
    vote(&app, "a1", "u1", "o1");
    // Reactivating the question closes a1 and opens a fresh poll.
    call(&app, "POST", "/questions/qs1/activate", Fields::new());

    let display = call(&app, "GET", "/display/q1", Fields::new());
    assert_eq!(field(&display, "title"), "Poll");
    let questions = display
        .as_record()
        .and_then(|r| r.get("questions"))
        .and_then(Value::as_list)
        .unwrap();
    let question = questions.get(0).unwrap();
    assert_eq!(field(question, "activation"), "a2");
    let options = options(question);
    assert!(options.iter().all(|o| int(o, "count") == 0));

    // The closed poll keeps its own tallies.
    let closed = options_of(&app, "a1");
    assert_eq!(int(&closed[0], "count"), 1);
}

fn options_of(app: &QuizApp, activation: &str) -> Vec<Value> {
    options(&call(app, "GET", &format!("/activations/{activation}"), Fields::new()))
}

#[test]
fn display_without_polls_reports_nil_activation() {
    let app = poll();
    let display = call(&app, "GET", "/display/q1", Fields::new());
    let question = display
        .as_record()
        .and_then(|r| r.get("questions"))
        .and_then(Value::as_list)
        .and_then(|l| l.get(0).cloned())
        .unwrap();
    let record = question.as_record().unwrap();
    assert_eq!(record.get("activation"), Some(&Value::Nil));
    assert_eq!(record.get("showResults"), Some(&Value::Bool(false)));
}

#[test]
fn activation_of_a_deleted_question_keeps_defaults() {
    let app = poll();
    call(&app, "POST", "/questions/qs1/activate", Fields::new());
    call(&app, "DELETE", "/questions/qs1", Fields::new());

    let payload = call(&app, "GET", "/activations/a1", Fields::new());
    let record = payload.as_record().unwrap();
    assert_eq!(record.get("quiz"), Some(&Value::Nil));
    let question = record.require("question").unwrap();
    assert_eq!(field(question, "text"), "");
    assert!(options(&payload).is_empty());
}
