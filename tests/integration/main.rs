//! End-to-end tests for the quiz service
//!
//! Requests go through `QuizApp`, so every test exercises routing, the
//! API concept, the synchronizations, and the Quiz and Activation concepts
//! together.

mod activation;
mod concurrency;

use concord_concepts::QuizApp;
use concord_engine::EngineConfig;
use concord_foundation::{Fields, Value};

pub fn app() -> QuizApp {
    QuizApp::new(EngineConfig::new()).unwrap()
}

/// Sends a request that must produce a response.
pub fn call(app: &QuizApp, method: &str, path: &str, body: Fields) -> Value {
    app.request(method, path, body)
        .unwrap()
        .unwrap_or_else(|| panic!("{method} {path} produced no response"))
}

/// Reads a string field out of a record payload.
pub fn field(value: &Value, name: &str) -> String {
    value
        .as_record()
        .and_then(|r| r.get(name))
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("no string field {name} in {value}"))
        .to_string()
}
