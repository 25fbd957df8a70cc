//! Integration tests for Error
//!
//! Tests error kinds, classification, and attached context.

use concord_foundation::{Error, ErrorContext, ErrorKind, SemanticLimit};

#[test]
fn action_failure_wraps_source() {
    let err = Error::action_failed("Quiz", "deleteQuiz", Error::not_found("quiz", "q9"));
    assert!(err.is_action_failure());
    assert!(!err.is_limit_exceeded());
    let text = err.to_string();
    assert!(text.contains("Quiz.deleteQuiz"));
    assert!(text.contains("q9"));
}

#[test]
fn cascade_depth_is_distinct_from_action_failure() {
    let err = Error::limit_exceeded(SemanticLimit::MaxCascadeDepth { limit: 32, flow: 4 });
    assert!(err.is_limit_exceeded());
    assert!(!err.is_action_failure());
    assert_eq!(
        err.to_string(),
        "limit exceeded: max cascade depth (32) exceeded in flow 4"
    );
}

#[test]
fn context_is_attached() {
    let err = Error::internal("boom").with_context(
        ErrorContext::new()
            .with_source("CreateQuiz")
            .with_frame("flow-1, wave 2"),
    );
    let ctx = err.context.as_ref().unwrap();
    assert_eq!(ctx.source.as_deref(), Some("CreateQuiz"));
    assert_eq!(ctx.stack, vec!["flow-1, wave 2".to_string()]);
    assert!(matches!(err.kind, ErrorKind::Internal(_)));
}

#[test]
fn invalid_rule_names_rule() {
    let err = Error::invalid_rule("Broken", "rule has no trigger patterns");
    match err.kind {
        ErrorKind::InvalidRule { rule, reason } => {
            assert_eq!(rule, "Broken");
            assert!(reason.contains("trigger"));
        }
        other => panic!("unexpected kind: {other:?}"),
    }
}
