//! Integration tests for Var and Frame
//!
//! Tests variable identity and the unification rules frames enforce.

use concord_foundation::{Frame, Value, Var, Vars};

#[test]
fn same_name_different_instantiations_differ() {
    let a = Vars::new().var("owner");
    let b = Vars::new().var("owner");
    assert_eq!(a.name(), b.name());
    assert_ne!(a, b);

    let frame = Frame::new().bind(&a, "u1");
    assert!(frame.is_bound(&a));
    assert!(!frame.is_bound(&b));
}

#[test]
fn vars_reuse_within_one_instantiation() {
    let mut vars = Vars::new();
    let [x, y] = vars.vars(["x", "y"]);
    assert_eq!(vars.var("x"), x);
    assert_ne!(x, y);
    assert_eq!(vars.len(), 2);
}

#[test]
fn unify_binds_then_constrains() {
    let v = Var::fresh("quiz");
    let empty = Frame::new();

    let bound = empty.unify(&v, &Value::from("q1")).unwrap();
    assert!(empty.is_empty());
    assert_eq!(bound.get(&v), Some(&Value::from("q1")));

    assert!(bound.unify(&v, &Value::from("q1")).is_some());
    assert!(bound.unify(&v, &Value::from("q2")).is_none());
}

#[test]
fn require_reports_unbound_variable() {
    let v = Var::fresh("payload");
    let err = Frame::new().require(&v).unwrap_err();
    assert!(err.to_string().contains("payload"));
}

#[test]
fn require_str_checks_type() {
    let v = Var::fresh("n");
    let frame = Frame::new().bind(&v, 3);
    assert!(frame.require_str(&v).is_err());
    assert_eq!(frame.require(&v).unwrap(), &Value::Int(3));
}

#[test]
fn named_snapshot_follows_creation_order() {
    let mut vars = Vars::new();
    let [a, b] = vars.vars(["first", "second"]);
    let frame = Frame::new().bind(&b, 2).bind(&a, 1);
    let names: Vec<String> = frame.to_named_vec().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["first", "second"]);
}
