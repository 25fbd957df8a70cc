//! Integration tests for Value and Fields
//!
//! Tests strict equality, record ordering, accessors, and display.

use concord_foundation::{Fields, List, Type, Value, fields};
use std::collections::HashSet;

// =============================================================================
// Equality
// =============================================================================

#[test]
fn strings_never_equal_numbers() {
    assert_ne!(Value::from("1"), Value::Int(1));
    assert_ne!(Value::from("true"), Value::Bool(true));
    assert_ne!(Value::Int(0), Value::Bool(false));
    assert_ne!(Value::Int(0), Value::Nil);
}

#[test]
fn records_compare_structurally() {
    let a = Value::Record(fields! { "quiz" => "q1", "title" => "Foo" });
    let b = Value::Record(fields! { "title" => "Foo", "quiz" => "q1" });
    let c = Value::Record(fields! { "quiz" => "q2", "title" => "Foo" });
    assert_eq!(a, b);
    assert_ne!(a, c);

    let set: HashSet<Value> = [a, b, c].into_iter().collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn lists_are_ordered() {
    let ab = Value::from(vec!["a", "b"]);
    let ba = Value::from(vec!["b", "a"]);
    assert_ne!(ab, ba);
    assert_eq!(ab.value_type(), Type::List);
}

// =============================================================================
// Fields
// =============================================================================

#[test]
fn fields_iterate_in_key_order() {
    let f = fields! { "title" => "Foo", "owner" => "u1", "method" => "POST" };
    let keys: Vec<&str> = f.keys().map(AsRef::as_ref).collect();
    assert_eq!(keys, vec!["method", "owner", "title"]);
}

#[test]
fn fields_typed_getters() {
    let f = fields! { "count" => 3, "shown" => true, "label" => "A" };
    assert_eq!(f.get_int("count").unwrap(), 3);
    assert!(f.get_bool("shown").unwrap());
    assert_eq!(f.get_str("label").unwrap(), "A");
    assert!(f.get_str("count").is_err());
    assert!(f.get_int("missing").is_err());
}

#[test]
fn fields_are_persistent() {
    let base = fields! { "a" => 1 };
    let extended = base.insert("b", 2);
    let removed = extended.remove("a");
    assert_eq!(base.len(), 1);
    assert_eq!(extended.len(), 2);
    assert!(!removed.contains("a"));
    assert!(removed.contains("b"));
}

#[test]
fn record_display_is_compact() {
    let v = Value::Record(fields! { "ok" => true, "id" => "q1" });
    assert_eq!(v.to_string(), "{id: q1, ok: true}");
    assert_eq!(Value::Record(Fields::new()).to_string(), "{}");
}

#[test]
fn list_collects_values() {
    let list: List<Value> = (1..=3).map(Value::Int).collect();
    assert_eq!(list.len(), 3);
    assert_eq!(Value::List(list).to_string(), "[1, 2, 3]");
}
