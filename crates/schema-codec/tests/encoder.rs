// crates/schema-codec/tests/encoder.rs
// ============================================================================
// Module: Encoder Tests
// Description: Behavioral coverage for encoder combinators.
// Purpose: Pin the rendered output of primitives, containers, sums and lazy
//          encoders, including the fallbacks for values outside the contract.
// Dependencies: schema_codec::encoder, serde_json, tracing-subscriber
// ============================================================================
//! ## Overview
//! Integration tests for encoders. Fallback paths are checked both for their
//! output and for the warning event they emit.

// ============================================================================
// SECTION: Test Support
// ============================================================================

mod support;

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use schema_codec::Encode;
use schema_codec::Encoder;
use schema_codec::Literal;
use schema_codec::encoder;
use serde_json::Value;
use serde_json::json;
use support::TestResult;
use support::ensure;
use support::ensure_eq;

/// Number field lifted into the dynamic domain.
fn number_field() -> Encoder<Value, Value> {
    encoder::dynamic(&encoder::number())
}

/// String field lifted into the dynamic domain.
fn string_field() -> Encoder<Value, Value> {
    encoder::dynamic(&encoder::string())
}

/// In-memory sink for formatted tracing output.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Returns everything written so far.
    fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a subscriber that records warn-level events into the result.
fn with_captured_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, logs.contents())
}

// ============================================================================
// SECTION: Primitives
// ============================================================================

#[test]
fn primitives_render_interchange_values() -> TestResult {
    ensure_eq(&encoder::string().encode(&"a".to_string()), &json!("a"), "string")?;
    ensure_eq(&encoder::number().encode(&2.5), &json!(2.5), "number")?;
    ensure_eq(&encoder::number().encode(&36.0), &json!(36), "integral number")?;
    ensure_eq(&encoder::number().encode(&f64::NAN), &Value::Null, "non-finite number")?;
    ensure_eq(&encoder::boolean().encode(&true), &json!(true), "boolean")?;
    ensure_eq(&encoder::literal().encode(&Literal::from("on")), &json!("on"), "literal")?;
    ensure_eq(&encoder::unknown_array().encode(&vec![json!(1)]), &json!([1]), "array")?;
    ensure_eq(&encoder::id::<u8>().encode(&7), &7, "identity")
}

#[test]
fn contramap_and_compose_apply_in_order() -> TestResult {
    let digits = encoder::contramap(&encoder::string(), |count: &u32| count.to_string());
    ensure_eq(&digits.encode(&42), &json!("42"), "contramap")?;

    let doubled: Encoder<f64, f64> = Encoder::new(|value: &f64| value * 2.0);
    let composed = encoder::compose(&encoder::number(), &doubled);
    ensure_eq(&composed.encode(&1.5), &json!(3), "inner runs first")
}

#[test]
fn nullable_renders_none_as_null() -> TestResult {
    let encoder = encoder::nullable(&encoder::string());
    ensure_eq(&encoder.encode(&None), &Value::Null, "none")?;
    ensure_eq(&encoder.encode(&Some("x".to_string())), &json!("x"), "some")
}

// ============================================================================
// SECTION: Containers
// ============================================================================

#[test]
fn struct_encodes_declared_fields_only() -> TestResult {
    let encoder = encoder::struct_([("a", number_field()), ("b", string_field())]);
    ensure_eq(
        &encoder.encode(&json!({ "a": 1.0, "b": "x", "c": true })),
        &json!({ "a": 1, "b": "x" }),
        "undeclared key dropped",
    )?;
    let from = encoder::from_struct([("a", number_field())]);
    ensure_eq(&from.encode(&json!({ "a": 2.0 })).len(), &1, "from_struct yields an object")
}

#[test]
fn partial_leaves_absent_fields_absent() -> TestResult {
    let encoder = encoder::partial([("a", number_field()), ("b", string_field())]);
    ensure_eq(&encoder.encode(&json!({ "b": "x" })), &json!({ "b": "x" }), "absent stays absent")?;
    let from = encoder::from_partial([("a", number_field())]);
    ensure(from.encode(&json!({})).is_empty(), "from_partial of empty object")
}

#[test]
fn array_record_and_tuple_render_positionally() -> TestResult {
    ensure_eq(&encoder::array(&encoder::boolean()).encode(&vec![true, false]), &json!([true, false]), "array")?;
    ensure_eq(
        &encoder::from_array(&encoder::boolean()).encode(&vec![true]),
        &vec![json!(true)],
        "from_array",
    )?;
    let entries: BTreeMap<String, f64> = [("a".to_string(), 1.0)].into_iter().collect();
    ensure_eq(&encoder::record(&encoder::number()).encode(&entries), &json!({ "a": 1 }), "record")?;
    let tuple = encoder::tuple((encoder::string(), encoder::number()));
    ensure_eq(&tuple.encode(&("a".to_string(), 1.0)), &json!(["a", 1]), "tuple")?;
    let from_tuple = encoder::from_tuple((encoder::boolean(),));
    ensure_eq(&from_tuple.encode(&(false,)), &vec![json!(false)], "from_tuple")
}

#[test]
fn intersect_merges_outputs_with_right_winning() -> TestResult {
    let left = encoder::struct_([("a", number_field())]);
    let right: Encoder<Value, Value> = Encoder::new(|_: &Value| json!({ "a": "right", "b": 1 }));
    let encoder = encoder::intersect(&left, &right);
    ensure_eq(&encoder.encode(&json!({ "a": 1.0 })), &json!({ "a": "right", "b": 1 }), "right wins")
}

// ============================================================================
// SECTION: Sums, Lazy and Dynamic
// ============================================================================

#[test]
fn sum_dispatches_on_the_value_tag() -> TestResult {
    let encoder = encoder::sum(
        "type",
        [
            ("circle", encoder::struct_([("type", string_field()), ("radius", number_field())])),
            ("square", encoder::struct_([("type", string_field()), ("side", number_field())])),
        ],
    );
    ensure_eq(
        &encoder.encode(&json!({ "type": "square", "side": 2.0, "radius": 9.0 })),
        &json!({ "type": "square", "side": 2 }),
        "square member used",
    )
}

#[test]
fn sum_with_unknown_tag_encodes_default_and_warns() -> TestResult {
    let encoder = encoder::from_sum("type", [("circle", number_field())]);
    let (encoded, logs) = with_captured_warnings(|| encoder.encode(&json!({ "type": "hexagon" })));
    ensure_eq(&encoded, &Value::Null, "default output")?;
    ensure(logs.contains("no known tag"), format!("warning emitted: {logs}"))
}

#[test]
fn dynamic_passes_through_values_outside_the_typed_domain() -> TestResult {
    let encoder = number_field();
    ensure_eq(&encoder.encode(&json!(4.0)), &json!(4), "typed value in canonical form")?;
    let (encoded, logs) = with_captured_warnings(|| encoder.encode(&json!("four")));
    ensure_eq(&encoded, &json!("four"), "passed through")?;
    ensure(logs.contains("passing through"), format!("warning emitted: {logs}"))
}

#[test]
fn lazy_encodes_recursive_values() -> TestResult {
    /// Singly linked list: `{ head: number, tail: List | null }`.
    fn list() -> Encoder<Value, Value> {
        encoder::lazy("List", || {
            encoder::struct_([("head", number_field()), ("tail", encoder::dynamic(&encoder::nullable(&list())))])
        })
    }
    let value = json!({ "head": 1.0, "tail": { "head": 2.0, "tail": null, "x": 0 } });
    ensure_eq(
        &list().encode(&value),
        &json!({ "head": 1, "tail": { "head": 2, "tail": null } }),
        "nested list",
    )
}
