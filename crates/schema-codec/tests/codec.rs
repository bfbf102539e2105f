// crates/schema-codec/tests/codec.rs
// ============================================================================
// Module: Codec Tests
// Description: Behavioral coverage for codec combinators.
// Purpose: Check that each codec pairs the matching decoder and encoder and
//          that codec-only constructors behave as documented.
// Dependencies: schema_codec::codec, serde_json
// ============================================================================
//! ## Overview
//! Integration tests for codecs. The round-trip laws themselves are covered
//! by property tests in `laws.rs`; these tests pin concrete behavior.

// ============================================================================
// SECTION: Test Support
// ============================================================================

mod support;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use schema_codec::Codec;
use schema_codec::Decode;
use schema_codec::DecodeError;
use schema_codec::Decoder;
use schema_codec::Encode;
use schema_codec::Literal;
use schema_codec::Object;
use schema_codec::canonical_number;
use schema_codec::codec;
use schema_codec::decoder;
use schema_codec::encoder;
use serde_json::Value;
use serde_json::json;
use support::TestResult;
use support::ensure;
use support::ensure_eq;

/// Number field lifted into the dynamic domain.
fn number_field() -> Codec<Value, Value, Value> {
    codec::dynamic(&codec::number())
}

/// String field lifted into the dynamic domain.
fn string_field() -> Codec<Value, Value, Value> {
    codec::dynamic(&codec::string())
}

// ============================================================================
// SECTION: Constructors
// ============================================================================

#[test]
fn make_pairs_both_halves() -> TestResult {
    let upper = codec::make(
        &decoder::map(&decoder::string(), |text: String| text.to_uppercase()),
        &encoder::contramap(&encoder::string(), |text: &String| text.to_lowercase()),
    );
    ensure_eq(&upper.decode(&json!("abc")), &Ok("ABC".to_string()), "decode half")?;
    ensure_eq(&upper.encode(&"ABC".to_string()), &json!("abc"), "encode half")?;
    ensure_eq(&upper.decoder().decode(&json!("x")), &Ok("X".to_string()), "decoder accessor")?;
    ensure_eq(&upper.encoder().encode(&"X".to_string()), &json!("x"), "encoder accessor")
}

#[test]
fn from_decoder_encodes_with_identity() -> TestResult {
    let codec = codec::from_decoder(&decoder::unknown_record());
    let object = codec.decode(&json!({ "a": 1 }))?;
    ensure_eq(&codec.encode(&object), &object, "identity encoder")
}

#[test]
fn literal_round_trips_listed_values() -> TestResult {
    let codec = codec::literal([Literal::from("on"), Literal::from(false)]);
    let decoded = codec.decode(&json!(false))?;
    ensure_eq(&decoded, &Literal::Boolean(false), "decoded")?;
    ensure_eq(&codec.encode(&decoded), &json!(false), "encoded")
}

// ============================================================================
// SECTION: Mapping Combinators
// ============================================================================

#[test]
fn imap_maps_both_directions() -> TestResult {
    let reversed = codec::imap(
        &codec::string(),
        |text: String| text.chars().rev().collect::<String>(),
        |text: &String| text.chars().rev().collect::<String>(),
    );
    ensure_eq(&reversed.decode(&json!("abc")), &Ok("cba".to_string()), "decode maps")?;
    ensure_eq(&reversed.encode(&"cba".to_string()), &json!("abc"), "encode contramaps")
}

#[test]
fn refine_only_narrows_decoding() -> TestResult {
    let even = codec::refine(&codec::number(), |value: &f64| value % 2.0 == 0.0, "Even");
    ensure_eq(&even.decode(&json!(4)), &Ok(4.0), "accepted")?;
    ensure_eq(&even.decode(&json!(3)), &Err(DecodeError::expected(json!(3), "Even")), "rejected")?;
    ensure_eq(&even.encode(&3.0), &json!(3), "encoding unchanged")
}

#[test]
fn map_left_with_input_only_rewrites_errors() -> TestResult {
    let codec = codec::map_left_with_input(&codec::boolean(), |input: &Value, error| {
        DecodeError::leaf(input.clone(), format!("flag: {error}"))
    });
    let error = codec.decode(&json!("yes")).err().ok_or("expected failure")?;
    ensure_eq(&error.to_string(), &"flag: cannot decode \"yes\", should be boolean".to_string(), "message")?;
    ensure_eq(&codec.encode(&true), &json!(true), "encoding unchanged")
}

#[test]
fn compose_runs_outer_then_inner() -> TestResult {
    let names = codec::compose(&codec::unknown_array(), &codec::from_array(&codec::string()));
    let decoded = names.decode(&json!(["a", "b"]))?;
    ensure_eq(&decoded, &vec!["a".to_string(), "b".to_string()], "decoded")?;
    ensure_eq(&names.encode(&decoded), &json!(["a", "b"]), "encoded")?;
    ensure_eq(
        &names.decode(&json!("a")),
        &Err(DecodeError::expected(json!("a"), "Array<unknown>")),
        "outer failure",
    )
}

// ============================================================================
// SECTION: Object Combinators
// ============================================================================

#[test]
fn struct_strips_undeclared_keys_on_both_sides() -> TestResult {
    let person = codec::struct_([("name", string_field()), ("age", number_field())]);
    let decoded = person.decode(&json!({ "name": "Ada", "age": 36, "extra": 1 }))?;
    ensure_eq(&decoded, &json!({ "name": "Ada", "age": 36 }), "decoded")?;
    ensure_eq(&person.encode(&decoded), &decoded, "encoded")
}

#[test]
fn integral_numbers_round_trip_through_dynamic_fields() -> TestResult {
    let person = codec::struct_([("age", number_field())]);
    let value = json!({ "age": 36 });
    ensure_eq(&person.decode(&person.encode(&value)), &Ok(value.clone()), "integer domain value")?;
    let fractional = json!({ "age": 36.5 });
    ensure_eq(&person.decode(&person.encode(&fractional)), &Ok(fractional.clone()), "fractional domain value")?;
    ensure_eq(&person.decode(&json!({ "age": 36.0 })), &Ok(value), "integral float canonicalized")
}

#[test]
fn canonical_numbers_prefer_integers() -> TestResult {
    ensure_eq(&canonical_number(36.0), &json!(36), "integral")?;
    ensure_eq(&canonical_number(-0.0), &json!(0), "negative zero")?;
    ensure_eq(&canonical_number(1.5), &json!(1.5), "fraction")?;
    ensure_eq(&canonical_number(1e300), &json!(1e300), "beyond exact integers")?;
    ensure_eq(&canonical_number(f64::NAN), &Value::Null, "not a number")?;
    ensure_eq(&codec::number().encode(&9_007_199_254_740_992.0), &json!(9_007_199_254_740_992_i64), "largest exact")
}

#[test]
fn struct_agrees_with_composed_form() -> TestResult {
    let fused = codec::struct_([("a", number_field())]);
    let composed = codec::compose(&codec::unknown_record(), &codec::from_struct([("a", number_field())]));
    for input in [json!({ "a": 1, "b": 2 }), json!({ "a": "x" }), json!(null)] {
        ensure_eq(&fused.decode(&input), &composed.decode(&input), "decode agrees")?;
    }
    let value = json!({ "a": 1 });
    ensure_eq(&fused.encode(&value), &composed.encode(&value), "encode agrees")
}

#[test]
fn partial_codec_keeps_absent_fields_absent() -> TestResult {
    let settings = codec::partial([("theme", string_field()), ("zoom", number_field())]);
    let decoded = settings.decode(&json!({ "zoom": 2 }))?;
    ensure_eq(&decoded, &json!({ "zoom": 2 }), "decoded")?;
    ensure_eq(&settings.encode(&decoded), &json!({ "zoom": 2 }), "encoded")?;
    let from = codec::from_partial([("theme", string_field())]);
    ensure_eq(&from.decode(&Object::new()), &Ok(json!({})), "from_partial")
}

#[test]
fn intersect_codec_merges_both_sides() -> TestResult {
    let both = codec::intersect(&codec::struct_([("a", number_field())]), &codec::struct_([("b", string_field())]));
    let decoded = both.decode(&json!({ "a": 1, "b": "x" }))?;
    ensure_eq(&decoded, &json!({ "a": 1, "b": "x" }), "decoded")?;
    ensure_eq(&both.encode(&decoded), &decoded, "encoded")
}

#[test]
fn sum_codec_round_trips_members() -> TestResult {
    let shape = codec::sum(
        "type",
        [
            ("circle", codec::struct_([("type", string_field()), ("radius", number_field())])),
            ("square", codec::struct_([("type", string_field()), ("side", number_field())])),
        ],
    );
    let decoded = shape.decode(&json!({ "type": "circle", "radius": 1 }))?;
    ensure_eq(&shape.encode(&decoded), &json!({ "type": "circle", "radius": 1 }), "encoded")?;
    ensure(
        matches!(shape.decode(&json!({ "type": "triangle" })), Err(DecodeError::UnknownTag { .. })),
        "unknown tag rejected",
    )
}

#[test]
fn from_sum_codec_works_on_typed_objects() -> TestResult {
    let member = codec::from_struct([("kind", string_field())]);
    let sum = codec::from_sum("kind", [("a", member)]);
    let input: Object = [("kind".to_string(), json!("a"))].into_iter().collect();
    let decoded = sum.decode(&input)?;
    ensure_eq(&sum.encode(&decoded), &input, "round trip")
}

// ============================================================================
// SECTION: Containers
// ============================================================================

#[test]
fn containers_round_trip() -> TestResult {
    let scores = codec::record(&codec::array(&codec::number()));
    let decoded = scores.decode(&json!({ "ann": [1, 2], "bob": [] }))?;
    let expected: BTreeMap<String, Vec<f64>> =
        [("ann".to_string(), vec![1.0, 2.0]), ("bob".to_string(), Vec::new())].into_iter().collect();
    ensure_eq(&decoded, &expected, "decoded")?;
    ensure_eq(&scores.encode(&decoded), &json!({ "ann": [1, 2], "bob": [] }), "encoded")?;

    let from = codec::from_record(&codec::boolean());
    ensure_eq(&from.encode(&BTreeMap::from([("x".to_string(), true)])).len(), &1, "from_record")
}

#[test]
fn tuple_codec_round_trips_and_checks_arity() -> TestResult {
    let pair = codec::tuple(&(codec::string(), codec::nullable(&codec::number())));
    let decoded = pair.decode(&json!(["a", null]))?;
    ensure_eq(&decoded, &("a".to_string(), None), "decoded")?;
    ensure_eq(&pair.encode(&decoded), &json!(["a", null]), "encoded")?;
    ensure_eq(&pair.decode(&json!(["a", 1, 2])), &Err(DecodeError::arity(2, 3)), "arity")?;

    let from = codec::from_tuple(&(codec::boolean(), codec::boolean(), codec::string()));
    let items = vec![json!(true), json!(false), json!("z")];
    let decoded = from.decode(&items)?;
    ensure_eq(&from.encode(&decoded), &items, "from_tuple round trip")
}

// ============================================================================
// SECTION: Lazy
// ============================================================================

#[test]
fn lazy_codec_shares_one_forced_definition() -> TestResult {
    let forced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&forced);
    let codec = codec::lazy("Flag", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        codec::boolean()
    });
    ensure_eq(&codec.encode(&true), &json!(true), "encode forces")?;
    ensure_eq(&codec.decode(&json!(false)), &Ok(false), "decode reuses")?;
    ensure_eq(&forced.load(Ordering::SeqCst), &1, "thunk ran once")
}

/// Recursive category tree: `{ name: string, subcategories: Category[] }`.
fn category() -> Codec<Value, Value, Value> {
    codec::lazy("Category", || {
        codec::struct_([
            ("name", string_field()),
            ("subcategories", codec::dynamic(&codec::array(&category()))),
        ])
    })
}

#[test]
fn lazy_codec_round_trips_recursive_values() -> TestResult {
    let tree = json!({
        "name": "root",
        "subcategories": [{ "name": "leaf", "subcategories": [], "note": "dropped" }]
    });
    let decoded = category().decode(&tree)?;
    ensure_eq(
        &category().encode(&decoded),
        &json!({ "name": "root", "subcategories": [{ "name": "leaf", "subcategories": [] }] }),
        "encoded",
    )
}

/// Times the shared outline thunk has run.
static OUTLINE_FORCED: AtomicUsize = AtomicUsize::new(0);

/// Recursive outline `Array<Outline>` referring to itself through one shared instance.
static OUTLINE: LazyLock<Codec<Value, Value, Value>> = LazyLock::new(|| {
    codec::lazy("Outline", || {
        OUTLINE_FORCED.fetch_add(1, Ordering::SeqCst);
        codec::dynamic(&codec::array(&*OUTLINE))
    })
});

#[test]
fn shared_self_reference_forces_once_across_levels() -> TestResult {
    let tree = json!([[[]], [[], [[]]]]);
    ensure_eq(&OUTLINE.decode(&tree), &Ok(tree.clone()), "three levels decoded")?;
    ensure_eq(&OUTLINE.encode(&tree), &tree, "encoded")?;
    ensure_eq(&OUTLINE.decode(&tree), &Ok(tree.clone()), "decoded again")?;
    ensure_eq(&OUTLINE_FORCED.load(Ordering::SeqCst), &1, "one definition for every level")
}

#[test]
fn codecs_are_accepted_where_decoders_are_expected() -> TestResult {
    let as_decoder: Decoder<Value, f64> = decoder::refine(&codec::number(), |value: &f64| *value >= 0.0, "NonNegative");
    ensure(as_decoder.decode(&json!(1)).is_ok(), "codec used as decoder")?;
    ensure_eq(&encoder::nullable(&codec::number()).encode(&Some(1.0)), &json!(1), "codec used as encoder")
}
