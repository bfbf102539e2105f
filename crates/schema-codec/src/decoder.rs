// crates/schema-codec/src/decoder.rs
// ============================================================================
// Module: Decoder Combinators
// Description: Validating parsers from an input representation to a domain value.
// Purpose: Provide the decode half of every codec combinator, with error
//          accumulation, tag dispatch and lazy recursion.
// Dependencies: crate::{error, limits, schemable, tuple}, serde_json, tracing
// ============================================================================

//! ## Overview
//! A [`Decoder<I, A>`] turns a borrowed `I` into an owned `A` or a
//! [`DecodeError`] tree. Decoders are immutable, cheap to clone and safe to
//! share across threads.
//!
//! Two families exist for containers:
//! - `from_*` combinators take an already-typed container (`Object`,
//!   `Vec<I>`) and only decode its contents.
//! - The plain combinators (`struct_`, `array`, `record`, `tuple`, `sum`)
//!   start from an untrusted [`Value`]: they first check the container kind
//!   (as `unknown_record` / `unknown_array` would) and then apply the
//!   matching `from_*` logic to the borrowed contents.
//!
//! Structural combinators accumulate: every failing field, element or
//! position is reported, not just the first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::OnceLock;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DecodeError;
use crate::error::DecodeResult;
use crate::limits::DepthGuard;
use crate::limits::RecursionLimits;
use crate::schemable::Intersect;
use crate::schemable::Literal;
use crate::schemable::Object;
use crate::schemable::Properties;
use crate::schemable::Schemable;
use crate::schemable::Tagged;
use crate::schemable::WithRefine;
use crate::schemable::WithUnion;
use crate::schemable::WithUnknownContainers;
use crate::schemable::canonicalize_numbers;
use crate::schemable::render_literals;
use crate::tuple::TupleDecoders;

// ============================================================================
// SECTION: Expected Kinds
// ============================================================================

/// Expected kind reported by [`string`].
const EXPECTED_STRING: &str = "string";
/// Expected kind reported by [`number`].
const EXPECTED_NUMBER: &str = "number";
/// Expected kind reported by [`boolean`].
const EXPECTED_BOOLEAN: &str = "boolean";
/// Expected kind reported by [`unknown_array`].
const EXPECTED_ARRAY: &str = "Array<unknown>";
/// Expected kind reported by [`unknown_record`].
const EXPECTED_RECORD: &str = "Record<string, unknown>";
/// Expected kind reported by the `null` branch of [`nullable`].
const EXPECTED_NULL: &str = "null";

// ============================================================================
// SECTION: Decoder Type
// ============================================================================

/// Shared decode function.
type DecodeFn<I, A> = dyn Fn(&I) -> DecodeResult<A> + Send + Sync;

/// A validating parser from `I` to `A`.
pub struct Decoder<I, A> {
    /// The decode function.
    run: Arc<DecodeFn<I, A>>,
}

impl<I, A> Clone for Decoder<I, A> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<I: 'static, A: 'static> Decoder<I, A> {
    /// Wraps a decode function.
    pub fn new<F>(decode: F) -> Self
    where
        F: Fn(&I) -> DecodeResult<A> + Send + Sync + 'static,
    {
        Self {
            run: Arc::new(decode),
        }
    }
}

/// Anything that can decode `I` into `A`.
///
/// Implemented by [`Decoder`] and [`Codec`](crate::Codec), so every decoder
/// combinator also accepts codecs.
pub trait Decode<I, A> {
    /// Decodes `input`.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] describing every location that failed.
    fn decode(&self, input: &I) -> DecodeResult<A>;

    /// Returns a standalone decoder with the same behavior.
    fn to_decoder(&self) -> Decoder<I, A>;
}

impl<I: 'static, A: 'static> Decode<I, A> for Decoder<I, A> {
    fn decode(&self, input: &I) -> DecodeResult<A> {
        (self.run)(input)
    }

    fn to_decoder(&self) -> Self {
        self.clone()
    }
}

// ============================================================================
// SECTION: Primitives
// ============================================================================

/// Builds a primitive decoder from an extractor and its expected kind.
fn primitive<A: 'static>(expected: &'static str, extract: fn(&Value) -> Option<A>) -> Decoder<Value, A> {
    Decoder::new(move |input: &Value| {
        extract(input).ok_or_else(|| DecodeError::expected(input.clone(), expected))
    })
}

/// Accepts any string.
#[must_use]
pub fn string() -> Decoder<Value, String> {
    primitive(EXPECTED_STRING, |value| value.as_str().map(str::to_string))
}

/// Accepts any finite number.
#[must_use]
pub fn number() -> Decoder<Value, f64> {
    primitive(EXPECTED_NUMBER, |value| value.as_f64().filter(|number| number.is_finite()))
}

/// Accepts any boolean.
#[must_use]
pub fn boolean() -> Decoder<Value, bool> {
    primitive(EXPECTED_BOOLEAN, Value::as_bool)
}

/// Accepts any array.
#[must_use]
pub fn unknown_array() -> Decoder<Value, Vec<Value>> {
    primitive(EXPECTED_ARRAY, |value| value.as_array().cloned())
}

/// Accepts any object.
#[must_use]
pub fn unknown_record() -> Decoder<Value, Object> {
    primitive(EXPECTED_RECORD, |value| value.as_object().cloned())
}

/// Accepts exactly one of `values`, returning the matching literal.
pub fn literal(values: impl IntoIterator<Item = Literal>) -> Decoder<Value, Literal> {
    let values: Vec<Literal> = values.into_iter().collect();
    let expected = render_literals(&values);
    Decoder::new(move |input: &Value| {
        values
            .iter()
            .find(|literal| literal.matches(input))
            .cloned()
            .ok_or_else(|| DecodeError::expected(input.clone(), expected.clone()))
    })
}

// ============================================================================
// SECTION: Mapping Combinators
// ============================================================================

/// Transforms successful results with `f`.
pub fn map<I, A, B, F>(from: &impl Decode<I, A>, f: F) -> Decoder<I, B>
where
    I: 'static,
    A: 'static,
    B: 'static,
    F: Fn(A) -> B + Send + Sync + 'static,
{
    let from = from.to_decoder();
    Decoder::new(move |input: &I| from.decode(input).map(&f))
}

/// Rewrites failures using both the original input and the raw error.
pub fn map_left_with_input<I, A, F>(from: &impl Decode<I, A>, f: F) -> Decoder<I, A>
where
    I: 'static,
    A: 'static,
    F: Fn(&I, DecodeError) -> DecodeError + Send + Sync + 'static,
{
    let from = from.to_decoder();
    Decoder::new(move |input: &I| from.decode(input).map_err(|error| f(input, error)))
}

/// Keeps only values satisfying `predicate`; rejections are leaves tagged `id`.
pub fn refine<I, A, P>(from: &impl Decode<I, A>, predicate: P, id: impl Into<String>) -> Decoder<I, A>
where
    I: 'static,
    A: Serialize + 'static,
    P: Fn(&A) -> bool + Send + Sync + 'static,
{
    let from = from.to_decoder();
    let id = id.into();
    Decoder::new(move |input: &I| {
        let value = from.decode(input)?;
        if predicate(&value) {
            Ok(value)
        } else {
            let actual = serde_json::to_value(&value).map_or(Value::Null, canonicalize_numbers);
            Err(DecodeError::expected(actual, id.clone()))
        }
    })
}

/// Runs `from`, then feeds its result to `to`. Either failure aborts as is.
pub fn compose<I, A, B>(from: &impl Decode<I, A>, to: &impl Decode<A, B>) -> Decoder<I, B>
where
    I: 'static,
    A: 'static,
    B: 'static,
{
    let from = from.to_decoder();
    let to = to.to_decoder();
    Decoder::new(move |input: &I| {
        let intermediate = from.decode(input)?;
        to.decode(&intermediate)
    })
}

/// Accepts `null` as `None`, or anything `or` accepts as `Some`.
pub fn nullable<A: 'static>(or: &impl Decode<Value, A>) -> Decoder<Value, Option<A>> {
    let or = or.to_decoder();
    Decoder::new(move |input: &Value| {
        if input.is_null() {
            return Ok(None);
        }
        or.decode(input).map(Some).map_err(|error| {
            DecodeError::composite(vec![
                DecodeError::member(0, DecodeError::expected(input.clone(), EXPECTED_NULL)),
                DecodeError::member(1, error),
            ])
        })
    })
}

/// Lifts a typed decoder into the dynamic value domain via serde.
///
/// Numbers in the result take their [`canonical_number`] form, matching what
/// the codec and encoder interpreters produce for the same schema.
///
/// [`canonical_number`]: crate::canonical_number
pub fn dynamic<A>(decoder: &impl Decode<Value, A>) -> Decoder<Value, Value>
where
    A: Serialize + 'static,
{
    let decoder = decoder.to_decoder();
    Decoder::new(move |input: &Value| {
        let value = decoder.decode(input)?;
        serde_json::to_value(&value).map(canonicalize_numbers).map_err(|err| {
            DecodeError::leaf(input.clone(), format!("decoded value has no dynamic form: {err}"))
        })
    })
}

// ============================================================================
// SECTION: Struct and Partial
// ============================================================================

/// Collects property decoders in declaration order.
fn collect_properties<K, D>(properties: impl IntoIterator<Item = (K, D)>) -> Vec<(String, Decoder<Value, Value>)>
where
    K: Into<String>,
    D: Decode<Value, Value>,
{
    properties.into_iter().map(|(key, decoder)| (key.into(), decoder.to_decoder())).collect()
}

/// Decodes every declared property; undeclared keys are dropped.
fn decode_struct(properties: &[(String, Decoder<Value, Value>)], object: &Object) -> DecodeResult<Value> {
    let mut decoded = Object::new();
    let mut errors = Vec::new();
    for (key, decoder) in properties {
        let Some(value) = object.get(key) else {
            errors.push(DecodeError::key(key.clone(), true, DecodeError::missing()));
            continue;
        };
        match decoder.decode(value) {
            Ok(value) => {
                decoded.insert(key.clone(), value);
            }
            Err(error) => errors.push(DecodeError::key(key.clone(), true, error)),
        }
    }
    if errors.is_empty() { Ok(Value::Object(decoded)) } else { Err(DecodeError::composite(errors)) }
}

/// Decodes the declared properties that are present.
fn decode_partial(properties: &[(String, Decoder<Value, Value>)], object: &Object) -> DecodeResult<Value> {
    let mut decoded = Object::new();
    let mut errors = Vec::new();
    for (key, decoder) in properties {
        let Some(value) = object.get(key) else {
            continue;
        };
        match decoder.decode(value) {
            Ok(value) => {
                decoded.insert(key.clone(), value);
            }
            Err(error) => errors.push(DecodeError::key(key.clone(), false, error)),
        }
    }
    if errors.is_empty() { Ok(Value::Object(decoded)) } else { Err(DecodeError::composite(errors)) }
}

/// Decodes the properties of an already-validated object.
pub fn from_struct<K, D>(properties: impl IntoIterator<Item = (K, D)>) -> Decoder<Object, Value>
where
    K: Into<String>,
    D: Decode<Value, Value>,
{
    let properties = collect_properties(properties);
    Decoder::new(move |object: &Object| decode_struct(&properties, object))
}

/// Decodes an untrusted value as an object with every property present.
///
/// Equivalent to `compose(unknown_record(), from_struct(properties))`.
pub fn struct_<K, D>(properties: impl IntoIterator<Item = (K, D)>) -> Decoder<Value, Value>
where
    K: Into<String>,
    D: Decode<Value, Value>,
{
    let properties = collect_properties(properties);
    Decoder::new(move |input: &Value| match input.as_object() {
        Some(object) => decode_struct(&properties, object),
        None => Err(DecodeError::expected(input.clone(), EXPECTED_RECORD)),
    })
}

/// Decodes the present properties of an already-validated object.
pub fn from_partial<K, D>(properties: impl IntoIterator<Item = (K, D)>) -> Decoder<Object, Value>
where
    K: Into<String>,
    D: Decode<Value, Value>,
{
    let properties = collect_properties(properties);
    Decoder::new(move |object: &Object| decode_partial(&properties, object))
}

/// Decodes an untrusted value as an object whose properties are optional.
pub fn partial<K, D>(properties: impl IntoIterator<Item = (K, D)>) -> Decoder<Value, Value>
where
    K: Into<String>,
    D: Decode<Value, Value>,
{
    let properties = collect_properties(properties);
    Decoder::new(move |input: &Value| match input.as_object() {
        Some(object) => decode_partial(&properties, object),
        None => Err(DecodeError::expected(input.clone(), EXPECTED_RECORD)),
    })
}

// ============================================================================
// SECTION: Arrays and Records
// ============================================================================

/// Decodes every element, reporting each failing index.
fn decode_items<I: 'static, A: 'static>(item: &Decoder<I, A>, items: &[I]) -> DecodeResult<Vec<A>> {
    let mut decoded = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (index, input) in items.iter().enumerate() {
        match item.decode(input) {
            Ok(value) => decoded.push(value),
            Err(error) => errors.push(DecodeError::index(index, error)),
        }
    }
    if errors.is_empty() { Ok(decoded) } else { Err(DecodeError::composite(errors)) }
}

/// Decodes every value of an object, reporting each failing key.
fn decode_entries<A: 'static>(codomain: &Decoder<Value, A>, object: &Object) -> DecodeResult<BTreeMap<String, A>> {
    let mut decoded = BTreeMap::new();
    let mut errors = Vec::new();
    for (key, input) in object {
        match codomain.decode(input) {
            Ok(value) => {
                decoded.insert(key.clone(), value);
            }
            Err(error) => errors.push(DecodeError::key(key.clone(), false, error)),
        }
    }
    if errors.is_empty() { Ok(decoded) } else { Err(DecodeError::composite(errors)) }
}

/// Decodes each element of an already-validated sequence.
pub fn from_array<I: 'static, A: 'static>(item: &impl Decode<I, A>) -> Decoder<Vec<I>, Vec<A>> {
    let item = item.to_decoder();
    Decoder::new(move |items: &Vec<I>| decode_items(&item, items))
}

/// Decodes an untrusted value as an array of `item`.
pub fn array<A: 'static>(item: &impl Decode<Value, A>) -> Decoder<Value, Vec<A>> {
    let item = item.to_decoder();
    Decoder::new(move |input: &Value| match input.as_array() {
        Some(items) => decode_items(&item, items),
        None => Err(DecodeError::expected(input.clone(), EXPECTED_ARRAY)),
    })
}

/// Decodes each value of an already-validated object; keys pass through.
pub fn from_record<A: 'static>(codomain: &impl Decode<Value, A>) -> Decoder<Object, BTreeMap<String, A>> {
    let codomain = codomain.to_decoder();
    Decoder::new(move |object: &Object| decode_entries(&codomain, object))
}

/// Decodes an untrusted value as an object whose values all match `codomain`.
pub fn record<A: 'static>(codomain: &impl Decode<Value, A>) -> Decoder<Value, BTreeMap<String, A>> {
    let codomain = codomain.to_decoder();
    Decoder::new(move |input: &Value| match input.as_object() {
        Some(object) => decode_entries(&codomain, object),
        None => Err(DecodeError::expected(input.clone(), EXPECTED_RECORD)),
    })
}

// ============================================================================
// SECTION: Tuples
// ============================================================================

/// Decodes an already-validated sequence position by position.
///
/// A sequence whose length differs from the tuple arity fails with
/// [`DecodeError::Arity`] before any position is decoded.
pub fn from_tuple<I, T>(components: T) -> Decoder<Vec<I>, T::Value>
where
    I: 'static,
    T: TupleDecoders<I>,
{
    Decoder::new(move |items: &Vec<I>| components.decode_items(items))
}

/// Decodes an untrusted value as a fixed-arity tuple.
pub fn tuple<T>(components: T) -> Decoder<Value, T::Value>
where
    T: TupleDecoders<Value>,
{
    Decoder::new(move |input: &Value| match input.as_array() {
        Some(items) => components.decode_items(items),
        None => Err(DecodeError::expected(input.clone(), EXPECTED_ARRAY)),
    })
}

// ============================================================================
// SECTION: Intersection and Unions
// ============================================================================

/// Decodes the same input with both sides and merges the results.
///
/// Failures of both sides are reported together.
pub fn intersect<I, A>(left: &impl Decode<I, A>, right: &impl Decode<I, A>) -> Decoder<I, A>
where
    I: 'static,
    A: Intersect + 'static,
{
    let left = left.to_decoder();
    let right = right.to_decoder();
    Decoder::new(move |input: &I| match (left.decode(input), right.decode(input)) {
        (Ok(left), Ok(right)) => Ok(left.intersect(right)),
        (Err(error), Ok(_)) | (Ok(_), Err(error)) => Err(error),
        (Err(left), Err(right)) => Err(DecodeError::composite(vec![left, right])),
    })
}

/// Selects a member by the string in `tag` and delegates to it.
fn dispatch<I: Tagged + 'static, A: 'static>(
    tag: &str,
    members: &BTreeMap<String, Decoder<I, A>>,
    input: &I,
) -> DecodeResult<A> {
    let actual = input.tag_value(tag);
    let selected = actual.and_then(Value::as_str).and_then(|value| members.get_key_value(value));
    let Some((value, member)) = selected else {
        return Err(DecodeError::unknown_tag(
            tag,
            actual.cloned().unwrap_or(Value::Null),
            members.keys().cloned().collect(),
        ));
    };
    member.decode(input).map_err(|error| DecodeError::tag(tag, value.clone(), error))
}

/// Collects sum members keyed by tag value.
fn collect_members<I, A, K, D>(members: impl IntoIterator<Item = (K, D)>) -> BTreeMap<String, Decoder<I, A>>
where
    I: 'static,
    A: 'static,
    K: Into<String>,
    D: Decode<I, A>,
{
    members.into_iter().map(|(key, decoder)| (key.into(), decoder.to_decoder())).collect()
}

/// Discriminated union over an already-validated object-like input.
///
/// Only the member named by the tag is invoked.
pub fn from_sum<I, A, K, D>(tag: impl Into<String>, members: impl IntoIterator<Item = (K, D)>) -> Decoder<I, A>
where
    I: Tagged + 'static,
    A: 'static,
    K: Into<String>,
    D: Decode<I, A>,
{
    let tag = tag.into();
    let members = collect_members(members);
    Decoder::new(move |input: &I| dispatch(&tag, &members, input))
}

/// Discriminated union over an untrusted value, which must be an object.
pub fn sum<A, K, D>(tag: impl Into<String>, members: impl IntoIterator<Item = (K, D)>) -> Decoder<Value, A>
where
    A: 'static,
    K: Into<String>,
    D: Decode<Value, A>,
{
    let tag = tag.into();
    let members = collect_members(members);
    Decoder::new(move |input: &Value| {
        if !input.is_object() {
            return Err(DecodeError::expected(input.clone(), EXPECTED_RECORD));
        }
        dispatch(&tag, &members, input)
    })
}

/// Tries `members` in order and returns the first success.
pub fn union<I, A, D>(members: impl IntoIterator<Item = D>) -> Decoder<I, A>
where
    I: 'static,
    A: 'static,
    D: Decode<I, A>,
{
    let members: Vec<Decoder<I, A>> = members.into_iter().map(|member| member.to_decoder()).collect();
    Decoder::new(move |input: &I| {
        let mut errors = Vec::with_capacity(members.len());
        for (index, member) in members.iter().enumerate() {
            match member.decode(input) {
                Ok(value) => return Ok(value),
                Err(error) => errors.push(DecodeError::member(index, error)),
            }
        }
        Err(DecodeError::composite(errors))
    })
}

// ============================================================================
// SECTION: Lazy
// ============================================================================

/// Defers building the decoder until the first decode call.
pub fn lazy<I, A, F>(id: impl Into<String>, f: F) -> Decoder<I, A>
where
    I: 'static,
    A: 'static,
    F: Fn() -> Decoder<I, A> + Send + Sync + 'static,
{
    lazy_with_limits(id, RecursionLimits::default(), f)
}

/// [`lazy`] with explicit recursion limits.
///
/// The thunk runs at most once per returned decoder; errors raised inside are
/// wrapped in a lazy branch carrying `id`.
pub fn lazy_with_limits<I, A, F>(id: impl Into<String>, limits: RecursionLimits, f: F) -> Decoder<I, A>
where
    I: 'static,
    A: 'static,
    F: Fn() -> Decoder<I, A> + Send + Sync + 'static,
{
    let id = id.into();
    let forced: OnceLock<Decoder<I, A>> = OnceLock::new();
    Decoder::new(move |input: &I| {
        let Some(_guard) = DepthGuard::enter(limits.max_depth()) else {
            tracing::debug!(schema = %id, max_depth = limits.max_depth(), "lazy recursion limit reached");
            return Err(DecodeError::TooDeep {
                id: id.clone(),
                max_depth: limits.max_depth(),
            });
        };
        let decoder = forced.get_or_init(|| {
            tracing::trace!(schema = %id, "forcing lazy decoder");
            f()
        });
        decoder.decode(input).map_err(|error| DecodeError::lazy(id.clone(), error))
    })
}

// ============================================================================
// SECTION: Schemable Instance
// ============================================================================

/// Interprets schemas as [`Decoder<Value, A>`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoderSchemable;

impl Schemable for DecoderSchemable {
    type Schema<A: 'static> = Decoder<Value, A>;

    fn literal(values: &[Literal]) -> Decoder<Value, Literal> {
        literal(values.iter().cloned())
    }

    fn string() -> Decoder<Value, String> {
        string()
    }

    fn number() -> Decoder<Value, f64> {
        number()
    }

    fn boolean() -> Decoder<Value, bool> {
        boolean()
    }

    fn nullable<A: 'static>(or: &Decoder<Value, A>) -> Decoder<Value, Option<A>> {
        nullable(or)
    }

    fn struct_(properties: Properties<Self>) -> Decoder<Value, Value> {
        struct_(properties)
    }

    fn partial(properties: Properties<Self>) -> Decoder<Value, Value> {
        partial(properties)
    }

    fn record<A: 'static>(codomain: &Decoder<Value, A>) -> Decoder<Value, BTreeMap<String, A>> {
        record(codomain)
    }

    fn array<A: 'static>(item: &Decoder<Value, A>) -> Decoder<Value, Vec<A>> {
        array(item)
    }

    fn tuple2<A: 'static, B: 'static>(
        first: &Decoder<Value, A>,
        second: &Decoder<Value, B>,
    ) -> Decoder<Value, (A, B)> {
        tuple((first.clone(), second.clone()))
    }

    fn tuple3<A: 'static, B: 'static, C: 'static>(
        first: &Decoder<Value, A>,
        second: &Decoder<Value, B>,
        third: &Decoder<Value, C>,
    ) -> Decoder<Value, (A, B, C)> {
        tuple((first.clone(), second.clone(), third.clone()))
    }

    fn intersect(left: &Decoder<Value, Value>, right: &Decoder<Value, Value>) -> Decoder<Value, Value> {
        intersect(left, right)
    }

    fn sum(tag: &str, members: Vec<(String, Decoder<Value, Value>)>) -> Decoder<Value, Value> {
        sum(tag, members)
    }

    fn lazy<A: 'static>(
        id: &str,
        f: impl Fn() -> Decoder<Value, A> + Send + Sync + 'static,
    ) -> Decoder<Value, A> {
        lazy(id, f)
    }

    fn dynamic<A>(schema: &Decoder<Value, A>) -> Decoder<Value, Value>
    where
        A: Serialize + DeserializeOwned + 'static,
    {
        dynamic(schema)
    }
}

impl WithUnknownContainers for DecoderSchemable {
    fn unknown_array() -> Decoder<Value, Vec<Value>> {
        unknown_array()
    }

    fn unknown_record() -> Decoder<Value, Object> {
        unknown_record()
    }
}

impl WithRefine for DecoderSchemable {
    fn refine<A>(
        from: &Decoder<Value, A>,
        predicate: impl Fn(&A) -> bool + Send + Sync + 'static,
        id: &str,
    ) -> Decoder<Value, A>
    where
        A: Serialize + 'static,
    {
        refine(from, predicate, id)
    }
}

impl WithUnion for DecoderSchemable {
    fn union<A: 'static>(members: &[Decoder<Value, A>]) -> Decoder<Value, A> {
        union(members.iter().cloned())
    }
}
