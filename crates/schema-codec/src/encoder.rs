// crates/schema-codec/src/encoder.rs
// ============================================================================
// Module: Encoder Combinators
// Description: Total functions from a domain value to an output representation.
// Purpose: Provide the encode half of every codec combinator.
// Dependencies: crate::{schemable, tuple}, serde_json, tracing
// ============================================================================

//! ## Overview
//! An [`Encoder<O, A>`] renders an `A` as an `O`. Encoding never fails: it
//! trusts that its input came from the matching decoder (or was built by
//! hand to satisfy it).
//!
//! `compose` reads right to left on the encode side: the outer encoder runs
//! first and its output is fed to the inner one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::OnceLock;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::schemable::Intersect;
use crate::schemable::Literal;
use crate::schemable::Object;
use crate::schemable::Properties;
use crate::schemable::Schemable;
use crate::schemable::Tagged;
use crate::schemable::WithRefine;
use crate::schemable::WithUnknownContainers;
use crate::schemable::canonical_number;
use crate::tuple::TupleEncoders;

// ============================================================================
// SECTION: Encoder Type
// ============================================================================

/// Shared encode function.
type EncodeFn<O, A> = dyn Fn(&A) -> O + Send + Sync;

/// A total renderer from `A` to `O`.
pub struct Encoder<O, A> {
    /// The encode function.
    run: Arc<EncodeFn<O, A>>,
}

impl<O, A> Clone for Encoder<O, A> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<O: 'static, A: 'static> Encoder<O, A> {
    /// Wraps an encode function.
    pub fn new<F>(encode: F) -> Self
    where
        F: Fn(&A) -> O + Send + Sync + 'static,
    {
        Self {
            run: Arc::new(encode),
        }
    }
}

/// Anything that can encode `A` into `O`.
///
/// Implemented by [`Encoder`] and [`Codec`](crate::Codec).
pub trait Encode<O, A> {
    /// Encodes `value`.
    fn encode(&self, value: &A) -> O;

    /// Returns a standalone encoder with the same behavior.
    fn to_encoder(&self) -> Encoder<O, A>;
}

impl<O: 'static, A: 'static> Encode<O, A> for Encoder<O, A> {
    fn encode(&self, value: &A) -> O {
        (self.run)(value)
    }

    fn to_encoder(&self) -> Self {
        self.clone()
    }
}

// ============================================================================
// SECTION: Primitives
// ============================================================================

/// Returns its input unchanged.
#[must_use]
pub fn id<A: Clone + 'static>() -> Encoder<A, A> {
    Encoder::new(A::clone)
}

/// Renders a string.
#[must_use]
pub fn string() -> Encoder<Value, String> {
    Encoder::new(|value: &String| Value::String(value.clone()))
}

/// Renders a number in its [`canonical_number`] form; non-finite numbers
/// have no interchange form and become `null`.
#[must_use]
pub fn number() -> Encoder<Value, f64> {
    Encoder::new(|value: &f64| canonical_number(*value))
}

/// Renders a boolean.
#[must_use]
pub fn boolean() -> Encoder<Value, bool> {
    Encoder::new(|value: &bool| Value::Bool(*value))
}

/// Renders a literal.
#[must_use]
pub fn literal() -> Encoder<Value, Literal> {
    Encoder::new(Literal::to_value)
}

/// Renders an untyped sequence.
#[must_use]
pub fn unknown_array() -> Encoder<Value, Vec<Value>> {
    Encoder::new(|items: &Vec<Value>| Value::Array(items.clone()))
}

/// Renders an untyped object.
#[must_use]
pub fn unknown_record() -> Encoder<Value, Object> {
    Encoder::new(|object: &Object| Value::Object(object.clone()))
}

// ============================================================================
// SECTION: Mapping Combinators
// ============================================================================

/// Adapts `from` to a new domain by mapping values back with `f` first.
pub fn contramap<O, A, B, F>(from: &impl Encode<O, A>, f: F) -> Encoder<O, B>
where
    O: 'static,
    A: 'static,
    B: 'static,
    F: Fn(&B) -> A + Send + Sync + 'static,
{
    let from = from.to_encoder();
    Encoder::new(move |value: &B| from.encode(&f(value)))
}

/// Encodes with `to`, then encodes the intermediate result with `from`.
pub fn compose<O, A, B>(from: &impl Encode<O, A>, to: &impl Encode<A, B>) -> Encoder<O, B>
where
    O: 'static,
    A: 'static,
    B: 'static,
{
    let from = from.to_encoder();
    let to = to.to_encoder();
    Encoder::new(move |value: &B| from.encode(&to.encode(value)))
}

/// Renders `None` as `null` and `Some` with `or`.
pub fn nullable<A: 'static>(or: &impl Encode<Value, A>) -> Encoder<Value, Option<A>> {
    let or = or.to_encoder();
    Encoder::new(move |value: &Option<A>| value.as_ref().map_or(Value::Null, |inner| or.encode(inner)))
}

/// Lowers a dynamic value to the typed encoder's domain via serde.
///
/// Values that do not deserialize into `A` are passed through unchanged and
/// reported at warn level.
pub fn dynamic<A>(encoder: &impl Encode<Value, A>) -> Encoder<Value, Value>
where
    A: DeserializeOwned + 'static,
{
    let encoder = encoder.to_encoder();
    Encoder::new(move |value: &Value| match serde_json::from_value::<A>(value.clone()) {
        Ok(typed) => encoder.encode(&typed),
        Err(err) => {
            tracing::warn!(error = %err, "dynamic value does not fit typed encoder; passing through");
            value.clone()
        }
    })
}

// ============================================================================
// SECTION: Struct and Partial
// ============================================================================

/// Collects property encoders in declaration order.
fn collect_properties<K, E>(properties: impl IntoIterator<Item = (K, E)>) -> Vec<(String, Encoder<Value, Value>)>
where
    K: Into<String>,
    E: Encode<Value, Value>,
{
    properties.into_iter().map(|(key, encoder)| (key.into(), encoder.to_encoder())).collect()
}

/// Encodes the declared properties that are present; other keys are dropped.
fn encode_properties(properties: &[(String, Encoder<Value, Value>)], value: &Value) -> Object {
    let mut encoded = Object::new();
    let Some(object) = value.as_object() else {
        return encoded;
    };
    for (key, encoder) in properties {
        if let Some(field) = object.get(key) {
            encoded.insert(key.clone(), encoder.encode(field));
        }
    }
    encoded
}

/// Encodes the declared properties of an object-shaped value.
pub fn from_struct<K, E>(properties: impl IntoIterator<Item = (K, E)>) -> Encoder<Object, Value>
where
    K: Into<String>,
    E: Encode<Value, Value>,
{
    let properties = collect_properties(properties);
    Encoder::new(move |value: &Value| encode_properties(&properties, value))
}

/// [`from_struct`] rendered as a plain value.
pub fn struct_<K, E>(properties: impl IntoIterator<Item = (K, E)>) -> Encoder<Value, Value>
where
    K: Into<String>,
    E: Encode<Value, Value>,
{
    let properties = collect_properties(properties);
    Encoder::new(move |value: &Value| Value::Object(encode_properties(&properties, value)))
}

/// Encodes the present declared properties; absent ones stay absent.
pub fn from_partial<K, E>(properties: impl IntoIterator<Item = (K, E)>) -> Encoder<Object, Value>
where
    K: Into<String>,
    E: Encode<Value, Value>,
{
    from_struct(properties)
}

/// [`from_partial`] rendered as a plain value.
pub fn partial<K, E>(properties: impl IntoIterator<Item = (K, E)>) -> Encoder<Value, Value>
where
    K: Into<String>,
    E: Encode<Value, Value>,
{
    struct_(properties)
}

// ============================================================================
// SECTION: Arrays and Records
// ============================================================================

/// Encodes each element.
pub fn from_array<O: 'static, A: 'static>(item: &impl Encode<O, A>) -> Encoder<Vec<O>, Vec<A>> {
    let item = item.to_encoder();
    Encoder::new(move |values: &Vec<A>| values.iter().map(|value| item.encode(value)).collect())
}

/// [`from_array`] rendered as a plain value.
pub fn array<A: 'static>(item: &impl Encode<Value, A>) -> Encoder<Value, Vec<A>> {
    let item = item.to_encoder();
    Encoder::new(move |values: &Vec<A>| Value::Array(values.iter().map(|value| item.encode(value)).collect()))
}

/// Encodes each value of a map; keys pass through.
pub fn from_record<A: 'static>(codomain: &impl Encode<Value, A>) -> Encoder<Object, BTreeMap<String, A>> {
    let codomain = codomain.to_encoder();
    Encoder::new(move |entries: &BTreeMap<String, A>| {
        entries.iter().map(|(key, value)| (key.clone(), codomain.encode(value))).collect()
    })
}

/// [`from_record`] rendered as a plain value.
pub fn record<A: 'static>(codomain: &impl Encode<Value, A>) -> Encoder<Value, BTreeMap<String, A>> {
    let from = from_record(codomain);
    Encoder::new(move |entries: &BTreeMap<String, A>| Value::Object(from.encode(entries)))
}

// ============================================================================
// SECTION: Tuples
// ============================================================================

/// Encodes each tuple position in order.
pub fn from_tuple<O, T>(components: T) -> Encoder<Vec<O>, T::Value>
where
    O: 'static,
    T: TupleEncoders<O>,
{
    Encoder::new(move |value: &T::Value| components.encode_items(value))
}

/// [`from_tuple`] rendered as a plain value.
pub fn tuple<T>(components: T) -> Encoder<Value, T::Value>
where
    T: TupleEncoders<Value>,
{
    Encoder::new(move |value: &T::Value| Value::Array(components.encode_items(value)))
}

// ============================================================================
// SECTION: Intersection and Sums
// ============================================================================

/// Encodes with both sides and merges the outputs.
pub fn intersect<O, A>(left: &impl Encode<O, A>, right: &impl Encode<O, A>) -> Encoder<O, A>
where
    O: Intersect + 'static,
    A: 'static,
{
    let left = left.to_encoder();
    let right = right.to_encoder();
    Encoder::new(move |value: &A| left.encode(value).intersect(right.encode(value)))
}

/// Encodes with the member named by the value's tag.
///
/// A value whose tag names no member encodes as `O::default()` and is
/// reported at warn level.
pub fn sum<O, A, K, E>(tag: impl Into<String>, members: impl IntoIterator<Item = (K, E)>) -> Encoder<O, A>
where
    O: Default + 'static,
    A: Tagged + 'static,
    K: Into<String>,
    E: Encode<O, A>,
{
    let tag = tag.into();
    let members: BTreeMap<String, Encoder<O, A>> =
        members.into_iter().map(|(key, encoder)| (key.into(), encoder.to_encoder())).collect();
    Encoder::new(move |value: &A| {
        let selected = value.tag_value(&tag).and_then(Value::as_str).and_then(|key| members.get(key));
        if let Some(member) = selected {
            member.encode(value)
        } else {
            tracing::warn!(tag = %tag, "sum value carries no known tag; encoding default");
            O::default()
        }
    })
}

/// Sum encoder over object-like outputs; identical to [`sum`] since encoding
/// has no untrusted container to check.
pub fn from_sum<O, A, K, E>(tag: impl Into<String>, members: impl IntoIterator<Item = (K, E)>) -> Encoder<O, A>
where
    O: Default + 'static,
    A: Tagged + 'static,
    K: Into<String>,
    E: Encode<O, A>,
{
    sum(tag, members)
}

// ============================================================================
// SECTION: Lazy
// ============================================================================

/// Defers building the encoder until the first encode call.
pub fn lazy<O, A, F>(id: impl Into<String>, f: F) -> Encoder<O, A>
where
    O: 'static,
    A: 'static,
    F: Fn() -> Encoder<O, A> + Send + Sync + 'static,
{
    let id = id.into();
    let forced: OnceLock<Encoder<O, A>> = OnceLock::new();
    Encoder::new(move |value: &A| {
        let encoder = forced.get_or_init(|| {
            tracing::trace!(schema = %id, "forcing lazy encoder");
            f()
        });
        encoder.encode(value)
    })
}

// ============================================================================
// SECTION: Schemable Instance
// ============================================================================

/// Interprets schemas as [`Encoder<Value, A>`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EncoderSchemable;

impl Schemable for EncoderSchemable {
    type Schema<A: 'static> = Encoder<Value, A>;

    fn literal(_values: &[Literal]) -> Encoder<Value, Literal> {
        literal()
    }

    fn string() -> Encoder<Value, String> {
        string()
    }

    fn number() -> Encoder<Value, f64> {
        number()
    }

    fn boolean() -> Encoder<Value, bool> {
        boolean()
    }

    fn nullable<A: 'static>(or: &Encoder<Value, A>) -> Encoder<Value, Option<A>> {
        nullable(or)
    }

    fn struct_(properties: Properties<Self>) -> Encoder<Value, Value> {
        struct_(properties)
    }

    fn partial(properties: Properties<Self>) -> Encoder<Value, Value> {
        partial(properties)
    }

    fn record<A: 'static>(codomain: &Encoder<Value, A>) -> Encoder<Value, BTreeMap<String, A>> {
        record(codomain)
    }

    fn array<A: 'static>(item: &Encoder<Value, A>) -> Encoder<Value, Vec<A>> {
        array(item)
    }

    fn tuple2<A: 'static, B: 'static>(
        first: &Encoder<Value, A>,
        second: &Encoder<Value, B>,
    ) -> Encoder<Value, (A, B)> {
        tuple((first.clone(), second.clone()))
    }

    fn tuple3<A: 'static, B: 'static, C: 'static>(
        first: &Encoder<Value, A>,
        second: &Encoder<Value, B>,
        third: &Encoder<Value, C>,
    ) -> Encoder<Value, (A, B, C)> {
        tuple((first.clone(), second.clone(), third.clone()))
    }

    fn intersect(left: &Encoder<Value, Value>, right: &Encoder<Value, Value>) -> Encoder<Value, Value> {
        intersect(left, right)
    }

    fn sum(tag: &str, members: Vec<(String, Encoder<Value, Value>)>) -> Encoder<Value, Value> {
        sum(tag, members)
    }

    fn lazy<A: 'static>(
        id: &str,
        f: impl Fn() -> Encoder<Value, A> + Send + Sync + 'static,
    ) -> Encoder<Value, A> {
        lazy(id, f)
    }

    fn dynamic<A>(schema: &Encoder<Value, A>) -> Encoder<Value, Value>
    where
        A: Serialize + DeserializeOwned + 'static,
    {
        dynamic(schema)
    }
}

impl WithUnknownContainers for EncoderSchemable {
    fn unknown_array() -> Encoder<Value, Vec<Value>> {
        unknown_array()
    }

    fn unknown_record() -> Encoder<Value, Object> {
        unknown_record()
    }
}

impl WithRefine for EncoderSchemable {
    fn refine<A>(
        from: &Encoder<Value, A>,
        _predicate: impl Fn(&A) -> bool + Send + Sync + 'static,
        _id: &str,
    ) -> Encoder<Value, A>
    where
        A: Serialize + 'static,
    {
        from.clone()
    }
}
