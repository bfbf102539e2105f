// crates/schema-codec/src/codec.rs
// ============================================================================
// Module: Codec Combinators
// Description: Paired decoders and encoders built from a single description.
// Purpose: Keep both directions of a schema in sync so that decode/encode
//          round trips hold by construction.
// Dependencies: crate::{decoder, encoder, limits, schemable, tuple}
// ============================================================================

//! ## Overview
//! A [`Codec<I, O, A>`] decodes `I` into `A` and encodes `A` into `O`. Every
//! combinator here builds its decoder and encoder from the matching
//! combinators in [`decoder`](crate::decoder) and [`encoder`](crate::encoder),
//! which is what keeps the two directions consistent.
//!
//! Codecs satisfy two round-trip laws:
//! - Law A, for every input `u` with `decode(u) == Ok(a)`:
//!   `decode(encode(a)) == Ok(a)`.
//! - Law B, for every domain value `a`: `decode(encode(a)) == Ok(a)`.
//!
//! Law B quantifies over the codec's domain. Typed domains (`String`,
//! `Vec<A>`, tuples, maps) contain every value of the type, `f64` only finite
//! values, and a [`refine`] only values its predicate accepts. A [`dynamic`]
//! domain contains only values in canonical form: declared keys only, and
//! numbers as [`canonical_number`](crate::canonical_number) renders them
//! (`36` rather than `36.0`). Encoded outputs are always canonical, so
//! `decode(o).map(encode) == Ok(o)` holds for every output `o`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::OnceLock;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::decoder;
use crate::decoder::Decode;
use crate::decoder::Decoder;
use crate::encoder;
use crate::encoder::Encode;
use crate::encoder::Encoder;
use crate::error::DecodeError;
use crate::error::DecodeResult;
use crate::limits::RecursionLimits;
use crate::schemable::Intersect;
use crate::schemable::Literal;
use crate::schemable::Object;
use crate::schemable::Properties;
use crate::schemable::Schemable;
use crate::schemable::Tagged;
use crate::schemable::WithRefine;
use crate::schemable::WithUnknownContainers;
use crate::tuple::TupleCodecs;

// ============================================================================
// SECTION: Codec Type
// ============================================================================

/// A decoder from `I` to `A` paired with an encoder from `A` to `O`.
pub struct Codec<I, O, A> {
    /// Decode half.
    decoder: Decoder<I, A>,
    /// Encode half.
    encoder: Encoder<O, A>,
}

impl<I, O, A> Clone for Codec<I, O, A> {
    fn clone(&self) -> Self {
        Self {
            decoder: self.decoder.clone(),
            encoder: self.encoder.clone(),
        }
    }
}

impl<I: 'static, O: 'static, A: 'static> Codec<I, O, A> {
    /// Returns the decode half.
    #[must_use]
    pub const fn decoder(&self) -> &Decoder<I, A> {
        &self.decoder
    }

    /// Returns the encode half.
    #[must_use]
    pub const fn encoder(&self) -> &Encoder<O, A> {
        &self.encoder
    }
}

impl<I: 'static, O: 'static, A: 'static> Decode<I, A> for Codec<I, O, A> {
    fn decode(&self, input: &I) -> DecodeResult<A> {
        self.decoder.decode(input)
    }

    fn to_decoder(&self) -> Decoder<I, A> {
        self.decoder.clone()
    }
}

impl<I: 'static, O: 'static, A: 'static> Encode<O, A> for Codec<I, O, A> {
    fn encode(&self, value: &A) -> O {
        self.encoder.encode(value)
    }

    fn to_encoder(&self) -> Encoder<O, A> {
        self.encoder.clone()
    }
}

// ============================================================================
// SECTION: Constructors
// ============================================================================

/// Pairs a decoder with an encoder.
pub fn make<I, O, A>(decoder: &impl Decode<I, A>, encoder: &impl Encode<O, A>) -> Codec<I, O, A>
where
    I: 'static,
    O: 'static,
    A: 'static,
{
    Codec {
        decoder: decoder.to_decoder(),
        encoder: encoder.to_encoder(),
    }
}

/// Pairs a decoder with the identity encoder.
pub fn from_decoder<I, A>(decoder: &impl Decode<I, A>) -> Codec<I, A, A>
where
    I: 'static,
    A: Clone + 'static,
{
    make(decoder, &encoder::id())
}

// ============================================================================
// SECTION: Primitives
// ============================================================================

/// Exactly one of `values`.
pub fn literal(values: impl IntoIterator<Item = Literal>) -> Codec<Value, Value, Literal> {
    make(&decoder::literal(values), &encoder::literal())
}

/// Any string.
#[must_use]
pub fn string() -> Codec<Value, Value, String> {
    make(&decoder::string(), &encoder::string())
}

/// Any finite number.
#[must_use]
pub fn number() -> Codec<Value, Value, f64> {
    make(&decoder::number(), &encoder::number())
}

/// Any boolean.
#[must_use]
pub fn boolean() -> Codec<Value, Value, bool> {
    make(&decoder::boolean(), &encoder::boolean())
}

/// Any array, kept untyped.
#[must_use]
pub fn unknown_array() -> Codec<Value, Value, Vec<Value>> {
    make(&decoder::unknown_array(), &encoder::unknown_array())
}

/// Any object, kept untyped.
#[must_use]
pub fn unknown_record() -> Codec<Value, Value, Object> {
    make(&decoder::unknown_record(), &encoder::unknown_record())
}

// ============================================================================
// SECTION: Mapping Combinators
// ============================================================================

/// Rewrites decode failures; encoding is unchanged.
pub fn map_left_with_input<I, O, A, F>(codec: &Codec<I, O, A>, f: F) -> Codec<I, O, A>
where
    I: 'static,
    O: 'static,
    A: 'static,
    F: Fn(&I, DecodeError) -> DecodeError + Send + Sync + 'static,
{
    make(&decoder::map_left_with_input(codec, f), codec)
}

/// Narrows the decoded domain; encoding is unchanged.
pub fn refine<I, O, A, P>(from: &Codec<I, O, A>, predicate: P, id: impl Into<String>) -> Codec<I, O, A>
where
    I: 'static,
    O: 'static,
    A: Serialize + 'static,
    P: Fn(&A) -> bool + Send + Sync + 'static,
{
    make(&decoder::refine(from, predicate, id), from)
}

/// Maps the domain both ways: `f` after decoding, `g` before encoding.
pub fn imap<I, O, A, B, F, G>(codec: &Codec<I, O, A>, f: F, g: G) -> Codec<I, O, B>
where
    I: 'static,
    O: 'static,
    A: 'static,
    B: 'static,
    F: Fn(A) -> B + Send + Sync + 'static,
    G: Fn(&B) -> A + Send + Sync + 'static,
{
    make(&decoder::map(codec, f), &encoder::contramap(codec, g))
}

/// Chains two codecs: `from` handles the outer representation and `to`
/// refines its domain further.
pub fn compose<I, O, A, B>(from: &Codec<I, O, A>, to: &Codec<A, A, B>) -> Codec<I, O, B>
where
    I: 'static,
    O: 'static,
    A: 'static,
    B: 'static,
{
    make(&decoder::compose(from, to), &encoder::compose(from, to))
}

/// `null` as `None`, anything `or` accepts as `Some`.
pub fn nullable<A: 'static>(or: &Codec<Value, Value, A>) -> Codec<Value, Value, Option<A>> {
    make(&decoder::nullable(or), &encoder::nullable(or))
}

/// Lifts a typed codec into the dynamic value domain.
///
/// Decoding yields the canonical encoded form of the decoded value, so the
/// dynamic domain coincides with the codec's output and encoding is the
/// identity. Domain values built by hand must already be canonical: numbers
/// in their [`canonical_number`](crate::canonical_number) form and objects
/// without undeclared keys. A value such as `{"age": 36.0}` encodes as
/// itself and decodes back as `{"age": 36}`.
pub fn dynamic<A: 'static>(codec: &Codec<Value, Value, A>) -> Codec<Value, Value, Value> {
    let inner = codec.clone();
    let decoder = Decoder::new(move |input: &Value| {
        let value = inner.decode(input)?;
        Ok(inner.encode(&value))
    });
    make(&decoder, &encoder::id())
}

// ============================================================================
// SECTION: Struct and Partial
// ============================================================================

/// Collects property codecs in declaration order.
fn collect_properties<K>(
    properties: impl IntoIterator<Item = (K, Codec<Value, Value, Value>)>,
) -> Vec<(String, Codec<Value, Value, Value>)>
where
    K: Into<String>,
{
    properties.into_iter().map(|(key, codec)| (key.into(), codec)).collect()
}

/// Object properties over an already-validated object.
pub fn from_struct<K>(properties: impl IntoIterator<Item = (K, Codec<Value, Value, Value>)>) -> Codec<Object, Object, Value>
where
    K: Into<String>,
{
    let properties = collect_properties(properties);
    make(&decoder::from_struct(properties.clone()), &encoder::from_struct(properties))
}

/// An object with every listed property present; undeclared keys are dropped.
///
/// Equivalent to `compose(&unknown_record(), &from_struct(properties))`.
pub fn struct_<K>(properties: impl IntoIterator<Item = (K, Codec<Value, Value, Value>)>) -> Codec<Value, Value, Value>
where
    K: Into<String>,
{
    let properties = collect_properties(properties);
    make(&decoder::struct_(properties.clone()), &encoder::struct_(properties))
}

/// Optional object properties over an already-validated object.
pub fn from_partial<K>(
    properties: impl IntoIterator<Item = (K, Codec<Value, Value, Value>)>,
) -> Codec<Object, Object, Value>
where
    K: Into<String>,
{
    let properties = collect_properties(properties);
    make(&decoder::from_partial(properties.clone()), &encoder::from_partial(properties))
}

/// An object whose listed properties are optional.
pub fn partial<K>(properties: impl IntoIterator<Item = (K, Codec<Value, Value, Value>)>) -> Codec<Value, Value, Value>
where
    K: Into<String>,
{
    let properties = collect_properties(properties);
    make(&decoder::partial(properties.clone()), &encoder::partial(properties))
}

// ============================================================================
// SECTION: Arrays, Records and Tuples
// ============================================================================

/// Element-wise codec over an already-validated sequence.
pub fn from_array<I, O, A>(item: &Codec<I, O, A>) -> Codec<Vec<I>, Vec<O>, Vec<A>>
where
    I: 'static,
    O: 'static,
    A: 'static,
{
    make(&decoder::from_array(item), &encoder::from_array(item))
}

/// A sequence whose elements all match `item`.
pub fn array<A: 'static>(item: &Codec<Value, Value, A>) -> Codec<Value, Value, Vec<A>> {
    make(&decoder::array(item), &encoder::array(item))
}

/// Value-wise codec over an already-validated object.
pub fn from_record<A: 'static>(codomain: &Codec<Value, Value, A>) -> Codec<Object, Object, BTreeMap<String, A>> {
    make(&decoder::from_record(codomain), &encoder::from_record(codomain))
}

/// An object whose values all match `codomain`.
pub fn record<A: 'static>(codomain: &Codec<Value, Value, A>) -> Codec<Value, Value, BTreeMap<String, A>> {
    make(&decoder::record(codomain), &encoder::record(codomain))
}

/// Position-wise codec over an already-validated sequence.
pub fn from_tuple<I, O, T>(components: &T) -> Codec<Vec<I>, Vec<O>, T::Value>
where
    I: 'static,
    O: 'static,
    T: TupleCodecs<I, O>,
{
    let (decoders, encoders) = components.split();
    make(&decoder::from_tuple(decoders), &encoder::from_tuple(encoders))
}

/// A fixed-arity sequence decoded into a native tuple.
pub fn tuple<T>(components: &T) -> Codec<Value, Value, T::Value>
where
    T: TupleCodecs<Value, Value>,
{
    let (decoders, encoders) = components.split();
    make(&decoder::tuple(decoders), &encoder::tuple(encoders))
}

// ============================================================================
// SECTION: Intersection and Sums
// ============================================================================

/// Values accepted by both sides; decoded values and encoded outputs are merged.
pub fn intersect<I, O, A>(left: &Codec<I, O, A>, right: &Codec<I, O, A>) -> Codec<I, O, A>
where
    I: 'static,
    O: Intersect + 'static,
    A: Intersect + 'static,
{
    make(&decoder::intersect(left, right), &encoder::intersect(left, right))
}

/// Discriminated union over an already-validated object-like input.
pub fn from_sum<I, O, A, K>(
    tag: impl Into<String>,
    members: impl IntoIterator<Item = (K, Codec<I, O, A>)>,
) -> Codec<I, O, A>
where
    I: Tagged + 'static,
    O: Default + 'static,
    A: Tagged + 'static,
    K: Into<String>,
{
    let tag = tag.into();
    let members: Vec<(String, Codec<I, O, A>)> = members.into_iter().map(|(key, codec)| (key.into(), codec)).collect();
    make(&decoder::from_sum(tag.clone(), members.clone()), &encoder::from_sum(tag, members))
}

/// Discriminated union over an untrusted value.
pub fn sum<O, A, K>(tag: impl Into<String>, members: impl IntoIterator<Item = (K, Codec<Value, O, A>)>) -> Codec<Value, O, A>
where
    O: Default + 'static,
    A: Tagged + 'static,
    K: Into<String>,
{
    let tag = tag.into();
    let members: Vec<(String, Codec<Value, O, A>)> =
        members.into_iter().map(|(key, codec)| (key.into(), codec)).collect();
    make(&decoder::sum(tag.clone(), members.clone()), &encoder::sum(tag, members))
}

// ============================================================================
// SECTION: Lazy
// ============================================================================

/// Defers building the codec until first use.
///
/// The forced codec is cached per returned value, not per `id`. A thunk that
/// refers to its own schema through a function call (`|| array(&node())`)
/// builds a fresh lazy codec for every nesting level it reaches. Recursive
/// schemas that are decoded often should refer to a single shared instance,
/// either a `static` [`LazyLock`](std::sync::LazyLock) holding the codec or a
/// definition run through [`interpret`](crate::interpret), whose identity
/// cache returns one instance per definition.
pub fn lazy<I, O, A, F>(id: impl Into<String>, f: F) -> Codec<I, O, A>
where
    I: 'static,
    O: 'static,
    A: 'static,
    F: Fn() -> Codec<I, O, A> + Send + Sync + 'static,
{
    lazy_with_limits(id, RecursionLimits::default(), f)
}

/// [`lazy`] with explicit recursion limits for the decode half.
///
/// Both halves share one forced codec, so the thunk runs at most once.
pub fn lazy_with_limits<I, O, A, F>(id: impl Into<String>, limits: RecursionLimits, f: F) -> Codec<I, O, A>
where
    I: 'static,
    O: 'static,
    A: 'static,
    F: Fn() -> Codec<I, O, A> + Send + Sync + 'static,
{
    let id = id.into();
    let forced: Arc<OnceLock<Codec<I, O, A>>> = Arc::new(OnceLock::new());
    let thunk = Arc::new(f);
    let decoder = {
        let forced = Arc::clone(&forced);
        let thunk = Arc::clone(&thunk);
        decoder::lazy_with_limits(id.clone(), limits, move || forced.get_or_init(|| thunk()).decoder.clone())
    };
    let encoder = encoder::lazy(id, move || forced.get_or_init(|| thunk()).encoder.clone());
    Codec {
        decoder,
        encoder,
    }
}

// ============================================================================
// SECTION: Schemable Instance
// ============================================================================

/// Interprets schemas as [`Codec<Value, Value, A>`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecSchemable;

impl Schemable for CodecSchemable {
    type Schema<A: 'static> = Codec<Value, Value, A>;

    fn literal(values: &[Literal]) -> Codec<Value, Value, Literal> {
        literal(values.iter().cloned())
    }

    fn string() -> Codec<Value, Value, String> {
        string()
    }

    fn number() -> Codec<Value, Value, f64> {
        number()
    }

    fn boolean() -> Codec<Value, Value, bool> {
        boolean()
    }

    fn nullable<A: 'static>(or: &Codec<Value, Value, A>) -> Codec<Value, Value, Option<A>> {
        nullable(or)
    }

    fn struct_(properties: Properties<Self>) -> Codec<Value, Value, Value> {
        struct_(properties)
    }

    fn partial(properties: Properties<Self>) -> Codec<Value, Value, Value> {
        partial(properties)
    }

    fn record<A: 'static>(codomain: &Codec<Value, Value, A>) -> Codec<Value, Value, BTreeMap<String, A>> {
        record(codomain)
    }

    fn array<A: 'static>(item: &Codec<Value, Value, A>) -> Codec<Value, Value, Vec<A>> {
        array(item)
    }

    fn tuple2<A: 'static, B: 'static>(
        first: &Codec<Value, Value, A>,
        second: &Codec<Value, Value, B>,
    ) -> Codec<Value, Value, (A, B)> {
        tuple(&(first.clone(), second.clone()))
    }

    fn tuple3<A: 'static, B: 'static, C: 'static>(
        first: &Codec<Value, Value, A>,
        second: &Codec<Value, Value, B>,
        third: &Codec<Value, Value, C>,
    ) -> Codec<Value, Value, (A, B, C)> {
        tuple(&(first.clone(), second.clone(), third.clone()))
    }

    fn intersect(left: &Codec<Value, Value, Value>, right: &Codec<Value, Value, Value>) -> Codec<Value, Value, Value> {
        intersect(left, right)
    }

    fn sum(tag: &str, members: Vec<(String, Codec<Value, Value, Value>)>) -> Codec<Value, Value, Value> {
        sum(tag, members)
    }

    fn lazy<A: 'static>(
        id: &str,
        f: impl Fn() -> Codec<Value, Value, A> + Send + Sync + 'static,
    ) -> Codec<Value, Value, A> {
        lazy(id, f)
    }

    fn dynamic<A>(schema: &Codec<Value, Value, A>) -> Codec<Value, Value, Value>
    where
        A: Serialize + DeserializeOwned + 'static,
    {
        dynamic(schema)
    }
}

impl WithUnknownContainers for CodecSchemable {
    fn unknown_array() -> Codec<Value, Value, Vec<Value>> {
        unknown_array()
    }

    fn unknown_record() -> Codec<Value, Value, Object> {
        unknown_record()
    }
}

impl WithRefine for CodecSchemable {
    fn refine<A>(
        from: &Codec<Value, Value, A>,
        predicate: impl Fn(&A) -> bool + Send + Sync + 'static,
        id: &str,
    ) -> Codec<Value, Value, A>
    where
        A: Serialize + 'static,
    {
        refine(from, predicate, id)
    }
}
