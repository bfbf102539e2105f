// crates/schema-codec/src/schemable.rs
// ============================================================================
// Module: Schemable Capabilities
// Description: Interpreter-agnostic schema vocabulary and shared utilities.
// Purpose: Let one schema definition be instantiated as a decoder, encoder,
//          codec or any other interpreter, and host the merge/tag/memo helpers
//          the interpreters share.
// Dependencies: serde, serde_json, tracing, std::sync
// ============================================================================

//! ## Overview
//! [`Schemable`] is implemented once per interpreter. A schema written as a
//! generic function over `S: Schemable` works unmodified for every
//! interpreter:
//!
//! ```
//! use schema_codec::DecoderSchemable;
//! use schema_codec::Properties;
//! use schema_codec::Schemable;
//! use schema_codec::ShapeSchemable;
//! use serde_json::Value;
//!
//! fn person<S: Schemable>() -> S::Schema<Value> {
//!     S::struct_(
//!         Properties::<S>::new()
//!             .field("name", &S::string())
//!             .field("age", &S::number()),
//!     )
//! }
//!
//! let shape = person::<ShapeSchemable>();
//! assert_eq!(shape.to_string(), "{ name: string; age: number }");
//! let _decoder = person::<DecoderSchemable>();
//! ```
//!
//! Object-shaped schemas (`struct_`, `partial`, `sum`, `intersect`) work on
//! dynamic [`Value`] domains; [`Schemable::dynamic`] lifts a typed schema into
//! that domain.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::any::TypeId;
use std::any::type_name;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Number;
use serde_json::Value;

// ============================================================================
// SECTION: Value Model
// ============================================================================

/// A plain key-value mapping of untyped values.
pub type Object = serde_json::Map<String, Value>;

/// Largest magnitude up to which every integer is exactly representable as `f64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Returns the canonical interchange form of a number.
///
/// Integral values within `±2^53` are written as integers (`36`, not
/// `36.0`), other finite values as floats, and non-finite values as `null`.
/// Every number encoder uses this form, so a dynamic domain value written
/// with plain integers is already canonical.
#[must_use]
pub fn canonical_number(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        #[allow(clippy::cast_possible_truncation, reason = "Integral and within 2^53, so the conversion is exact.")]
        let integer = value as i64;
        return Value::from(integer);
    }
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Rewrites every float in `value` into its [`canonical_number`] form.
pub(crate) fn canonicalize_numbers(value: Value) -> Value {
    match value {
        Value::Number(number) if number.is_f64() => number.as_f64().map_or(Value::Number(number), canonical_number),
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize_numbers).collect()),
        Value::Object(object) => {
            Value::Object(object.into_iter().map(|(key, item)| (key, canonicalize_numbers(item))).collect())
        }
        other => other,
    }
}

/// A literal value a `literal` schema can accept.
///
/// # Invariants
/// - `Number` is finite when produced by a decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// `null`.
    Null,
    /// A boolean literal.
    Boolean(bool),
    /// A numeric literal.
    Number(f64),
    /// A string literal.
    String(String),
}

impl Literal {
    /// Returns the interchange form of the literal.
    ///
    /// Numbers use [`canonical_number`]; non-finite numbers map to `null`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(value) => Value::Bool(*value),
            Self::Number(value) => canonical_number(*value),
            Self::String(value) => Value::String(value.clone()),
        }
    }

    /// Returns true when `value` is this literal.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Null, Value::Null) => true,
            (Self::Boolean(expected), Value::Bool(actual)) => expected == actual,
            (Self::Number(expected), Value::Number(actual)) => actual.as_f64() == Some(*expected),
            (Self::String(expected), Value::String(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Renders the alternatives accepted by a literal schema, e.g. `"a" | 1 | null`.
pub(crate) fn render_literals(values: &[Literal]) -> String {
    if values.is_empty() {
        return "never".to_string();
    }
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(" | ")
}

// ============================================================================
// SECTION: Intersection
// ============================================================================

/// Values that can be combined by an intersection schema.
pub trait Intersect: Sized {
    /// Combines the left and right decoded (or encoded) values.
    #[must_use]
    fn intersect(self, right: Self) -> Self;
}

/// Merges two untyped values for `intersect`.
///
/// When both sides are objects the result is a shallow merge in which the
/// right side's keys win. In every other case the right value replaces the
/// left one outright.
#[must_use]
pub fn intersect_(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Object(mut merged), Value::Object(right)) => {
            merged.extend(right);
            Value::Object(merged)
        }
        (_, right) => right,
    }
}

impl Intersect for Value {
    fn intersect(self, right: Self) -> Self {
        intersect_(self, right)
    }
}

impl Intersect for Object {
    fn intersect(mut self, right: Self) -> Self {
        self.extend(right);
        self
    }
}

impl<T> Intersect for BTreeMap<String, T> {
    fn intersect(mut self, right: Self) -> Self {
        self.extend(right);
        self
    }
}

// ============================================================================
// SECTION: Tag Access
// ============================================================================

/// Values whose sum discriminant can be read without decoding them.
pub trait Tagged {
    /// Returns the value stored under `tag`, if any.
    fn tag_value(&self, tag: &str) -> Option<&Value>;
}

impl Tagged for Value {
    fn tag_value(&self, tag: &str) -> Option<&Value> {
        self.get(tag)
    }
}

impl Tagged for Object {
    fn tag_value(&self, tag: &str) -> Option<&Value> {
        self.get(tag)
    }
}

// ============================================================================
// SECTION: Capability Interfaces
// ============================================================================

/// The schema vocabulary every interpreter implements.
///
/// `Schema<A>` is the interpreter's representation of a schema for domain
/// values of type `A` (a decoder, an encoder, a codec, a description...).
pub trait Schemable: Sized + 'static {
    /// Interpreter representation of a schema over domain type `A`.
    type Schema<A: 'static>: Clone + Send + Sync + 'static;

    /// Accepts exactly one of `values`.
    fn literal(values: &[Literal]) -> Self::Schema<Literal>;

    /// Any string.
    fn string() -> Self::Schema<String>;

    /// Any finite number.
    fn number() -> Self::Schema<f64>;

    /// Any boolean.
    fn boolean() -> Self::Schema<bool>;

    /// `null` or a value accepted by `or`.
    fn nullable<A: 'static>(or: &Self::Schema<A>) -> Self::Schema<Option<A>>;

    /// An object with every listed property present.
    fn struct_(properties: Properties<Self>) -> Self::Schema<Value>;

    /// An object whose listed properties are optional.
    fn partial(properties: Properties<Self>) -> Self::Schema<Value>;

    /// An object whose values all match `codomain`.
    fn record<A: 'static>(codomain: &Self::Schema<A>) -> Self::Schema<BTreeMap<String, A>>;

    /// A sequence whose elements all match `item`.
    fn array<A: 'static>(item: &Self::Schema<A>) -> Self::Schema<Vec<A>>;

    /// A two-element sequence.
    fn tuple2<A: 'static, B: 'static>(
        first: &Self::Schema<A>,
        second: &Self::Schema<B>,
    ) -> Self::Schema<(A, B)>;

    /// A three-element sequence.
    fn tuple3<A: 'static, B: 'static, C: 'static>(
        first: &Self::Schema<A>,
        second: &Self::Schema<B>,
        third: &Self::Schema<C>,
    ) -> Self::Schema<(A, B, C)>;

    /// Values accepted by both `left` and `right`.
    fn intersect(left: &Self::Schema<Value>, right: &Self::Schema<Value>) -> Self::Schema<Value>;

    /// A discriminated union keyed by the string field `tag`.
    fn sum(tag: &str, members: Vec<(String, Self::Schema<Value>)>) -> Self::Schema<Value>;

    /// A schema whose definition is deferred until first use.
    fn lazy<A: 'static>(
        id: &str,
        f: impl Fn() -> Self::Schema<A> + Send + Sync + 'static,
    ) -> Self::Schema<A>;

    /// Lifts a typed schema into the dynamic value domain used by objects.
    fn dynamic<A>(schema: &Self::Schema<A>) -> Self::Schema<Value>
    where
        A: Serialize + DeserializeOwned + 'static;
}

/// Interpreters that can validate untyped containers.
pub trait WithUnknownContainers: Schemable {
    /// Any sequence.
    fn unknown_array() -> Self::Schema<Vec<Value>>;

    /// Any key-value mapping.
    fn unknown_record() -> Self::Schema<Object>;
}

/// Interpreters that support refinements.
pub trait WithRefine: Schemable {
    /// Narrows `from` to values satisfying `predicate`, reported as `id`.
    fn refine<A>(
        from: &Self::Schema<A>,
        predicate: impl Fn(&A) -> bool + Send + Sync + 'static,
        id: &str,
    ) -> Self::Schema<A>
    where
        A: Serialize + 'static;
}

/// Interpreters that support untagged unions.
pub trait WithUnion: Schemable {
    /// Values accepted by any of `members`, tried in order.
    fn union<A: 'static>(members: &[Self::Schema<A>]) -> Self::Schema<A>;
}

// ============================================================================
// SECTION: Properties Builder
// ============================================================================

/// Ordered property list for `struct_` and `partial`, for any interpreter.
pub struct Properties<S: Schemable> {
    /// Property names with their dynamic schemas, in declaration order.
    entries: Vec<(String, S::Schema<Value>)>,
}

impl<S: Schemable> Properties<S> {
    /// Creates an empty property list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a typed property, lifting its schema with [`Schemable::dynamic`].
    #[must_use]
    pub fn field<A>(mut self, name: impl Into<String>, schema: &S::Schema<A>) -> Self
    where
        A: Serialize + DeserializeOwned + 'static,
    {
        self.entries.push((name.into(), S::dynamic(schema)));
        self
    }

    /// Adds a property whose schema already works on dynamic values.
    #[must_use]
    pub fn value_field(mut self, name: impl Into<String>, schema: S::Schema<Value>) -> Self {
        self.entries.push((name.into(), schema));
        self
    }

    /// Number of declared properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no property was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Schemable> Default for Properties<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schemable> Clone for Properties<S> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<S: Schemable> IntoIterator for Properties<S> {
    type Item = (String, S::Schema<Value>);
    type IntoIter = std::vec::IntoIter<(String, S::Schema<Value>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ============================================================================
// SECTION: Identity Cache
// ============================================================================

/// Thread-safe cache whose population is idempotent.
///
/// Builders run outside the lock so they may consult the cache themselves;
/// when two callers race, both build and the first insert wins.
pub(crate) struct IdentityCache<K, V> {
    /// Cached entries.
    entries: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash, V: Clone> IdentityCache<K, V> {
    /// Creates an empty cache.
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, building it on first use.
    pub(crate) fn get_or_insert_with(&self, key: K, build: impl FnOnce() -> V) -> V {
        if let Some(value) = self.lock().get(&key) {
            return value.clone();
        }
        let built = build();
        self.lock().entry(key).or_insert(built).clone()
    }

    /// Number of cached entries.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Locks the entries, recovering from a poisoned lock.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Memoization
// ============================================================================

/// A function whose results are cached per distinct key identity.
pub struct Memoized<K: ?Sized, V, F> {
    /// The wrapped pure function.
    function: F,
    /// Results keyed by the key's address; the key is retained so its
    /// address cannot be reused while cached.
    cache: IdentityCache<usize, (Arc<K>, V)>,
}

/// Caches `f` by the pointer identity of its `Arc` argument.
///
/// Two `Arc`s pointing at equal but distinct allocations are different keys.
pub fn memoize<K, V, F>(f: F) -> Memoized<K, V, F>
where
    K: ?Sized,
    V: Clone,
    F: Fn(&K) -> V,
{
    Memoized {
        function: f,
        cache: IdentityCache::new(),
    }
}

impl<K, V, F> Memoized<K, V, F>
where
    K: ?Sized,
    V: Clone,
    F: Fn(&K) -> V,
{
    /// Returns the cached result for `key`, computing it on first use.
    pub fn call(&self, key: &Arc<K>) -> V {
        let address = Arc::as_ptr(key).cast::<()>().addr();
        let (_, value) = self.cache.get_or_insert_with(address, || {
            tracing::trace!(address, "memoized function cache miss");
            (Arc::clone(key), (self.function)(&**key))
        });
        value
    }

    /// Number of distinct keys cached so far.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// A named schema definition that can be interpreted by any [`Schemable`].
///
/// Recursive definitions refer to themselves through [`interpret`] inside a
/// `lazy` thunk, so every interpreter builds the definition once.
pub trait Definition: 'static {
    /// Domain type described by the definition.
    type Value: 'static;

    /// Builds the definition for interpreter `S`.
    fn define<S: Schemable>() -> S::Schema<Self::Value>;
}

/// Process-wide interpreted definitions, keyed by interpreter and definition type.
static DEFINITIONS: LazyLock<IdentityCache<(TypeId, TypeId), Arc<dyn Any + Send + Sync>>> =
    LazyLock::new(IdentityCache::new);

/// Returns definition `D` interpreted by `S`, building it at most once per
/// process (a concurrent first use may build twice; one result is kept).
#[must_use]
pub fn interpret<S: Schemable, D: Definition>() -> S::Schema<D::Value> {
    let key = (TypeId::of::<S>(), TypeId::of::<D>());
    let cached = DEFINITIONS.get_or_insert_with(key, || {
        tracing::trace!(
            interpreter = type_name::<S>(),
            definition = type_name::<D>(),
            "interpreting schema definition"
        );
        let schema: Arc<dyn Any + Send + Sync> = Arc::new(D::define::<S>());
        schema
    });
    match cached.downcast::<S::Schema<D::Value>>() {
        Ok(schema) => (*schema).clone(),
        Err(_) => D::define::<S>(),
    }
}
