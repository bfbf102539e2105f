// crates/schema-codec/src/shape.rs
// ============================================================================
// Module: Shape Interpreter
// Description: Renders schemas as type-like descriptions.
// Purpose: Demonstrate that schema definitions are interpreter-agnostic and
//          give tooling a readable summary of a schema.
// Dependencies: crate::schemable
// ============================================================================

//! ## Overview
//! [`ShapeSchemable`] interprets a schema as a [`Shape`], a rendered
//! description such as `{ name: string; tags: Array<string> }`. Lazy schemas
//! render as their identifier and never force their thunk, so recursive
//! definitions render finitely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::schemable::Literal;
use crate::schemable::Object;
use crate::schemable::Properties;
use crate::schemable::Schemable;
use crate::schemable::WithRefine;
use crate::schemable::WithUnion;
use crate::schemable::WithUnknownContainers;
use crate::schemable::render_literals;

// ============================================================================
// SECTION: Shape
// ============================================================================

/// Rendered description of a schema over domain type `A`.
pub struct Shape<A> {
    /// The rendered description.
    text: Arc<str>,
    /// Domain marker.
    marker: PhantomData<fn() -> A>,
}

impl<A> Shape<A> {
    /// Wraps a rendered description.
    fn new(text: impl Into<Arc<str>>) -> Self {
        Self {
            text: text.into(),
            marker: PhantomData,
        }
    }

    /// Returns the rendered description.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Reinterprets the description for another domain type.
    fn cast<B>(&self) -> Shape<B> {
        Shape {
            text: Arc::clone(&self.text),
            marker: PhantomData,
        }
    }
}

impl<A> Clone for Shape<A> {
    fn clone(&self) -> Self {
        self.cast()
    }
}

impl<A> fmt::Debug for Shape<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shape").field(&self.text).finish()
    }
}

impl<A> fmt::Display for Shape<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ============================================================================
// SECTION: Rendering Helpers
// ============================================================================

/// Renders an object type, marking every property optional when `optional`.
fn render_object(properties: Properties<ShapeSchemable>, optional: bool) -> String {
    if properties.is_empty() {
        return "{}".to_string();
    }
    let marker = if optional { "?" } else { "" };
    let fields: Vec<String> =
        properties.into_iter().map(|(name, shape)| format!("{name}{marker}: {shape}")).collect();
    format!("{{ {} }}", fields.join("; "))
}

/// Parenthesizes a rendered union so it binds tighter than `&`.
fn group(text: &str) -> String {
    if has_top_level_union(text) { format!("({text})") } else { text.to_string() }
}

/// Returns true when `text` contains a `|` outside brackets and string literals.
fn has_top_level_union(text: &str) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for ch in text.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' | '<' | '(' => depth += 1,
            '}' | ']' | '>' | ')' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Renders alternatives separated by `|`; no alternatives is `never`.
fn render_union<'a>(members: impl Iterator<Item = &'a str>) -> String {
    let members: Vec<&str> = members.collect();
    if members.is_empty() { "never".to_string() } else { members.join(" | ") }
}

// ============================================================================
// SECTION: Schemable Instance
// ============================================================================

/// Interprets schemas as [`Shape`] descriptions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeSchemable;

impl Schemable for ShapeSchemable {
    type Schema<A: 'static> = Shape<A>;

    fn literal(values: &[Literal]) -> Shape<Literal> {
        Shape::new(render_literals(values))
    }

    fn string() -> Shape<String> {
        Shape::new("string")
    }

    fn number() -> Shape<f64> {
        Shape::new("number")
    }

    fn boolean() -> Shape<bool> {
        Shape::new("boolean")
    }

    fn nullable<A: 'static>(or: &Shape<A>) -> Shape<Option<A>> {
        Shape::new(format!("null | {or}"))
    }

    fn struct_(properties: Properties<Self>) -> Shape<Value> {
        Shape::new(render_object(properties, false))
    }

    fn partial(properties: Properties<Self>) -> Shape<Value> {
        Shape::new(render_object(properties, true))
    }

    fn record<A: 'static>(codomain: &Shape<A>) -> Shape<BTreeMap<String, A>> {
        Shape::new(format!("Record<string, {codomain}>"))
    }

    fn array<A: 'static>(item: &Shape<A>) -> Shape<Vec<A>> {
        Shape::new(format!("Array<{item}>"))
    }

    fn tuple2<A: 'static, B: 'static>(first: &Shape<A>, second: &Shape<B>) -> Shape<(A, B)> {
        Shape::new(format!("[{first}, {second}]"))
    }

    fn tuple3<A: 'static, B: 'static, C: 'static>(
        first: &Shape<A>,
        second: &Shape<B>,
        third: &Shape<C>,
    ) -> Shape<(A, B, C)> {
        Shape::new(format!("[{first}, {second}, {third}]"))
    }

    fn intersect(left: &Shape<Value>, right: &Shape<Value>) -> Shape<Value> {
        Shape::new(format!("{} & {}", group(left.as_str()), group(right.as_str())))
    }

    fn sum(_tag: &str, members: Vec<(String, Shape<Value>)>) -> Shape<Value> {
        Shape::new(render_union(members.iter().map(|(_, shape)| shape.as_str())))
    }

    fn lazy<A: 'static>(id: &str, _f: impl Fn() -> Shape<A> + Send + Sync + 'static) -> Shape<A> {
        Shape::new(id)
    }

    fn dynamic<A>(schema: &Shape<A>) -> Shape<Value>
    where
        A: Serialize + DeserializeOwned + 'static,
    {
        schema.cast()
    }
}

impl WithUnknownContainers for ShapeSchemable {
    fn unknown_array() -> Shape<Vec<Value>> {
        Shape::new("Array<unknown>")
    }

    fn unknown_record() -> Shape<Object> {
        Shape::new("Record<string, unknown>")
    }
}

impl WithRefine for ShapeSchemable {
    fn refine<A>(
        from: &Shape<A>,
        _predicate: impl Fn(&A) -> bool + Send + Sync + 'static,
        id: &str,
    ) -> Shape<A>
    where
        A: Serialize + 'static,
    {
        Shape::new(format!("Refine<{from}, \"{id}\">"))
    }
}

impl WithUnion for ShapeSchemable {
    fn union<A: 'static>(members: &[Shape<A>]) -> Shape<A> {
        Shape::new(render_union(members.iter().map(Shape::as_str)))
    }
}
