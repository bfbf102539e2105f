// crates/schema-codec/src/lib.rs
// ============================================================================
// Module: Schema Codec Root
// Description: Public API surface for composable decoders, encoders and codecs.
// Purpose: Wire together the error tree, the three combinator families, the
//          schemable interpreters and the recursion limits.
// Dependencies: crate::{codec, decoder, encoder, error, limits, schemable,
//              shape, tuple}
// ============================================================================

//! ## Overview
//! Schemas are built from small combinators and interpreted three ways:
//! - [`decoder`]: validate an untrusted [`serde_json::Value`] into a typed
//!   domain value, accumulating every failure into a [`DecodeError`] tree.
//! - [`encoder`]: render a domain value back into a [`serde_json::Value`].
//! - [`codec`]: both at once, built so that the round-trip laws hold.
//!
//! The [`Schemable`] trait lets one definition be instantiated by any of
//! these interpreters, or by [`ShapeSchemable`] to render a description.
//!
//! ```
//! use schema_codec::Decode;
//! use schema_codec::Encode;
//! use schema_codec::codec;
//! use serde_json::json;
//!
//! let point = codec::struct_([("x", codec::dynamic(&codec::number())), ("y", codec::dynamic(&codec::number()))]);
//! let decoded = point.decode(&json!({ "x": 1.5, "y": -2.0, "z": 0 }));
//! assert_eq!(decoded, Ok(json!({ "x": 1.5, "y": -2 })));
//! assert!(point.decode(&json!({ "x": "1" })).is_err());
//! assert_eq!(point.encode(&json!({ "x": 1.5, "y": -2 })), json!({ "x": 1.5, "y": -2 }));
//! ```

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod limits;
pub mod schemable;
pub mod shape;
pub mod tuple;

#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use codec::Codec;
pub use codec::CodecSchemable;
pub use decoder::Decode;
pub use decoder::Decoder;
pub use decoder::DecoderSchemable;
pub use encoder::Encode;
pub use encoder::Encoder;
pub use encoder::EncoderSchemable;
pub use error::DecodeError;
pub use error::DecodeResult;
pub use error::Failure;
pub use error::Path;
pub use error::Segment;
pub use limits::LimitsError;
pub use limits::RecursionLimits;
pub use schemable::Definition;
pub use schemable::Intersect;
pub use schemable::Literal;
pub use schemable::Memoized;
pub use schemable::Object;
pub use schemable::Properties;
pub use schemable::Schemable;
pub use schemable::Tagged;
pub use schemable::WithRefine;
pub use schemable::WithUnion;
pub use schemable::WithUnknownContainers;
pub use schemable::canonical_number;
pub use schemable::interpret;
pub use schemable::intersect_;
pub use schemable::memoize;
pub use shape::Shape;
pub use shape::ShapeSchemable;
pub use tuple::TupleCodecs;
pub use tuple::TupleDecoders;
pub use tuple::TupleEncoders;
