// crates/schema-codec/src/tuple.rs
// ============================================================================
// Module: Tuple Components
// Description: Fixed-arity tuple support shared by decoders, encoders and codecs.
// Purpose: Give `tuple` combinators a typed, positional domain for arities 1..=6.
// Dependencies: crate::{codec, decoder, encoder, error}
// ============================================================================

//! ## Overview
//! Tuples of decoders, encoders or codecs implement the traits below so the
//! `tuple` combinators can decode into, and encode from, native Rust tuples.
//! Decoding checks the arity before touching any element and then reports
//! every failing position.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::codec::Codec;
use crate::decoder::Decode;
use crate::decoder::Decoder;
use crate::encoder::Encode;
use crate::encoder::Encoder;
use crate::error::DecodeError;
use crate::error::DecodeResult;

// ============================================================================
// SECTION: Traits
// ============================================================================

/// A tuple of decoders sharing input type `I`.
pub trait TupleDecoders<I>: Clone + Send + Sync + 'static {
    /// Tuple of decoded component values.
    type Value: 'static;

    /// Number of components.
    const ARITY: usize;

    /// Decodes `items` position by position.
    ///
    /// # Errors
    /// Returns [`DecodeError::Arity`] when `items.len()` differs from
    /// [`Self::ARITY`], otherwise every failing position.
    fn decode_items(&self, items: &[I]) -> DecodeResult<Self::Value>;
}

/// A tuple of encoders sharing output type `O`.
pub trait TupleEncoders<O>: Clone + Send + Sync + 'static {
    /// Tuple of component values accepted.
    type Value: 'static;

    /// Encodes each component in order.
    fn encode_items(&self, value: &Self::Value) -> Vec<O>;
}

/// A tuple of codecs sharing input type `I` and output type `O`.
pub trait TupleCodecs<I, O> {
    /// Tuple of component domain values.
    type Value: 'static;
    /// The decode halves.
    type Decoders: TupleDecoders<I, Value = Self::Value>;
    /// The encode halves.
    type Encoders: TupleEncoders<O, Value = Self::Value>;

    /// Splits the codecs into their decoders and encoders.
    fn split(&self) -> (Self::Decoders, Self::Encoders);
}

// ============================================================================
// SECTION: Implementations
// ============================================================================

/// Implements the tuple traits for one arity.
macro_rules! impl_tuple_components {
    ($arity:literal; $(($index:tt, $A:ident, $slot:ident)),+) => {
        impl<I: 'static, $($A: 'static),+> TupleDecoders<I> for ($(Decoder<I, $A>,)+) {
            type Value = ($($A,)+);

            const ARITY: usize = $arity;

            fn decode_items(&self, items: &[I]) -> DecodeResult<Self::Value> {
                if items.len() != Self::ARITY {
                    return Err(DecodeError::arity(Self::ARITY, items.len()));
                }
                let mut errors = Vec::new();
                $(
                    let $slot = match self.$index.decode(&items[$index]) {
                        Ok(value) => Some(value),
                        Err(error) => {
                            errors.push(DecodeError::position($index, error));
                            None
                        }
                    };
                )+
                match ($($slot,)+) {
                    ($(Some($slot),)+) => Ok(($($slot,)+)),
                    _ => Err(DecodeError::composite(errors)),
                }
            }
        }

        impl<O: 'static, $($A: 'static),+> TupleEncoders<O> for ($(Encoder<O, $A>,)+) {
            type Value = ($($A,)+);

            fn encode_items(&self, value: &Self::Value) -> Vec<O> {
                vec![$(self.$index.encode(&value.$index)),+]
            }
        }

        impl<I: 'static, O: 'static, $($A: 'static),+> TupleCodecs<I, O> for ($(Codec<I, O, $A>,)+) {
            type Value = ($($A,)+);
            type Decoders = ($(Decoder<I, $A>,)+);
            type Encoders = ($(Encoder<O, $A>,)+);

            fn split(&self) -> (Self::Decoders, Self::Encoders) {
                (($(self.$index.decoder().clone(),)+), ($(self.$index.encoder().clone(),)+))
            }
        }
    };
}

impl_tuple_components!(1; (0, A1, a1));
impl_tuple_components!(2; (0, A1, a1), (1, A2, a2));
impl_tuple_components!(3; (0, A1, a1), (1, A2, a2), (2, A3, a3));
impl_tuple_components!(4; (0, A1, a1), (1, A2, a2), (2, A3, a3), (3, A4, a4));
impl_tuple_components!(5; (0, A1, a1), (1, A2, a2), (2, A3, a3), (3, A4, a4), (4, A5, a5));
impl_tuple_components!(6; (0, A1, a1), (1, A2, a2), (2, A3, a3), (3, A4, a4), (4, A5, a5), (5, A6, a6));
