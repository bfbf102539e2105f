// crates/schema-codec/src/error.rs
// ============================================================================
// Module: Decode Error Tree
// Description: Structured, path-preserving decode failures.
// Purpose: Describe where and why decoding failed as a leaf/branch/composite
//          tree that reporting layers can walk without re-parsing messages.
// Dependencies: serde::{Serialize, Deserialize}, serde_json::Value, smallvec, thiserror
// ============================================================================

//! ## Overview
//! Every decoder reports failure as a [`DecodeError`] value. Leaves carry the
//! rejected input and a message, branches attribute a nested error to a
//! structural location (field, index, tuple position, selected sum tag, lazy
//! schema), and composites keep independent sibling failures together so a
//! struct with two bad fields reports both.
//!
//! The tree shape is the stable contract: [`DecodeError::failures`] flattens it
//! into `(Path, leaf)` pairs, and [`Path`] renders locations such as
//! `.children[1].value`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use thiserror::Error;

// ============================================================================
// SECTION: Result Alias
// ============================================================================

/// Result of a single decode call.
pub type DecodeResult<A> = Result<A, DecodeError>;

// ============================================================================
// SECTION: Segments
// ============================================================================

/// Structural location a branch error is attributed to.
///
/// # Invariants
/// - Variants are stable for serialization; `kind` is the serde tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// Object property. `required` is false for partial and record keys.
    Key {
        /// Property name.
        key: String,
        /// Whether the property was required by the schema.
        required: bool,
    },
    /// Array element.
    Index {
        /// Zero-based element index.
        index: usize,
    },
    /// Fixed tuple position.
    Position {
        /// Zero-based tuple position.
        position: usize,
    },
    /// Alternative of a union (`nullable` uses 0 for `null`, 1 for the inner schema).
    Member {
        /// Zero-based alternative index.
        member: usize,
    },
    /// Sum member selected by tag dispatch.
    Tag {
        /// Discriminant field name.
        tag: String,
        /// Discriminant value that selected the member.
        value: String,
    },
    /// Named lazy schema boundary. Not a location in the input.
    Lazy {
        /// Identifier given to the lazy schema.
        id: String,
    },
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key {
                key, ..
            } => write!(f, ".{key}"),
            Self::Index {
                index,
            } => write!(f, "[{index}]"),
            Self::Position {
                position,
            } => write!(f, "[{position}]"),
            Self::Member {
                member,
            } => write!(f, "|{member}"),
            Self::Tag {
                tag,
                value,
            } => write!(f, "({tag}={value})"),
            Self::Lazy {
                id,
            } => write!(f, "<{id}>"),
        }
    }
}

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Ordered segments from the decoded root down to a failing leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(SmallVec<[Segment; 8]>);

impl Path {
    /// Returns the segments from root to leaf, including lazy boundaries.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Returns the lazy schema identifiers crossed on the way to the leaf.
    pub fn lazy_ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|segment| match segment {
            Segment::Lazy {
                id,
            } => Some(id.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            if !matches!(segment, Segment::Lazy { .. }) {
                write!(f, "{segment}")?;
            }
        }
        Ok(())
    }
}

/// A terminal failure together with the path that leads to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure<'a> {
    /// Location of the failure.
    pub path: Path,
    /// The terminal (non-branch, non-composite) error.
    pub error: &'a DecodeError,
}

// ============================================================================
// SECTION: Decode Error
// ============================================================================

/// Why and where a decode failed.
///
/// # Invariants
/// - `Composite` never wraps exactly one error when built through
///   [`DecodeError::composite`].
/// - `Branch` always points into a nested error; leaves never carry paths.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeError {
    /// Terminal failure: the input had the wrong kind or failed a refinement.
    #[error("{message}")]
    Leaf {
        /// The rejected value.
        actual: Value,
        /// Human-readable description.
        message: String,
        /// Expected kind or refinement id, when known.
        expected: Option<String>,
    },
    /// A sum discriminant did not name any known member.
    #[error(
        "unrecognized value {actual} for tag `{tag}`, expected one of {}",
        render_tags(.expected)
    )]
    UnknownTag {
        /// Discriminant field name.
        tag: String,
        /// Value found in the discriminant field (`null` when absent).
        actual: Value,
        /// Known member tags in sorted order.
        expected: Vec<String>,
    },
    /// Sequence length did not match the fixed arity of a tuple.
    #[error("expected {expected} elements, found {actual}")]
    Arity {
        /// Required number of elements.
        expected: usize,
        /// Number of elements present.
        actual: usize,
    },
    /// Lazy schema recursion exceeded the configured depth.
    #[error("lazy schema `{id}` exceeded recursion depth {max_depth}")]
    TooDeep {
        /// Identifier of the lazy schema that refused to recurse.
        id: String,
        /// Configured depth limit.
        max_depth: usize,
    },
    /// Error attributed to a structural location.
    #[error("at {segment}: {error}")]
    Branch {
        /// Location of the nested error.
        segment: Segment,
        /// Nested error.
        error: Box<Self>,
    },
    /// Independent sibling failures at the same level.
    #[error("{}", render_composite(.errors))]
    Composite {
        /// Sibling errors in input order.
        errors: Vec<Self>,
    },
}

impl DecodeError {
    // ------------------------------------------------------------------------
    // Leaf constructors
    // ------------------------------------------------------------------------

    /// Creates a leaf error with a free-form message and no expected kind.
    pub fn leaf(actual: Value, message: impl Into<String>) -> Self {
        Self::Leaf {
            actual,
            message: message.into(),
            expected: None,
        }
    }

    /// Creates a leaf error for a value that is not of the `expected` kind.
    pub fn expected(actual: Value, expected: impl Into<String>) -> Self {
        let expected = expected.into();
        Self::Leaf {
            message: format!("cannot decode {actual}, should be {expected}"),
            actual,
            expected: Some(expected),
        }
    }

    /// Creates the error reported for a required property that is absent.
    #[must_use]
    pub fn missing() -> Self {
        Self::leaf(Value::Null, "required property is missing")
    }

    /// Creates a tag-dispatch error.
    pub fn unknown_tag(tag: impl Into<String>, actual: Value, expected: Vec<String>) -> Self {
        Self::UnknownTag {
            tag: tag.into(),
            actual,
            expected,
        }
    }

    /// Creates an arity error.
    #[must_use]
    pub const fn arity(expected: usize, actual: usize) -> Self {
        Self::Arity {
            expected,
            actual,
        }
    }

    // ------------------------------------------------------------------------
    // Branch constructors
    // ------------------------------------------------------------------------

    /// Attributes `error` to `segment`.
    #[must_use]
    pub fn branch(segment: Segment, error: Self) -> Self {
        Self::Branch {
            segment,
            error: Box::new(error),
        }
    }

    /// Attributes `error` to an object property.
    pub fn key(key: impl Into<String>, required: bool, error: Self) -> Self {
        Self::branch(
            Segment::Key {
                key: key.into(),
                required,
            },
            error,
        )
    }

    /// Attributes `error` to an array element.
    #[must_use]
    pub fn index(index: usize, error: Self) -> Self {
        Self::branch(
            Segment::Index {
                index,
            },
            error,
        )
    }

    /// Attributes `error` to a tuple position.
    #[must_use]
    pub fn position(position: usize, error: Self) -> Self {
        Self::branch(
            Segment::Position {
                position,
            },
            error,
        )
    }

    /// Attributes `error` to a union alternative.
    #[must_use]
    pub fn member(member: usize, error: Self) -> Self {
        Self::branch(
            Segment::Member {
                member,
            },
            error,
        )
    }

    /// Attributes `error` to the sum member selected by `tag = value`.
    pub fn tag(tag: impl Into<String>, value: impl Into<String>, error: Self) -> Self {
        Self::branch(
            Segment::Tag {
                tag: tag.into(),
                value: value.into(),
            },
            error,
        )
    }

    /// Marks `error` as raised inside the lazy schema `id`.
    pub fn lazy(id: impl Into<String>, error: Self) -> Self {
        Self::branch(
            Segment::Lazy {
                id: id.into(),
            },
            error,
        )
    }

    /// Groups sibling failures; a single error is returned unchanged.
    #[must_use]
    pub fn composite(mut errors: Vec<Self>) -> Self {
        if errors.len() == 1 {
            if let Some(error) = errors.pop() {
                return error;
            }
        }
        Self::Composite {
            errors,
        }
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Returns true for terminal errors (anything but branch and composite).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Branch { .. } | Self::Composite { .. })
    }

    /// Flattens the tree into every terminal failure and the path leading to it.
    #[must_use]
    pub fn failures(&self) -> Vec<Failure<'_>> {
        let mut out = Vec::new();
        collect_failures(self, &mut Path::default(), &mut out);
        out
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Depth-first walk accumulating terminal failures with their paths.
fn collect_failures<'a>(error: &'a DecodeError, path: &mut Path, out: &mut Vec<Failure<'a>>) {
    match error {
        DecodeError::Branch {
            segment,
            error,
        } => {
            path.0.push(segment.clone());
            collect_failures(error, path, out);
            path.0.pop();
        }
        DecodeError::Composite {
            errors,
        } => {
            for error in errors {
                collect_failures(error, path, out);
            }
        }
        terminal => out.push(Failure {
            path: path.clone(),
            error: terminal,
        }),
    }
}

/// Renders known tags for [`DecodeError::UnknownTag`].
fn render_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        return "never".to_string();
    }
    tags.iter().map(|tag| format!("\"{tag}\"")).collect::<Vec<_>>().join(" | ")
}

/// Renders sibling errors for [`DecodeError::Composite`].
fn render_composite(errors: &[DecodeError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
