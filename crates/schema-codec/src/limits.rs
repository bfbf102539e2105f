// crates/schema-codec/src/limits.rs
// ============================================================================
// Module: Recursion Limits
// Description: Configurable depth limits for lazy (recursive) schemas.
// Purpose: Turn unbounded recursion on hostile input into a structured decode
//          failure instead of a stack overflow.
// Dependencies: serde::Deserialize, thiserror, std::cell::Cell
// ============================================================================

//! ## Overview
//! Lazy decoders enter a per-thread depth guard on every call. When the number
//! of nested lazy decodes on the current thread would exceed
//! [`RecursionLimits::max_depth`], the decoder fails with
//! [`DecodeError::TooDeep`](crate::DecodeError::TooDeep).
//!
//! [`RecursionLimits`] deserializes with strict field checking and range
//! validation, so a host application can embed it in its own TOML or JSON
//! configuration and an out-of-range depth fails at load time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::Cell;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum number of nested lazy decodes per thread.
pub const DEFAULT_MAX_LAZY_DEPTH: usize = 128;
/// Largest accepted `max_depth`.
///
/// Each lazy level costs several stack frames; this bound keeps the deepest
/// accepted recursion well inside a 2 MiB thread stack.
pub const MAX_LAZY_DEPTH_CEILING: usize = 256;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Errors raised when recursion limits are invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitsError {
    /// A limit was outside its accepted range.
    #[error("invalid recursion limits: {0}")]
    Invalid(String),
}

/// Depth limits applied by lazy decoders.
///
/// # Invariants
/// - `1 <= max_depth <= MAX_LAZY_DEPTH_CEILING`. Construction and
///   deserialization both validate, so no out-of-range value is observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecursionLimitsConfig")]
pub struct RecursionLimits {
    /// Maximum number of nested lazy decodes on one thread.
    max_depth: usize,
}

/// Unvalidated wire form of [`RecursionLimits`].
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RecursionLimitsConfig {
    /// Requested maximum depth.
    max_depth: usize,
}

impl Default for RecursionLimitsConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_LAZY_DEPTH,
        }
    }
}

impl TryFrom<RecursionLimitsConfig> for RecursionLimits {
    type Error = LimitsError;

    fn try_from(config: RecursionLimitsConfig) -> Result<Self, Self::Error> {
        Self::new(config.max_depth)
    }
}

impl Default for RecursionLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_LAZY_DEPTH,
        }
    }
}

impl RecursionLimits {
    /// Creates validated limits.
    ///
    /// # Errors
    /// Returns [`LimitsError::Invalid`] when `max_depth` is zero or above
    /// [`MAX_LAZY_DEPTH_CEILING`].
    pub fn new(max_depth: usize) -> Result<Self, LimitsError> {
        let limits = Self {
            max_depth,
        };
        limits.validate()?;
        Ok(limits)
    }

    /// Maximum number of nested lazy decodes on one thread.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Checks the limits, failing closed on out-of-range values.
    ///
    /// # Errors
    /// Returns [`LimitsError::Invalid`] when a limit is out of range.
    pub fn validate(&self) -> Result<(), LimitsError> {
        if self.max_depth == 0 {
            return Err(LimitsError::Invalid("max_depth must be at least 1".to_string()));
        }
        if self.max_depth > MAX_LAZY_DEPTH_CEILING {
            return Err(LimitsError::Invalid(format!(
                "max_depth {} exceeds ceiling {MAX_LAZY_DEPTH_CEILING}",
                self.max_depth
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Depth Guard
// ============================================================================

thread_local! {
    /// Number of lazy decodes currently on this thread's stack.
    static LAZY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// RAII marker for one level of lazy recursion on the current thread.
///
/// # Invariants
/// - Each live guard accounts for exactly one increment of `LAZY_DEPTH`.
#[derive(Debug)]
pub(crate) struct DepthGuard {
    /// Prevents construction outside [`DepthGuard::enter`].
    _private: (),
}

impl DepthGuard {
    /// Enters one level of recursion, or returns `None` when `max_depth`
    /// levels are already active.
    pub(crate) fn enter(max_depth: usize) -> Option<Self> {
        LAZY_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= max_depth {
                return None;
            }
            depth.set(current + 1);
            Some(Self {
                _private: (),
            })
        })
    }

    /// Current depth on this thread.
    #[cfg(test)]
    pub(crate) fn current() -> usize {
        LAZY_DEPTH.with(Cell::get)
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        LAZY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}
