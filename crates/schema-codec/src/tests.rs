// crates/schema-codec/src/tests.rs
// ============================================================================
// Module: Schema Codec Unit Tests
// Description: Crate-internal coverage for the depth guard and identity cache.
// Purpose: Check invariants of crate-private helpers that integration tests
//          cannot reach directly.
// Dependencies: schema-codec
// ============================================================================

//! ## Overview
//! Unit tests for crate-private helpers, plus test-only lint relaxations.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::limits::DepthGuard;
use crate::schemable::IdentityCache;

// ============================================================================
// SECTION: Depth Guard
// ============================================================================

#[test]
fn depth_guard_counts_nested_levels_and_releases_on_drop() {
    let base = DepthGuard::current();
    {
        let outer = DepthGuard::enter(base + 2);
        assert!(outer.is_some());
        assert_eq!(DepthGuard::current(), base + 1);
        let inner = DepthGuard::enter(base + 2);
        assert!(inner.is_some());
        assert_eq!(DepthGuard::current(), base + 2);
        assert!(DepthGuard::enter(base + 2).is_none());
        assert_eq!(DepthGuard::current(), base + 2);
    }
    assert_eq!(DepthGuard::current(), base);
}

#[test]
fn depth_guard_is_per_thread() {
    let _held = DepthGuard::enter(1);
    let other = std::thread::spawn(|| DepthGuard::enter(1).is_some()).join().unwrap();
    assert!(other);
}

// ============================================================================
// SECTION: Identity Cache
// ============================================================================

#[test]
fn identity_cache_builds_each_key_once() {
    let cache: IdentityCache<u32, Arc<str>> = IdentityCache::new();
    let builds = AtomicUsize::new(0);
    let build = || {
        builds.fetch_add(1, Ordering::SeqCst);
        Arc::<str>::from("built")
    };
    let first = cache.get_or_insert_with(7, build);
    let second = cache.get_or_insert_with(7, build);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn identity_cache_keeps_first_insert_when_builder_reenters() {
    let cache: IdentityCache<u32, u32> = IdentityCache::new();
    let value = cache.get_or_insert_with(1, || cache.get_or_insert_with(1, || 10) + 1);
    assert_eq!(value, 10);
    assert_eq!(cache.get_or_insert_with(1, || 99), 10);
}
