//! Shared test utilities for domain testing
//!
//! This crate provides reusable test infrastructure for the domain crates:
//! - `TestQdrant`: Qdrant container with automatic cleanup (feature: "qdrant")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Features
//!
//! - `qdrant`: Enables Qdrant test infrastructure
//! - `all`: Enables all container-backed test infrastructure
//!
//! # Usage
//!
//! ## Qdrant Testing
//!
//! Add `features = ["qdrant"]` to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["qdrant"] }
//! ```
//!
//! Then in your tests:
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestQdrant};
//!
//! #[tokio::test]
//! #[ignore = "requires Docker"]
//! async fn my_qdrant_test() {
//!     let qdrant = TestQdrant::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_qdrant_test");
//!
//!     let collection = builder.collection();
//!     let id = builder.record_id("main");
//!     let vector = builder.unit_vector(384, 0);
//! }
//! ```

#[cfg(feature = "qdrant")]
mod qdrant;

#[cfg(feature = "qdrant")]
pub use qdrant::TestQdrant;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by deriving all data from a seed.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// This is the recommended way to create a builder for consistent test data.
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_store_record");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Collection name unique to this test, so tests can share one store
    pub fn collection(&self) -> String {
        format!("test_{}", self.seed)
    }

    /// Caller-facing record id
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(7);
    /// assert_eq!(builder.record_id("main"), "doc-7-main");
    /// ```
    pub fn record_id(&self, suffix: &str) -> String {
        format!("doc-{}-{}", self.seed, suffix)
    }

    /// Vector of length `dimension` with a single 1.0 at `axis`
    ///
    /// Unit vectors on distinct axes have cosine similarity 0, on the same
    /// axis 1.
    pub fn unit_vector(&self, dimension: usize, axis: usize) -> Vec<f32> {
        assert!(axis < dimension, "axis {} out of range for {}", axis, dimension);
        let mut vector = vec![0.0; dimension];
        vector[axis] = 1.0;
        vector
    }

    /// Seed-dependent vector of length `dimension` with entries in [-1, 1]
    pub fn vector(&self, dimension: usize) -> Vec<f32> {
        // xorshift64, seeded so that zero still produces values
        let mut state = self.seed | 1;
        (0..dimension)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
            })
            .collect()
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that two vectors are equal within `tolerance` per component
    pub fn assert_vec_close(actual: &[f32], expected: &[f32], tolerance: f32, context: &str) {
        assert_eq!(
            actual.len(),
            expected.len(),
            "{}: expected length {}, got {}",
            context,
            expected.len(),
            actual.len()
        );
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!(
                (a - e).abs() <= tolerance,
                "{}: component {} differs, expected {}, got {}",
                context,
                i,
                e,
                a
            );
        }
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}
