//! # DocMap Testkit
//!
//! Test utilities for DocMap.
//!
//! This crate provides:
//! - A store, registry and unit of work fixture plus a sample mapped type
//! - Property-based record generators using proptest
//! - Diff/apply/CBOR round-trip helpers
//! - Shared diff test vectors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docmap_testkit::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn diff_applies_cleanly((old, new) in edited_pair_strategy()) {
//!         assert_roundtrip(Some(&old), &new);
//!     }
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::vectors::*;
    pub use proptest::prelude::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use vectors::*;
