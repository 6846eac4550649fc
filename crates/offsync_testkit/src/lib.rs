//! # offsync testkit
//!
//! Test utilities for offsync.
//!
//! This crate provides:
//! - [`TestHarness`]: a store, an in-memory remote and an engine with a
//!   manual clock
//! - [`wire_engine`]: an engine talking the HTTP wire format to an
//!   in-process row server
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use offsync_testkit::TestHarness;
//!
//! let h = TestHarness::memory();
//! let owner = h.account("alice");
//! h.pet(owner, "Rex");
//! assert!(h.go_online());
//! assert_eq!(h.engine.full_sync(owner).unwrap().total_pushed(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
