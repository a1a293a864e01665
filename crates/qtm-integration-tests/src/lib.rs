//! Integration test crate for the presale backend.
//!
//! This crate has no library code — it only contains integration tests
//! that exercise end-to-end flows across multiple workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p qtm-integration-tests
//! ```
