//! Integration test crate for tally.
//!
//! This crate has no library code. It only contains integration tests
//! that run snapshots through several workspace crates end to end.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p tally-integration-tests
//! ```
