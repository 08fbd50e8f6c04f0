//! Integration test crate for the veil overlay.
//!
//! This crate has no library code. It only contains integration tests that
//! run the directory, relays and users together, over the in-process
//! network and over real TCP sockets.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p veil-integration-tests
//! ```
