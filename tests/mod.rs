//! Integration tests for CineMate
//!
//! Tests are organized by component:
//! - client_test: API client (auth header, normalization, refresh-and-retry)
//! - session_test: Session store flows (login, signup, logout, restore, profile)
//! - slider_test: Carousel state machine and its tokio driver
//! - storage_test: File-backed key-value store and credential pair
//! - cli_test: Argument parsing, JSON envelopes, input validation

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
