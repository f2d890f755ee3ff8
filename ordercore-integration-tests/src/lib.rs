//! Integration tests for `OrderCore`
//!
//! This crate contains integration tests that verify the interaction between
//! the ordercore engine and the in-memory adapters: atomic commits,
//! concurrent inventory contention, lifecycle transitions, and history
//! pagination.

// This is a test-only crate
#![cfg(test)]
