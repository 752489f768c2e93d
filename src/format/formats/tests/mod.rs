//! Unit tests for population format implementations.
//!
//! These tests verify parsing edge cases of each format and that populations
//! survive a round trip.

mod json_tests;
