//! Test utilities for the backend crate.
//!
//! Shared helpers for unit tests (in `src/`) and integration tests (in
//! `tests/`). Compiled for tests and behind the `test-support` feature.

pub mod clock;
