//! Helpers for downstream crates that test against a real SQLite backend. Enable with the `test_utils` feature.
pub mod prepare_env;
