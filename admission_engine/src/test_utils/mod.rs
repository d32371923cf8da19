//! Helpers for tests of the engine and of crates built on it.
pub mod collaborators;
#[cfg(feature = "sqlite")]
pub mod prepare_env;
