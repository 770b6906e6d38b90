//! Shared utilities for stock-review
//!
//! Binaries call [`load_env_file`] and [`init_tracing`] once at startup;
//! library crates only emit `tracing` events.

pub mod env;
pub mod logging;

pub use env::load_env_file;
pub use logging::{LogFormat, init_tracing};
