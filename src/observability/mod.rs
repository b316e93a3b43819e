//! Diagnostic logging for the command-line binary.

mod tracing_init;

pub use tracing_init::*;
