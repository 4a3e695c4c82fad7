//! Synthetic light-curve generation for the `demo` subcommand and tests.

pub mod sample;

pub use sample::*;
