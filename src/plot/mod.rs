//! Periodogram and light-curve plotting.

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;
