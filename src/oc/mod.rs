//! O-C (observed minus calculated) timing analysis.
//!
//! Responsibilities:
//!
//! - time each minimum of the light curve by local polynomial fits, with
//!   resampling-based timing errors (`minima`)
//! - build the O-C curve against a linear ephemeris (`curve`)

pub mod curve;
pub mod minima;

pub use curve::*;
pub use minima::*;
