//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the input light curve (`TimeSeries`)
//! - fitting configuration (`FitConfig`, `FitKind`)
//! - fit outputs (`HarmonicFit`, `FourierParameters`, `FourierSolution`)

pub mod types;

pub use types::*;
