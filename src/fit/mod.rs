//! Fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit a single sinusoid at a fixed or free frequency (`harmonic`)
//! - run the iterative pre-whitening loop (`session`)
//! - estimate errors by bootstrap resampling (`bootstrap`, parallel via rayon)
//! - derive Fourier ratio diagnostics (`params`)

pub mod bootstrap;
pub mod harmonic;
pub mod params;
pub mod session;

pub use bootstrap::*;
pub use harmonic::*;
pub use params::*;
pub use session::*;
