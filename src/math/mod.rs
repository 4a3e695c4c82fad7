//! Mathematical utilities: Lomb-Scargle periodogram and the
//! Levenberg-Marquardt solver used by the harmonic fitter.

pub mod lm;
pub mod periodogram;

pub use lm::*;
pub use periodogram::*;
