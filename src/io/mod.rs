//! Light-curve file I/O.

pub mod export;
pub mod ingest;
