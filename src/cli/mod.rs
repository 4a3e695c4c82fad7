//! Command-line parsing for the Fourier light-curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::FitKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lcf", version, about = "Fourier decomposition of variable-star light curves")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a light-curve CSV (columns: time, value, optional error).
    Fit(FitArgs),
    /// Fit a synthetic light curve (sanity check / demo of the pipeline).
    Demo(DemoArgs),
    /// Time the minima of a light-curve CSV and build its O-C curve.
    Oc(OcArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Input CSV file.
    pub file: PathBuf,

    #[command(flatten)]
    pub flags: FitFlags,
}

#[derive(Debug, Parser, Clone)]
pub struct DemoArgs {
    /// Fundamental frequency of the synthetic signal.
    #[arg(long, default_value_t = 2.0)]
    pub frequency: f64,

    /// Harmonic amplitudes (first value = fundamental).
    #[arg(long, num_args = 1.., value_delimiter = ',', default_values_t = [1.0, 0.5, 0.2])]
    pub amplitudes: Vec<f64>,

    /// Gaussian noise sigma.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// Number of synthetic observations.
    #[arg(long, default_value_t = 400)]
    pub n_points: usize,

    /// Observation baseline (time units).
    #[arg(long, default_value_t = 30.0)]
    pub time_span: f64,

    /// Seed for the synthetic sample generator.
    #[arg(long, default_value_t = 42)]
    pub sample_seed: u64,

    #[command(flatten)]
    pub flags: FitFlags,
}

#[derive(Debug, Parser, Clone)]
pub struct OcArgs {
    /// Input CSV file.
    pub file: PathBuf,

    /// Known period used to predict minima.
    #[arg(long)]
    pub period: f64,

    /// Epoch for the calculated minima (default: first observed minimum).
    #[arg(long)]
    pub t0: Option<f64>,

    /// Fit window around each minimum, as a fraction of the period.
    #[arg(long, default_value_t = 0.1)]
    pub phase_interval: f64,

    /// Polynomial order fitted to each minimum window.
    #[arg(long, default_value_t = 3)]
    pub order: usize,

    /// Number of noise resamplings per minimum for timing errors.
    #[arg(long, default_value_t = 1000)]
    pub samplings: usize,

    /// Run resampling trials in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Worker count for parallel resampling (-1 = all cores).
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub ncores: i32,

    /// RNG seed for the resampling (omit for non-deterministic).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print an ASCII O-C plot.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (characters).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (characters).
    #[arg(long, default_value_t = 16)]
    pub height: usize,

    /// Export the O-C table to a CSV file.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Fit options shared by `fit` and `demo`, mirroring `FitConfig`.
#[derive(Debug, Args, Clone)]
pub struct FitFlags {
    /// Number of harmonics to extract.
    #[arg(short = 'n', long, default_value_t = 3)]
    pub nfreq: usize,

    /// Minimum periodogram frequency (default: 1 / time span).
    #[arg(long)]
    pub min_frequency: Option<f64>,

    /// Maximum periodogram frequency (default: nyquist-factor x pseudo-Nyquist).
    #[arg(long)]
    pub max_frequency: Option<f64>,

    /// Multiple of the pseudo-Nyquist frequency for the default maximum.
    #[arg(long, default_value_t = 1.0)]
    pub nyquist_factor: f64,

    /// Periodogram oversampling (grid points per peak width).
    #[arg(long, default_value_t = 10)]
    pub samples_per_peak: usize,

    /// Estimate errors by bootstrap resampling (slower, more robust at low S/N).
    #[arg(long)]
    pub bootstrap: bool,

    /// Number of bootstrap trials.
    #[arg(long, default_value_t = 100)]
    pub ntry: usize,

    /// Fraction of points drawn per bootstrap trial, in (0, 1].
    #[arg(long, default_value_t = 0.7)]
    pub sample_size: f64,

    /// Run bootstrap trials in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Worker count for parallel bootstrap (-1 = all cores).
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub ncores: i32,

    /// Trigonometric base function of the model.
    #[arg(long, value_enum, default_value_t = FitKind::Sin)]
    pub kind: FitKind,

    /// RNG seed for bootstrap resampling (omit for non-deterministic).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Iteration cap for the non-linear solver.
    #[arg(long, default_value_t = 100)]
    pub max_iterations: usize,

    /// Print ASCII periodogram and folded-light-curve plots.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (characters).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (characters).
    #[arg(long, default_value_t = 16)]
    pub height: usize,

    /// Export the per-harmonic table to a CSV file.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the full solution to a JSON file.
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Export the periodogram to an SVG file.
    #[arg(long)]
    pub export_periodogram: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fit_with_defaults() {
        let cli = Cli::try_parse_from(["lcf", "fit", "lc.csv"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit subcommand");
        };
        assert_eq!(args.flags.nfreq, 3);
        assert!(!args.flags.bootstrap);
        assert_eq!(args.flags.ncores, -1);
    }

    #[test]
    fn parses_demo_amplitude_list() {
        let cli =
            Cli::try_parse_from(["lcf", "demo", "--amplitudes", "1.0,0.4", "--nfreq", "2"]).unwrap();
        let Command::Demo(args) = cli.command else {
            panic!("expected demo subcommand");
        };
        assert_eq!(args.amplitudes, vec![1.0, 0.4]);
        assert_eq!(args.flags.nfreq, 2);
    }

    #[test]
    fn parses_oc_with_required_period() {
        let cli = Cli::try_parse_from(["lcf", "oc", "lc.csv", "--period", "0.57"]).unwrap();
        let Command::Oc(args) = cli.command else {
            panic!("expected oc subcommand");
        };
        assert!((args.period - 0.57).abs() < 1e-12);
        assert_eq!(args.order, 3);
        assert!(args.t0.is_none());

        // Without a period the command must not parse.
        assert!(Cli::try_parse_from(["lcf", "oc", "lc.csv"]).is_err());
    }

    #[test]
    fn negative_ncores_is_accepted() {
        let cli = Cli::try_parse_from(["lcf", "fit", "lc.csv", "--ncores", "-1"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit subcommand");
        };
        assert_eq!(args.flags.ncores, -1);
    }
}
