//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - ingests or generates a light curve
//! - runs the periodogram + pre-whitening pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use std::path::Path;

use crate::cli::{Command, DemoArgs, FitArgs, FitFlags, OcArgs};
use crate::data::SampleSpec;
use crate::domain::{FitConfig, TimeSeries};
use crate::error::FitError;
use crate::io::ingest::IngestedData;
use crate::oc::OcConfig;

pub mod pipeline;

/// Entry point for the `lcf` binary.
pub fn run() -> Result<(), FitError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Demo(args) => handle_demo(args),
        Command::Oc(args) => handle_oc(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), FitError> {
    let config = fit_config_from_flags(&args.flags);
    let ingest = crate::io::ingest::read_light_curve(&args.file)?;
    warn_skipped(&ingest, &args.file);
    run_and_report(ingest.series, config, &args.flags)
}

fn handle_oc(args: OcArgs) -> Result<(), FitError> {
    let config = OcConfig {
        period: args.period,
        phase_interval: args.phase_interval,
        order: args.order,
        samplings: args.samplings,
        parallel: args.parallel,
        ncores: args.ncores,
        seed: args.seed,
    };
    let ingest = crate::io::ingest::read_light_curve(&args.file)?;
    warn_skipped(&ingest, &args.file);

    let minima = crate::oc::fit_minima(&ingest.series, &config)?;
    let curve = crate::oc::calculate_oc(&minima, args.period, args.t0)?;

    println!(
        "{}",
        crate::report::format_oc_summary(ingest.series.len(), &config, &minima, &curve)
    );
    if args.plot {
        println!(
            "{}",
            crate::plot::render_oc_curve(&curve, args.width, args.height)
        );
    }
    if let Some(path) = &args.export {
        crate::io::export::write_oc_csv(path, &curve)?;
    }
    Ok(())
}

fn warn_skipped(ingest: &IngestedData, file: &Path) {
    if ingest.skipped.is_empty() {
        return;
    }
    eprintln!(
        "Warning: skipped {} unusable row(s) in '{}':",
        ingest.skipped.len(),
        file.display()
    );
    for row in ingest.skipped.iter().take(5) {
        eprintln!("  line {}: {}", row.line, row.message);
    }
    if ingest.skipped.len() > 5 {
        eprintln!("  ... and {} more", ingest.skipped.len() - 5);
    }
}

fn handle_demo(args: DemoArgs) -> Result<(), FitError> {
    let config = fit_config_from_flags(&args.flags);
    let spec = SampleSpec {
        frequency: args.frequency,
        // Evenly spread default phases; the fit does not depend on them.
        phases: (0..args.amplitudes.len()).map(|i| 0.4 * i as f64).collect(),
        amplitudes: args.amplitudes,
        noise_sigma: args.noise,
        n_points: args.n_points,
        time_span: args.time_span,
        seed: args.sample_seed,
        ..SampleSpec::default()
    };
    let series = crate::data::generate_sample(&spec)?;
    run_and_report(series, config, &args.flags)
}

fn run_and_report(series: TimeSeries, config: FitConfig, flags: &FitFlags) -> Result<(), FitError> {
    let run = pipeline::run_fit(series, config)?;

    println!(
        "{}",
        crate::report::format_run_summary(
            run.series.len(),
            &run.config,
            &run.periodogram,
            &run.solution
        )
    );

    if flags.plot {
        println!(
            "{}",
            crate::plot::render_periodogram(&run.periodogram, flags.width, flags.height)
        );
        println!(
            "{}",
            crate::plot::render_folded_curve(&run.series, &run.solution, flags.width, flags.height)
        );
    }

    if let Some(path) = &flags.export {
        crate::io::export::write_harmonics_csv(path, &run.solution)?;
    }
    if let Some(path) = &flags.export_json {
        crate::io::export::write_solution_json(path, &run.solution)?;
    }
    if let Some(path) = &flags.export_periodogram {
        crate::plot::write_periodogram_svg(path, &run.periodogram)?;
    }

    Ok(())
}

pub fn fit_config_from_flags(flags: &FitFlags) -> FitConfig {
    FitConfig {
        nfreq: flags.nfreq,
        min_frequency: flags.min_frequency,
        max_frequency: flags.max_frequency,
        nyquist_factor: flags.nyquist_factor,
        samples_per_peak: flags.samples_per_peak,
        bootstrap: flags.bootstrap,
        ntry: flags.ntry,
        sample_size: flags.sample_size,
        parallel: flags.parallel,
        ncores: flags.ncores,
        kind: flags.kind,
        seed: flags.seed,
        max_iterations: flags.max_iterations,
    }
}
