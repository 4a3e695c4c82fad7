//! Export fit results to CSV/JSON.
//!
//! The CSV is meant to be easy to consume in spreadsheets or downstream
//! scripts; the JSON is the portable representation of a full solution
//! (harmonics + Fourier parameters + uncertainties).

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::FourierSolution;
use crate::error::FitError;
use crate::oc::OcPoint;

/// Write the per-harmonic table to a CSV file.
pub fn write_harmonics_csv(path: &Path, solution: &FourierSolution) -> Result<(), FitError> {
    let mut file = File::create(path)
        .map_err(|e| FitError::Io(format!("Failed to create CSV '{}': {e}", path.display())))?;

    writeln!(
        file,
        "order,frequency,frequency_err,amplitude,amplitude_err,phase,phase_err,offset,offset_err"
    )
    .map_err(|e| FitError::Io(format!("Failed to write CSV header: {e}")))?;

    for h in &solution.harmonics {
        writeln!(
            file,
            "{},{:.10},{:.10},{:.10},{:.10},{:.10},{:.10},{:.10},{:.10}",
            h.order,
            h.frequency,
            h.frequency_err,
            h.amplitude,
            h.amplitude_err,
            h.phase,
            h.phase_err,
            h.offset,
            h.offset_err,
        )
        .map_err(|e| FitError::Io(format!("Failed to write CSV row: {e}")))?;
    }

    Ok(())
}

/// Write the O-C curve to a CSV file.
pub fn write_oc_csv(path: &Path, curve: &[OcPoint]) -> Result<(), FitError> {
    let mut file = File::create(path)
        .map_err(|e| FitError::Io(format!("Failed to create CSV '{}': {e}", path.display())))?;

    writeln!(file, "time,oc,oc_err")
        .map_err(|e| FitError::Io(format!("Failed to write CSV header: {e}")))?;
    for p in curve {
        writeln!(file, "{:.10},{:.10},{:.10}", p.time, p.oc, p.err)
            .map_err(|e| FitError::Io(format!("Failed to write CSV row: {e}")))?;
    }
    Ok(())
}

/// Write the full solution as pretty-printed JSON.
pub fn write_solution_json(path: &Path, solution: &FourierSolution) -> Result<(), FitError> {
    let file = File::create(path)
        .map_err(|e| FitError::Io(format!("Failed to create JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, solution)
        .map_err(|e| FitError::Io(format!("Failed to write JSON '{}': {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitKind, FourierParameters, HarmonicFit};

    fn solution() -> FourierSolution {
        let h = |order: usize| HarmonicFit {
            order,
            frequency: order as f64 * 1.5,
            amplitude: 1.0 / order as f64,
            phase: 0.3 * order as f64,
            offset: 12.0,
            frequency_err: if order == 1 { 1e-4 } else { 0.0 },
            amplitude_err: 0.01,
            phase_err: 0.02,
            offset_err: 0.005,
            kind: FitKind::Sin,
        };
        let params = FourierParameters {
            frequency: 1.5,
            period: 1.0 / 1.5,
            r21: 0.5,
            p21: 0.6,
            r31: None,
            p31: None,
        };
        FourierSolution {
            harmonics: vec![h(1), h(2)],
            parameters: params.clone(),
            errors: params,
        }
    }

    #[test]
    fn csv_export_has_one_row_per_harmonic() {
        let mut path = std::env::temp_dir();
        path.push(format!("lcf-export-{}.csv", std::process::id()));
        write_harmonics_csv(&path, &solution()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.starts_with("order,frequency"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn oc_export_has_one_row_per_point() {
        let curve = vec![
            OcPoint {
                time: 0.5,
                oc: 0.0,
                err: 0.003,
            },
            OcPoint {
                time: 1.52,
                oc: 0.02,
                err: 0.004,
            },
        ];
        let mut path = std::env::temp_dir();
        path.push(format!("lcf-oc-export-{}.csv", std::process::id()));
        write_oc_csv(&path, &curve).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.starts_with("time,oc,oc_err"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn json_export_round_trips() {
        let mut path = std::env::temp_dir();
        path.push(format!("lcf-export-{}.json", std::process::id()));
        write_solution_json(&path, &solution()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: FourierSolution = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.harmonics.len(), 2);
        assert!((parsed.parameters.r21 - 0.5).abs() < 1e-12);
        std::fs::remove_file(path).ok();
    }
}
