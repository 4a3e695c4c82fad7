//! SVG periodogram rendering via Plotters.
//!
//! SVG keeps the backend dependency-free (no font rasterization or system
//! libraries), which is why the crate enables only `svg_backend` +
//! `line_series`.

use std::path::Path;

use plotters::prelude::*;

use crate::error::FitError;
use crate::math::Periodogram;

/// Write the periodogram to an SVG file.
pub fn write_periodogram_svg(path: &Path, pg: &Periodogram) -> Result<(), FitError> {
    let f_min = pg.frequencies[0];
    let f_max = *pg.frequencies.last().unwrap_or(&1.0);
    let p_max = pg.power.iter().cloned().fold(0.0f64, f64::max).max(1e-12);

    let path_str = path.to_string_lossy().to_string();
    let root = SVGBackend::new(&path_str, (900, 500)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| FitError::Io(format!("Failed to draw '{}': {e}", path.display())))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(12)
        .x_label_area_size(36)
        .y_label_area_size(48)
        .caption("Lomb-Scargle periodogram", ("sans-serif", 22))
        .build_cartesian_2d(f_min..f_max, 0.0..p_max * 1.05)
        .map_err(|e| FitError::Io(format!("Failed to build chart '{}': {e}", path.display())))?;

    chart
        .configure_mesh()
        .x_desc("frequency")
        .y_desc("normalized power")
        .draw()
        .map_err(|e| FitError::Io(format!("Failed to draw mesh '{}': {e}", path.display())))?;

    chart
        .draw_series(LineSeries::new(
            pg.frequencies
                .iter()
                .zip(pg.power.iter())
                .map(|(&f, &p)| (f, p)),
            &BLUE,
        ))
        .map_err(|e| FitError::Io(format!("Failed to draw series '{}': {e}", path.display())))?;

    // Mark the selected peak.
    chart
        .draw_series(std::iter::once(Circle::new(
            (pg.peak_frequency, pg.peak_power),
            4,
            RED.filled(),
        )))
        .map_err(|e| FitError::Io(format!("Failed to draw peak '{}': {e}", path.display())))?;

    root.present()
        .map_err(|e| FitError::Io(format!("Failed to write '{}': {e}", path.display())))?;
    Ok(())
}
