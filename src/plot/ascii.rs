//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - periodogram power: `*` line, peak marked `P`
//! - folded light curve: observed points `o`, fitted model `-`

use crate::domain::{FourierSolution, TimeSeries};
use crate::math::Periodogram;
use crate::oc::OcPoint;

/// Render the periodogram as a terminal plot.
pub fn render_periodogram(pg: &Periodogram, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let f_min = pg.frequencies[0];
    let f_max = *pg.frequencies.last().unwrap_or(&1.0);
    let p_max = pg.power.iter().cloned().fold(0.0f64, f64::max).max(1e-12);

    let mut grid = vec![vec![' '; width]; height];

    for (&f, &p) in pg.frequencies.iter().zip(pg.power.iter()) {
        let x = map_x(f, f_min, f_max, width);
        let y = map_y(p, 0.0, p_max, height);
        grid[y][x] = '*';
    }
    let px = map_x(pg.peak_frequency, f_min, f_max, width);
    let py = map_y(pg.peak_power, 0.0, p_max, height);
    grid[py][px] = 'P';

    let mut out = String::new();
    out.push_str(&format!(
        "Periodogram: f=[{f_min:.4}, {f_max:.4}] | peak f={:.6} (power {:.2})\n",
        pg.peak_frequency, pg.peak_power
    ));
    frame(&mut out, &grid, width);
    out
}

/// Render the light curve folded on the fitted period, model overlaid.
pub fn render_folded_curve(
    series: &TimeSeries,
    solution: &FourierSolution,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let frequency = solution.parameters.frequency;

    let folded: Vec<(f64, f64)> = series
        .times()
        .iter()
        .zip(series.values().iter())
        .map(|(&t, &v)| ((t * frequency).rem_euclid(1.0), v))
        .collect();

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, v) in &folded {
        y_min = y_min.min(v);
        y_max = y_max.max(v);
    }
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Model first so observations overlay it.
    for i in 0..width {
        let phase = i as f64 / width as f64;
        // Evaluate at a representative epoch: the fold is frequency-periodic.
        let t = phase / frequency;
        let y: f64 = solution
            .harmonics
            .iter()
            .map(|h| h.evaluate(t) - h.offset)
            .sum::<f64>()
            + solution.harmonics[0].offset;
        let row = map_y(y, y_min, y_max, height);
        grid[row][i] = '-';
    }

    for &(phase, v) in &folded {
        let x = map_x(phase, 0.0, 1.0, width);
        let y = map_y(v, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Folded light curve: P={:.6} | y=[{y_min:.3}, {y_max:.3}]\n",
        solution.parameters.period
    ));
    frame(&mut out, &grid, width);
    out
}

/// Render the O-C curve: points `o`, the O-C = 0 line `-`.
pub fn render_oc_curve(curve: &[OcPoint], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (mut t_min, mut t_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut oc_min, mut oc_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in curve {
        t_min = t_min.min(p.time);
        t_max = t_max.max(p.time);
        oc_min = oc_min.min(p.oc);
        oc_max = oc_max.max(p.oc);
    }
    // Keep the zero line inside the frame.
    let (oc_min, oc_max) = pad_range(oc_min.min(0.0), oc_max.max(0.0), 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let zero_row = map_y(0.0, oc_min, oc_max, height);
    for cell in &mut grid[zero_row] {
        *cell = '-';
    }
    for p in curve {
        let x = map_x(p.time, t_min, t_max, width);
        let y = map_y(p.oc, oc_min, oc_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "O-C curve: {} minima | t=[{t_min:.3}, {t_max:.3}] | O-C=[{oc_min:.4}, {oc_max:.4}]\n",
        curve.len()
    ));
    frame(&mut out, &grid, width);
    out
}

fn frame(out: &mut String, grid: &[Vec<char>], width: usize) {
    // Top of the grid is the largest value; rows are stored top-down.
    out.push('+');
    out.push_str(&"-".repeat(width));
    out.push_str("+\n");
    for row in grid {
        out.push('|');
        out.extend(row.iter());
        out.push_str("|\n");
    }
    out.push('+');
    out.push_str(&"-".repeat(width));
    out.push_str("+\n");
}

fn map_x(v: f64, min: f64, max: f64, width: usize) -> usize {
    if max <= min {
        return 0;
    }
    let u = ((v - min) / (max - min)).clamp(0.0, 1.0);
    ((u * (width as f64 - 1.0)).round() as usize).min(width - 1)
}

fn map_y(v: f64, min: f64, max: f64, height: usize) -> usize {
    if max <= min {
        return height - 1;
    }
    let u = ((v - min) / (max - min)).clamp(0.0, 1.0);
    let row = (u * (height as f64 - 1.0)).round() as usize;
    height - 1 - row.min(height - 1)
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    if !(min.is_finite() && max.is_finite()) {
        return (0.0, 1.0);
    }
    let span = (max - min).max(1e-9);
    (min - span * frac, max + span * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Periodogram;

    #[test]
    fn periodogram_plot_has_expected_dimensions() {
        let pg = Periodogram {
            frequencies: (1..100).map(|i| i as f64 * 0.1).collect(),
            power: (1..100).map(|i| ((i as f64) * 0.3).sin().abs()).collect(),
            peak_frequency: 5.0,
            peak_power: 1.0,
            resolution: 0.1,
        };
        let plot = render_periodogram(&pg, 60, 12);
        // Header + top border + 12 rows + bottom border.
        assert_eq!(plot.lines().count(), 15);
        assert!(plot.contains('P'));
    }

    #[test]
    fn oc_plot_draws_points_and_zero_line() {
        let curve: Vec<OcPoint> = (0..8)
            .map(|k| OcPoint {
                time: k as f64,
                oc: 0.01 * k as f64,
                err: 0.002,
            })
            .collect();
        let plot = render_oc_curve(&curve, 40, 10);
        assert_eq!(plot.lines().count(), 13);
        assert!(plot.contains('o'));
        assert!(plot.contains("8 minima"));
    }

    #[test]
    fn map_y_inverts_vertical_axis() {
        assert_eq!(map_y(1.0, 0.0, 1.0, 10), 0);
        assert_eq!(map_y(0.0, 0.0, 1.0, 10), 9);
    }
}
