//! Benchmark artifacts: SVG charts, a text summary and a JSON dump.
//!
//! Charts are plain SVG strings assembled by hand. For a 1D dataset
//! [`write_artifacts`] produces
//! - `<prefix>_comparison.svg`: ground truth, then one panel per model
//! - `<prefix>_convergence.svg`: overlaid loss curves on a log scale
//! - `<prefix>_results.json`
//!
//! and for a volumetric dataset `<prefix>_4d_convergence.svg` and
//! `<prefix>_4d_results.json`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::benchmark::BenchmarkReport;
use crate::data::Dataset;
use crate::error::{QuasimotoError, Result};
use crate::trainer::RunState;

const WIDTH: f64 = 1000.0;
const PANEL_HEIGHT: f64 = 240.0;
const CONVERGENCE_HEIGHT: f64 = 520.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 36.0;

const PALETTE: [&str; 6] = [
    "#d62728", "#1f77b4", "#2ca02c", "#9467bd", "#ff7f0e", "#8c564b",
];

/// Linear map from data coordinates to pixels.
#[derive(Debug, Clone, Copy)]
struct Scale {
    lo: f64,
    hi: f64,
    px_lo: f64,
    px_hi: f64,
}

impl Scale {
    fn new(lo: f64, hi: f64, px_lo: f64, px_hi: f64) -> Self {
        let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
        Self {
            lo,
            hi,
            px_lo,
            px_hi,
        }
    }

    fn map(&self, v: f64) -> f64 {
        self.px_lo + (v - self.lo) / (self.hi - self.lo) * (self.px_hi - self.px_lo)
    }
}

fn finite_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Split a point stream into runs of consecutive drawable points.
fn segments(points: impl IntoIterator<Item = Option<(f64, f64)>>) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for point in points {
        match point {
            Some(p) => current.push(p),
            None => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn polyline(svg: &mut String, points: &[(f64, f64)], color: &str, width: f64, dashed: bool) {
    let mut coords = String::with_capacity(points.len() * 16);
    for (x, y) in points {
        let _ = write!(coords, "{x:.2},{y:.2} ");
    }
    let dash = if dashed {
        r#" stroke-dasharray="6,4" stroke-opacity="0.4""#
    } else {
        ""
    };
    let _ = write!(
        svg,
        r#"<polyline fill="none" stroke="{}" stroke-width="{}"{} points="{}"/>"#,
        color,
        width,
        dash,
        coords.trim_end()
    );
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn frame(svg: &mut String, x: &Scale, y: &Scale) {
    let _ = write!(
        svg,
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"#ccc\"/>",
        x.px_lo,
        y.px_hi,
        x.px_hi - x.px_lo,
        y.px_lo - y.px_hi
    );
}

fn series(
    xs: &[f32],
    ys: &[f32],
    x: &Scale,
    y: &Scale,
) -> Vec<Vec<(f64, f64)>> {
    segments(xs.iter().zip(ys).map(|(&xv, &yv)| {
        let (xv, yv) = (f64::from(xv), f64::from(yv));
        (xv.is_finite() && yv.is_finite()).then(|| (x.map(xv), y.map(yv)))
    }))
}

/// Ground truth followed by one panel per model, each showing the prediction over the
/// truth with the residual MSE in its title.
///
/// # Errors
///
/// Returns [`QuasimotoError::InvalidConfig`] unless the dataset has one spatial axis, or
/// a shape mismatch if a model's predictions do not cover the dataset.
pub fn render_comparison_svg(dataset: &Dataset, report: &BenchmarkReport) -> Result<String> {
    let xs = match (dataset.spatial_dims(), dataset.axis(0)) {
        (1, Some(axis)) => axis,
        (dims, _) => {
            return Err(QuasimotoError::invalid_config(format!(
                "comparison chart needs a 1D dataset, got {dims} spatial axes"
            )))
        }
    };
    let truth = dataset.target();
    for result in report {
        if result.predictions.len() != truth.len() {
            return Err(QuasimotoError::shape_mismatch(
                format!("{} predictions for '{}'", truth.len(), result.name),
                result.predictions.len().to_string(),
            ));
        }
    }

    let panels = report.len() + 1;
    let height = PANEL_HEIGHT * panels as f64;
    let (x_lo, x_hi) = finite_range(xs.iter().map(|&v| f64::from(v))).unwrap_or((0.0, 1.0));
    let x = Scale::new(x_lo, x_hi, MARGIN_LEFT, WIDTH - MARGIN_RIGHT);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {height}" font-family="sans-serif">"#
    );
    svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);

    let panel = |svg: &mut String, index: usize, title: &str, prediction: Option<(&[f32], &str)>| {
        let top = PANEL_HEIGHT * index as f64;
        let values = truth
            .iter()
            .chain(prediction.map(|(p, _)| p).unwrap_or(&[]))
            .map(|&v| f64::from(v));
        let (lo, hi) = finite_range(values).unwrap_or((-1.0, 1.0));
        let pad = (hi - lo).abs().max(1e-6) * 0.05;
        let y = Scale::new(
            lo - pad,
            hi + pad,
            top + PANEL_HEIGHT - MARGIN_BOTTOM,
            top + MARGIN_TOP,
        );

        let _ = write!(
            svg,
            r#"<text x="{}" y="{:.2}" text-anchor="middle" font-size="14" font-weight="bold">{}</text>"#,
            WIDTH / 2.0,
            top + 24.0,
            escape(title)
        );
        frame(svg, &x, &y);
        let _ = write!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="end" font-size="10">{:.3}</text><text x="{:.2}" y="{:.2}" text-anchor="end" font-size="10">{:.3}</text>"#,
            MARGIN_LEFT - 6.0,
            y.px_hi + 10.0,
            hi + pad,
            MARGIN_LEFT - 6.0,
            y.px_lo,
            lo - pad
        );

        match prediction {
            None => {
                for seg in series(xs, truth, &x, &y) {
                    polyline(svg, &seg, "black", 2.0, false);
                }
            }
            Some((pred, color)) => {
                for seg in series(xs, truth, &x, &y) {
                    polyline(svg, &seg, "black", 1.0, true);
                }
                for seg in series(xs, pred, &x, &y) {
                    polyline(svg, &seg, color, 2.0, false);
                }
            }
        }
    };

    panel(&mut svg, 0, "Ground Truth Signal", None);
    for (i, result) in report.iter().enumerate() {
        let title = format!("{} Fit (MSE: {:.8})", result.name, result.residual_mse);
        let color = PALETTE[i % PALETTE.len()];
        panel(&mut svg, i + 1, &title, Some((result.predictions.as_slice(), color)));
    }

    svg.push_str("</svg>");
    Ok(svg)
}

/// Loss curves of every model in `report`, log-scaled.
///
/// Non-finite and non-positive losses are left as gaps in the curve.
pub fn render_convergence_svg(report: &BenchmarkReport, title: &str) -> String {
    let plot_top = MARGIN_TOP + 10.0;
    let plot_bottom = CONVERGENCE_HEIGHT - MARGIN_BOTTOM - 10.0;

    let log_losses = |losses: &[f32]| -> Vec<Option<f64>> {
        losses
            .iter()
            .map(|&v| {
                let v = f64::from(v);
                (v.is_finite() && v > 0.0).then(|| v.log10())
            })
            .collect()
    };

    let steps = report
        .iter()
        .map(|r| r.trajectory.len())
        .max()
        .unwrap_or(0)
        .max(2);
    let (lo, hi) = finite_range(
        report
            .iter()
            .flat_map(|r| log_losses(r.trajectory.values()))
            .flatten(),
    )
    .unwrap_or((-1.0, 0.0));
    let (decade_lo, decade_hi) = (lo.floor(), hi.ceil().max(lo.floor() + 1.0));

    let x = Scale::new(0.0, (steps - 1) as f64, MARGIN_LEFT, WIDTH - MARGIN_RIGHT);
    let y = Scale::new(decade_lo, decade_hi, plot_bottom, plot_top);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {CONVERGENCE_HEIGHT}" font-family="sans-serif">"#
    );
    svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = write!(
        svg,
        r#"<text x="{}" y="24" text-anchor="middle" font-size="14" font-weight="bold">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    );
    frame(&mut svg, &x, &y);

    // decade grid
    let mut decade = decade_lo;
    while decade <= decade_hi {
        let py = y.map(decade);
        let _ = write!(
            svg,
            "<line x1=\"{:.2}\" y1=\"{py:.2}\" x2=\"{:.2}\" y2=\"{py:.2}\" stroke=\"#eee\"/><text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-size=\"10\">1e{}</text>",
            x.px_lo,
            x.px_hi,
            MARGIN_LEFT - 6.0,
            py + 3.0,
            decade as i64
        );
        decade += 1.0;
    }
    let _ = write!(
        svg,
        r#"<text x="{}" y="{:.2}" text-anchor="middle" font-size="12">Epoch</text><text x="16" y="{:.2}" font-size="12" transform="rotate(-90 16 {:.2})" text-anchor="middle">MSE Loss</text>"#,
        WIDTH / 2.0,
        CONVERGENCE_HEIGHT - 8.0,
        (plot_top + plot_bottom) / 2.0,
        (plot_top + plot_bottom) / 2.0
    );

    for (i, result) in report.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let points = log_losses(result.trajectory.values())
            .into_iter()
            .enumerate()
            .map(|(step, v)| v.map(|v| (x.map(step as f64), y.map(v))));
        for seg in segments(points) {
            polyline(&mut svg, &seg, color, 2.0, false);
        }

        let ly = plot_top + 16.0 * i as f64 + 8.0;
        let lx = WIDTH - MARGIN_RIGHT - 180.0;
        let _ = write!(
            svg,
            r#"<line x1="{lx:.2}" y1="{ly:.2}" x2="{:.2}" y2="{ly:.2}" stroke="{color}" stroke-width="2"/><text x="{:.2}" y="{:.2}" font-size="11">{}</text>"#,
            lx + 20.0,
            lx + 26.0,
            ly + 4.0,
            escape(&result.name)
        );
    }

    svg.push_str("</svg>");
    svg
}

/// Fixed-width table of final losses.
pub fn summary_table(report: &BenchmarkReport) -> String {
    let mut table = format!(
        "{:<20} {:>12} {:>16} {:>16} {:>10}\n",
        "Model", "Params", "Final Loss", "Residual MSE", "Seconds"
    );
    table.push_str(&"-".repeat(78));
    table.push('\n');
    for result in report {
        let _ = write!(
            table,
            "{:<20} {:>12} {:>16.8} {:>16.8} {:>10.2}",
            result.name,
            result.parameter_count,
            result.final_loss,
            result.residual_mse,
            result.seconds
        );
        if let RunState::Aborted { step } = result.state {
            let _ = write!(table, "  aborted at step {step}");
        }
        table.push('\n');
    }
    table
}

/// Files written by [`write_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Prediction panels; only produced for 1D datasets
    pub comparison: Option<PathBuf>,
    pub convergence: PathBuf,
    pub results: PathBuf,
}

impl ArtifactPaths {
    /// All written paths.
    pub fn all(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self.comparison.iter().map(PathBuf::as_path).collect();
        paths.push(&self.convergence);
        paths.push(&self.results);
        paths
    }
}

/// Write the charts and JSON results for `report` into `dir`, creating it if needed.
///
/// # Errors
///
/// Returns an error if rendering fails or a file cannot be written.
pub fn write_artifacts(
    dir: &Path,
    prefix: &str,
    dataset: &Dataset,
    report: &BenchmarkReport,
) -> Result<ArtifactPaths> {
    fs::create_dir_all(dir)?;

    let paths = if dataset.spatial_dims() == 1 {
        let comparison = dir.join(format!("{prefix}_comparison.svg"));
        fs::write(&comparison, render_comparison_svg(dataset, report)?)?;

        let convergence = dir.join(format!("{prefix}_convergence.svg"));
        fs::write(
            &convergence,
            render_convergence_svg(report, "Training Convergence Comparison"),
        )?;

        ArtifactPaths {
            comparison: Some(comparison),
            convergence,
            results: dir.join(format!("{prefix}_results.json")),
        }
    } else {
        let convergence = dir.join(format!("{prefix}_4d_convergence.svg"));
        let title = match report.results.as_slice() {
            [only] => format!("{} Training Convergence", only.name),
            _ => "Volumetric Training Convergence".to_string(),
        };
        fs::write(&convergence, render_convergence_svg(report, &title))?;

        ArtifactPaths {
            comparison: None,
            convergence,
            results: dir.join(format!("{prefix}_4d_results.json")),
        }
    };

    fs::write(&paths.results, serde_json::to_string_pretty(report)?)?;
    for path in paths.all() {
        tracing::info!("Saved {}", path.display());
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::BenchmarkResult;
    use crate::data::{generate_1d_with, generate_volumetric, ChirpConfig};
    use crate::history::LossTrajectory;
    use crate::model::ModelSpec;

    fn fake_result(name: &str, predictions: Vec<f32>, losses: Vec<f32>) -> BenchmarkResult {
        BenchmarkResult {
            name: name.to_string(),
            spec: ModelSpec::Wave,
            final_loss: losses.last().copied().unwrap_or(f32::NAN),
            trajectory: LossTrajectory::from(losses),
            state: RunState::Exhausted,
            parameter_count: 8,
            predictions,
            residual_mse: 0.125,
            seconds: 1.5,
        }
    }

    fn small_chirp() -> Dataset {
        generate_1d_with(&ChirpConfig {
            points: 40,
            ..ChirpConfig::default()
        })
    }

    fn report_for(dataset: &Dataset) -> BenchmarkReport {
        let mut report = BenchmarkReport::new(dataset.name());
        report.push(fake_result("Quasimoto", vec![0.0; dataset.len()], vec![1.0, 0.5, 0.1]));
        report.push(fake_result("SIREN <w0>", vec![0.1; dataset.len()], vec![2.0, 0.2, 0.02]));
        report
    }

    #[test]
    fn test_comparison_svg_panels() {
        let dataset = small_chirp();
        let svg = render_comparison_svg(&dataset, &report_for(&dataset)).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Ground Truth Signal"));
        assert!(svg.contains("Quasimoto Fit (MSE: 0.12500000)"));
        assert!(svg.contains("SIREN &lt;w0&gt; Fit"));
        // truth, then truth + prediction per model
        assert_eq!(svg.matches("<polyline").count(), 1 + 2 * 2);
    }

    #[test]
    fn test_comparison_requires_1d() {
        let dataset = generate_volumetric(3);
        let report = BenchmarkReport::new(dataset.name());
        assert!(matches!(
            render_comparison_svg(&dataset, &report),
            Err(QuasimotoError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_comparison_rejects_short_predictions() {
        let dataset = small_chirp();
        let mut report = BenchmarkReport::new(dataset.name());
        report.push(fake_result("short", vec![0.0; 3], vec![1.0]));
        assert!(matches!(
            render_comparison_svg(&dataset, &report),
            Err(QuasimotoError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_convergence_svg_skips_non_finite() {
        let mut report = BenchmarkReport::new("chirp");
        report.push(fake_result(
            "unstable",
            vec![],
            vec![1.0, 0.5, f32::NAN, 0.25, f32::INFINITY, 0.1],
        ));
        let svg = render_convergence_svg(&report, "Convergence");

        assert!(svg.contains("unstable"));
        assert!(!svg.contains("NaN"));
        assert!(!svg.contains("inf"));
        // three finite runs separated by the gaps
        assert_eq!(svg.matches("<polyline").count(), 3);
        assert!(svg.contains("1e0"));
        assert!(svg.contains("1e-1"));
    }

    #[test]
    fn test_convergence_svg_empty_report() {
        let svg = render_convergence_svg(&BenchmarkReport::new("empty"), "Nothing");
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<polyline").count(), 0);
    }

    #[test]
    fn test_summary_table() {
        let dataset = small_chirp();
        let table = summary_table(&report_for(&dataset));
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Model"));
        assert!(lines[2].starts_with("Quasimoto"));
        assert!(lines[2].contains("0.10000000"));
        assert!(lines[3].contains("0.02000000"));
    }

    #[test]
    fn test_summary_table_marks_aborted_runs() {
        let mut report = BenchmarkReport::new("chirp");
        report.push(fake_result("Stable", vec![], vec![0.5, 0.25]));
        let mut aborted = fake_result("Diverging", vec![], vec![]);
        aborted.state = RunState::Aborted { step: 0 };
        report.push(aborted);

        let table = summary_table(&report);
        let lines: Vec<&str> = table.lines().collect();
        assert!(!lines[2].contains("aborted"));
        assert!(lines[3].starts_with("Diverging"));
        assert!(lines[3].ends_with("aborted at step 0"));
    }

    #[test]
    fn test_write_artifacts_1d() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = small_chirp();
        let report = report_for(&dataset);

        let paths = write_artifacts(dir.path(), "quasimoto", &dataset, &report).unwrap();
        assert_eq!(
            paths.comparison.as_deref(),
            Some(dir.path().join("quasimoto_comparison.svg").as_path())
        );
        assert_eq!(paths.convergence, dir.path().join("quasimoto_convergence.svg"));
        for path in paths.all() {
            assert!(path.exists(), "{} missing", path.display());
        }

        let json = std::fs::read_to_string(&paths.results).unwrap();
        let parsed: BenchmarkReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.results[0].name, "Quasimoto");
    }

    #[test]
    fn test_write_artifacts_volumetric() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = generate_volumetric(2);
        let mut report = BenchmarkReport::new(dataset.name());
        report.push(fake_result("Quasimoto-4D", vec![0.0; 8], vec![0.3, 0.2]));

        let paths = write_artifacts(dir.path(), "quasimoto", &dataset, &report).unwrap();
        assert!(paths.comparison.is_none());
        assert_eq!(
            paths.convergence,
            dir.path().join("quasimoto_4d_convergence.svg")
        );
        let svg = std::fs::read_to_string(&paths.convergence).unwrap();
        assert!(svg.contains("Quasimoto-4D Training Convergence"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a<b>&"c""#), "a&lt;b&gt;&amp;&quot;c&quot;");
    }
}
