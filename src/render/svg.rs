//! SVG chart canvas
//!
//! Each chart is rendered with plotters into an SVG document and written to
//! `<output_dir>/<canvas id>.svg`. Destroying a chart removes the file again.

use anyhow::{Context, Result, anyhow};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::chart::{ChartCanvas, ChartDataset, ChartOptions};
use crate::core::config::ChartConfig;

/// Interpolated points drawn between two neighbouring rates.
const SEGMENT_SAMPLES: usize = 8;

#[derive(Debug, Clone)]
pub struct SvgCanvas {
    id: String,
    width: u32,
    height: u32,
    output_dir: PathBuf,
}

/// A chart currently drawn on an [`SvgCanvas`].
#[derive(Debug, Clone, PartialEq)]
pub struct SvgChart {
    pub path: PathBuf,
    pub label: String,
}

impl SvgCanvas {
    pub fn new(id: &str, width: u32, height: u32, output_dir: impl Into<PathBuf>) -> Self {
        SvgCanvas {
            id: id.to_string(),
            width,
            height,
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &ChartConfig) -> Self {
        Self::new(
            &config.canvas_id,
            config.width,
            config.height,
            config.output_dir.clone(),
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.svg", self.id))
    }

    /// Writes `dataset` to the canvas file without tracking it as a live chart.
    pub fn export(&self, dataset: &ChartDataset, options: &ChartOptions) -> Result<PathBuf> {
        let svg = render_svg(dataset, options, self.size())?;
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create chart directory: {}",
                self.output_dir.display()
            )
        })?;
        let path = self.path();
        fs::write(&path, svg)
            .with_context(|| format!("Failed to write chart to {}", path.display()))?;
        debug!(path = %path.display(), "Chart written");
        Ok(path)
    }
}

impl ChartCanvas for SvgCanvas {
    type Chart = SvgChart;

    fn create(&mut self, dataset: &ChartDataset, options: &ChartOptions) -> Result<SvgChart> {
        let path = self.export(dataset, options)?;
        Ok(SvgChart {
            path,
            label: dataset.label.clone(),
        })
    }

    fn destroy(&mut self, chart: SvgChart) {
        remove_chart_file(&chart.path);
    }
}

fn remove_chart_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Chart removed"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove chart"),
    }
}

/// Renders `dataset` as a single line series into an SVG string of `size` pixels.
pub fn render_svg(
    dataset: &ChartDataset,
    options: &ChartOptions,
    size: (u32, u32),
) -> Result<String> {
    let mut buffer = String::new();
    {
        let root = SVGBackend::with_string(&mut buffer, size).into_drawing_area();
        draw_line_chart(&root, dataset, options)
            .map_err(|e| anyhow!("Failed to draw chart: {}", e))?;
    }
    Ok(buffer)
}

fn draw_line_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    dataset: &ChartDataset,
    options: &ChartOptions,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let x_max = dataset.labels.len().saturating_sub(1).max(1) as f64;
    let (y_min, y_max) = y_bounds(&dataset.values, options.begin_at_zero);

    let mut chart = ChartBuilder::on(root)
        .caption(&dataset.label, ("sans-serif", 14).into_font())
        .margin(8)
        .x_label_area_size(24)
        .y_label_area_size(48)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)?;

    let labels = &dataset.labels;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len().clamp(2, 12))
        .y_labels(5)
        .x_label_formatter(&|x| {
            let index = x.round();
            if (x - index).abs() > 1e-6 || index < 0.0 {
                return String::new();
            }
            labels.get(index as usize).cloned().unwrap_or_default()
        })
        .label_style(("sans-serif", 10).into_font())
        .draw()?;

    if !dataset.is_empty() {
        let (r, g, b) = dataset.stroke;
        let points: Vec<(f64, f64)> = dataset
            .points()
            .enumerate()
            .map(|(i, (_, value))| (i as f64, value))
            .collect();
        chart.draw_series(LineSeries::new(
            smooth(&points, dataset.tension),
            RGBColor(r, g, b).stroke_width(2),
        ))?;
    }

    root.present()?;
    Ok(())
}

/// Y axis range for `values`, padded above the largest value.
fn y_bounds(values: &[f64], begin_at_zero: bool) -> (f64, f64) {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let max = finite.clone().fold(f64::NEG_INFINITY, f64::max);
    let min = finite.fold(f64::INFINITY, f64::min);
    if !max.is_finite() {
        return (0.0, 1.0);
    }
    let low = if begin_at_zero { min.min(0.0) } else { min };
    let high = if max > low { max * 1.05 } else { low + 1.0 };
    (low, high)
}

/// Cardinal spline through `points`; `tension` scales the tangents.
///
/// A tension of zero keeps straight segments. Every input point is on the curve.
fn smooth(points: &[(f64, f64)], tension: f64) -> Vec<(f64, f64)> {
    if tension <= 0.0 || points.len() < 3 {
        return points.to_vec();
    }
    let tangent = |i: usize| {
        let prev = points[i.saturating_sub(1)];
        let next = points[(i + 1).min(points.len() - 1)];
        ((next.0 - prev.0) * tension, (next.1 - prev.1) * tension)
    };

    let mut curve = Vec::with_capacity((points.len() - 1) * SEGMENT_SAMPLES + 1);
    for i in 0..points.len() - 1 {
        let (p0, p1) = (points[i], points[i + 1]);
        let (m0, m1) = (tangent(i), tangent(i + 1));
        for step in 0..SEGMENT_SAMPLES {
            let t = step as f64 / SEGMENT_SAMPLES as f64;
            let (t2, t3) = (t * t, t * t * t);
            let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
            let h10 = t3 - 2.0 * t2 + t;
            let h01 = -2.0 * t3 + 3.0 * t2;
            let h11 = t3 - t2;
            curve.push((
                h00 * p0.0 + h10 * m0.0 + h01 * p1.0 + h11 * m1.0,
                h00 * p0.1 + h10 * m0.1 + h01 * p1.1 + h11 * m1.1,
            ));
        }
    }
    curve.push(points[points.len() - 1]);
    curve
}
