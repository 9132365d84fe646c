//! Chart dataset derivation and the single chart resource slot

use crate::core::rates::RateTable;
use anyhow::Result;
use tracing::{debug, warn};

/// Stroke color of the rate series (teal).
pub const DEFAULT_STROKE: (u8, u8, u8) = (75, 192, 192);
/// Line interpolation tension passed to the canvas.
pub const DEFAULT_TENSION: f64 = 0.1;

/// Render-ready projection of a [`RateTable`].
///
/// Always rebuilt from a table, never edited in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDataset {
    /// Series label, `"<base> to <target>"`.
    pub label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub stroke: (u8, u8, u8),
    pub tension: f64,
}

impl ChartDataset {
    pub fn from_rates(base: &str, target: &str, rates: &RateTable) -> Self {
        let (labels, values) = rates
            .iter()
            .map(|(code, rate)| (code.to_string(), rate))
            .unzip();
        ChartDataset {
            label: series_label(base, target),
            labels,
            values,
            stroke: DEFAULT_STROKE,
            tension: DEFAULT_TENSION,
        }
    }

    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

pub fn series_label(base: &str, target: &str) -> String {
    format!("{base} to {target}")
}

/// Fixed chart configuration: a single line series with the y axis starting at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub begin_at_zero: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        ChartOptions {
            begin_at_zero: true,
        }
    }
}

/// A drawing surface able to hold chart instances.
pub trait ChartCanvas {
    type Chart;

    fn create(&mut self, dataset: &ChartDataset, options: &ChartOptions) -> Result<Self::Chart>;

    fn destroy(&mut self, chart: Self::Chart);
}

/// A canvas that draws nothing, for hosts without a chart surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCanvas;

impl ChartCanvas for NoCanvas {
    type Chart = ();

    fn create(&mut self, _dataset: &ChartDataset, _options: &ChartOptions) -> Result<()> {
        Ok(())
    }

    fn destroy(&mut self, _chart: ()) {}
}

/// Owns at most one live chart on a canvas.
///
/// Every render releases the previous chart before creating the next one, so a failed
/// creation leaves the slot empty rather than showing a chart for an old table.
pub struct ChartSlot<C: ChartCanvas> {
    canvas: C,
    options: ChartOptions,
    live: Option<C::Chart>,
}

impl<C: ChartCanvas> ChartSlot<C> {
    pub fn new(canvas: C) -> Self {
        Self::with_options(canvas, ChartOptions::default())
    }

    pub fn with_options(canvas: C, options: ChartOptions) -> Self {
        ChartSlot {
            canvas,
            options,
            live: None,
        }
    }

    pub fn render(&mut self, dataset: &ChartDataset) -> Result<()> {
        self.release();
        let chart = self.canvas.create(dataset, &self.options)?;
        debug!(label = %dataset.label, points = dataset.labels.len(), "Chart created");
        self.live = Some(chart);
        Ok(())
    }

    /// Destroys the live chart, if any.
    pub fn release(&mut self) {
        if let Some(chart) = self.live.take() {
            debug!("Destroying previous chart");
            self.canvas.destroy(chart);
        }
    }

    pub fn live(&self) -> Option<&C::Chart> {
        self.live.as_ref()
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }
}

impl<C: ChartCanvas> Drop for ChartSlot<C> {
    fn drop(&mut self) {
        if self.live.is_some() {
            warn!("Chart slot dropped with a live chart, releasing it");
            self.release();
        }
    }
}
