use super::ui;
use crate::core::chart::{ChartOptions, NoCanvas};
use crate::core::config::AppConfig;
use crate::core::convert::ConversionOutcome;
use crate::core::rates::RateProvider;
use crate::render::SvgCanvas;
use crate::widget::ConverterWidget;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub amount: Option<f64>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Also write the rate chart to the configured canvas file.
    pub chart: bool,
}

#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub base: String,
    pub target: String,
    pub amount: f64,
    pub outcome: ConversionOutcome,
    pub published_at: Option<DateTime<Utc>>,
    pub chart_path: Option<PathBuf>,
}

impl ConversionReport {
    pub fn display(&self) -> String {
        let value_style = if self.outcome.is_available() {
            ui::StyleType::Value
        } else {
            ui::StyleType::Error
        };
        let mut output = format!(
            "{} {} = {} {}",
            self.amount,
            ui::style_text(&self.base, ui::StyleType::Label),
            ui::style_text(self.outcome.as_str(), value_style),
            ui::style_text(&self.target, ui::StyleType::Label),
        );
        if let Some(published_at) = self.published_at {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    &format!("Rates as of {}", published_at.format("%Y-%m-%d %H:%M UTC")),
                    ui::StyleType::Subtle
                )
            ));
        }
        if let Some(path) = &self.chart_path {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    &format!("Chart written to {}", path.display()),
                    ui::StyleType::Subtle
                )
            ));
        }
        output
    }
}

pub async fn run(
    config: &AppConfig,
    provider: Arc<dyn RateProvider>,
    options: ConvertOptions,
) -> Result<()> {
    let report = convert_once(config, provider, options).await?;
    println!("{}", report.display());
    Ok(())
}

/// Mounts a converter, waits for the first rate table and converts once.
pub async fn convert_once(
    config: &AppConfig,
    provider: Arc<dyn RateProvider>,
    options: ConvertOptions,
) -> Result<ConversionReport> {
    let mut widget = ConverterWidget::from_config(config, provider, NoCanvas);
    if let Some(from) = &options.from {
        widget.set_base(from);
    }
    if let Some(to) = &options.to {
        widget.set_target(to);
    }
    if let Some(amount) = options.amount {
        widget.set_amount(amount);
    }
    info!(
        base = %widget.state().base(),
        target = %widget.state().target(),
        "Converting"
    );

    widget.mount();
    let pb = ui::new_spinner("Loading...");
    widget.settle().await;
    pb.finish_and_clear();

    let state = widget.state();
    if state.rates_base() != Some(state.base()) {
        let reason = state.last_error().unwrap_or("no rates received");
        return Err(anyhow!(
            "Could not fetch rates for {}: {}",
            state.base(),
            reason
        ));
    }

    let chart_path = match (options.chart, state.dataset()) {
        (true, Some(dataset)) => Some(
            SvgCanvas::from_config(&config.chart).export(dataset, &ChartOptions::default())?,
        ),
        _ => None,
    };

    let outcome = widget.convert();
    let state = widget.state();
    let report = ConversionReport {
        base: state.base().to_string(),
        target: state.target().to_string(),
        amount: state.amount(),
        outcome,
        published_at: state.published_at(),
        chart_path,
    };
    widget.teardown();
    Ok(report)
}
