//! Interactive converter session on the terminal.

use super::ui;
use crate::cli::rates::display_rates;
use crate::core::chart::ChartCanvas;
use crate::core::config::AppConfig;
use crate::core::rates::{RateProvider, RateSnapshot};
use crate::core::state::{ConverterState, LoadPhase, Settled};
use crate::render::SvgCanvas;
use crate::widget::{ConverterWidget, Handled};
use anyhow::{Result, anyhow, bail};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

const HELP: &str = "\
Commands:
  convert [AMOUNT]  convert the current (or given) amount
  amount AMOUNT     set the amount
  from CODE         set the base currency
  to CODE           set the target currency
  swap              swap base and target
  rates             list the current rate table
  status            show the current state
  help              show this help
  quit              leave";

#[derive(Debug, Clone, PartialEq)]
pub enum WatchCommand {
    Convert(Option<f64>),
    Amount(f64),
    From(String),
    To(String),
    Swap,
    Rates,
    Status,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<WatchCommand>> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();
    if parts.next().is_some() {
        bail!("Too many arguments: {}", line.trim());
    }

    let command = match (verb.to_lowercase().as_str(), arg) {
        ("convert" | "c", None) => WatchCommand::Convert(None),
        ("convert" | "c", Some(amount)) => WatchCommand::Convert(Some(parse_amount(amount)?)),
        ("amount" | "a", Some(amount)) => WatchCommand::Amount(parse_amount(amount)?),
        ("from" | "f", Some(code)) => WatchCommand::From(code.to_string()),
        ("to" | "t", Some(code)) => WatchCommand::To(code.to_string()),
        ("swap" | "s", None) => WatchCommand::Swap,
        ("rates" | "r", None) => WatchCommand::Rates,
        ("status", None) => WatchCommand::Status,
        ("help" | "h" | "?", None) => WatchCommand::Help,
        ("quit" | "q" | "exit", None) => WatchCommand::Quit,
        ("amount" | "a" | "from" | "f" | "to" | "t", None) => {
            bail!("Missing argument for {verb}")
        }
        _ => bail!("Unknown command: {}", line.trim()),
    };
    Ok(Some(command))
}

fn parse_amount(text: &str) -> Result<f64> {
    text.parse::<f64>()
        .map_err(|_| anyhow!("Invalid amount: {text}"))
}

/// One-line summary of the converter state.
pub fn status_line(state: &ConverterState) -> String {
    let mut parts = vec![format!(
        "{} {} -> {}",
        state.amount(),
        ui::style_text(state.base(), ui::StyleType::Label),
        ui::style_text(state.target(), ui::StyleType::Label)
    )];
    if let Some(converted) = state.converted() {
        let style = if converted.is_available() {
            ui::StyleType::Value
        } else {
            ui::StyleType::Error
        };
        parts.push(format!("result {}", ui::style_text(converted.as_str(), style)));
    }
    match state.phase() {
        LoadPhase::Idle => parts.push("idle".to_string()),
        LoadPhase::Loading => parts.push(ui::style_text("Loading...", ui::StyleType::Subtle)),
        LoadPhase::Ready => {}
    }
    if !state.rates().is_empty() {
        let mut rates = format!("{} rates", state.rates().len());
        if let Some(published_at) = state.published_at() {
            rates.push_str(&format!(" as of {}", published_at.format("%Y-%m-%d %H:%M UTC")));
        }
        parts.push(ui::style_text(&rates, ui::StyleType::Subtle));
    }
    if let Some(err) = state.last_error() {
        parts.push(ui::style_text(&format!("refresh failing: {err}"), ui::StyleType::Error));
    }
    parts.join(" | ")
}

/// Applies a command to the widget and returns the text to print.
pub fn apply_command<C: ChartCanvas>(
    widget: &mut ConverterWidget<C>,
    command: WatchCommand,
) -> Option<String> {
    match command {
        WatchCommand::Convert(amount) => {
            if let Some(amount) = amount {
                widget.set_amount(amount);
            }
            widget.convert();
            Some(status_line(widget.state()))
        }
        WatchCommand::Amount(amount) => {
            widget.set_amount(amount);
            Some(status_line(widget.state()))
        }
        WatchCommand::From(code) => {
            widget.set_base(&code);
            Some(status_line(widget.state()))
        }
        WatchCommand::To(code) => {
            widget.set_target(&code);
            Some(status_line(widget.state()))
        }
        WatchCommand::Swap => {
            widget.swap();
            Some(status_line(widget.state()))
        }
        WatchCommand::Rates => {
            let state = widget.state();
            match state.rates_base() {
                Some(base) => Some(display_rates(
                    &RateSnapshot {
                        base: base.to_string(),
                        rates: state.rates().clone(),
                        published_at: state.published_at(),
                    },
                    state.target(),
                )),
                None => Some(ui::style_text("No rates loaded yet", ui::StyleType::Subtle)),
            }
        }
        WatchCommand::Status => Some(status_line(widget.state())),
        WatchCommand::Help => Some(HELP.to_string()),
        WatchCommand::Quit => None,
    }
}

pub async fn run(
    config: &AppConfig,
    provider: Arc<dyn RateProvider>,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let canvas = SvgCanvas::from_config(&config.chart);
    let chart_path = canvas.path();
    let mut widget = ConverterWidget::from_config(config, provider, canvas);
    if let Some(from) = &from {
        widget.set_base(from);
    }
    if let Some(to) = &to {
        widget.set_target(to);
    }

    println!("{}", ui::style_text("Currency Converter", ui::StyleType::Title));
    println!(
        "{}",
        ui::style_text(
            &format!("Chart: {}", chart_path.display()),
            ui::StyleType::Subtle
        )
    );
    println!("{HELP}");
    widget.mount();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("Input closed");
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(WatchCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Some(output) = apply_command(&mut widget, command) {
                            println!("{output}");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
                }
            }
            Some(event) = widget.next_event() => {
                if let Handled::Settled(settled) = widget.handle(event) {
                    if settled != Settled::Stale {
                        println!("{}", status_line(widget.state()));
                    }
                }
            }
        }
    }

    info!("Leaving converter");
    widget.teardown();
    Ok(())
}
