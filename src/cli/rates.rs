use super::ui;
use crate::core::rates::{RateProvider, RateSnapshot, normalize_code};
use anyhow::{Context, Result};
use comfy_table::Cell;
use tracing::info;

pub async fn run(provider: &dyn RateProvider, base: &str, highlight: &str) -> Result<()> {
    let base = normalize_code(base);
    info!(%base, "Listing rates");

    let pb = ui::new_spinner("Loading...");
    let result = provider.fetch_rates(&base).await;
    pb.finish_and_clear();

    let snapshot = result.with_context(|| format!("Could not fetch rates for {base}"))?;
    println!("{}", display_rates(&snapshot, &normalize_code(highlight)));
    Ok(())
}

pub fn display_rates(snapshot: &RateSnapshot, highlight: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Rate (1 {})", snapshot.base)),
    ]);
    for (code, rate) in snapshot.rates.iter() {
        table.add_row(vec![Cell::new(code), ui::rate_cell(rate, code == highlight)]);
    }

    let mut output = format!(
        "Rates for {}\n\n",
        ui::style_text(&snapshot.base, ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    if let Some(published_at) = snapshot.published_at {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(
                &format!("Published {}", published_at.format("%Y-%m-%d %H:%M UTC")),
                ui::StyleType::Subtle
            )
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_display_rates_lists_every_currency() {
        let snapshot = RateSnapshot {
            base: "USD".to_string(),
            rates: [("INR", 83.0), ("EUR", 0.91)].into_iter().collect(),
            published_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single(),
        };

        let output = console::strip_ansi_codes(&display_rates(&snapshot, "INR")).to_string();

        assert!(output.contains("Rates for USD"));
        assert!(output.contains("Rate (1 USD)"));
        assert!(output.contains("INR"));
        assert!(output.contains("83.0000"));
        assert!(output.contains("EUR"));
        assert!(output.contains("0.910000"));
        assert!(output.contains("Published 2024-01-01 00:00 UTC"));
    }
}
