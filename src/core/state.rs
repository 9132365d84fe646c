//! Converter state container
//!
//! All widget state lives in [`ConverterState`] and only changes through the `on_*`
//! transitions and the selection setters, so the whole fetch/convert/swap cycle can be
//! exercised without a terminal, a network or a canvas.
//!
//! Fetches are tagged with a [`FetchTicket`] when they start. A completion is applied only
//! when it was dispatched for the current currency pair and is newer than the last applied
//! completion; everything else is discarded as stale.

use crate::core::chart::ChartDataset;
use crate::core::config::{OverlapPolicy, StaleTargetPolicy};
use crate::core::convert::{ConversionOutcome, ConversionRequest, convert};
use crate::core::rates::{FetchFailure, RateSnapshot, RateTable};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// No fetch was started yet.
    Idle,
    /// At least one fetch is outstanding.
    Loading,
    /// Every started fetch has settled.
    Ready,
}

/// Identifies one dispatched fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub epoch: u64,
    pub base: String,
}

/// What applying a fetch completion did to the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// The completion belonged to an older request or pair and was dropped.
    Stale,
    /// The completion was applied.
    Applied {
        /// A new chart dataset was published.
        dataset_changed: bool,
        /// The target was replaced because the new table had no rate for it.
        target_reset: Option<String>,
    },
    /// The completion was a failure for the current pair.
    Failed(FetchFailure),
}

#[derive(Debug, Clone)]
pub struct ConverterState {
    base: String,
    target: String,
    amount: f64,
    rates: RateTable,
    /// Base currency the current table is quoted in.
    rates_base: Option<String>,
    dataset: Option<ChartDataset>,
    converted: Option<ConversionOutcome>,
    published_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    stale_target: StaleTargetPolicy,
    in_flight: usize,
    started: bool,
    torn_down: bool,
    next_seq: u64,
    last_applied_seq: u64,
    epoch: u64,
}

impl ConverterState {
    pub fn new(base: &str, target: &str, amount: f64, stale_target: StaleTargetPolicy) -> Self {
        ConverterState {
            base: base.to_string(),
            target: target.to_string(),
            amount,
            rates: RateTable::new(),
            rates_base: None,
            dataset: None,
            converted: None,
            published_at: None,
            last_error: None,
            stale_target,
            in_flight: 0,
            started: false,
            torn_down: false,
            next_seq: 0,
            last_applied_seq: 0,
            epoch: 0,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn rates_base(&self) -> Option<&str> {
        self.rates_base.as_deref()
    }

    pub fn dataset(&self) -> Option<&ChartDataset> {
        self.dataset.as_ref()
    }

    pub fn converted(&self) -> Option<&ConversionOutcome> {
        self.converted.as_ref()
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn phase(&self) -> LoadPhase {
        if !self.started {
            LoadPhase::Idle
        } else if self.in_flight > 0 {
            LoadPhase::Loading
        } else {
            LoadPhase::Ready
        }
    }

    /// Whether a refresh tick should dispatch a fetch under `policy`.
    pub fn accepts_tick(&self, policy: OverlapPolicy) -> bool {
        if self.torn_down {
            return false;
        }
        match policy {
            OverlapPolicy::Allow => true,
            OverlapPolicy::SkipTick => self.in_flight == 0,
        }
    }

    /// Selects a new base currency. Returns `true` when the pair changed.
    pub fn set_base(&mut self, code: &str) -> bool {
        if self.base == code {
            return false;
        }
        self.base = code.to_string();
        self.bump_epoch();
        true
    }

    /// Selects a new target currency. Returns `true` when the pair changed.
    pub fn set_target(&mut self, code: &str) -> bool {
        if self.target == code {
            return false;
        }
        self.target = code.to_string();
        self.bump_epoch();
        true
    }

    pub fn set_amount(&mut self, amount: f64) {
        self.amount = amount;
    }

    /// Exchanges base and target in one step.
    pub fn on_swap(&mut self) {
        std::mem::swap(&mut self.base, &mut self.target);
        self.bump_epoch();
        debug!(base = %self.base, target = %self.target, "Swapped currencies");
    }

    pub fn on_fetch_start(&mut self) -> FetchTicket {
        self.next_seq += 1;
        self.in_flight += 1;
        self.started = true;
        FetchTicket {
            seq: self.next_seq,
            epoch: self.epoch,
            base: self.base.clone(),
        }
    }

    pub fn on_fetch_success(&mut self, ticket: &FetchTicket, snapshot: RateSnapshot) -> Settled {
        self.settle();
        if !self.is_current(ticket) {
            debug!(seq = ticket.seq, base = %ticket.base, "Discarding stale rates");
            return Settled::Stale;
        }
        self.last_applied_seq = ticket.seq;
        self.last_error = None;
        self.published_at = snapshot.published_at;
        self.rates = snapshot.rates;
        self.rates_base = Some(ticket.base.clone());

        let target_reset = self.reset_target_if_missing();
        let dataset = ChartDataset::from_rates(&self.base, &self.target, &self.rates);
        let dataset_changed = self.dataset.as_ref() != Some(&dataset);
        if dataset_changed {
            self.dataset = Some(dataset);
        }
        info!(
            base = %ticket.base,
            currencies = self.rates.len(),
            dataset_changed,
            "Applied rate table"
        );
        Settled::Applied {
            dataset_changed,
            target_reset,
        }
    }

    pub fn on_fetch_failure(&mut self, ticket: &FetchTicket, err: &anyhow::Error) -> Settled {
        self.settle();
        let failure = FetchFailure::of(err);
        if !self.is_current(ticket) {
            debug!(seq = ticket.seq, base = %ticket.base, %failure, "Discarding stale failure");
            return Settled::Stale;
        }
        error!(base = %ticket.base, %failure, error = %err, "Error fetching rates");
        self.last_error = Some(format!("{failure}: {err}"));
        Settled::Failed(failure)
    }

    /// Converts the current amount with whatever table is cached.
    ///
    /// A table quoted in a different base than the one selected yields
    /// [`ConversionOutcome::Unavailable`] until a fetch for the new base lands.
    pub fn on_user_convert(&mut self) -> ConversionOutcome {
        let outcome = if self.rates_base.as_deref() == Some(self.base.as_str()) {
            let request = ConversionRequest {
                amount: self.amount,
                base_currency: &self.base,
                target_currency: &self.target,
            };
            convert(&request, &self.rates)
        } else {
            ConversionOutcome::Unavailable
        };
        self.converted = Some(outcome.clone());
        outcome
    }

    /// Marks the state as unmounted. Outstanding fetches become stale.
    pub fn on_teardown(&mut self) {
        self.torn_down = true;
        self.bump_epoch();
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        !self.torn_down && ticket.epoch == self.epoch && ticket.seq > self.last_applied_seq
    }

    fn settle(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    fn bump_epoch(&mut self) {
        self.epoch += 1;
    }

    fn reset_target_if_missing(&mut self) -> Option<String> {
        if self.stale_target != StaleTargetPolicy::Reset || self.rates.contains(&self.target) {
            return None;
        }
        let replacement = self.rates.codes().find(|code| *code != self.base)?.to_string();
        info!(from = %self.target, to = %replacement, "Target currency has no rate, resetting");
        self.target = replacement.clone();
        self.bump_epoch();
        Some(replacement)
    }
}
