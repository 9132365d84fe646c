//! The converter widget: state, rate fetching, refresh timer and chart in one place.
//!
//! A fetch is activated on mount and whenever the base or target currency changes; each
//! activation also restarts the refresh timer so only one tick loop is ever live. Fetches
//! run as spawned tasks and report back through the widget's event channel, and
//! [`ConverterWidget::handle`] applies their results to the state and the chart.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::chart::{ChartCanvas, ChartSlot};
use crate::core::config::{AppConfig, OverlapPolicy};
use crate::core::convert::ConversionOutcome;
use crate::core::rates::{RateProvider, RateSnapshot, normalize_code};
use crate::core::state::{ConverterState, FetchTicket, Settled};
use crate::core::timer::RefreshTimer;

const EVENT_BUFFER: usize = 32;

pub enum WidgetEvent {
    Tick { generation: u64 },
    FetchSettled {
        ticket: FetchTicket,
        result: Result<RateSnapshot>,
    },
}

/// Result of handling one [`WidgetEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    TickDispatched,
    TickSkipped,
    Settled(Settled),
}

#[derive(Debug, Clone)]
pub struct WidgetOptions {
    pub refresh_interval: Duration,
    pub overlap: OverlapPolicy,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        WidgetOptions {
            refresh_interval: Duration::from_secs(60),
            overlap: OverlapPolicy::default(),
        }
    }
}

pub struct ConverterWidget<C: ChartCanvas> {
    state: ConverterState,
    provider: Arc<dyn RateProvider>,
    chart: ChartSlot<C>,
    timer: RefreshTimer<WidgetEvent>,
    overlap: OverlapPolicy,
    events_tx: mpsc::Sender<WidgetEvent>,
    events_rx: mpsc::Receiver<WidgetEvent>,
    mounted: bool,
}

impl<C: ChartCanvas> ConverterWidget<C> {
    pub fn new(
        state: ConverterState,
        provider: Arc<dyn RateProvider>,
        canvas: C,
        options: WidgetOptions,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        ConverterWidget {
            state,
            provider,
            chart: ChartSlot::new(canvas),
            timer: RefreshTimer::new(options.refresh_interval, |generation| {
                WidgetEvent::Tick { generation }
            }),
            overlap: options.overlap,
            events_tx,
            events_rx,
            mounted: false,
        }
    }

    pub fn from_config(config: &AppConfig, provider: Arc<dyn RateProvider>, canvas: C) -> Self {
        let state = ConverterState::new(
            &normalize_code(&config.base_currency),
            &normalize_code(&config.target_currency),
            config.amount,
            config.stale_target,
        );
        let options = WidgetOptions {
            refresh_interval: config.refresh_interval(),
            overlap: config.overlap,
        };
        Self::new(state, provider, canvas, options)
    }

    pub fn state(&self) -> &ConverterState {
        &self.state
    }

    pub fn chart(&self) -> &ChartSlot<C> {
        &self.chart
    }

    pub fn timer(&self) -> &RefreshTimer<WidgetEvent> {
        &self.timer
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Starts the first fetch and the refresh timer.
    ///
    /// A torn down widget stays down; build a new one to start over.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        if self.state.is_torn_down() {
            warn!("Ignoring mount of a torn down converter");
            return;
        }
        info!(base = %self.state.base(), target = %self.state.target(), "Mounting converter");
        self.mounted = true;
        self.activate();
    }

    pub fn set_base(&mut self, code: &str) -> bool {
        let changed = self.state.set_base(&normalize_code(code));
        if changed {
            self.activate();
        }
        changed
    }

    pub fn set_target(&mut self, code: &str) -> bool {
        let changed = self.state.set_target(&normalize_code(code));
        if changed {
            self.activate();
        }
        changed
    }

    pub fn swap(&mut self) {
        self.state.on_swap();
        self.activate();
    }

    pub fn set_amount(&mut self, amount: f64) {
        self.state.set_amount(amount);
    }

    pub fn convert(&mut self) -> ConversionOutcome {
        self.state.on_user_convert()
    }

    /// Waits for the next timer tick or fetch completion.
    pub async fn next_event(&mut self) -> Option<WidgetEvent> {
        self.events_rx.recv().await
    }

    pub fn handle(&mut self, event: WidgetEvent) -> Handled {
        match event {
            WidgetEvent::Tick { generation } => self.on_tick(generation),
            WidgetEvent::FetchSettled { ticket, result } => {
                Handled::Settled(self.on_settled(&ticket, result))
            }
        }
    }

    /// Handles events until no fetch is outstanding.
    pub async fn settle(&mut self) {
        while self.state.is_loading() {
            match self.next_event().await {
                Some(event) => {
                    self.handle(event);
                }
                None => break,
            }
        }
    }

    /// Cancels the refresh timer, drops outstanding fetch results and releases the chart.
    pub fn teardown(&mut self) {
        if !self.mounted {
            return;
        }
        info!("Tearing down converter");
        self.mounted = false;
        self.timer.cancel();
        self.state.on_teardown();
        self.chart.release();
    }

    fn activate(&mut self) {
        if !self.mounted {
            return;
        }
        self.dispatch();
        self.timer.restart(self.events_tx.clone());
    }

    fn dispatch(&mut self) {
        let ticket = self.state.on_fetch_start();
        debug!(seq = ticket.seq, base = %ticket.base, "Dispatching rate fetch");

        let provider = Arc::clone(&self.provider);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = provider.fetch_rates(&ticket.base).await;
            if events
                .send(WidgetEvent::FetchSettled { ticket, result })
                .await
                .is_err()
            {
                debug!("Converter gone before fetch settled");
            }
        });
    }

    fn on_tick(&mut self, generation: u64) -> Handled {
        if !self.mounted || generation != self.timer.generation() {
            debug!(generation, "Ignoring tick from a cancelled timer");
            return Handled::TickSkipped;
        }
        if !self.state.accepts_tick(self.overlap) {
            debug!(
                in_flight = self.state.in_flight(),
                "Fetch still outstanding, skipping refresh"
            );
            return Handled::TickSkipped;
        }
        self.dispatch();
        Handled::TickDispatched
    }

    fn on_settled(&mut self, ticket: &FetchTicket, result: Result<RateSnapshot>) -> Settled {
        let settled = match result {
            Ok(snapshot) => self.state.on_fetch_success(ticket, snapshot),
            Err(e) => self.state.on_fetch_failure(ticket, &e),
        };

        if let Settled::Applied {
            dataset_changed,
            target_reset,
        } = &settled
        {
            if *dataset_changed {
                self.redraw();
            }
            if target_reset.is_some() {
                self.activate();
            }
        }
        settled
    }

    fn redraw(&mut self) {
        let Some(dataset) = self.state.dataset() else {
            return;
        };
        if let Err(e) = self.chart.render(dataset) {
            error!(error = %e, "Failed to render chart");
        }
    }
}

impl<C: ChartCanvas> Drop for ConverterWidget<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}
