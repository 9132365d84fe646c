//! Core converter logic, independent of the terminal and the network

pub mod chart;
pub mod config;
pub mod convert;
pub mod log;
pub mod rates;
pub mod state;
pub mod timer;

// Re-export main types for cleaner imports
pub use chart::{ChartCanvas, ChartDataset, ChartSlot};
pub use convert::ConversionOutcome;
pub use rates::{FetchFailure, RateProvider, RateSnapshot, RateTable};
pub use state::{ConverterState, LoadPhase};
