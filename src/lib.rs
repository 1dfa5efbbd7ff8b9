pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod formats;
pub mod utils;

pub use adapters::LocalStorage;
pub use app::sources::{GaussianSourceCalculator, PhenomSourceCalculator};
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::InstrumentConfig;
pub use core::instrument::{CalculatorResult, Instrument, RunContext};
pub use core::{Calculator, DataCollection, DataHandle, FormatKind, Storage};
pub use utils::error::{Result, SimError};
