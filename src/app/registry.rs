use crate::adapters::LocalStorage;
use crate::app::sources::{GaussianSourceCalculator, PhenomSourceCalculator};
use crate::core::{Calculator, CalculatorParameters};
use crate::utils::error::{Result, SimError};

pub const PHENOM_SOURCE: &str = "phenom_source";
pub const GAUSSIAN_SOURCE: &str = "gaussian_source";

pub const KNOWN_KINDS: [&str; 2] = [PHENOM_SOURCE, GAUSSIAN_SOURCE];

fn unknown_kind(kind: &str) -> SimError {
    SimError::InvalidConfigValueError {
        field: "calculators.kind".to_string(),
        value: kind.to_string(),
        reason: format!("Unknown calculator kind. Known kinds: {}", KNOWN_KINDS.join(", ")),
    }
}

pub fn is_known_kind(kind: &str) -> bool {
    KNOWN_KINDS.contains(&kind)
}

/// Creates a calculator of `kind` writing through the local filesystem.
pub fn create_calculator(kind: &str, name: &str) -> Result<Box<dyn Calculator>> {
    let calculator: Box<dyn Calculator> = match kind {
        PHENOM_SOURCE => Box::new(PhenomSourceCalculator::new(name)?),
        GAUSSIAN_SOURCE => Box::new(GaussianSourceCalculator::new(name)?),
        other => return Err(unknown_kind(other)),
    };
    tracing::debug!("Created {} calculator '{}'", kind, name);
    Ok(calculator)
}

pub fn default_parameters(kind: &str) -> Result<CalculatorParameters> {
    match kind {
        PHENOM_SOURCE => PhenomSourceCalculator::<LocalStorage>::default_parameters(),
        GAUSSIAN_SOURCE => GaussianSourceCalculator::<LocalStorage>::default_parameters(),
        other => Err(unknown_kind(other)),
    }
}
